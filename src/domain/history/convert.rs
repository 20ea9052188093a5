//! Wire → domain conversions for history data.

use super::wire::HistoHourEntry;
use super::PriceHistoryEntry;

impl From<&HistoHourEntry> for PriceHistoryEntry {
    fn from(candle: &HistoHourEntry) -> Self {
        Self {
            time: candle.time,
            low: candle.low,
            high: candle.high,
        }
    }
}

/// Collapse a list of wire candles into resolver entries.
pub fn entries_from_wire(candles: &[HistoHourEntry]) -> Vec<PriceHistoryEntry> {
    candles.iter().map(PriceHistoryEntry::from).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;

    #[test]
    fn test_entries_keep_time_and_quote_bounds() {
        let candle = HistoHourEntry {
            time: 1611608400,
            high: Decimal::new(21, 1),
            low: Decimal::new(19, 1),
            open: Decimal::TWO,
            close: Decimal::TWO,
            volumefrom: Decimal::ONE,
            volumeto: Decimal::TWO,
            conversion_type: None,
            conversion_symbol: None,
        };
        let entries = entries_from_wire(&[candle]);
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].time, 1611608400);
        assert_eq!(entries[0].high, Decimal::new(21, 1));
        assert_eq!(entries[0].low, Decimal::new(19, 1));
    }
}
