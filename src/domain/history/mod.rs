//! Price history domain — the hourly series the resolver reads.

pub mod convert;
pub mod wire;

use crate::error::RemoteError;
use crate::shared::{Asset, Timestamp, HOUR_IN_SECONDS};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// One resolved hourly price point. Only the fields the resolver needs
/// survive conversion from the wire candle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceHistoryEntry {
    pub time: Timestamp,
    pub low: Decimal,
    pub high: Decimal,
}

impl PriceHistoryEntry {
    /// The price the resolver reports for this hour.
    pub fn midpoint(&self) -> Decimal {
        (self.high + self.low) / Decimal::TWO
    }
}

/// A contiguous hourly series together with its validity window.
///
/// Invariants: `start_time <= data[0].time` and `end_time >= data[last].time`
/// (the end may exceed the last entry by up to one hour due to
/// fetch-boundary drift). Owned by the cache; resolvers read snapshots.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceHistoryData {
    pub data: Vec<PriceHistoryEntry>,
    pub start_time: Timestamp,
    pub end_time: Timestamp,
}

impl PriceHistoryData {
    /// Whether `timestamp` falls inside the validity window.
    pub fn covers(&self, timestamp: Timestamp) -> bool {
        self.start_time <= timestamp && timestamp < self.end_time
    }
}

/// Check that the assembled hourly data has timestamps increasing by exactly
/// one hour. Any violation is a hard data-integrity error naming the
/// offending indices and pair; partial series must be discarded, not cached.
pub fn check_hourly_sanity(
    data: &[wire::HistoHourEntry],
    from_asset: &Asset,
    to_asset: &Asset,
) -> Result<(), RemoteError> {
    for (index, pair) in data.windows(2).enumerate() {
        let diff = pair[1].time - pair[0].time;
        if diff != HOUR_IN_SECONDS {
            return Err(RemoteError::DataIntegrity {
                pair: format!("{from_asset}_{to_asset}"),
                detail: format!(
                    "unexpected time difference {diff}s between indices {index} and {}",
                    index + 1
                ),
            });
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shared::Asset;

    fn candle(time: Timestamp) -> wire::HistoHourEntry {
        wire::HistoHourEntry {
            time,
            high: Decimal::ONE,
            low: Decimal::ONE,
            open: Decimal::ONE,
            close: Decimal::ONE,
            volumefrom: Decimal::ZERO,
            volumeto: Decimal::ZERO,
            conversion_type: None,
            conversion_symbol: None,
        }
    }

    #[test]
    fn test_hourly_sanity_accepts_contiguous_series() {
        let data = vec![candle(0), candle(3600), candle(7200), candle(10800)];
        let btc = Asset::new("BTC");
        let usd = Asset::new("USD");
        assert!(check_hourly_sanity(&data, &btc, &usd).is_ok());
    }

    #[test]
    fn test_hourly_sanity_names_offending_indices() {
        let data = vec![candle(0), candle(3600), candle(10800)];
        let btc = Asset::new("BTC");
        let usd = Asset::new("USD");
        let err = check_hourly_sanity(&data, &btc, &usd).unwrap_err();
        match err {
            RemoteError::DataIntegrity { pair, detail } => {
                assert_eq!(pair, "BTC_USD");
                assert!(detail.contains("indices 1 and 2"), "{detail}");
                assert!(detail.contains("7200s"), "{detail}");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_midpoint() {
        let entry = PriceHistoryEntry {
            time: 0,
            low: Decimal::new(10, 0),
            high: Decimal::new(30, 0),
        };
        assert_eq!(entry.midpoint(), Decimal::new(20, 0));
    }

    #[test]
    fn test_covers_is_half_open() {
        let series = PriceHistoryData {
            data: vec![],
            start_time: 100,
            end_time: 200,
        };
        assert!(series.covers(100));
        assert!(series.covers(199));
        assert!(!series.covers(200));
        assert!(!series.covers(99));
    }
}
