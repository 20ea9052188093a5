//! Wire types for the min-api history endpoints.

use crate::shared::Timestamp;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// One hourly candle from `v2/histohour`.
///
/// Every quote field defaults to zero: up until 23/09/2020 the remote could
/// omit values due to a bug on their side, and the documented behavior is to
/// treat those as zero rather than fail the whole page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoHourEntry {
    pub time: Timestamp,
    #[serde(default)]
    pub high: Decimal,
    #[serde(default)]
    pub low: Decimal,
    #[serde(default)]
    pub open: Decimal,
    #[serde(default)]
    pub close: Decimal,
    #[serde(default)]
    pub volumefrom: Decimal,
    #[serde(default)]
    pub volumeto: Decimal,
    #[serde(rename = "conversionType", default, skip_serializing_if = "Option::is_none")]
    pub conversion_type: Option<String>,
    #[serde(rename = "conversionSymbol", default, skip_serializing_if = "Option::is_none")]
    pub conversion_symbol: Option<String>,
}

/// Full `v2/histohour` response, including the declared window boundaries.
///
/// `time_from`/`time_to` are the remote's declared coverage, which may drift
/// from the requested window by a few seconds near "now". The backfill engine
/// owns the tolerance rules for that drift.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoHourResponse {
    #[serde(rename = "Aggregated", default)]
    pub aggregated: bool,
    #[serde(rename = "TimeFrom")]
    pub time_from: Timestamp,
    #[serde(rename = "TimeTo")]
    pub time_to: Timestamp,
    #[serde(rename = "Data", default)]
    pub data: Vec<HistoHourEntry>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_histohour_entry_missing_quotes_default_to_zero() {
        let entry: HistoHourEntry =
            serde_json::from_str(r#"{"time": 1611615600, "high": "1.5"}"#).unwrap();
        assert_eq!(entry.time, 1611615600);
        assert_eq!(entry.high, Decimal::new(15, 1));
        assert_eq!(entry.low, Decimal::ZERO);
        assert_eq!(entry.open, Decimal::ZERO);
        assert_eq!(entry.close, Decimal::ZERO);
    }

    #[test]
    fn test_histohour_entry_accepts_json_numbers() {
        let entry: HistoHourEntry = serde_json::from_str(
            r#"{"time": 1611615600, "high": 34250.12, "low": 33980.4,
                "open": 34000, "close": 34100.5, "volumefrom": 12.5,
                "volumeto": 425000, "conversionType": "direct",
                "conversionSymbol": ""}"#,
        )
        .unwrap();
        assert_eq!(entry.high.to_string(), "34250.12");
        assert_eq!(entry.conversion_type.as_deref(), Some("direct"));
    }

    #[test]
    fn test_histohour_response_renamed_fields() {
        let resp: HistoHourResponse = serde_json::from_str(
            r#"{"Aggregated": false, "TimeFrom": 1611608400,
                "TimeTo": 1611615600,
                "Data": [{"time": 1611608400}, {"time": 1611612000}]}"#,
        )
        .unwrap();
        assert_eq!(resp.time_from, 1611608400);
        assert_eq!(resp.time_to, 1611615600);
        assert_eq!(resp.data.len(), 2);
    }
}
