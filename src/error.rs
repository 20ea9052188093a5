//! Unified SDK error types.

use crate::shared::{Asset, Timestamp};
use thiserror::Error;

/// Top-level SDK error.
#[derive(Error, Debug)]
pub enum HistorianError {
    #[error("remote error: {0}")]
    Remote(#[from] RemoteError),

    /// The asset cannot be priced by the remote service at all. Distinct from
    /// a transport failure so callers can tell "service is down" from "this
    /// asset is unknown here".
    #[error("asset {0} is not supported for price queries")]
    UnsupportedAsset(String),

    /// Raised only after every strategy (override table, direct series
    /// lookup, BTC bridge, daily endpoint) produced no usable price.
    #[error("no price found for {from_asset} -> {to_asset} at {date}")]
    NoPriceForGivenTimestamp {
        from_asset: Asset,
        to_asset: Asset,
        date: String,
    },

    /// Cache persistence failure.
    #[error("cache I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The peer resolver handle could no longer be upgraded. Production
    /// wiring points the handle at the client itself, so this only occurs
    /// when a substituted peer was dropped.
    #[error("peer price resolver is no longer available")]
    PeerResolverGone,
}

impl HistorianError {
    pub(crate) fn no_price(from: &Asset, to: &Asset, timestamp: Timestamp) -> Self {
        let date = chrono::DateTime::from_timestamp(timestamp, 0)
            .map(|dt| dt.format("%d/%m/%Y, %H:%M:%S").to_string())
            .unwrap_or_else(|| timestamp.to_string());
        Self::NoPriceForGivenTimestamp {
            from_asset: from.clone(),
            to_asset: to.clone(),
            date,
        }
    }
}

/// Errors from talking to the remote price service.
#[derive(Error, Debug)]
pub enum RemoteError {
    #[error("request failed: {0}")]
    Reqwest(#[from] reqwest::Error),

    #[error("remote returned invalid JSON: {body}")]
    InvalidJson { body: String },

    /// The remote reported an explicit non-success status.
    #[error("remote query rejected: {message}")]
    Rejected { message: String },

    /// A payload parsed as JSON but not as the expected shape.
    #[error("unexpected payload format: {0}")]
    UnexpectedPayload(String),

    /// An assembled series violated the hourly-continuity or window-boundary
    /// invariants. Fatal for the current request; never auto-repaired.
    #[error("data integrity violation for pair {pair}: {detail}")]
    DataIntegrity { pair: String, detail: String },
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shared::Asset;

    #[test]
    fn test_no_price_formats_date() {
        let err = HistorianError::no_price(&Asset::new("ETH"), &Asset::new("EUR"), 1577836800);
        let msg = err.to_string();
        assert!(msg.contains("ETH -> EUR"));
        assert!(msg.contains("01/01/2020"));
    }
}
