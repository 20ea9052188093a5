//! Shared newtypes and utilities used across all domain modules.
//!
//! These types are serialization-transparent: they serialize/deserialize
//! identically to the raw strings and integers the wire formats and cache
//! files use, so they can appear directly in wire types without conversion
//! overhead.

use lazy_static::lazy_static;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::HashSet;
use std::str::FromStr;

/// Unix timestamp in seconds.
pub type Timestamp = i64;

/// Seconds in one hour; the granularity of the histohour feed.
pub const HOUR_IN_SECONDS: Timestamp = 3600;

/// Current unix timestamp in seconds.
pub fn ts_now() -> Timestamp {
    chrono::Utc::now().timestamp()
}

// ─── Asset ───────────────────────────────────────────────────────────────────

/// Newtype for asset identifiers (e.g. `"BTC"`, `"cDAI"`, `"$BASED"`).
///
/// Identifiers are opaque here; translation to the remote service's symbols
/// goes through [`crate::domain::symbols::SymbolTable`].
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Asset(String);

impl Asset {
    pub fn new(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    pub fn identifier(&self) -> &str {
        &self.0
    }

    /// Whether this asset is a fiat currency.
    pub fn is_fiat(&self) -> bool {
        FIAT_CURRENCIES.contains(self.0.as_str())
    }
}

impl std::fmt::Display for Asset {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for Asset {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for Asset {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl FromStr for Asset {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Asset(s.to_string()))
    }
}

impl Serialize for Asset {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for Asset {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Ok(Asset(s))
    }
}

lazy_static! {
    /// The bridge asset used for triangulation when no direct quote exists.
    pub static ref A_BTC: Asset = Asset::new("BTC");
    /// The reference fiat against which consistency is checked.
    pub static ref A_USD: Asset = Asset::new("USD");
    pub static ref A_USDT: Asset = Asset::new("USDT");
    pub static ref A_DAI: Asset = Asset::new("DAI");
    pub static ref A_COMP: Asset = Asset::new("COMP");
    pub static ref A_WETH: Asset = Asset::new("WETH");

    /// ISO 4217 codes the SDK treats as fiat for the consistency adjuster.
    static ref FIAT_CURRENCIES: HashSet<&'static str> = [
        "USD", "EUR", "GBP", "JPY", "CNY", "KRW", "CAD", "AUD", "NZD", "CHF",
        "SEK", "NOK", "DKK", "PLN", "CZK", "HUF", "RUB", "TRY", "BRL", "MXN",
        "SGD", "HKD", "TWD", "INR", "ZAR", "ILS", "THB", "IDR", "MYR", "PHP",
    ]
    .into_iter()
    .collect();
}

// ─── PairCacheKey ────────────────────────────────────────────────────────────

/// Cache key for an ordered (from, to) asset pair, e.g. `"ETH_EUR"`.
///
/// Asymmetric by construction: `A→B` and `B→A` produce different keys.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PairCacheKey(String);

impl PairCacheKey {
    pub fn new(from: &Asset, to: &Asset) -> Self {
        Self(format!("{}_{}", from.identifier(), to.identifier()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for PairCacheKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for PairCacheKey {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pair_cache_key_is_asymmetric() {
        let eth = Asset::new("ETH");
        let eur = Asset::new("EUR");
        assert_eq!(PairCacheKey::new(&eth, &eur).as_str(), "ETH_EUR");
        assert_ne!(
            PairCacheKey::new(&eth, &eur),
            PairCacheKey::new(&eur, &eth)
        );
    }

    #[test]
    fn test_asset_serde_is_transparent() {
        let asset = Asset::new("cDAI");
        let json = serde_json::to_string(&asset).unwrap();
        assert_eq!(json, "\"cDAI\"");
        let back: Asset = serde_json::from_str(&json).unwrap();
        assert_eq!(asset, back);
    }

    #[test]
    fn test_fiat_classification() {
        assert!(Asset::new("EUR").is_fiat());
        assert!(Asset::new("USD").is_fiat());
        assert!(!Asset::new("BTC").is_fiat());
        assert!(!Asset::new("cUSDC").is_fiat());
    }
}
