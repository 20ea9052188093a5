//! Static special-case tables for assets the remote cannot price directly.
//!
//! Both tables are immutable, built once and injected into the client, so
//! tests can substitute their own contents instead of fighting ambient
//! global state.

use crate::shared::{Asset, Timestamp};
use rust_decimal::Decimal;
use std::collections::HashMap;

/// Assets that can only be priced through a fixed intermediate asset.
///
/// CryptoCompare cannot quote these against an arbitrary target, so queries
/// are synthesized from two hops: `from -> intermediate -> to`.
#[derive(Debug, Clone, Default)]
pub struct SpecialCases {
    mapping: HashMap<Asset, Asset>,
}

impl SpecialCases {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn from_pairs<I, A, B>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (A, B)>,
        A: Into<Asset>,
        B: Into<Asset>,
    {
        Self {
            mapping: pairs
                .into_iter()
                .map(|(a, b)| (a.into(), b.into()))
                .collect(),
        }
    }

    pub fn contains(&self, asset: &Asset) -> bool {
        self.mapping.contains_key(asset)
    }

    pub fn intermediate(&self, asset: &Asset) -> Option<&Asset> {
        self.mapping.get(asset)
    }

    /// The table the original service ships with. Hopefully temporary:
    /// entries get removed once cryptocompare learns to price them directly.
    pub fn defaults() -> Self {
        Self::from_pairs([
            ("TLN", "WETH"),
            ("BLY", "USDT"),
            ("cDAI", "DAI"),
            ("cCOMP", "COMP"),
            ("cBAT", "BAT"),
            ("cREP", "REP"),
            ("cSAI", "SAI"),
            ("cUSDC", "USDC"),
            ("cUSDT", "USDT"),
            ("cWBTC", "WBTC"),
            ("cUNI", "UNI"),
            ("cZRX", "ZRX"),
            ("ADADOWN", "USDT"),
            ("ADAUP", "USDT"),
            ("BNBDOWN", "USDT"),
            ("BNBUP", "USDT"),
            ("BTCDOWN", "USDT"),
            ("BTCUP", "USDT"),
            ("ETHDOWN", "USDT"),
            ("ETHUP", "USDT"),
            ("EOSDOWN", "USDT"),
            ("EOSUP", "USDT"),
            ("DOTDOWN", "USDT"),
            ("DOTUP", "USDT"),
            ("LTCDOWN", "USDT"),
            ("LTCUP", "USDT"),
            ("TRXDOWN", "USDT"),
            ("TRXUP", "USDT"),
            ("XRPDOWN", "USDT"),
            ("XRPUP", "USDT"),
            ("LINKDOWN", "USDT"),
            ("LINKUP", "USDT"),
            ("XTZDOWN", "USDT"),
            ("XTZUP", "USDT"),
            ("FILDOWN", "USDT"),
            ("FILUP", "USDT"),
            ("YFIDOWN", "USDT"),
            ("YFIUP", "USDT"),
            ("DEXT", "USDT"),
            ("DOS", "USDT"),
            ("GEEQ", "USDT"),
            ("STAKE", "USDT"),
            ("MCB", "USDT"),
            ("TRB", "USDT"),
            ("YFI", "USDT"),
            ("YAM", "USDT"),
            ("DEC-2", "USDT"),
            ("ORN", "USDT"),
            ("PERX", "USDT"),
            ("PRQ", "USDT"),
            ("RING", "USDT"),
            ("SBREE", "USDT"),
            ("YFII", "USDT"),
            ("BZRX", "USDT"),
            ("CREAM", "USDT"),
            ("ADEL", "USDT"),
            ("ANK", "USDT"),
            ("CORN", "USDT"),
            ("SAL", "USDT"),
            ("CRT", "USDT"),
            ("FSW", "USDT"),
            ("JFI", "USDT"),
            ("PEARL", "USDT"),
            ("TAI", "USDT"),
            ("YFL", "USDT"),
            ("TRUMPWIN", "USDT"),
            ("TRUMPLOSE", "USDT"),
            ("KLV", "USDT"),
            ("KRT", "KRW"),
            ("RVC", "USDT"),
            ("SDT", "USDT"),
            ("CHI", "USDT"),
            ("BAKE", "BNB"),
            ("BURGER", "BNB"),
            ("CAKE", "BNB"),
            ("BREE", "USDT"),
            ("GHST", "USDT"),
            ("MEXP", "USDT"),
            ("POLS", "USDT"),
            ("RARI", "USDT"),
            ("VALUE", "USDT"),
            ("$BASED", "WETH"),
            ("DPI", "WETH"),
            ("JRT", "USDT"),
            ("PICKLE", "USDT"),
            ("BOT", "USDT"),
        ])
    }
}

// ─── Histohour overrides ─────────────────────────────────────────────────────

/// A known-good USD reference price for an asset, applicable at or before
/// `timestamp`. `usd_price` comes from the 'close' price in USD.
#[derive(Debug, Clone, PartialEq)]
pub struct HistoHourOverride {
    pub timestamp: Timestamp,
    pub usd_price: Decimal,
}

/// Assets for which the histohour feed returns degenerate zero prices before
/// a known date. Queries against USD at or before that date short-circuit to
/// the recorded price without touching the remote.
#[derive(Debug, Clone, Default)]
pub struct HistoHourOverrides {
    mapping: HashMap<Asset, HistoHourOverride>,
}

impl HistoHourOverrides {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn from_entries<I, A>(entries: I) -> Self
    where
        I: IntoIterator<Item = (A, HistoHourOverride)>,
        A: Into<Asset>,
    {
        Self {
            mapping: entries.into_iter().map(|(a, o)| (a.into(), o)).collect(),
        }
    }

    pub fn get(&self, asset: &Asset) -> Option<&HistoHourOverride> {
        self.mapping.get(asset)
    }

    pub fn contains(&self, asset: &Asset) -> bool {
        self.mapping.contains_key(asset)
    }

    /// Safest starting reference prices known to avoid the zero-price window.
    pub fn defaults() -> Self {
        Self::from_entries([(
            "COMP",
            HistoHourOverride {
                timestamp: 1592632800,
                usd_price: Decimal::new(20293, 2),
            },
        )])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_special_cases_route_compound_tokens() {
        let cases = SpecialCases::defaults();
        let cdai = Asset::new("cDAI");
        assert!(cases.contains(&cdai));
        assert_eq!(cases.intermediate(&cdai), Some(&Asset::new("DAI")));
        assert!(!cases.contains(&Asset::new("BTC")));
    }

    #[test]
    fn test_default_overrides_have_comp() {
        let overrides = HistoHourOverrides::defaults();
        let comp = overrides.get(&Asset::new("COMP")).unwrap();
        assert_eq!(comp.timestamp, 1592632800);
        assert_eq!(comp.usd_price.to_string(), "202.93");
    }
}
