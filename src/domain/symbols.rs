//! Asset identifier → remote symbol translation.
//!
//! The SDK treats this as an opaque mapping: most identifiers pass through
//! unchanged, a few are renamed on the remote side, and some are known to be
//! missing entirely. The table is injected at client build time.

use crate::error::HistorianError;
use crate::shared::Asset;
use std::collections::{HashMap, HashSet};

/// Translation table from asset identifiers to min-api symbols.
#[derive(Debug, Clone, Default)]
pub struct SymbolTable {
    renames: HashMap<Asset, String>,
    unsupported: HashSet<Asset>,
}

impl SymbolTable {
    /// Pure pass-through table: every identifier is its own remote symbol.
    pub fn passthrough() -> Self {
        Self::default()
    }

    pub fn with_rename(mut self, asset: impl Into<Asset>, symbol: impl Into<String>) -> Self {
        self.renames.insert(asset.into(), symbol.into());
        self
    }

    pub fn with_unsupported(mut self, asset: impl Into<Asset>) -> Self {
        self.unsupported.insert(asset.into());
        self
    }

    /// Translate an asset for use in a query string.
    ///
    /// Fails with the typed unsupported-asset error, never a transport error,
    /// when the asset is known to be missing from the remote.
    pub fn remote_symbol(&self, asset: &Asset) -> Result<String, HistorianError> {
        if self.unsupported.contains(asset) {
            return Err(HistorianError::UnsupportedAsset(
                asset.identifier().to_string(),
            ));
        }
        Ok(self
            .renames
            .get(asset)
            .cloned()
            .unwrap_or_else(|| asset.identifier().to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_passthrough_and_rename() {
        let table = SymbolTable::passthrough().with_rename("WETH2", "WETH");
        assert_eq!(table.remote_symbol(&Asset::new("BTC")).unwrap(), "BTC");
        assert_eq!(table.remote_symbol(&Asset::new("WETH2")).unwrap(), "WETH");
    }

    #[test]
    fn test_unsupported_is_typed() {
        let table = SymbolTable::passthrough().with_unsupported("NOCOIN");
        match table.remote_symbol(&Asset::new("NOCOIN")) {
            Err(HistorianError::UnsupportedAsset(name)) => assert_eq!(name, "NOCOIN"),
            other => panic!("unexpected result: {other:?}"),
        }
    }
}
