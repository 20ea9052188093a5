//! Network URL constants for the CryptoCompare SDK.

/// Default REST API base URL (the `data` namespace of min-api).
pub const DEFAULT_API_URL: &str = "https://min-api.cryptocompare.com/data";
