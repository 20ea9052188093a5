//! HTTP client layer — `CryptoCompareHttp` plus the rate-limit retry policy.

pub mod client;
pub mod retry;

pub use client::CryptoCompareHttp;
pub use retry::{RateLimitBackoff, RATE_LIMIT_MSG};

use crate::error::RemoteError;
use async_trait::async_trait;

/// The single logical remote call every endpoint goes through.
///
/// `CryptoCompareHttp` is the production implementation; tests substitute
/// canned payloads behind the same seam.
#[async_trait]
pub trait ApiQuery: Send + Sync {
    /// Query a relative path under the API base, e.g.
    /// `price?fsym=BTC&tsyms=USD`, and return the parsed payload (the `Data`
    /// field when present, else the whole document).
    async fn api_query(&self, path: &str) -> Result<serde_json::Value, RemoteError>;
}
