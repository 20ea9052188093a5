//! # CryptoCompare SDK
//!
//! A Rust SDK for resolving historical asset prices through the CryptoCompare
//! min-api, with a file-backed hourly-series cache.
//!
//! ## Architecture
//!
//! The SDK is organized in layers:
//!
//! 1. **Core** — Shared newtypes, domain models, wire types
//! 2. **HTTP API** — `CryptoCompareHttp` with the rate-limit retry loop
//! 3. **Endpoints** — Typed queries with special-case two-hop synthesis
//! 4. **Cache** — `PriceHistoryCache`, per-pair time-range files
//! 5. **High-Level Client** — `HistorianClient`: backfill, resolution, consistency
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use cryptocompare_sdk::prelude::*;
//!
//! let client = HistorianClient::builder()
//!     .data_dir("/var/cache/price-history")
//!     .build()?;
//!
//! let eth = Asset::new("ETH");
//! let eur = Asset::new("EUR");
//! let price = client.query_historical_price(&eth, &eur, 1611615600).await?;
//! ```

// ── Layer 1: Core ────────────────────────────────────────────────────────────

/// Shared newtypes used across all domains.
pub mod shared;

/// Domain modules: history series, special-case tables, symbol translation.
pub mod domain;

/// Unified SDK error types.
pub mod error;

/// Network URL constants.
pub mod network;

// ── Layer 2: HTTP API ────────────────────────────────────────────────────────

/// HTTP client with the rate-limit retry loop.
pub mod http;

// ── Layer 3: Endpoints ───────────────────────────────────────────────────────

/// Typed endpoint queries and the two-hop synthesizer.
pub mod endpoints;

// ── Layer 4: Cache ───────────────────────────────────────────────────────────

/// File-backed time-range cache for hourly price series.
pub mod cache;

// ── Layer 5: High-Level Client ───────────────────────────────────────────────

/// `HistorianClient` — the primary entry point.
pub mod client;

// ── Prelude ──────────────────────────────────────────────────────────────────

pub mod prelude {
    // Shared newtypes
    pub use crate::shared::{ts_now, Asset, PairCacheKey, Timestamp, HOUR_IN_SECONDS};
    pub use crate::shared::{A_BTC, A_COMP, A_DAI, A_USD, A_USDT, A_WETH};

    // Domain types — hourly history
    pub use crate::domain::history::wire::{HistoHourEntry, HistoHourResponse};
    pub use crate::domain::history::{PriceHistoryData, PriceHistoryEntry};

    // Domain types — special-case and override tables, symbol translation
    pub use crate::domain::special::{HistoHourOverride, HistoHourOverrides, SpecialCases};
    pub use crate::domain::symbols::SymbolTable;

    // Errors
    pub use crate::error::{HistorianError, RemoteError};

    // Network
    pub use crate::network::DEFAULT_API_URL;

    // HTTP transport
    pub use crate::http::retry::RateLimitBackoff;
    pub use crate::http::{ApiQuery, CryptoCompareHttp};

    // Endpoint queries
    pub use crate::endpoints::{Endpoints, PriceMap};

    // Cache
    pub use crate::cache::PriceHistoryCache;

    // High-level client
    pub use crate::client::{HistorianClient, HistorianClientBuilder, PriceResolver};
}
