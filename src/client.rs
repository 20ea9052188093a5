//! High-level client — `HistorianClient`.
//!
//! Owns the backfill engine, the nearest-timestamp resolver and the
//! cross-currency consistency adjuster, glued to the endpoint layer and the
//! file-backed series cache. This module also keeps the builder and the
//! peer-resolver wiring.

use crate::cache::PriceHistoryCache;
use crate::domain::history::convert::entries_from_wire;
use crate::domain::history::wire::HistoHourEntry;
use crate::domain::history::{check_hourly_sanity, PriceHistoryData};
use crate::domain::special::{HistoHourOverrides, SpecialCases};
use crate::domain::symbols::SymbolTable;
use crate::endpoints::Endpoints;
use crate::error::{HistorianError, RemoteError};
use crate::http::{ApiQuery, CryptoCompareHttp};
use crate::shared::{ts_now, Asset, PairCacheKey, Timestamp, A_BTC, A_USD, HOUR_IN_SECONDS};

use async_lock::RwLock;
use async_trait::async_trait;
use rust_decimal::Decimal;
use std::path::PathBuf;
use std::sync::{Arc, Weak};

/// Maximum page size of the remote hourly-history endpoint.
const HOUR_QUERY_LIMIT: u32 = 2000;

/// Default earliest timestamp worth backfilling (2015-08-01).
const DEFAULT_HISTORICAL_DATA_START: Timestamp = 1438387200;

/// Relative difference at which the USD-derived cross rate is considered
/// authoritative over a directly quoted non-USD fiat price.
const INCONSISTENCY_THRESHOLD: Decimal = Decimal::from_parts(1, 0, 0, false, 1); // 0.1

/// The historical price resolution contract.
///
/// `HistorianClient` implements it, and in production wiring is its own
/// peer for the recursive BTC-bridge and USD-consistency lookups. Tests can
/// substitute any other implementation.
#[async_trait]
pub trait PriceResolver: Send + Sync {
    /// How much `to` one unit of `from` cost at `timestamp`.
    async fn resolve(
        &self,
        from: &Asset,
        to: &Asset,
        timestamp: Timestamp,
    ) -> Result<Decimal, HistorianError>;
}

/// The primary entry point of the SDK.
pub struct HistorianClient {
    endpoints: Endpoints,
    cache: PriceHistoryCache,
    overrides: HistoHourOverrides,
    historical_data_start: Timestamp,
    /// Peer used for recursive lookups; the client itself in production.
    peer: RwLock<Weak<dyn PriceResolver>>,
}

impl HistorianClient {
    pub fn builder() -> HistorianClientBuilder {
        HistorianClientBuilder::default()
    }

    /// Direct access to the typed endpoint queries.
    pub fn endpoints(&self) -> &Endpoints {
        &self.endpoints
    }

    /// Replace the peer resolver used for BTC-bridge and USD-consistency
    /// lookups. The caller keeps the strong reference alive.
    pub async fn set_peer(&self, peer: Weak<dyn PriceResolver>) {
        *self.peer.write().await = peer;
    }

    async fn peer(&self) -> Result<Arc<dyn PriceResolver>, HistorianError> {
        self.peer
            .read()
            .await
            .upgrade()
            .ok_or(HistorianError::PeerResolverGone)
    }

    // ─── Backfill engine ─────────────────────────────────────────────────

    /// The cached hourly series for the pair, assembling it from paged
    /// remote history when the cache does not cover `timestamp`.
    ///
    /// Returns a contiguous, gap-free hourly series spanning from the
    /// earlier of the configured start and `timestamp` up to "now".
    pub async fn get_historical_data(
        &self,
        from: &Asset,
        to: &Asset,
        timestamp: Timestamp,
    ) -> Result<PriceHistoryData, HistorianError> {
        tracing::debug!(%from, %to, timestamp, "retrieving historical price data");

        let cache_key = PairCacheKey::new(from, to);
        // One check-then-fetch-then-store at a time per pair.
        let fetch_lock = self.cache.fetch_lock(&cache_key).await;
        let _guard = fetch_lock.lock().await;

        self.cache.ensure_loaded(&cache_key).await;
        if let Some(data) = self.cache.get_if_covers(&cache_key, timestamp).await {
            return Ok(data);
        }

        let now_ts = ts_now();
        let series_start = self.historical_data_start.min(timestamp);
        let mut end_date = series_start;
        let mut calculated_history: Vec<HistoHourEntry> = Vec::new();

        loop {
            let pr_end_date = end_date;
            end_date += Timestamp::from(HOUR_QUERY_LIMIT) * HOUR_IN_SECONDS;

            tracing::debug!(%from, %to, end_date, "querying cryptocompare for hourly history page");
            let mut resp = self
                .endpoints
                .histohour(from, to, HOUR_QUERY_LIMIT, end_date)
                .await?;

            if pr_end_date != resp.time_from {
                // Responses close to "now" can contain more than requested.
                // Less than an hour of drift is tolerated as-is; a larger
                // overlap duplicates the previous window and is sliced off,
                // but only when the slicing point lines up exactly.
                let diff = pr_end_date - resp.time_from;
                if diff >= HOUR_IN_SECONDS {
                    let skip = (diff / HOUR_IN_SECONDS) as usize;
                    let reference_matches =
                        resp.data.get(skip).map(|entry| entry.time) == Some(pr_end_date);
                    if !reference_matches {
                        return Err(RemoteError::DataIntegrity {
                            pair: cache_key.to_string(),
                            detail: "expected to find the previous window end while \
                                     slicing overlapping histohour entries"
                                .to_string(),
                        }
                        .into());
                    }
                    resp.data.drain(..skip);
                }
            }

            // The declared end may drift from the requested one by less than
            // an hour (hourly data); adopt it so the next iteration continues
            // from the real boundary. More than that is corrupt data.
            let end_dates_dont_match = end_date < now_ts && resp.time_to != end_date;
            if end_dates_dont_match {
                if resp.time_to - end_date >= HOUR_IN_SECONDS {
                    return Err(RemoteError::DataIntegrity {
                        pair: cache_key.to_string(),
                        detail: format!(
                            "histohour window end {} drifted from requested {} by an hour or more",
                            resp.time_to, end_date
                        ),
                    }
                    .into());
                }
                end_date = resp.time_to;
            }

            // If the last accumulated slot and the first new one are the same
            // hour, keep only one.
            let duplicate_boundary = matches!(
                (calculated_history.last(), resp.data.first()),
                (Some(last), Some(first)) if last.time == first.time
            );
            if duplicate_boundary {
                resp.data.remove(0);
            }
            calculated_history.extend(resp.data);

            if end_date >= now_ts {
                break;
            }
        }

        // Always check sanity before anything is cached; a violating series
        // is discarded wholesale.
        check_hourly_sanity(&calculated_history, from, to)?;

        let data = PriceHistoryData {
            data: entries_from_wire(&calculated_history),
            start_time: series_start,
            end_time: end_date,
        };
        self.cache.store(&cache_key, data.clone()).await?;
        Ok(data)
    }

    // ─── Override short-circuit ──────────────────────────────────────────

    /// For USD pairs of assets with a registered histohour override, return
    /// the known-good reference price when the query is at or before the
    /// override timestamp. These exist because the hourly feed reports
    /// spurious zero prices for some assets before a certain date.
    fn check_special_histohour_price(
        &self,
        from: &Asset,
        to: &Asset,
        timestamp: Timestamp,
    ) -> Option<Decimal> {
        let (asset, invert) = if *to == *A_USD && self.overrides.contains(from) {
            (from, false)
        } else if *from == *A_USD && self.overrides.contains(to) {
            (to, true)
        } else {
            return None;
        };

        let known = self.overrides.get(asset)?;
        if timestamp > known.timestamp {
            return None;
        }
        let price = if invert {
            Decimal::ONE.checked_div(known.usd_price)?
        } else {
            known.usd_price
        };
        tracing::warn!(
            %from,
            %to,
            timestamp,
            price = %price,
            reference_timestamp = known.timestamp,
            "hourly feed may return zero prices here; using known-good reference price"
        );
        Some(price)
    }

    // ─── Resolver ────────────────────────────────────────────────────────

    /// Resolve the historical price of `from` in `to` at `timestamp`.
    ///
    /// Strategies, in order: the override table, the nearest entry of the
    /// cached/backfilled hourly series, BTC-bridge triangulation through the
    /// peer resolver, and finally the daily-historical endpoint. Non-USD
    /// fiat results pass through the consistency adjuster. Fails with
    /// `NoPriceForGivenTimestamp` only when everything yielded zero.
    pub async fn query_historical_price(
        &self,
        from: &Asset,
        to: &Asset,
        timestamp: Timestamp,
    ) -> Result<Decimal, HistorianError> {
        if let Some(price) = self.check_special_histohour_price(from, to, timestamp) {
            return Ok(price);
        }

        let history = self.get_historical_data(from, to, timestamp).await?;
        let mut price = nearest_entry_price(&history.data, timestamp, from, to);

        if price == Decimal::ZERO {
            if *from != *A_BTC && *to != *A_BTC {
                tracing::debug!(
                    %from,
                    %to,
                    timestamp,
                    "no direct historical price, triangulating through BTC"
                );
                let peer = self.peer().await?;
                let asset_btc_price = peer.resolve(from, &A_BTC, timestamp).await?;
                let btc_to_asset_price = peer.resolve(&A_BTC, to, timestamp).await?;
                price = asset_btc_price * btc_to_asset_price;
            } else {
                tracing::debug!(
                    %from,
                    %to,
                    timestamp,
                    "no direct historical price, attempting daily price"
                );
                price = self.endpoints.price_historical(from, to, timestamp).await?;
            }
        }

        let comparison_to_nonusd_fiat = (to.is_fiat() && *to != *A_USD)
            || (from.is_fiat() && *from != *A_USD);
        if comparison_to_nonusd_fiat {
            price = self
                .adjust_to_price_inconsistencies(price, from, to, timestamp)
                .await?;
        }

        if price == Decimal::ZERO {
            return Err(HistorianError::no_price(from, to, timestamp));
        }

        tracing::debug!(%from, %to, timestamp, price = %price, "got historical price");
        Ok(price)
    }

    // ─── Consistency adjuster ────────────────────────────────────────────

    /// Doublecheck `price` against the USD rates of both legs. When the
    /// implied cross rate disagrees by 10% or more, the cross rate is
    /// authoritative. Guards against known feed inconsistencies for
    /// non-USD fiat pairs.
    async fn adjust_to_price_inconsistencies(
        &self,
        price: Decimal,
        from: &Asset,
        to: &Asset,
        timestamp: Timestamp,
    ) -> Result<Decimal, HistorianError> {
        let peer = self.peer().await?;
        let from_asset_usd = peer.resolve(from, &A_USD, timestamp).await?;
        let to_asset_usd = peer.resolve(to, &A_USD, timestamp).await?;

        // A zero USD leg makes the cross rate meaningless; keep the computed
        // price and let the final zero check decide.
        let usd_invert_conversion = match from_asset_usd.checked_div(to_asset_usd) {
            Some(rate) => rate,
            None => return Ok(price),
        };
        let abs_diff = (usd_invert_conversion - price).abs();
        let relative_difference = match abs_diff.checked_div(price.max(usd_invert_conversion)) {
            Some(diff) => diff,
            None => return Ok(price),
        };
        if relative_difference >= INCONSISTENCY_THRESHOLD {
            tracing::warn!(
                %from,
                %to,
                timestamp,
                inconsistent_price = %price,
                adjusted_price = %usd_invert_conversion,
                "historical price data inconsistent, taking USD adjusted price"
            );
            return Ok(usd_invert_conversion);
        }
        Ok(price)
    }
}

#[async_trait]
impl PriceResolver for HistorianClient {
    async fn resolve(
        &self,
        from: &Asset,
        to: &Asset,
        timestamp: Timestamp,
    ) -> Result<Decimal, HistorianError> {
        self.query_historical_price(from, to, timestamp).await
    }
}

/// Pick the series entry closest to `timestamp` and report its midpoint, or
/// zero when the series cannot serve the timestamp.
///
/// The candidate index may overshoot the series by exactly one step (the
/// fetch boundary can be up to an hour short of "now"); that case steps back
/// to the last entry. A larger overshoot means the series genuinely cannot
/// answer and the caller falls back to triangulation instead of crashing.
fn nearest_entry_price(
    entries: &[crate::domain::history::PriceHistoryEntry],
    timestamp: Timestamp,
    from: &Asset,
    to: &Asset,
) -> Decimal {
    let first = match entries.first() {
        Some(first) if timestamp >= first.time => first,
        _ => return Decimal::ZERO,
    };

    let len = entries.len() as Timestamp;
    let mut index = (timestamp - first.time) / HOUR_IN_SECONDS;
    if index > len - 1 {
        if index == len {
            index = len - 1;
        } else {
            tracing::error!(
                %from,
                %to,
                timestamp,
                index,
                series_len = entries.len(),
                "expected series index not found, attempting other methods"
            );
            return Decimal::ZERO;
        }
    }

    let mut index = index as usize;
    let diff = (entries[index].time - timestamp).abs();
    if index + 1 < entries.len() {
        let diff_p1 = (entries[index + 1].time - timestamp).abs();
        if diff_p1 < diff {
            index += 1;
        }
    }
    entries[index].midpoint()
}

// ═════════════════════════════════════════════════════════════════════════════
// Builder
// ═════════════════════════════════════════════════════════════════════════════

pub struct HistorianClientBuilder {
    base_url: String,
    data_dir: Option<PathBuf>,
    api_key: Option<String>,
    historical_data_start: Timestamp,
    symbols: SymbolTable,
    special_cases: SpecialCases,
    overrides: HistoHourOverrides,
    transport: Option<Arc<dyn ApiQuery>>,
}

impl Default for HistorianClientBuilder {
    fn default() -> Self {
        Self {
            base_url: crate::network::DEFAULT_API_URL.to_string(),
            data_dir: None,
            api_key: None,
            historical_data_start: DEFAULT_HISTORICAL_DATA_START,
            symbols: SymbolTable::passthrough(),
            special_cases: SpecialCases::defaults(),
            overrides: HistoHourOverrides::defaults(),
            transport: None,
        }
    }
}

impl HistorianClientBuilder {
    pub fn base_url(mut self, url: &str) -> Self {
        self.base_url = url.to_string();
        self
    }

    /// Directory holding the per-pair cache files. Required.
    pub fn data_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.data_dir = Some(dir.into());
        self
    }

    pub fn api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = Some(key.into());
        self
    }

    /// Earliest timestamp a backfill reaches for (defaults to 2015-08-01).
    pub fn historical_data_start(mut self, timestamp: Timestamp) -> Self {
        self.historical_data_start = timestamp;
        self
    }

    pub fn symbols(mut self, symbols: SymbolTable) -> Self {
        self.symbols = symbols;
        self
    }

    pub fn special_cases(mut self, special_cases: SpecialCases) -> Self {
        self.special_cases = special_cases;
        self
    }

    pub fn histohour_overrides(mut self, overrides: HistoHourOverrides) -> Self {
        self.overrides = overrides;
        self
    }

    /// Substitute the remote transport. Mainly for tests.
    pub fn transport(mut self, transport: Arc<dyn ApiQuery>) -> Self {
        self.transport = Some(transport);
        self
    }

    pub fn build(self) -> Result<Arc<HistorianClient>, HistorianError> {
        let data_dir = self.data_dir.ok_or_else(|| {
            std::io::Error::new(std::io::ErrorKind::InvalidInput, "data_dir is required")
        })?;
        let cache = PriceHistoryCache::open(data_dir)?;

        let transport = match self.transport {
            Some(transport) => transport,
            None => Arc::new(CryptoCompareHttp::with_api_key(
                &self.base_url,
                self.api_key,
            )),
        };
        let endpoints = Endpoints::new(transport, self.symbols, self.special_cases);

        Ok(Arc::new_cyclic(|weak: &Weak<HistorianClient>| {
            let peer: Weak<dyn PriceResolver> = weak.clone();
            HistorianClient {
                endpoints,
                cache,
                overrides: self.overrides,
                historical_data_start: self.historical_data_start,
                peer: RwLock::new(peer),
            }
        }))
    }
}
