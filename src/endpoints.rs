//! Typed endpoint queries over the raw [`ApiQuery`] transport.
//!
//! This layer owns path construction, wire-type parsing, symbol translation
//! and the special-case two-hop synthesizer. The legs of a synthesized query
//! always go through the direct variants, so a special-case chain can never
//! re-trigger the synthesizer.

use crate::domain::history::wire::{HistoHourEntry, HistoHourResponse};
use crate::domain::special::SpecialCases;
use crate::domain::symbols::SymbolTable;
use crate::error::{HistorianError, RemoteError};
use crate::http::ApiQuery;
use crate::shared::{Asset, Timestamp, A_BTC};

use rust_decimal::Decimal;
use std::collections::HashMap;
use std::sync::Arc;

/// Current-price response: quote symbol → price.
pub type PriceMap = HashMap<String, Decimal>;

/// Endpoint queries with special-case handling.
#[derive(Clone)]
pub struct Endpoints {
    api: Arc<dyn ApiQuery>,
    symbols: SymbolTable,
    special_cases: SpecialCases,
}

impl Endpoints {
    pub fn new(api: Arc<dyn ApiQuery>, symbols: SymbolTable, special_cases: SpecialCases) -> Self {
        Self {
            api,
            symbols,
            special_cases,
        }
    }

    /// The intermediate asset for a pair needing two-hop synthesis, if any.
    /// When both sides qualify, `from`'s mapping wins.
    fn intermediate_for(&self, from: &Asset, to: &Asset) -> Option<Asset> {
        self.special_cases
            .intermediate(from)
            .or_else(|| self.special_cases.intermediate(to))
            .cloned()
    }

    fn symbol(&self, asset: &Asset) -> Result<String, HistorianError> {
        self.symbols.remote_symbol(asset)
    }

    // ─── Current price ───────────────────────────────────────────────────

    /// Current price of `from` quoted in `to`.
    pub async fn price(&self, from: &Asset, to: &Asset) -> Result<PriceMap, HistorianError> {
        match self.intermediate_for(from, to) {
            Some(intermediate) => self.price_two_hop(from, &intermediate, to).await,
            None => self.price_direct(from, to).await,
        }
    }

    async fn price_direct(&self, from: &Asset, to: &Asset) -> Result<PriceMap, HistorianError> {
        let fsym = self.symbol(from)?;
        let tsym = self.symbol(to)?;
        let path = format!(
            "price?fsym={}&tsyms={}",
            urlencoding::encode(&fsym),
            urlencoding::encode(&tsym)
        );
        let value = self.api.api_query(&path).await?;
        let map: PriceMap = serde_json::from_value(value)
            .map_err(|e| RemoteError::UnexpectedPayload(e.to_string()))?;
        Ok(map)
    }

    async fn price_two_hop(
        &self,
        from: &Asset,
        intermediate: &Asset,
        to: &Asset,
    ) -> Result<PriceMap, HistorianError> {
        let leg1 = self.price_direct(from, intermediate).await?;
        let leg2 = self.price_direct(intermediate, to).await?;

        let isym = self.symbol(intermediate)?;
        let tsym = self.symbol(to)?;
        // Missing quote values are a documented remote quirk; assume zero.
        let p1 = leg1.get(&isym).copied().unwrap_or(Decimal::ZERO);
        let p2 = leg2.get(&tsym).copied().unwrap_or(Decimal::ZERO);

        Ok(HashMap::from([(tsym, p1 * p2)]))
    }

    // ─── Hourly history ──────────────────────────────────────────────────

    /// Up to `limit` hourly candles of `from`/`to` ending at `to_timestamp`,
    /// including the remote's declared `TimeFrom`/`TimeTo` boundaries.
    pub async fn histohour(
        &self,
        from: &Asset,
        to: &Asset,
        limit: u32,
        to_timestamp: Timestamp,
    ) -> Result<HistoHourResponse, HistorianError> {
        match self.intermediate_for(from, to) {
            Some(intermediate) => {
                self.histohour_two_hop(from, &intermediate, to, limit, to_timestamp)
                    .await
            }
            None => self.histohour_direct(from, to, limit, to_timestamp).await,
        }
    }

    async fn histohour_direct(
        &self,
        from: &Asset,
        to: &Asset,
        limit: u32,
        to_timestamp: Timestamp,
    ) -> Result<HistoHourResponse, HistorianError> {
        let fsym = self.symbol(from)?;
        let tsym = self.symbol(to)?;
        let path = format!(
            "v2/histohour?fsym={}&tsym={}&limit={limit}&toTs={to_timestamp}",
            urlencoding::encode(&fsym),
            urlencoding::encode(&tsym)
        );
        let value = self.api.api_query(&path).await?;
        let resp: HistoHourResponse = serde_json::from_value(value)
            .map_err(|e| RemoteError::UnexpectedPayload(e.to_string()))?;
        Ok(resp)
    }

    async fn histohour_two_hop(
        &self,
        from: &Asset,
        intermediate: &Asset,
        to: &Asset,
        limit: u32,
        to_timestamp: Timestamp,
    ) -> Result<HistoHourResponse, HistorianError> {
        let leg1 = self
            .histohour_direct(from, intermediate, limit, to_timestamp)
            .await?;
        let leg2 = self
            .histohour_direct(intermediate, to, limit, to_timestamp)
            .await?;

        if leg2.data.len() < leg1.data.len() {
            return Err(RemoteError::UnexpectedPayload(format!(
                "two-hop histohour legs have mismatched lengths: {} vs {}",
                leg1.data.len(),
                leg2.data.len()
            ))
            .into());
        }

        // Element-wise product of the quote fields; volumes and conversion
        // metadata pass through from the first leg unchanged.
        let data = leg1
            .data
            .iter()
            .enumerate()
            .map(|(idx, entry)| {
                let other = &leg2.data[idx];
                HistoHourEntry {
                    time: entry.time,
                    high: entry.high * other.high,
                    low: entry.low * other.low,
                    open: entry.open * other.open,
                    close: entry.close * other.close,
                    volumefrom: entry.volumefrom,
                    volumeto: entry.volumeto,
                    conversion_type: entry.conversion_type.clone(),
                    conversion_symbol: entry.conversion_symbol.clone(),
                }
            })
            .collect();

        Ok(HistoHourResponse {
            aggregated: leg1.aggregated,
            time_from: leg1.time_from,
            time_to: leg1.time_to,
            data,
        })
    }

    // ─── Daily historical price ──────────────────────────────────────────

    /// Daily historical price of `from` in `to` at `timestamp`.
    pub async fn price_historical(
        &self,
        from: &Asset,
        to: &Asset,
        timestamp: Timestamp,
    ) -> Result<Decimal, HistorianError> {
        match self.intermediate_for(from, to) {
            Some(intermediate) => {
                tracing::debug!(%from, %to, %intermediate, timestamp, "two-hop daily historical price");
                let leg1 = self
                    .price_historical_direct(from, &intermediate, timestamp)
                    .await?;
                let leg2 = self
                    .price_historical_direct(&intermediate, to, timestamp)
                    .await?;
                Ok(leg1 * leg2)
            }
            None => self.price_historical_direct(from, to, timestamp).await,
        }
    }

    async fn price_historical_direct(
        &self,
        from: &Asset,
        to: &Asset,
        timestamp: Timestamp,
    ) -> Result<Decimal, HistorianError> {
        tracing::debug!(%from, %to, timestamp, "querying cryptocompare for daily historical price");
        let fsym = self.symbol(from)?;
        let tsym = self.symbol(to)?;
        let mut path = format!(
            "pricehistorical?fsym={}&tsyms={}&ts={timestamp}",
            urlencoding::encode(&fsym),
            urlencoding::encode(&tsym)
        );
        if *to == *A_BTC {
            path.push_str("&tryConversion=false");
        }
        let value = self.api.api_query(&path).await?;
        let parsed: HashMap<String, HashMap<String, Decimal>> = serde_json::from_value(value)
            .map_err(|e| RemoteError::UnexpectedPayload(e.to_string()))?;
        parsed
            .get(&fsym)
            .and_then(|quotes| quotes.get(&tsym))
            .copied()
            .ok_or_else(|| {
                RemoteError::UnexpectedPayload(format!(
                    "pricehistorical response missing {fsym}/{tsym} entry"
                ))
                .into()
            })
    }
}
