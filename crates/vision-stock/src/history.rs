//! Chart history and quote summaries for the web client

use crate::api::{MarketDataProvider, Quote, last_and_previous};
use crate::cache::{CacheKey, StockCache};
use crate::config::StockConfig;
use crate::error::{Result, StockError};
use chrono::{NaiveDate, NaiveTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;

const SUMMARY_RANGE: &str = "1y";

/// First day of the chart history
pub fn series_start() -> NaiveDate {
    NaiveDate::from_ymd_opt(2023, 1, 1).unwrap_or(NaiveDate::MIN)
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeriesMeta {
    #[serde(rename = "2. Symbol")]
    pub symbol: String,
    #[serde(rename = "3. Last Refreshed")]
    pub last_refreshed: String,
}

/// One day of the chart series; prices are rendered as strings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeriesBar {
    #[serde(rename = "1. open")]
    pub open: String,
    #[serde(rename = "2. high")]
    pub high: String,
    #[serde(rename = "3. low")]
    pub low: String,
    #[serde(rename = "4. close")]
    pub close: String,
    #[serde(rename = "5. volume")]
    pub volume: String,
}

/// Daily series in the layout chart clients expect
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailySeries {
    #[serde(rename = "Meta Data")]
    pub meta: SeriesMeta,
    /// Keyed by `YYYY-MM-DD`
    #[serde(rename = "Time Series (Daily)")]
    pub series: BTreeMap<String, SeriesBar>,
}

/// Headline quote figures derived from a year of daily bars
///
/// Fields the daily chart cannot supply are left empty.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuoteSummary {
    pub symbol: String,
    pub short_name: Option<String>,
    pub price: f64,
    pub change: f64,
    pub change_percent: f64,
    pub market_cap: Option<f64>,
    pub fifty_two_week_high: f64,
    pub fifty_two_week_low: f64,
    pub dividend_yield: Option<f64>,
    pub pe_ratio: Option<f64>,
}

impl QuoteSummary {
    /// Summarise bars ordered oldest first; `None` without any bars
    pub fn from_quotes(symbol: &str, quotes: &[Quote]) -> Option<Self> {
        let last = quotes.last()?;
        let (change, change_percent) = match last_and_previous(quotes) {
            Some((price, prev)) if prev != 0.0 => (price - prev, (price - prev) / prev * 100.0),
            _ => (0.0, 0.0),
        };

        Some(Self {
            symbol: symbol.to_string(),
            short_name: None,
            price: last.close,
            change,
            change_percent,
            market_cap: None,
            fifty_two_week_high: quotes.iter().map(|q| q.high).fold(f64::NEG_INFINITY, f64::max),
            fifty_two_week_low: quotes.iter().map(|q| q.low).fold(f64::INFINITY, f64::min),
            dividend_yield: None,
            pe_ratio: None,
        })
    }
}

/// Serves chart history and summaries, caching upstream bars briefly
#[derive(Clone)]
pub struct MarketHistory {
    provider: Arc<dyn MarketDataProvider>,
    cache: StockCache<Vec<Quote>>,
}

impl MarketHistory {
    pub fn new(provider: Arc<dyn MarketDataProvider>, config: &StockConfig) -> Self {
        Self {
            provider,
            cache: StockCache::new(config.cache_ttl_realtime),
        }
    }

    /// Daily bars since [`series_start`]
    pub async fn daily_series(&self, symbol: &str) -> Result<DailySeries> {
        let quotes = self
            .cache
            .get_or_fetch(CacheKey::new(symbol, "series"), || async {
                let start = series_start().and_time(NaiveTime::MIN).and_utc();
                self.provider.historical_quotes(symbol, start, Utc::now()).await
            })
            .await?;

        if quotes.is_empty() {
            return Err(no_data(symbol));
        }

        let series = quotes
            .iter()
            .map(|q| {
                let bar = SeriesBar {
                    open: q.open.to_string(),
                    high: q.high.to_string(),
                    low: q.low.to_string(),
                    close: q.close.to_string(),
                    volume: q.volume.to_string(),
                };
                (q.date.format("%Y-%m-%d").to_string(), bar)
            })
            .collect();

        Ok(DailySeries {
            meta: SeriesMeta {
                symbol: symbol.to_string(),
                last_refreshed: Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
            },
            series,
        })
    }

    /// Summary over the last year of daily bars
    pub async fn quote_summary(&self, symbol: &str) -> Result<QuoteSummary> {
        let quotes = self
            .cache
            .get_or_fetch(CacheKey::new(symbol, "summary"), || {
                self.provider.recent_quotes(symbol, SUMMARY_RANGE)
            })
            .await?;

        QuoteSummary::from_quotes(symbol, &quotes).ok_or_else(|| no_data(symbol))
    }
}

fn no_data(symbol: &str) -> StockError {
    StockError::DataUnavailable {
        symbol: symbol.to_string(),
        reason: "No daily bars returned.".to_string(),
    }
}
