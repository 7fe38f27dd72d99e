//! Provider abstraction over daily bars and market news

use crate::error::Result;
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// One daily OHLCV bar
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Quote {
    pub symbol: String,
    pub timestamp: DateTime<Utc>,
    /// Trading day in the exchange's local time
    pub date: NaiveDate,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: u64,
    pub adjclose: f64,
}

/// A market news headline as published by the provider
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarketNewsItem {
    pub title: String,
    pub publisher: Option<String>,
    pub link: Option<String>,
    pub published_at: Option<DateTime<Utc>>,
    /// `None` when the provider omitted the field
    pub related_tickers: Option<Vec<String>>,
}

/// Source of historical prices and news
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait MarketDataProvider: Send + Sync {
    /// Daily bars with timestamps in `[start, end)`, oldest first
    async fn historical_quotes(
        &self,
        symbol: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<Quote>>;

    /// Daily bars over a named range such as `5d` or `1y`
    async fn recent_quotes(&self, symbol: &str, range: &str) -> Result<Vec<Quote>>;

    /// Latest news items mentioning `symbol`
    async fn market_news(&self, symbol: &str, count: usize) -> Result<Vec<MarketNewsItem>>;
}

/// Last close and the close before it
///
/// Returns `None` when fewer than two bars are available.
pub fn last_and_previous(quotes: &[Quote]) -> Option<(f64, f64)> {
    match quotes {
        [.., prev, last] => Some((last.close, prev.close)),
        _ => None,
    }
}

#[cfg(test)]
pub(crate) fn bar(symbol: &str, day: DateTime<Utc>, close: f64) -> Quote {
    Quote {
        symbol: symbol.to_string(),
        timestamp: day,
        date: day.date_naive(),
        open: close - 1.0,
        high: close + 2.0,
        low: close - 2.0,
        close,
        volume: 1_000_000,
        adjclose: close,
    }
}
