//! Yahoo Finance API client

use crate::api::provider::{MarketDataProvider, MarketNewsItem, Quote};
use crate::error::{Result, StockError};
use async_trait::async_trait;
use chrono::{DateTime, FixedOffset, NaiveDate, Utc};
use serde::Deserialize;
use std::error::Error as _;
use std::time::Duration;
use time::OffsetDateTime;
use yahoo_finance_api as yahoo;

const SEARCH_URL: &str = "https://query2.finance.yahoo.com/v1/finance/search";
const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
                          (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

/// Yahoo Finance API client
#[derive(Clone)]
pub struct YahooFinanceClient {
    http: reqwest::Client,
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    news: Vec<SearchNewsItem>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SearchNewsItem {
    title: Option<String>,
    publisher: Option<String>,
    link: Option<String>,
    provider_publish_time: Option<i64>,
    related_tickers: Option<Vec<String>>,
}

impl YahooFinanceClient {
    /// Create a new Yahoo Finance client with a 30 second news timeout
    pub fn new() -> Self {
        Self::with_timeout(Duration::from_secs(30))
    }

    /// Create a client whose news requests time out after `timeout`
    pub fn with_timeout(timeout: Duration) -> Self {
        let http = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(timeout)
            .build()
            .unwrap_or_default();
        Self { http }
    }

    fn connector() -> Result<yahoo::YahooConnector> {
        yahoo::YahooConnector::new().map_err(map_yahoo_error)
    }

    /// Convert bars, dating each one in the exchange's time zone
    fn convert(symbol: &str, response: &yahoo::YResponse) -> Result<Vec<Quote>> {
        let quotes = response.quotes().map_err(map_yahoo_error)?;
        let gmtoffset = match response.metadata() {
            Ok(meta) => meta.gmtoffset,
            Err(e) => {
                tracing::debug!(symbol, error = %e, "no chart metadata, dating bars in UTC");
                0
            }
        };

        Ok(quotes
            .iter()
            .map(|q| {
                let timestamp = DateTime::from_timestamp(q.timestamp as i64, 0).unwrap_or_else(Utc::now);
                Quote {
                    symbol: symbol.to_string(),
                    date: exchange_date(timestamp, gmtoffset),
                    timestamp,
                    open: q.open,
                    high: q.high,
                    low: q.low,
                    close: q.close,
                    volume: q.volume,
                    adjclose: q.adjclose,
                }
            })
            .collect())
    }
}

/// Calendar date of `timestamp` at a UTC offset in seconds
fn exchange_date(timestamp: DateTime<Utc>, gmtoffset: i32) -> NaiveDate {
    FixedOffset::east_opt(gmtoffset)
        .map(|offset| timestamp.with_timezone(&offset).date_naive())
        .unwrap_or_else(|| timestamp.date_naive())
}

/// Transport failures become `DownloadFailed`; everything else Yahoo reports
/// (unknown symbol, empty range) stays a `YahooFinanceError`.
fn map_yahoo_error(err: yahoo::YahooError) -> StockError {
    let is_transport = err
        .source()
        .is_some_and(|s| s.downcast_ref::<reqwest::Error>().is_some());
    if is_transport {
        StockError::DownloadFailed(err.to_string())
    } else {
        StockError::YahooFinanceError(err.to_string())
    }
}

fn to_offset(dt: DateTime<Utc>, which: &str) -> Result<OffsetDateTime> {
    OffsetDateTime::from_unix_timestamp(dt.timestamp()).map_err(|e| {
        StockError::YahooFinanceError(format!("Invalid {which} timestamp: {e}"))
    })
}

fn parse_news(body: &str, count: usize) -> Result<Vec<MarketNewsItem>> {
    let response: SearchResponse = serde_json::from_str(body)?;
    Ok(response
        .news
        .into_iter()
        .filter_map(|item| {
            let title = item.title.filter(|t| !t.trim().is_empty())?;
            Some(MarketNewsItem {
                title,
                publisher: item.publisher,
                link: item.link,
                published_at: item
                    .provider_publish_time
                    .and_then(|ts| DateTime::from_timestamp(ts, 0)),
                related_tickers: item.related_tickers,
            })
        })
        .take(count)
        .collect())
}

#[async_trait]
impl MarketDataProvider for YahooFinanceClient {
    async fn historical_quotes(
        &self,
        symbol: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<Quote>> {
        let provider = Self::connector()?;

        let response = provider
            .get_quote_history(symbol, to_offset(start, "start")?, to_offset(end, "end")?)
            .await
            .map_err(map_yahoo_error)?;

        let quotes = Self::convert(symbol, &response)?;
        tracing::debug!(symbol, bars = quotes.len(), "fetched quote history");

        Ok(quotes)
    }

    async fn recent_quotes(&self, symbol: &str, range: &str) -> Result<Vec<Quote>> {
        let provider = Self::connector()?;

        let response = provider
            .get_quote_range(symbol, "1d", range)
            .await
            .map_err(map_yahoo_error)?;

        Self::convert(symbol, &response)
    }

    async fn market_news(&self, symbol: &str, count: usize) -> Result<Vec<MarketNewsItem>> {
        let url = url::Url::parse_with_params(
            SEARCH_URL,
            &[
                ("q", symbol),
                ("quotesCount", "0"),
                ("newsCount", &count.to_string()),
            ],
        )
        .map_err(|e| StockError::ApiError(format!("Invalid news URL: {e}")))?;

        let response = self.http.get(url).send().await?;

        if !response.status().is_success() {
            let status = response.status();
            return Err(StockError::ApiError(format!(
                "Yahoo news request for {symbol} failed with {status}"
            )));
        }

        let body = response.text().await?;
        parse_news(&body, count)
    }
}

impl Default for YahooFinanceClient {
    fn default() -> Self {
        Self::new()
    }
}
