//! Market dashboard aggregation
//!
//! Index levels, a five-day index chart, trending tickers, headlines and
//! sector moves in one payload. Upstream failures degrade to fallbacks so the
//! dashboard always renders.

use crate::api::{MarketDataProvider, MarketNewsItem, Quote, last_and_previous};
use crate::cache::{CacheKey, StockCache};
use crate::config::StockConfig;
use crate::error::Result;
use chrono::{NaiveDate, Utc};
use futures::future::join_all;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;

const SP500: &str = "^GSPC";
const DOW: &str = "^DJI";
const NASDAQ: &str = "^IXIC";
const VIX: &str = "^VIX";

/// Display name and symbol of each overview index
const INDICES: [(&str, &str); 4] = [("S&P 500", SP500), ("DOW", DOW), ("NASDAQ", NASDAQ), ("VIX", VIX)];

const TRENDING: [&str; 9] = [
    "AAPL",
    "NVDA",
    "MSFT",
    "TSLA",
    "AMZN",
    "RELIANCE.NS",
    "TCS.NS",
    "INFY.NS",
    "HDFCBANK.NS",
];

const NEWS_SOURCES: [&str; 2] = [SP500, "AAPL"];
const NEWS_COUNT: usize = 5;
const RECENT_RANGE: &str = "5d";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexSnapshot {
    pub name: String,
    pub value: f64,
    /// Percent change vs the previous close
    pub change: f64,
}

/// Closes of the three major indices on one trading day
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeeklyPoint {
    /// Weekday abbreviation, e.g. `Mon`
    pub name: String,
    pub sp500: f64,
    pub nasdaq: f64,
    pub dow: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrendingStock {
    pub ticker: String,
    pub name: String,
    pub price: f64,
    pub change: f64,
    pub change_percent: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewsItem {
    pub headline: String,
    pub date: String,
    pub summary: String,
    pub source: String,
    pub url: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SectorMove {
    pub name: String,
    pub value: f64,
    pub top_stock: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardData {
    pub market_overview: Vec<IndexSnapshot>,
    pub weekly: Vec<WeeklyPoint>,
    pub trending: Vec<TrendingStock>,
    pub news: Vec<NewsItem>,
    pub sectors: Vec<SectorMove>,
}

/// Builds the dashboard, caching the assembled payload briefly
#[derive(Clone)]
pub struct DashboardService {
    provider: Arc<dyn MarketDataProvider>,
    cache: StockCache<DashboardData>,
}

impl DashboardService {
    pub fn new(provider: Arc<dyn MarketDataProvider>, config: &StockConfig) -> Self {
        Self {
            provider,
            cache: StockCache::new(config.cache_ttl_realtime),
        }
    }

    /// Cached dashboard, rebuilt once the entry expires
    pub async fn get_dashboard(&self) -> Result<DashboardData> {
        self.cache
            .get_or_fetch(CacheKey::new("market", "dashboard"), || self.build())
            .await
    }

    async fn build(&self) -> Result<DashboardData> {
        let (index_quotes, trending, news) =
            tokio::join!(self.index_quotes(), self.trending(), self.news());

        let mut market_overview: Vec<IndexSnapshot> = INDICES
            .iter()
            .filter_map(|(name, symbol)| {
                let quotes = index_quotes.get(symbol)?;
                let (last, prev) = last_and_previous(quotes)?;
                Some(IndexSnapshot {
                    name: (*name).to_string(),
                    value: last,
                    change: percent_change(last, prev),
                })
            })
            .collect();

        if market_overview.is_empty() {
            tracing::warn!("no index quotes available, using fallback overview");
            market_overview = fallback_overview();
        }

        let weekly = weekly_performance(&index_quotes);

        tracing::info!(
            indices = market_overview.len(),
            weekly = weekly.len(),
            trending = trending.len(),
            news = news.len(),
            "dashboard assembled"
        );

        Ok(DashboardData {
            market_overview,
            weekly,
            trending,
            news,
            sectors: sectors(),
        })
    }

    /// Recent bars for every overview index; failed symbols are left out
    async fn index_quotes(&self) -> BTreeMap<&'static str, Vec<Quote>> {
        let lookups = INDICES.iter().map(|(_, symbol)| async move {
            (*symbol, self.provider.recent_quotes(symbol, RECENT_RANGE).await)
        });

        join_all(lookups)
            .await
            .into_iter()
            .filter_map(|(symbol, result)| match result {
                Ok(quotes) => Some((symbol, quotes)),
                Err(e) => {
                    tracing::warn!(symbol, error = %e, "index lookup failed");
                    None
                }
            })
            .collect()
    }

    async fn trending(&self) -> Vec<TrendingStock> {
        let lookups = TRENDING.iter().map(|symbol| async move {
            let quotes = match self.provider.recent_quotes(symbol, RECENT_RANGE).await {
                Ok(quotes) => quotes,
                Err(e) => {
                    tracing::debug!(symbol, error = %e, "trending lookup failed");
                    return None;
                }
            };
            let (price, prev) = last_and_previous(&quotes)?;
            if prev == 0.0 {
                return None;
            }
            let change = price - prev;
            Some(TrendingStock {
                ticker: (*symbol).to_string(),
                name: symbol.trim_end_matches(".NS").to_string(),
                price,
                change,
                change_percent: change / prev * 100.0,
            })
        });

        join_all(lookups).await.into_iter().flatten().collect()
    }

    /// Top headlines from the first source that has any
    async fn news(&self) -> Vec<NewsItem> {
        for source in NEWS_SOURCES {
            match self.provider.market_news(source, NEWS_COUNT).await {
                Ok(items) if !items.is_empty() => {
                    return items.into_iter().take(NEWS_COUNT).map(news_item).collect();
                }
                Ok(_) => tracing::debug!(source, "no news"),
                Err(e) => tracing::warn!(source, error = %e, "news lookup failed"),
            }
        }

        vec![NewsItem {
            headline: "Market steady as tech stocks rally".to_string(),
            date: Utc::now().date_naive().format("%Y-%m-%d").to_string(),
            summary: "Positive outlook for the week.".to_string(),
            source: "System".to_string(),
            url: "#".to_string(),
        }]
    }
}

fn percent_change(last: f64, prev: f64) -> f64 {
    if prev == 0.0 { 0.0 } else { (last - prev) / prev * 100.0 }
}

/// Join the index closes by trading day, oldest first
fn weekly_performance(index_quotes: &BTreeMap<&'static str, Vec<Quote>>) -> Vec<WeeklyPoint> {
    let mut by_day: BTreeMap<NaiveDate, WeeklyPoint> = BTreeMap::new();

    for symbol in [SP500, NASDAQ, DOW] {
        for quote in index_quotes.get(symbol).into_iter().flatten() {
            let day = quote.date;
            let point = by_day.entry(day).or_insert_with(|| WeeklyPoint {
                name: day.format("%a").to_string(),
                sp500: 0.0,
                nasdaq: 0.0,
                dow: 0.0,
            });
            match symbol {
                SP500 => point.sp500 = quote.close,
                NASDAQ => point.nasdaq = quote.close,
                _ => point.dow = quote.close,
            }
        }
    }

    by_day.into_values().collect()
}

fn news_item(item: MarketNewsItem) -> NewsItem {
    let summary = match &item.related_tickers {
        Some(tickers) => format!("Related: {}", tickers.join(", ")),
        None => "Click to read full story.".to_string(),
    };

    NewsItem {
        headline: item.title,
        date: item
            .published_at
            .unwrap_or_else(Utc::now)
            .format("%Y-%m-%d")
            .to_string(),
        summary,
        source: item.publisher.unwrap_or_else(|| "Yahoo Finance".to_string()),
        url: item.link.unwrap_or_else(|| "#".to_string()),
    }
}

fn fallback_overview() -> Vec<IndexSnapshot> {
    [("S&P 500", 5200.0, 0.5), ("DOW", 39000.0, 0.2), ("NASDAQ", 16000.0, 0.8)]
        .into_iter()
        .map(|(name, value, change)| IndexSnapshot {
            name: name.to_string(),
            value,
            change,
        })
        .collect()
}

fn sectors() -> Vec<SectorMove> {
    [("Tech", 1.5, "NVDA"), ("Health", -0.5, "LLY"), ("Finance", 0.8, "JPM"), ("Energy", -1.2, "XOM")]
        .into_iter()
        .map(|(name, value, top)| SectorMove {
            name: name.to_string(),
            value,
            top_stock: top.to_string(),
        })
        .collect()
}
