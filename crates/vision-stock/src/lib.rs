//! Stock price forecasting and market dashboard
//!
//! This crate powers the Stock Vision service. It includes:
//!
//! - Daily bars and market news from Yahoo Finance behind a mockable provider trait
//! - Feature engineering (moving averages, RSI) and min-max scaling
//! - An LSTM regressor trained per ticker with backpropagation through time
//! - Headline scraping with lexicon-based sentiment scoring
//! - A market dashboard aggregating indices, movers, headlines and sectors
//!
//! # Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use vision_stock::{StockConfig, StockPredictor, YahooFinanceClient};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = StockConfig::from_env()?;
//!     let provider = Arc::new(YahooFinanceClient::with_timeout(config.request_timeout));
//!     let predictor = StockPredictor::new(provider, config);
//!
//!     let forecast = predictor.predict("AAPL").await?;
//!     println!("{}", forecast.prediction_text);
//!     Ok(())
//! }
//! ```

pub mod api;
pub mod cache;
pub mod config;
pub mod dashboard;
pub mod error;
pub mod features;
pub mod history;
pub mod model;
pub mod predictor;
pub mod scaler;
pub mod sentiment;
pub mod window;

pub use api::{MarketDataProvider, MarketNewsItem, Quote, YahooFinanceClient};
pub use config::StockConfig;
pub use dashboard::{DashboardData, DashboardService};
pub use error::{Result, StockError};
pub use history::{DailySeries, MarketHistory, QuoteSummary};
pub use predictor::{GraphData, PredictionResponse, StockPredictor, Trend};
pub use sentiment::{NewsScraper, NewsSentimentSummary, SentimentAnalyzer};
