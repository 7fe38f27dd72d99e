//! Market data providers

pub mod provider;
pub mod yahoo;

#[cfg(test)]
pub use provider::MockMarketDataProvider;
pub use provider::{MarketDataProvider, MarketNewsItem, Quote, last_and_previous};
pub use yahoo::YahooFinanceClient;
