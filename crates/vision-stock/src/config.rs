//! Configuration for stock forecasting operations

use crate::error::{Result, StockError};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

/// Prefix shared by every environment override
pub const ENV_PREFIX: &str = "STOCK_VISION_";

/// Configuration for stock forecasting operations
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StockConfig {
    /// First day of history downloaded for training
    pub history_start: NaiveDate,

    /// Number of past trading days fed to the model per prediction
    pub seq_len: usize,

    /// Number of trading days forecast past the last known close
    pub future_days: usize,

    /// Training epochs for a freshly created model
    pub epochs: usize,

    /// Adam learning rate
    pub learning_rate: f64,

    /// LSTM hidden state size
    pub hidden_size: usize,

    /// Dropout applied to the last hidden state while training
    pub dropout: f64,

    /// Fraction of windows used for training, the rest is validation
    pub train_ratio: f64,

    /// Directory holding per-ticker model files
    pub model_dir: PathBuf,

    /// Maximum headlines kept from a news scrape
    pub news_head_limit: usize,

    /// Outbound news scrapes allowed per minute
    pub scrape_rate_limit: u32,

    /// Timeout for a single news scrape
    pub scrape_timeout: Duration,

    /// Request timeout for market data calls
    pub request_timeout: Duration,

    /// Cache TTL for real-time data (quotes, dashboard)
    pub cache_ttl_realtime: Duration,
}

impl Default for StockConfig {
    fn default() -> Self {
        Self {
            history_start: NaiveDate::from_ymd_opt(2018, 1, 1).unwrap_or(NaiveDate::MIN),
            seq_len: 60,
            future_days: 3,
            epochs: 15,
            learning_rate: 0.01,
            hidden_size: 64,
            dropout: 0.2,
            train_ratio: 0.8,
            model_dir: PathBuf::from("saved_models"),
            news_head_limit: 50,
            scrape_rate_limit: 30,
            scrape_timeout: Duration::from_secs(5),
            request_timeout: Duration::from_secs(30),
            cache_ttl_realtime: Duration::from_secs(60), // 1 minute
        }
    }
}

impl StockConfig {
    /// Create a new configuration builder
    pub fn builder() -> StockConfigBuilder {
        StockConfigBuilder::default()
    }

    /// Default configuration with `STOCK_VISION_*` environment overrides applied
    pub fn from_env() -> Result<Self> {
        let config = Self::default().with_env_lookup(|key| std::env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    /// Apply overrides from an arbitrary key lookup
    ///
    /// Keys are the field names upper-cased and prefixed with [`ENV_PREFIX`].
    pub fn with_env_lookup<F>(mut self, lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| {
            lookup(&format!("{ENV_PREFIX}{name}"))
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        if let Some(v) = parse_opt::<NaiveDate>("HISTORY_START", get("HISTORY_START"))? {
            self.history_start = v;
        }
        if let Some(v) = parse_opt("SEQ_LEN", get("SEQ_LEN"))? {
            self.seq_len = v;
        }
        if let Some(v) = parse_opt("FUTURE_DAYS", get("FUTURE_DAYS"))? {
            self.future_days = v;
        }
        if let Some(v) = parse_opt("EPOCHS", get("EPOCHS"))? {
            self.epochs = v;
        }
        if let Some(v) = parse_opt("LEARNING_RATE", get("LEARNING_RATE"))? {
            self.learning_rate = v;
        }
        if let Some(v) = parse_opt("HIDDEN_SIZE", get("HIDDEN_SIZE"))? {
            self.hidden_size = v;
        }
        if let Some(v) = get("MODEL_DIR") {
            self.model_dir = PathBuf::from(v);
        }
        if let Some(v) = parse_opt("NEWS_HEAD_LIMIT", get("NEWS_HEAD_LIMIT"))? {
            self.news_head_limit = v;
        }
        if let Some(v) = parse_opt::<u64>("CACHE_TTL_SECS", get("CACHE_TTL_SECS"))? {
            self.cache_ttl_realtime = Duration::from_secs(v);
        }

        Ok(self)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if self.seq_len == 0 {
            return Err(StockError::ConfigError(
                "seq_len must be greater than 0".to_string(),
            ));
        }

        // The trend compares the last two forecasts
        if self.future_days < 2 {
            return Err(StockError::ConfigError(
                "future_days must be at least 2".to_string(),
            ));
        }

        if self.epochs == 0 || self.hidden_size == 0 {
            return Err(StockError::ConfigError(
                "epochs and hidden_size must be greater than 0".to_string(),
            ));
        }

        if !(self.learning_rate > 0.0 && self.learning_rate.is_finite()) {
            return Err(StockError::ConfigError(format!(
                "learning_rate must be positive, got {}",
                self.learning_rate
            )));
        }

        if !(self.train_ratio > 0.0 && self.train_ratio < 1.0) {
            return Err(StockError::ConfigError(format!(
                "train_ratio must be in (0, 1), got {}",
                self.train_ratio
            )));
        }

        if !(0.0..1.0).contains(&self.dropout) {
            return Err(StockError::ConfigError(format!(
                "dropout must be in [0, 1), got {}",
                self.dropout
            )));
        }

        if self.news_head_limit == 0 || self.scrape_rate_limit == 0 {
            return Err(StockError::ConfigError(
                "news_head_limit and scrape_rate_limit must be greater than 0".to_string(),
            ));
        }

        Ok(())
    }

    /// Path of the persisted model for a ticker
    pub fn model_path(&self, ticker: &str) -> PathBuf {
        self.model_dir.join(format!("{ticker}_model.bin"))
    }
}

fn parse_opt<T>(name: &str, raw: Option<String>) -> Result<Option<T>>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    raw.map(|v| {
        v.parse::<T>().map_err(|e| {
            StockError::ConfigError(format!("{ENV_PREFIX}{name}={v} is invalid: {e}"))
        })
    })
    .transpose()
}

/// Builder for StockConfig
#[derive(Debug, Default)]
pub struct StockConfigBuilder {
    history_start: Option<NaiveDate>,
    seq_len: Option<usize>,
    future_days: Option<usize>,
    epochs: Option<usize>,
    learning_rate: Option<f64>,
    hidden_size: Option<usize>,
    dropout: Option<f64>,
    train_ratio: Option<f64>,
    model_dir: Option<PathBuf>,
    news_head_limit: Option<usize>,
    scrape_rate_limit: Option<u32>,
    scrape_timeout: Option<Duration>,
    request_timeout: Option<Duration>,
    cache_ttl_realtime: Option<Duration>,
}

impl StockConfigBuilder {
    /// Set the first day of downloaded history
    pub fn history_start(mut self, date: NaiveDate) -> Self {
        self.history_start = Some(date);
        self
    }

    /// Set the model lookback window
    pub fn seq_len(mut self, seq_len: usize) -> Self {
        self.seq_len = Some(seq_len);
        self
    }

    /// Set how many days are forecast
    pub fn future_days(mut self, days: usize) -> Self {
        self.future_days = Some(days);
        self
    }

    /// Set training epochs
    pub fn epochs(mut self, epochs: usize) -> Self {
        self.epochs = Some(epochs);
        self
    }

    /// Set the Adam learning rate
    pub fn learning_rate(mut self, lr: f64) -> Self {
        self.learning_rate = Some(lr);
        self
    }

    /// Set the LSTM hidden size
    pub fn hidden_size(mut self, size: usize) -> Self {
        self.hidden_size = Some(size);
        self
    }

    /// Set training dropout
    pub fn dropout(mut self, dropout: f64) -> Self {
        self.dropout = Some(dropout);
        self
    }

    /// Set the train/validation split ratio
    pub fn train_ratio(mut self, ratio: f64) -> Self {
        self.train_ratio = Some(ratio);
        self
    }

    /// Set the model directory
    pub fn model_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.model_dir = Some(dir.into());
        self
    }

    /// Set the maximum number of scraped headlines
    pub fn news_head_limit(mut self, limit: usize) -> Self {
        self.news_head_limit = Some(limit);
        self
    }

    /// Set scrapes allowed per minute
    pub fn scrape_rate_limit(mut self, per_minute: u32) -> Self {
        self.scrape_rate_limit = Some(per_minute);
        self
    }

    /// Set the news scrape timeout
    pub fn scrape_timeout(mut self, duration: Duration) -> Self {
        self.scrape_timeout = Some(duration);
        self
    }

    /// Set request timeout
    pub fn request_timeout(mut self, duration: Duration) -> Self {
        self.request_timeout = Some(duration);
        self
    }

    /// Set cache TTL for real-time data
    pub fn cache_ttl_realtime(mut self, duration: Duration) -> Self {
        self.cache_ttl_realtime = Some(duration);
        self
    }

    /// Build the configuration
    pub fn build(self) -> Result<StockConfig> {
        let defaults = StockConfig::default();

        let config = StockConfig {
            history_start: self.history_start.unwrap_or(defaults.history_start),
            seq_len: self.seq_len.unwrap_or(defaults.seq_len),
            future_days: self.future_days.unwrap_or(defaults.future_days),
            epochs: self.epochs.unwrap_or(defaults.epochs),
            learning_rate: self.learning_rate.unwrap_or(defaults.learning_rate),
            hidden_size: self.hidden_size.unwrap_or(defaults.hidden_size),
            dropout: self.dropout.unwrap_or(defaults.dropout),
            train_ratio: self.train_ratio.unwrap_or(defaults.train_ratio),
            model_dir: self.model_dir.unwrap_or(defaults.model_dir),
            news_head_limit: self.news_head_limit.unwrap_or(defaults.news_head_limit),
            scrape_rate_limit: self.scrape_rate_limit.unwrap_or(defaults.scrape_rate_limit),
            scrape_timeout: self.scrape_timeout.unwrap_or(defaults.scrape_timeout),
            request_timeout: self.request_timeout.unwrap_or(defaults.request_timeout),
            cache_ttl_realtime: self.cache_ttl_realtime.unwrap_or(defaults.cache_ttl_realtime),
        };

        config.validate()?;
        Ok(config)
    }
}
