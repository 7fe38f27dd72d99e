//! Application metadata shared by every binary

use serde::{Deserialize, Serialize};

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Application name
    pub app_name: String,
    /// Environment (development, production, etc.)
    pub environment: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            app_name: "stock-vision".to_string(),
            environment: "development".to_string(),
        }
    }
}

impl Config {
    /// Build from `STOCK_VISION_ENV`, keeping defaults for anything unset
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Ok(env) = std::env::var("STOCK_VISION_ENV") {
            if !env.trim().is_empty() {
                config.environment = env.trim().to_string();
            }
        }
        config
    }

    /// Whether this is a production deployment
    pub fn is_production(&self) -> bool {
        self.environment.eq_ignore_ascii_case("production")
    }
}
