//! Server settings

use anyhow::{Context, Result};
use std::net::SocketAddr;

/// Listen address and request limits
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Upper bound on a single request, including model training
    pub request_timeout_secs: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8000,
            request_timeout_secs: 300,
        }
    }
}

impl ServerConfig {
    /// Read `HOST`, `PORT` and `REQUEST_TIMEOUT_SECS`
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary variable source, keeping defaults for unset keys
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(host) = get("HOST") {
            config.host = host.trim().to_string();
        }
        if let Some(port) = get("PORT") {
            config.port = port
                .trim()
                .parse()
                .with_context(|| format!("Invalid PORT: {port}"))?;
        }
        if let Some(secs) = get("REQUEST_TIMEOUT_SECS") {
            config.request_timeout_secs = secs
                .trim()
                .parse()
                .with_context(|| format!("Invalid REQUEST_TIMEOUT_SECS: {secs}"))?;
        }

        Ok(config)
    }

    /// Apply command-line overrides
    pub fn with_overrides(mut self, host: Option<String>, port: Option<u16>) -> Self {
        if let Some(host) = host {
            self.host = host;
        }
        if let Some(port) = port {
            self.port = port;
        }
        self
    }

    pub fn socket_addr(&self) -> Result<SocketAddr> {
        format!("{}:{}", self.host, self.port)
            .parse()
            .with_context(|| format!("Invalid listen address {}:{}", self.host, self.port))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars.iter().map(|(k, v)| ((*k).to_string(), (*v).to_string())).collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = ServerConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config, ServerConfig::default());
        assert_eq!(config.socket_addr().unwrap().port(), 8000);
    }

    #[test]
    fn test_env_and_overrides() {
        let config = ServerConfig::from_lookup(lookup(&[("HOST", "127.0.0.1"), ("PORT", "9000")])).unwrap();
        assert_eq!(config.host, "127.0.0.1");
        assert_eq!(config.port, 9000);

        let config = config.with_overrides(None, Some(7000));
        assert_eq!(config.socket_addr().unwrap().to_string(), "127.0.0.1:7000");
    }

    #[test]
    fn test_invalid_values() {
        assert!(ServerConfig::from_lookup(lookup(&[("PORT", "http")])).is_err());
        let config = ServerConfig::default().with_overrides(Some("not a host".to_string()), None);
        assert!(config.socket_addr().is_err());
    }
}
