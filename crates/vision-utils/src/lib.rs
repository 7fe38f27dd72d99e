//! Shared utilities for stock-vision
//!
//! This crate provides common functionality used across the stock-vision workspace,
//! including logging setup and application metadata.

pub mod config;
pub mod logging;

pub use config::Config;
pub use logging::{init_json_tracing, init_tracing, init_tracing_for, init_tracing_with_default};
