//! Stock Vision command-line interface
//!
//! # Usage
//!
//! ```bash
//! # Serve the HTTP API on HOST:PORT (default 0.0.0.0:8000)
//! stock-vision serve --port 8000
//!
//! # One-off forecast or dashboard, printed as JSON
//! stock-vision predict AAPL
//! stock-vision dashboard
//! ```

use anyhow::Context;
use clap::{Parser, Subcommand};
use std::sync::Arc;
use tracing::info;
use vision_server::{AppState, ServerConfig, router, shutdown_signal};
use vision_stock::{DashboardService, StockConfig, StockPredictor, YahooFinanceClient};

#[derive(Parser, Debug)]
#[command(name = "stock-vision")]
#[command(about = "LSTM stock forecasts and market dashboard", long_about = None, version)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the HTTP API
    Serve {
        /// Address to bind, overrides HOST
        #[arg(long)]
        host: Option<String>,
        /// Port to bind, overrides PORT
        #[arg(short, long)]
        port: Option<u16>,
    },
    /// Forecast the next closes for a ticker
    Predict {
        /// Ticker symbol, e.g. AAPL or TCS.NS
        ticker: String,
    },
    /// Print the market dashboard
    Dashboard,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let app_config = vision_utils::Config::from_env();
    vision_utils::init_tracing_for(&app_config);

    let cli = Cli::parse();
    let stock_config = StockConfig::from_env().context("Invalid stock configuration")?;
    let provider = Arc::new(YahooFinanceClient::with_timeout(stock_config.request_timeout));

    match cli.command.unwrap_or(Command::Serve { host: None, port: None }) {
        Command::Serve { host, port } => {
            let server_config = ServerConfig::from_env()?.with_overrides(host, port);
            let addr = server_config.socket_addr()?;
            let app = router(AppState::new(provider, stock_config), &server_config);

            info!(%addr, environment = %app_config.environment, "starting {}", app_config.app_name);
            let listener = tokio::net::TcpListener::bind(addr)
                .await
                .with_context(|| format!("Failed to bind {addr}"))?;
            axum::serve(listener, app)
                .with_graceful_shutdown(shutdown_signal())
                .await?;
            info!("shutdown complete");
        }
        Command::Predict { ticker } => {
            let predictor = StockPredictor::new(provider, stock_config);
            let forecast = predictor.predict(&ticker).await?;
            println!("{}", serde_json::to_string_pretty(&forecast)?);
        }
        Command::Dashboard => {
            let dashboard = DashboardService::new(provider, &stock_config);
            let data = dashboard.get_dashboard().await?;
            println!("{}", serde_json::to_string_pretty(&data)?);
        }
    }

    Ok(())
}
