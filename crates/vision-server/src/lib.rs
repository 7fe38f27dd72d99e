//! HTTP API for stock-vision
//!
//! Routes:
//! - `GET /` - liveness message
//! - `POST /predict` - LSTM forecast for one ticker
//! - `GET /dashboard` - market overview payload
//! - `GET /api/stock?symbol=` - daily chart history
//! - `GET /api/stock/summary?symbol=` - quote summary

pub mod config;
pub mod error;
pub mod handlers;

pub use config::ServerConfig;
pub use error::ApiError;

use axum::{
    Router,
    http::StatusCode,
    middleware::map_response,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use std::sync::Arc;
use std::time::Duration;
use tower_http::{
    cors::{Any, CorsLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};
use vision_stock::{DashboardService, MarketDataProvider, MarketHistory, StockConfig, StockPredictor};

/// Services shared by every handler
#[derive(Clone)]
pub struct AppState {
    pub predictor: Arc<StockPredictor>,
    pub dashboard: DashboardService,
    pub history: MarketHistory,
}

impl AppState {
    pub fn new(provider: Arc<dyn MarketDataProvider>, config: StockConfig) -> Self {
        Self {
            dashboard: DashboardService::new(Arc::clone(&provider), &config),
            history: MarketHistory::new(Arc::clone(&provider), &config),
            predictor: Arc::new(StockPredictor::new(provider, config)),
        }
    }

    /// Replace the predictor, e.g. with one that skips news scraping
    pub fn with_predictor(mut self, predictor: StockPredictor) -> Self {
        self.predictor = Arc::new(predictor);
        self
    }
}

/// Build the application router with CORS, tracing and a request timeout
pub fn router(state: AppState, config: &ServerConfig) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/", get(handlers::root))
        .route("/predict", post(handlers::predict))
        .route("/dashboard", get(handlers::dashboard))
        .route("/api/stock", get(handlers::stock_history))
        .route("/api/stock/summary", get(handlers::stock_summary))
        .with_state(state)
        .layer(cors)
        .layer(TimeoutLayer::new(Duration::from_secs(config.request_timeout_secs)))
        .layer(map_response(timeout_body))
        .layer(TraceLayer::new_for_http())
}

/// Give the empty 408 from [`TimeoutLayer`] the usual error body
async fn timeout_body(response: Response) -> Response {
    if response.status() == StatusCode::REQUEST_TIMEOUT {
        ApiError::Timeout.into_response()
    } else {
        response
    }
}

/// Resolve on Ctrl-C (or SIGTERM on Unix)
pub async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "failed to listen for Ctrl-C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };
    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }
    tracing::info!("shutdown signal received");
}
