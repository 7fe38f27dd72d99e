//! Route handlers

use crate::{AppState, ApiError};
use axum::{
    Json,
    extract::{Query, State, rejection::JsonRejection},
};
use serde::Deserialize;
use serde_json::{Value, json};
use vision_stock::{DailySeries, DashboardData, PredictionResponse, QuoteSummary};

#[derive(Debug, Deserialize)]
pub struct PredictRequest {
    pub stock_name: String,
}

#[derive(Debug, Deserialize)]
pub struct SymbolQuery {
    pub symbol: Option<String>,
}

impl SymbolQuery {
    fn require(self) -> Result<String, ApiError> {
        self.symbol
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .ok_or(ApiError::MissingSymbol)
    }
}

pub async fn root() -> Json<Value> {
    Json(json!({
        "status": "Server is running",
        "message": "Welcome to Stock Vision API",
    }))
}

pub async fn predict(
    State(state): State<AppState>,
    payload: Result<Json<PredictRequest>, JsonRejection>,
) -> Result<Json<PredictionResponse>, ApiError> {
    let Json(request) = payload?;
    if request.stock_name.trim().is_empty() {
        return Err(ApiError::BadRequest("Stock name is required".to_string()));
    }

    let response = state.predictor.predict(&request.stock_name).await?;
    Ok(Json(response))
}

pub async fn dashboard(State(state): State<AppState>) -> Result<Json<DashboardData>, ApiError> {
    let data = state.dashboard.get_dashboard().await?;
    Ok(Json(data))
}

pub async fn stock_history(
    State(state): State<AppState>,
    Query(query): Query<SymbolQuery>,
) -> Result<Json<DailySeries>, ApiError> {
    let symbol = query.require()?;
    state
        .history
        .daily_series(&symbol)
        .await
        .map(Json)
        .map_err(|e| ApiError::chart(&e, "Failed to fetch stock data"))
}

pub async fn stock_summary(
    State(state): State<AppState>,
    Query(query): Query<SymbolQuery>,
) -> Result<Json<QuoteSummary>, ApiError> {
    let symbol = query.require()?;
    state
        .history
        .quote_summary(&symbol)
        .await
        .map(Json)
        .map_err(|e| ApiError::chart(&e, "Failed to fetch stock summary"))
}

#[cfg(test)]
mod tests {
    use crate::{AppState, ServerConfig, router};
    use async_trait::async_trait;
    use axum::{
        body::Body,
        http::{Request, StatusCode},
    };
    use chrono::{DateTime, Duration, TimeZone, Utc};
    use serde_json::Value;
    use std::sync::Arc;
    use tower::ServiceExt;
    use vision_stock::{MarketDataProvider, MarketNewsItem, Quote, StockConfig, StockError, StockPredictor};

    /// Serves a fixed series for `GOOD` and fails every other symbol
    struct StubProvider;

    fn series(symbol: &str, days: i64) -> Vec<Quote> {
        let start = Utc.with_ymd_and_hms(2024, 1, 2, 21, 0, 0).unwrap();
        (0..days)
            .map(|i| {
                let close = 100.0 + i as f64;
                let timestamp = start + Duration::days(i);
                Quote {
                    symbol: symbol.to_string(),
                    timestamp,
                    date: timestamp.date_naive(),
                    open: close - 1.0,
                    high: close + 1.0,
                    low: close - 2.0,
                    close,
                    volume: 5_000,
                    adjclose: close,
                }
            })
            .collect()
    }

    #[async_trait]
    impl MarketDataProvider for StubProvider {
        async fn historical_quotes(
            &self,
            symbol: &str,
            _start: DateTime<Utc>,
            _end: DateTime<Utc>,
        ) -> vision_stock::Result<Vec<Quote>> {
            match symbol {
                "GOOD" => Ok(series(symbol, 3)),
                "EMPTY" => Ok(Vec::new()),
                "SLOW" => {
                    tokio::time::sleep(std::time::Duration::from_secs(30)).await;
                    Ok(Vec::new())
                }
                _ => Err(StockError::DownloadFailed("upstream down".to_string())),
            }
        }

        async fn recent_quotes(&self, symbol: &str, _range: &str) -> vision_stock::Result<Vec<Quote>> {
            match symbol {
                "GOOD" | "^GSPC" | "AAPL" => Ok(series(symbol, 5)),
                "EMPTY" => Ok(Vec::new()),
                _ => Err(StockError::YahooFinanceError("unknown symbol".to_string())),
            }
        }

        async fn market_news(&self, _symbol: &str, _count: usize) -> vision_stock::Result<Vec<MarketNewsItem>> {
            Ok(Vec::new())
        }
    }

    fn app_with(server: &ServerConfig) -> axum::Router {
        let provider: Arc<dyn MarketDataProvider> = Arc::new(StubProvider);
        let config = StockConfig::default();
        let state = AppState::new(Arc::clone(&provider), config.clone())
            .with_predictor(StockPredictor::new(provider, config).without_news());
        router(state, server)
    }

    fn app() -> axum::Router {
        app_with(&ServerConfig::default())
    }

    async fn send_to(app: axum::Router, request: Request<Body>) -> (StatusCode, Value) {
        let response = app.oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    async fn send(request: Request<Body>) -> (StatusCode, Value) {
        send_to(app(), request).await
    }

    fn predict_request(body: &str) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri("/predict")
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    async fn get(uri: &str) -> (StatusCode, Value) {
        send(Request::builder().uri(uri).body(Body::empty()).unwrap()).await
    }

    async fn post_predict(body: &str) -> (StatusCode, Value) {
        send(predict_request(body)).await
    }

    #[tokio::test]
    async fn test_root() {
        let (status, body) = get("/").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "Server is running");
        assert_eq!(body["message"], "Welcome to Stock Vision API");
    }

    #[tokio::test]
    async fn test_predict_requires_name() {
        let (status, body) = post_predict(r#"{"stock_name": ""}"#).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["detail"], "Stock name is required");
    }

    #[tokio::test]
    async fn test_predict_reports_failures_as_detail() {
        let (status, body) = post_predict(r#"{"stock_name": "broken"}"#).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["detail"], "Failed to download stock data: upstream down");

        // three bars cannot fill a training window
        let (status, body) = post_predict(r#"{"stock_name": "good"}"#).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["detail"], "Not enough data to train.");
    }

    #[tokio::test]
    async fn test_malformed_predict_body_uses_detail() {
        let (status, body) = post_predict("not json").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["detail"].as_str().is_some_and(|d| !d.is_empty()));

        let (status, body) = post_predict(r#"{"ticker": "AAPL"}"#).await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert!(body["detail"].as_str().is_some_and(|d| d.contains("stock_name")));
    }

    #[tokio::test]
    async fn test_timeout_uses_detail() {
        let server = ServerConfig {
            request_timeout_secs: 1,
            ..ServerConfig::default()
        };
        let (status, body) = send_to(app_with(&server), predict_request(r#"{"stock_name": "slow"}"#)).await;
        assert_eq!(status, StatusCode::REQUEST_TIMEOUT);
        assert_eq!(body["detail"], "Request timed out");
    }

    #[tokio::test]
    async fn test_dashboard() {
        let (status, body) = get("/dashboard").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["marketOverview"][0]["name"], "S&P 500");
        assert_eq!(body["trending"][0]["ticker"], "AAPL");
        assert_eq!(body["news"][0]["source"], "System");
        assert_eq!(body["sectors"].as_array().map(Vec::len), Some(4));
    }

    #[tokio::test]
    async fn test_stock_history() {
        let (status, body) = get("/api/stock?symbol=GOOD").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["Meta Data"]["2. Symbol"], "GOOD");
        assert_eq!(body["Time Series (Daily)"]["2024-01-03"]["4. close"], "101");

        let (status, body) = get("/api/stock").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "Missing symbol query param");

        let (status, body) = get("/api/stock?symbol=EMPTY").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"], "No data found");

        let (status, body) = get("/api/stock?symbol=BAD").await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["error"], "Failed to fetch stock data");
    }

    #[tokio::test]
    async fn test_stock_summary() {
        let (status, body) = get("/api/stock/summary?symbol=GOOD").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["symbol"], "GOOD");
        assert_eq!(body["price"], 104.0);
        assert_eq!(body["fiftyTwoWeekHigh"], 105.0);
        assert!(body["marketCap"].is_null());

        let (status, body) = get("/api/stock/summary?symbol=EMPTY").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"], "No data found");

        let (status, body) = get("/api/stock/summary?symbol=BAD").await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["error"], "Failed to fetch stock summary");
    }

    #[tokio::test]
    async fn test_cors_allows_any_origin() {
        let response = app()
            .oneshot(
                Request::builder()
                    .uri("/")
                    .header("origin", "http://localhost:5173")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(
            response.headers().get("access-control-allow-origin").unwrap(),
            "*"
        );
    }
}
