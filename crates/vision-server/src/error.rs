//! HTTP error responses

use axum::{
    Json,
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::{Map, Value};
use thiserror::Error;
use vision_stock::StockError;

/// Errors returned by the handlers
///
/// Forecast endpoints answer with `{"detail": ...}`, chart endpoints with
/// `{"error": ...}`.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    BadRequest(String),

    #[error("{0}")]
    Internal(String),

    /// Request body that could not be decoded, with the status axum chose
    #[error("{1}")]
    InvalidBody(StatusCode, String),

    #[error("Request timed out")]
    Timeout,

    #[error("Missing symbol query param")]
    MissingSymbol,

    #[error("No data found")]
    NoData,

    /// Upstream failure on a chart endpoint, with the message shown to clients
    #[error("{0}")]
    ChartFailed(&'static str),
}

impl ApiError {
    fn status_code(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) | ApiError::MissingSymbol => StatusCode::BAD_REQUEST,
            ApiError::NoData => StatusCode::NOT_FOUND,
            ApiError::Internal(_) | ApiError::ChartFailed(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::InvalidBody(status, _) => *status,
            ApiError::Timeout => StatusCode::REQUEST_TIMEOUT,
        }
    }

    fn body_key(&self) -> &'static str {
        match self {
            ApiError::BadRequest(_)
            | ApiError::Internal(_)
            | ApiError::InvalidBody(..)
            | ApiError::Timeout => "detail",
            ApiError::MissingSymbol | ApiError::NoData | ApiError::ChartFailed(_) => "error",
        }
    }

    /// Map a chart lookup failure, keeping "no data" distinct
    pub fn chart(err: &StockError, message: &'static str) -> Self {
        match err {
            StockError::DataUnavailable { .. } => ApiError::NoData,
            _ => {
                tracing::error!(error = %err, "{message}");
                ApiError::ChartFailed(message)
            }
        }
    }
}

impl From<StockError> for ApiError {
    fn from(err: StockError) -> Self {
        match err {
            StockError::InvalidSymbol(msg) => ApiError::BadRequest(msg),
            other => ApiError::Internal(other.to_string()),
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::InvalidBody(rejection.status(), rejection.body_text())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::warn!(error = %self, "request failed");
        } else {
            tracing::debug!(error = %self, "client error");
        }

        let mut body = Map::new();
        body.insert(self.body_key().to_string(), Value::String(self.to_string()));
        (status, Json(Value::Object(body))).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_status_codes() {
        assert_eq!(
            ApiError::BadRequest("x".to_string()).status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(ApiError::MissingSymbol.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(ApiError::NoData.status_code(), StatusCode::NOT_FOUND);
        assert_eq!(
            ApiError::Internal("x".to_string()).status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(ApiError::Timeout.status_code(), StatusCode::REQUEST_TIMEOUT);
        assert_eq!(ApiError::Timeout.body_key(), "detail");

        let err = ApiError::InvalidBody(StatusCode::UNPROCESSABLE_ENTITY, "missing field".to_string());
        assert_eq!(err.status_code(), StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(err.body_key(), "detail");
    }

    #[test]
    fn test_stock_error_conversion() {
        let err: ApiError = StockError::DownloadFailed("timeout".to_string()).into();
        assert_eq!(err.to_string(), "Failed to download stock data: timeout");
        assert_eq!(err.body_key(), "detail");

        let err: ApiError = StockError::InvalidSymbol("Stock name is required".to_string()).into();
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn test_chart_mapping() {
        let missing = StockError::DataUnavailable {
            symbol: "X".to_string(),
            reason: String::new(),
        };
        assert!(matches!(ApiError::chart(&missing, "Failed"), ApiError::NoData));

        let err = ApiError::chart(&StockError::Other("boom".to_string()), "Failed to fetch stock data");
        assert_eq!(err.to_string(), "Failed to fetch stock data");
        assert_eq!(err.body_key(), "error");
    }
}
