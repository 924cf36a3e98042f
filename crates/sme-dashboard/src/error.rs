//! Error types for sme-dashboard

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;
use tracing::error;

/// sme-dashboard error type
#[derive(Error, Debug)]
pub enum DashboardError {
    #[error("Server error: {0}")]
    ServerError(String),

    #[error("Data error: {0}")]
    DataError(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

impl From<sme_core::Error> for DashboardError {
    fn from(e: sme_core::Error) -> Self {
        DashboardError::DataError(e.to_string())
    }
}

impl IntoResponse for DashboardError {
    fn into_response(self) -> Response {
        error!(error_details = %self, "Dashboard request failed");
        let body = Json(serde_json::json!({ "error": self.to_string() }));
        (StatusCode::INTERNAL_SERVER_ERROR, body).into_response()
    }
}

/// Result type alias
pub type Result<T> = std::result::Result<T, DashboardError>;
