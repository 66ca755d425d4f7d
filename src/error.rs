//! Error types for the relay.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use thiserror::Error;

/// Everything that can end a `/query` call early.
#[derive(Error, Debug)]
pub enum RelayError {
    /// The caller sent no usable SQL.
    #[error("{0}")]
    InvalidRequest(String),

    /// The statement execution API answered with a non-success status.
    #[error("Databricks {status}: {body}")]
    Upstream { status: u16, body: String },

    #[error("HTTP client error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("JSON parse error: {0}")]
    Decode(String),

    /// A non-terminal submit response carried no id to poll with.
    #[error("No statement ID returned in execute response")]
    MissingStatementId,
}

impl RelayError {
    pub fn missing_sql() -> Self {
        Self::InvalidRequest("Missing SQL".to_string())
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for RelayError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!(error = %self, "query failed");
        }
        (status, Json(json!({ "error": self.to_string() }))).into_response()
    }
}
