//! HTTP error mapping

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use webui_bridge::Error;

/// Result type alias for handlers
pub type Result<T> = std::result::Result<T, ApiError>;

/// Bridge error rendered as an HTTP response
#[derive(Debug)]
pub struct ApiError(pub Error);

impl ApiError {
    /// Get the HTTP status code
    pub fn status_code(&self) -> StatusCode {
        match &self.0 {
            Error::ModuleNotFound(_) => StatusCode::NOT_FOUND,

            Error::OriginRejected(_) => StatusCode::FORBIDDEN,

            Error::InvalidOptions(_)
            | Error::InvalidCallback(_)
            | Error::InvalidParameter(_)
            | Error::InvalidModuleId(_) => StatusCode::BAD_REQUEST,

            Error::ShellUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,

            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<Error> for ApiError {
    fn from(err: Error) -> Self {
        ApiError(err)
    }
}

/// API error response
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub code: u32,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!("Request failed: {}", self.0);
        }
        let body = ErrorResponse {
            code: self.0.code(),
            message: self.0.to_string(),
            details: None,
        };

        (status, Json(body)).into_response()
    }
}
