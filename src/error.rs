//! Gateway error types.
//!
//! [`GatewayError`] is returned by HTTP handlers and maps each variant to
//! a status code and structured JSON body. [`TransportError`] covers writes
//! to an upgraded socket and never reaches an HTTP response.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;

/// Structured JSON error response body.
///
/// All error responses follow this shape:
/// ```json
/// {
///   "error": {
///     "code": 3002,
///     "message": "websocket upgrade failed: Connection header did not include 'upgrade'"
///   }
/// }
/// ```
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    /// Structured error payload.
    pub error: ErrorBody,
}

/// Inner error body with numeric code and human-readable message.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    /// Numeric error code.
    pub code: u32,
    /// Human-readable error message.
    pub message: String,
    /// Optional additional details.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

/// Server-side error enum with HTTP status code mapping.
///
/// # Error Code Ranges
///
/// | Range     | Category   | HTTP Status               |
/// |-----------|------------|---------------------------|
/// | 3000–3999 | Server     | 500 Internal Server Error |
#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    /// The connection could not be upgraded to a WebSocket.
    #[error("websocket upgrade failed: {0}")]
    UpgradeFailed(String),

    /// A response body could not be serialized.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl GatewayError {
    /// Returns the numeric error code for this variant.
    #[must_use]
    pub const fn error_code(&self) -> u32 {
        match self {
            Self::Serialization(_) => 3001,
            Self::UpgradeFailed(_) => 3002,
        }
    }

    /// Returns the HTTP status code for this variant.
    #[must_use]
    pub const fn status_code(&self) -> StatusCode {
        match self {
            Self::UpgradeFailed(_) | Self::Serialization(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for GatewayError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = ErrorResponse {
            error: ErrorBody {
                code: self.error_code(),
                message: self.to_string(),
                details: None,
            },
        };
        let mut response = axum::Json(body).into_response();
        *response.status_mut() = status;
        response
    }
}

/// Failure writing an envelope to an upgraded socket.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// The socket was closed, either by teardown or after an earlier write
    /// failure left it unusable.
    #[error("connection closed")]
    Closed,

    /// The writer's cancellation scope fired before the write started.
    #[error("operation cancelled")]
    Cancelled,

    /// The underlying socket rejected the frame.
    #[error("socket write failed: {0}")]
    Socket(String),

    /// The envelope could not be encoded.
    #[error("envelope encoding failed: {0}")]
    Encode(#[from] serde_json::Error),
}
