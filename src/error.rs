//! Relay error types with HTTP status code mapping.
//!
//! [`RelayError`] is the central error type for the relay. Only validation
//! failures ever reach a caller; everything that happens after a session has
//! been spawned is logged and swallowed by the session itself.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;

/// Structured JSON error response body.
///
/// All error responses follow this shape:
/// ```json
/// {
///   "error": {
///     "code": 1001,
///     "message": "invalid connect address: relative URL without a base",
///     "details": null
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
    /// Numeric error code (see code ranges on [`RelayError`]).
    pub code: u32,
    /// Human-readable error message.
    pub message: String,
    /// Optional additional details.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

/// Relay error enum with HTTP status code mapping.
///
/// # Error Code Ranges
///
/// | Range     | Category            | HTTP Status               |
/// |-----------|---------------------|---------------------------|
/// | 1000–1999 | Validation          | 400 Bad Request           |
/// | 2000–2999 | Control connection  | 502 Bad Gateway           |
/// | 3000–3999 | Server              | 500 Internal Server Error |
#[derive(Debug, thiserror::Error)]
pub enum RelayError {
    /// The connect address is not a well-formed websocket URI.
    #[error("invalid connect address: {0}")]
    InvalidAddress(String),

    /// The action request violates an input invariant.
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// The control server could not be reached or refused the handshake.
    #[error("connection failed: {0}")]
    ConnectionFailed(String),

    /// The control server answered a command with an error message.
    #[error("command rejected by control server: {message} (code {code})")]
    CommandRejected {
        /// Error code reported by the control server.
        code: u32,
        /// Error message reported by the control server.
        message: String,
    },

    /// The websocket dropped or a frame could not be exchanged.
    #[error("transport error: {0}")]
    Transport(String),

    /// The control server sent something the client cannot interpret.
    #[error("protocol error: {0}")]
    Protocol(String),

    /// Internal error.
    #[error("internal error: {0}")]
    Internal(String),
}

impl RelayError {
    /// Returns the numeric error code for this variant.
    #[must_use]
    pub const fn error_code(&self) -> u32 {
        match self {
            Self::InvalidAddress(_) => 1001,
            Self::InvalidRequest(_) => 1002,
            Self::ConnectionFailed(_) => 2001,
            Self::CommandRejected { .. } => 2002,
            Self::Transport(_) => 2003,
            Self::Protocol(_) => 2004,
            Self::Internal(_) => 3000,
        }
    }

    /// Returns the HTTP status code for this variant.
    #[must_use]
    pub const fn status_code(&self) -> StatusCode {
        match self {
            Self::InvalidAddress(_) | Self::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            Self::ConnectionFailed(_)
            | Self::CommandRejected { .. }
            | Self::Transport(_)
            | Self::Protocol(_) => StatusCode::BAD_GATEWAY,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<url::ParseError> for RelayError {
    fn from(err: url::ParseError) -> Self {
        Self::InvalidAddress(err.to_string())
    }
}

impl From<serde_json::Error> for RelayError {
    fn from(err: serde_json::Error) -> Self {
        Self::Protocol(err.to_string())
    }
}

impl IntoResponse for RelayError {
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
