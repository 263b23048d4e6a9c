//! Error types for connectors and the HTTP boundary.
//!
//! Connector errors never reach API consumers as failures; the aggregator turns
//! them into [`SourceError`] entries. [`ApiError`] covers request validation only.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};

use crate::types::{ErrorKind, SourceError, SourceName};

/// Total failure of one connector call.
#[derive(Debug, thiserror::Error)]
pub enum ConnectorError {
    /// Upstream did not answer within the client timeout.
    #[error("Timeout while calling source")]
    Timeout,

    /// Upstream answered with a non-success status.
    #[error("Bad status from source: {0}")]
    BadStatus(u16),

    /// Anything else: transport failure, malformed payload, parse error.
    #[error("Unhandled error: {0}")]
    Unknown(String),
}

impl ConnectorError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Timeout => ErrorKind::Timeout,
            Self::BadStatus(_) => ErrorKind::BadStatus,
            Self::Unknown(_) => ErrorKind::Unknown,
        }
    }

    pub fn into_source_error(self, source: SourceName) -> SourceError {
        SourceError {
            source,
            kind: self.kind(),
            message: self.to_string(),
        }
    }
}

impl From<reqwest::Error> for ConnectorError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            return Self::Timeout;
        }
        if let Some(status) = e.status() {
            if e.is_status() {
                return Self::BadStatus(status.as_u16());
            }
        }
        Self::Unknown(e.to_string())
    }
}

impl From<quick_xml::DeError> for ConnectorError {
    fn from(e: quick_xml::DeError) -> Self {
        Self::Unknown(format!("feed parse: {e}"))
    }
}

/// Request validation failure at the HTTP boundary.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("{0}")]
    Validation(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = Json(serde_json::json!({ "detail": self.to_string() }));
        (StatusCode::UNPROCESSABLE_ENTITY, body).into_response()
    }
}
