//! Error type of the relay's HTTP surface.
//!
//! Every failure a handler can meet ends up as one `RelayError`, and every
//! `RelayError` renders as a single `{ "error": "..." }` body with a
//! non-200 status.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum RelayError {
    /// The caller's query is unusable (no symbol, or no token anywhere).
    #[error("{0}")]
    InvalidRequest(String),

    /// Transport failure, non-2xx reply, or a payload missing required fields.
    #[error("{0}")]
    Upstream(String),

    /// The upstream did not answer within the configured timeout.
    #[error("{0}")]
    UpstreamTimeout(String),
}

impl RelayError {
    pub fn status(&self) -> StatusCode {
        match self {
            RelayError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            RelayError::Upstream(_) => StatusCode::BAD_GATEWAY,
            RelayError::UpstreamTimeout(_) => StatusCode::GATEWAY_TIMEOUT,
        }
    }

    /// Classifies an upstream failure, keeping the full context chain as the
    /// message.
    pub fn from_upstream(context: &str, why: anyhow::Error) -> Self {
        let timed_out = why
            .chain()
            .filter_map(|cause| cause.downcast_ref::<reqwest::Error>())
            .any(|cause| cause.is_timeout());
        let message = format!("{}: {:#}", context, why);

        if timed_out {
            RelayError::UpstreamTimeout(message)
        } else {
            RelayError::Upstream(message)
        }
    }
}

/// The one error document the relay ever sends.
#[derive(Serialize, Deserialize, Debug, PartialEq)]
pub struct ErrorBody {
    pub error: String,
}

impl IntoResponse for RelayError {
    fn into_response(self) -> Response {
        let status = self.status();
        (
            status,
            Json(ErrorBody {
                error: self.to_string(),
            }),
        )
            .into_response()
    }
}

#[cfg(test)]
mod tests {
    use anyhow::anyhow;

    use super::*;

    #[test]
    fn test_status_mapping() {
        assert_eq!(
            RelayError::InvalidRequest("symbol is required".into()).status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            RelayError::Upstream("boom".into()).status(),
            StatusCode::BAD_GATEWAY
        );
        assert_eq!(
            RelayError::UpstreamTimeout("slow".into()).status(),
            StatusCode::GATEWAY_TIMEOUT
        );
    }

    #[test]
    fn test_from_upstream_keeps_context() {
        let why = anyhow!("connection reset").context("Failed to send GET:/quote");
        let err = RelayError::from_upstream("quote request failed", why);

        assert_eq!(
            err,
            RelayError::Upstream(
                "quote request failed: Failed to send GET:/quote: connection reset".to_string()
            )
        );
    }

    #[test]
    fn test_error_body() {
        let body = serde_json::to_string(&ErrorBody {
            error: "quote request failed".to_string(),
        })
        .unwrap();
        assert_eq!(body, r#"{"error":"quote request failed"}"#);
    }
}
