//! Application error taxonomy and the JSON error body.
//!
//! Every failure a handler can hit maps to exactly one [`AppError`] variant,
//! which in turn maps to one HTTP status and one `{error, message, code}`
//! body. Errors never propagate past the router — handlers convert them
//! locally via [`Context::fail`](crate::Context::fail).

use bytes::Bytes;
use http::header::CONTENT_TYPE;
use http::{HeaderValue, StatusCode};
use http_body_util::Full;
use serde::Serialize;
use thiserror::Error;

/// A handler-level failure with a fixed HTTP mapping.
///
/// `Internal` deliberately hides its cause from the client: the source chain
/// is logged at the point of conversion, the wire sees a generic message.
#[derive(Debug, Error)]
pub enum AppError {
    /// Malformed body, missing required field, invalid path parameter, or an
    /// ownership violation (policy: acting on someone else's resource is a
    /// client error, not a 403).
    #[error("{0}")]
    BadRequest(String),

    /// Missing, malformed, expired, or otherwise unverifiable credential.
    #[error("{0}")]
    Unauthorized(String),

    /// Entity absent.
    #[error("{0}")]
    NotFound(String),

    /// Handler exceeded its execution budget.
    #[error("the operation took too long to complete")]
    Timeout,

    /// Persistence or transport failure. The cause is logged where the error
    /// is written, never serialized to the client.
    #[error("internal server error")]
    Internal(anyhow::Error),
}

impl AppError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::BadRequest(message.into())
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::Unauthorized(message.into())
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound(message.into())
    }

    pub fn internal(source: impl Into<anyhow::Error>) -> Self {
        Self::Internal(source.into())
    }

    pub fn status(&self) -> StatusCode {
        match self {
            Self::BadRequest(_)   => StatusCode::BAD_REQUEST,
            Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Self::NotFound(_)     => StatusCode::NOT_FOUND,
            Self::Timeout         => StatusCode::REQUEST_TIMEOUT,
            Self::Internal(_)     => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

// ── Wire format ───────────────────────────────────────────────────────────────

/// The JSON error body every failed request carries.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    /// Canonical reason phrase for the status (`"Bad Request"`, …).
    pub error: String,
    /// Human-readable detail.
    pub message: String,
    /// Numeric status code, duplicated in the body for lazy clients.
    pub code: u16,
}

impl ErrorBody {
    pub(crate) fn new(status: StatusCode, message: &str) -> Self {
        Self {
            error: status.canonical_reason().unwrap_or("Unknown").to_owned(),
            message: message.to_owned(),
            code: status.as_u16(),
        }
    }

    /// A complete JSON error response, used by the router for failures that
    /// happen before any [`Context`](crate::Context) exists (404, 405).
    pub(crate) fn response(status: StatusCode, message: &str) -> http::Response<Full<Bytes>> {
        let body = serde_json::to_vec(&Self::new(status, message))
            .unwrap_or_else(|_| b"{}".to_vec());
        let mut resp = http::Response::new(Full::new(Bytes::from(body)));
        *resp.status_mut() = status;
        resp.headers_mut()
            .insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        resp
    }
}
