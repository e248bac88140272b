//! Per-request context.
//!
//! One [`Context`] is created per dispatched request and destroyed when the
//! handler chain returns. It is the only mutable state the chain shares:
//! request head, buffered body, path parameters, the authenticated identity,
//! and the response slot all live here.
//!
//! # Why `Clone`
//!
//! The timeout middleware runs the inner handler as an independently
//! scheduled task and races it against a deadline. Both the task and the
//! middleware need the same response slot, so `Context` is a cheap handle
//! (`Arc` innards, one atomic increment per clone). A Context is still never
//! shared *across* requests — clones only ever exist within one chain.
//!
//! # Write-once response
//!
//! Writing a response twice to the same Context is a programming error. The
//! first write wins; later writes are logged and dropped, never a panic.
//! This is also the barrier that keeps an abandoned (timed-out) handler from
//! corrupting the timeout response already on the wire.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, OnceLock};

use bytes::Bytes;
use http::header::CONTENT_TYPE;
use http::{HeaderValue, Method, StatusCode};
use http_body_util::Full;
use serde::Serialize;
use serde::de::DeserializeOwned;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, warn};

use crate::error::{AppError, ErrorBody};

pub(crate) type HttpResponse = http::Response<Full<Bytes>>;

/// The per-request state container passed through the middleware/handler
/// chain. See the [module docs](self) for ownership rules.
#[derive(Clone)]
pub struct Context {
    inner: Arc<Inner>,
}

struct Inner {
    head: http::request::Parts,
    params: HashMap<String, String>,
    /// Single-consume body, mirroring a one-shot body stream: the first
    /// [`Context::decode_json`] takes it, a second call fails cleanly.
    body: Mutex<Option<Bytes>>,
    /// Set at most once, by the authentication middleware, before any
    /// downstream handler observes it.
    identity: OnceLock<u64>,
    response: Mutex<Option<HttpResponse>>,
    cancel: CancellationToken,
}

impl Context {
    pub(crate) fn new(
        head: http::request::Parts,
        body: Bytes,
        params: HashMap<String, String>,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                head,
                params,
                body: Mutex::new(Some(body)),
                identity: OnceLock::new(),
                response: Mutex::new(None),
                cancel: CancellationToken::new(),
            }),
        }
    }

    // ── Request access ────────────────────────────────────────────────────────

    pub fn method(&self) -> &Method {
        &self.inner.head.method
    }

    pub fn path(&self) -> &str {
        self.inner.head.uri.path()
    }

    /// Header lookup by name (case-insensitive). Non-UTF-8 values read as absent.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.inner.head.headers.get(name)?.to_str().ok()
    }

    /// Named path parameter. For a route `/posts/{id}`, `ctx.param("id")` on
    /// `/posts/42` returns `Some("42")`.
    pub fn param(&self, key: &str) -> Option<&str> {
        self.inner.params.get(key).map(String::as_str)
    }

    /// Deserializes the request body. The body is consumed on the first call;
    /// calling again fails with `BadRequest` — handlers decode at most once.
    pub fn decode_json<T: DeserializeOwned>(&self) -> Result<T, AppError> {
        let body = self
            .inner
            .body
            .lock()
            .expect("body lock poisoned")
            .take()
            .ok_or_else(|| AppError::bad_request("request body already consumed"))?;
        serde_json::from_slice(&body).map_err(|e| {
            debug!(error = %e, "request body failed to parse");
            AppError::bad_request("invalid request body")
        })
    }

    // ── Identity ──────────────────────────────────────────────────────────────

    /// Records the authenticated principal. Single-writer: only the
    /// authentication middleware calls this, and only once — a second call
    /// is ignored with a warning.
    pub fn set_identity(&self, user_id: u64) {
        if self.inner.identity.set(user_id).is_err() {
            warn!(user_id, "identity already set for this request, ignoring");
        }
    }

    /// The authenticated principal, or `None` when no authentication
    /// middleware ran (or it declined to set one). Not an error — handlers
    /// interpret absence themselves.
    pub fn identity(&self) -> Option<u64> {
        self.inner.identity.get().copied()
    }

    // ── Cancellation ──────────────────────────────────────────────────────────

    /// The execution scope of this request. Downstream work (a database
    /// call, an outbound request) can clone this and stop early once the
    /// timeout middleware gives up on the handler.
    pub fn cancellation(&self) -> CancellationToken {
        self.inner.cancel.clone()
    }

    pub fn is_cancelled(&self) -> bool {
        self.inner.cancel.is_cancelled()
    }

    pub(crate) fn cancel(&self) {
        self.inner.cancel.cancel();
    }

    // ── Response ──────────────────────────────────────────────────────────────

    /// Writes a JSON response. First write wins; see the module docs.
    pub fn respond_json<T: Serialize>(&self, status: StatusCode, payload: &T) {
        let (status, body) = match serde_json::to_vec(payload) {
            Ok(body) => (status, body),
            Err(e) => {
                error!(error = %e, "response payload failed to serialize");
                (StatusCode::INTERNAL_SERVER_ERROR, b"{}".to_vec())
            }
        };
        let mut resp = http::Response::new(Full::new(Bytes::from(body)));
        *resp.status_mut() = status;
        resp.headers_mut()
            .insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        self.store(resp);
    }

    /// Writes the structured error body for `err`. Internal failures log
    /// their source chain here; the wire only sees the generic message.
    pub fn fail(&self, err: &AppError) {
        if let AppError::Internal(source) = err {
            error!(error = ?source, "request failed");
        }
        let status = err.status();
        self.respond_json(status, &ErrorBody::new(status, &err.to_string()));
    }

    /// Whether a response has already been written.
    pub fn has_responded(&self) -> bool {
        self.inner.response.lock().expect("response lock poisoned").is_some()
    }

    fn store(&self, resp: HttpResponse) {
        let mut slot = self.inner.response.lock().expect("response lock poisoned");
        if slot.is_some() {
            warn!(path = %self.path(), "response already written, dropping second write");
            return;
        }
        *slot = Some(resp);
    }

    /// Taken exactly once by the router after the chain returns.
    pub(crate) fn take_response(&self) -> Option<HttpResponse> {
        self.inner.response.lock().expect("response lock poisoned").take()
    }
}
