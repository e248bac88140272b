//! Method + path request router.
//!
//! One radix tree per HTTP method, O(path-length) lookup via [`matchit`].
//! Routes are registered once at startup and never mutated afterwards;
//! a duplicate or malformed pattern is a configuration error and panics
//! before the server ever accepts a connection.
//!
//! Patterns are deliberately minimal: a literal path with at most one
//! trailing `{name}` segment (`/posts/{id}`). No wildcards, no mid-path
//! parameters — richer patterns are rejected at registration.

use std::collections::HashMap;
use std::sync::Arc;

use bytes::Bytes;
use http::{Method, StatusCode};
use http_body_util::Full;
use matchit::Router as MatchitRouter;
use tracing::{debug, error};

use crate::context::Context;
use crate::error::ErrorBody;
use crate::handler::{BoxedHandler, Handler};

/// The application route table. Build once at startup, pass to
/// [`Server::serve`](crate::Server::serve). Each registration returns `self`
/// so routes chain naturally.
pub struct Router {
    routes: HashMap<Method, MatchitRouter<BoxedHandler>>,
    registered: usize,
}

impl Router {
    pub fn new() -> Self {
        Self { routes: HashMap::new(), registered: 0 }
    }

    /// Register a handler for a method + pattern pair.
    ///
    /// # Panics
    ///
    /// Panics on a duplicate registration for the same method, or on a
    /// pattern that is not a literal path with at most one trailing `{name}`
    /// segment. Both are startup-fatal by design.
    pub fn on(mut self, method: Method, pattern: &str, handler: impl Handler) -> Self {
        validate_pattern(pattern);
        self.routes
            .entry(method)
            .or_default()
            .insert(pattern, handler.into_boxed_handler())
            .unwrap_or_else(|e| panic!("invalid route `{pattern}`: {e}"));
        self.registered += 1;
        self
    }

    pub fn get(self, pattern: &str, handler: impl Handler) -> Self {
        self.on(Method::GET, pattern, handler)
    }

    pub fn post(self, pattern: &str, handler: impl Handler) -> Self {
        self.on(Method::POST, pattern, handler)
    }

    pub fn put(self, pattern: &str, handler: impl Handler) -> Self {
        self.on(Method::PUT, pattern, handler)
    }

    pub fn delete(self, pattern: &str, handler: impl Handler) -> Self {
        self.on(Method::DELETE, pattern, handler)
    }

    /// Number of registered routes.
    pub fn len(&self) -> usize {
        self.registered
    }

    pub fn is_empty(&self) -> bool {
        self.registered == 0
    }

    // ── Dispatch ──────────────────────────────────────────────────────────────

    /// Routes one buffered request through the matching handler chain and
    /// returns the response the chain wrote.
    ///
    /// A fresh [`Context`] is constructed per call and dropped before this
    /// returns — it is never reused across requests. Misses produce a
    /// structured 404, or 405 when the path exists under another method.
    pub async fn dispatch(&self, req: http::Request<Bytes>) -> http::Response<Full<Bytes>> {
        let (head, body) = req.into_parts();

        let Some((handler, params)) = self.lookup(&head.method, head.uri.path()) else {
            return if self.allows_other_method(&head.method, head.uri.path()) {
                ErrorBody::response(StatusCode::METHOD_NOT_ALLOWED, "method not allowed")
            } else {
                ErrorBody::response(StatusCode::NOT_FOUND, "route not found")
            };
        };

        debug!(method = %head.method, path = head.uri.path(), "dispatching");
        let ctx = Context::new(head, body, params);
        handler.call(ctx.clone()).await;

        ctx.take_response().unwrap_or_else(|| {
            error!(path = %ctx.path(), "handler returned without writing a response");
            ErrorBody::response(StatusCode::INTERNAL_SERVER_ERROR, "internal server error")
        })
    }

    fn lookup(
        &self,
        method: &Method,
        path: &str,
    ) -> Option<(BoxedHandler, HashMap<String, String>)> {
        let tree = self.routes.get(method)?;
        let matched = tree.at(path).ok()?;
        let handler = Arc::clone(matched.value);
        let params = matched
            .params
            .iter()
            .map(|(k, v)| (k.to_owned(), v.to_owned()))
            .collect();
        Some((handler, params))
    }

    /// True when `path` is registered under some method other than `method`.
    fn allows_other_method(&self, method: &Method, path: &str) -> bool {
        self.routes
            .iter()
            .any(|(m, tree)| m != method && tree.at(path).is_ok())
    }
}

impl Default for Router {
    fn default() -> Self {
        Self::new()
    }
}

/// Enforces the minimal pattern grammar: literal segments, at most one
/// dynamic segment, and only in trailing position.
fn validate_pattern(pattern: &str) {
    let mut segments = pattern.split('/').filter(|s| !s.is_empty()).peekable();
    while let Some(segment) = segments.next() {
        let dynamic = segment.starts_with('{') && segment.ends_with('}');
        if segment.starts_with("{*") {
            panic!("invalid route `{pattern}`: wildcard segments are not supported");
        }
        if dynamic && segments.peek().is_some() {
            panic!("invalid route `{pattern}`: dynamic segment must be trailing");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use crate::context::Context;

    fn request(method: Method, path: &str) -> http::Request<Bytes> {
        http::Request::builder()
            .method(method)
            .uri(path)
            .body(Bytes::new())
            .unwrap()
    }

    async fn ok(ctx: Context) {
        ctx.respond_json(StatusCode::OK, &serde_json::json!({"ok": true}));
    }

    #[tokio::test]
    async fn dispatch_reaches_matching_handler_exactly_once() {
        let calls = Arc::new(AtomicUsize::new(0));
        let seen = Arc::clone(&calls);
        let router = Router::new().get("/posts/{id}", move |ctx: Context| {
            let seen = Arc::clone(&seen);
            async move {
                seen.fetch_add(1, Ordering::SeqCst);
                let id = ctx.param("id").unwrap().to_owned();
                ctx.respond_json(StatusCode::OK, &serde_json::json!({"id": id}));
            }
        });

        let resp = router.dispatch(request(Method::GET, "/posts/42")).await;
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn unknown_path_is_404() {
        let router = Router::new().get("/posts", ok);
        let resp = router.dispatch(request(Method::GET, "/nowhere")).await;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn known_path_wrong_method_is_405() {
        let router = Router::new().get("/posts", ok);
        let resp = router.dispatch(request(Method::DELETE, "/posts")).await;
        assert_eq!(resp.status(), StatusCode::METHOD_NOT_ALLOWED);
    }

    #[tokio::test]
    async fn static_route_beats_dynamic_sibling() {
        let router = Router::new()
            .get("/posts/{id}", |ctx: Context| async move {
                ctx.respond_json(StatusCode::OK, &serde_json::json!({"route": "by_id"}));
            })
            .get("/posts/me", |ctx: Context| async move {
                ctx.respond_json(StatusCode::OK, &serde_json::json!({"route": "mine"}));
            });

        let resp = router.dispatch(request(Method::GET, "/posts/me")).await;
        let body = String::from_utf8(
            http_body_util::BodyExt::collect(resp.into_body())
                .await
                .unwrap()
                .to_bytes()
                .to_vec(),
        )
        .unwrap();
        assert!(body.contains("mine"));
    }

    #[tokio::test]
    async fn silent_handler_becomes_500() {
        let router = Router::new().get("/quiet", |_ctx: Context| async {});
        let resp = router.dispatch(request(Method::GET, "/quiet")).await;
        assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    #[should_panic(expected = "invalid route")]
    fn duplicate_registration_panics() {
        let _ = Router::new().get("/posts", ok).get("/posts", ok);
    }

    #[test]
    #[should_panic(expected = "dynamic segment must be trailing")]
    fn mid_path_parameter_panics() {
        let _ = Router::new().get("/users/{id}/posts", ok);
    }

    #[test]
    #[should_panic(expected = "wildcard segments are not supported")]
    fn wildcard_pattern_panics() {
        let _ = Router::new().get("/files/{*rest}", ok);
    }

    #[test]
    fn len_counts_routes_across_methods() {
        let router = Router::new().get("/a", ok).post("/a", ok).get("/b", ok);
        assert_eq!(router.len(), 3);
        assert!(!router.is_empty());
    }
}
