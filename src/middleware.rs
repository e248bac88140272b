//! Middleware: handler-to-handler adapters for cross-cutting behavior.
//!
//! A middleware here is just a function `impl Handler -> impl Handler`.
//! Composition is nesting — `timeout(budget, require_auth(tokens, inner))` —
//! and the outermost adapter gets the first and last word on the request.
//! The terminal handler never knows the chain exists.

use std::sync::Arc;
use std::time::Duration;

use tracing::{error, warn};

use crate::auth::TokenCodec;
use crate::context::Context;
use crate::error::AppError;
use crate::handler::Handler;

/// Requires a valid bearer credential before `inner` runs.
///
/// Reads `Authorization: Bearer <token>`, verifies signature and expiry, and
/// records the subject id via [`Context::set_identity`] so everything
/// downstream can read it. Any failure — missing header, malformed scheme,
/// bad signature, expired token — writes a 401 and never invokes `inner`.
pub fn require_auth(tokens: TokenCodec, inner: impl Handler) -> impl Handler {
    let inner = inner.into_boxed_handler();
    move |ctx: Context| {
        let tokens = tokens.clone();
        let inner = Arc::clone(&inner);
        async move {
            let Some(header) = ctx.header("authorization") else {
                ctx.fail(&AppError::unauthorized("token not provided"));
                return;
            };
            let Some(token) = header.strip_prefix("Bearer ") else {
                ctx.fail(&AppError::unauthorized("malformed authorization header"));
                return;
            };
            match tokens.verify(token) {
                Ok(user_id) => {
                    ctx.set_identity(user_id);
                    inner.call(ctx).await;
                }
                Err(err) => ctx.fail(&err),
            }
        }
    }
}

/// Bounds `inner` to an execution budget.
///
/// The inner handler runs as its own task so the deadline only *races* it —
/// its side effects are never aborted mid-instruction. Two outcomes:
///
/// - the handler finishes first: its response stands;
/// - the budget elapses first: the request's cancellation token fires (so
///   cooperative downstream work can stop), a 408 is written, and the
///   handler task is left running. It is abandoned, not killed — a known
///   property of this design. The Context's write-once response slot keeps
///   any late write from the abandoned task off the wire.
pub fn timeout(budget: Duration, inner: impl Handler) -> impl Handler {
    let inner = inner.into_boxed_handler();
    move |ctx: Context| {
        let inner = Arc::clone(&inner);
        async move {
            let mut task = tokio::spawn(inner.call(ctx.clone()));
            tokio::select! {
                res = &mut task => {
                    if let Err(e) = res {
                        error!(error = %e, "handler task failed");
                        ctx.fail(&AppError::internal(anyhow::anyhow!("handler task failed: {e}")));
                    }
                }
                () = tokio::time::sleep(budget) => {
                    warn!(path = %ctx.path(), budget_ms = budget.as_millis() as u64,
                        "handler exceeded its budget, abandoning it");
                    ctx.cancel();
                    ctx.fail(&AppError::Timeout);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Instant;

    use bytes::Bytes;
    use http::StatusCode;

    use crate::handler::BoxedHandler;

    fn ctx_with_auth(header: Option<&str>) -> Context {
        let mut builder = http::Request::builder().method(http::Method::GET).uri("/auth/me");
        if let Some(value) = header {
            builder = builder.header("authorization", value);
        }
        let (head, _) = builder.body(()).unwrap().into_parts();
        Context::new(head, Bytes::new(), HashMap::new())
    }

    /// A terminal handler that counts its invocations and answers 200.
    fn counting_handler(calls: Arc<AtomicUsize>) -> impl Handler {
        move |ctx: Context| {
            let calls = Arc::clone(&calls);
            async move {
                calls.fetch_add(1, Ordering::SeqCst);
                ctx.respond_json(StatusCode::OK, &serde_json::json!({"ok": true}));
            }
        }
    }

    async fn run(handler: &BoxedHandler, ctx: &Context) {
        handler.call(ctx.clone()).await;
    }

    #[tokio::test]
    async fn missing_header_short_circuits_with_401() {
        let calls = Arc::new(AtomicUsize::new(0));
        let chain = require_auth(TokenCodec::new("s"), counting_handler(Arc::clone(&calls)))
            .into_boxed_handler();

        let ctx = ctx_with_auth(None);
        run(&chain, &ctx).await;

        assert_eq!(ctx.take_response().unwrap().status(), StatusCode::UNAUTHORIZED);
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn malformed_scheme_short_circuits_with_401() {
        let calls = Arc::new(AtomicUsize::new(0));
        let chain = require_auth(TokenCodec::new("s"), counting_handler(Arc::clone(&calls)))
            .into_boxed_handler();

        let ctx = ctx_with_auth(Some("Basic abc"));
        run(&chain, &ctx).await;

        assert_eq!(ctx.take_response().unwrap().status(), StatusCode::UNAUTHORIZED);
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn foreign_signature_short_circuits_with_401() {
        let calls = Arc::new(AtomicUsize::new(0));
        let chain = require_auth(TokenCodec::new("right"), counting_handler(Arc::clone(&calls)))
            .into_boxed_handler();

        let token = TokenCodec::new("wrong").issue(7).unwrap();
        let ctx = ctx_with_auth(Some(&format!("Bearer {token}")));
        run(&chain, &ctx).await;

        assert_eq!(ctx.take_response().unwrap().status(), StatusCode::UNAUTHORIZED);
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn valid_token_sets_identity_and_invokes_inner() {
        let tokens = TokenCodec::new("s");
        let token = tokens.issue(7).unwrap();

        let chain = require_auth(tokens, |ctx: Context| async move {
            assert_eq!(ctx.identity(), Some(7));
            ctx.respond_json(StatusCode::OK, &serde_json::json!({"id": 7}));
        })
        .into_boxed_handler();

        let ctx = ctx_with_auth(Some(&format!("Bearer {token}")));
        run(&chain, &ctx).await;

        assert_eq!(ctx.take_response().unwrap().status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn fast_handler_beats_the_budget() {
        let calls = Arc::new(AtomicUsize::new(0));
        let chain = timeout(Duration::from_secs(5), counting_handler(Arc::clone(&calls)))
            .into_boxed_handler();

        let ctx = ctx_with_auth(None);
        run(&chain, &ctx).await;

        assert_eq!(ctx.take_response().unwrap().status(), StatusCode::OK);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn slow_handler_yields_408_within_the_budget() {
        let budget = Duration::from_millis(50);
        let chain = timeout(budget, |ctx: Context| async move {
            tokio::time::sleep(Duration::from_secs(30)).await;
            ctx.respond_json(StatusCode::OK, &serde_json::json!({"too": "late"}));
        })
        .into_boxed_handler();

        let ctx = ctx_with_auth(None);
        let started = Instant::now();
        run(&chain, &ctx).await;

        // 408 observed within budget plus scheduling slack, cancellation fired,
        // and the abandoned task cannot overwrite the timeout response.
        assert!(started.elapsed() < Duration::from_secs(5));
        assert!(ctx.is_cancelled());
        assert_eq!(ctx.take_response().unwrap().status(), StatusCode::REQUEST_TIMEOUT);
    }

    #[tokio::test]
    async fn abandoned_handler_write_is_dropped() {
        let chain = timeout(Duration::from_millis(20), |ctx: Context| async move {
            tokio::time::sleep(Duration::from_millis(60)).await;
            ctx.respond_json(StatusCode::OK, &serde_json::json!({"too": "late"}));
        })
        .into_boxed_handler();

        let ctx = ctx_with_auth(None);
        run(&chain, &ctx).await;
        assert!(ctx.has_responded());

        // let the abandoned task finish while the slot still holds the 408;
        // its late write must be dropped by the write-once barrier
        tokio::time::sleep(Duration::from_millis(120)).await;
        assert_eq!(ctx.take_response().unwrap().status(), StatusCode::REQUEST_TIMEOUT);
    }

    #[tokio::test]
    async fn nested_chain_runs_outermost_first() {
        let tokens = TokenCodec::new("s");
        let calls = Arc::new(AtomicUsize::new(0));
        let chain = timeout(
            Duration::from_secs(5),
            require_auth(tokens, counting_handler(Arc::clone(&calls))),
        )
        .into_boxed_handler();

        // auth rejects inside the timeout envelope; inner never runs
        let ctx = ctx_with_auth(None);
        run(&chain, &ctx).await;
        assert_eq!(ctx.take_response().unwrap().status(), StatusCode::UNAUTHORIZED);
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }
}
