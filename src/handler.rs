//! Handler trait and type erasure.
//!
//! The router stores handlers of *different* concrete types in one
//! `HashMap<Method, Tree>`, so every handler is erased behind a trait object:
//!
//! ```text
//! async fn me(ctx: Context) { … }            ← user writes this
//!        ↓ router.get("/auth/me", me)
//! me.into_boxed_handler()                    ← Handler blanket impl
//!        ↓
//! Arc::new(FnHandler(me))                    ← stored as Arc<dyn ErasedHandler>
//!        ↓
//! handler.call(ctx)  at request time         ← one vtable dispatch
//! ```
//!
//! Handlers return `()` — every outcome, success or failure, is written
//! through the [`Context`]. The router never consumes a return value.
//!
//! Middleware composes at this layer too: an adapter like
//! [`middleware::timeout`](crate::middleware::timeout) takes an
//! `impl Handler`, wraps it, and is itself an `impl Handler` (the blanket
//! impl covers capturing closures, not just `async fn` items).

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use crate::context::Context;

/// A heap-allocated, type-erased future. `Pin<Box<…>>` because the runtime
/// polls it in place; `Send + 'static` so tokio may move it across threads
/// (the timeout middleware spawns it as its own task).
pub(crate) type BoxFuture = Pin<Box<dyn Future<Output = ()> + Send + 'static>>;

/// Internal dispatch interface. `#[doc(hidden)] pub` only because it appears
/// in the return type of [`Handler::into_boxed_handler`].
#[doc(hidden)]
pub trait ErasedHandler {
    fn call(&self, ctx: Context) -> BoxFuture;
}

/// A type-erased handler shared across concurrent requests. `Arc` so the
/// cost per request is one atomic increment, not a copy.
#[doc(hidden)]
pub type BoxedHandler = Arc<dyn ErasedHandler + Send + Sync + 'static>;

/// Implemented for every valid route handler.
///
/// Never implemented by hand — any `async fn(Context)` (or closure of the
/// same shape) satisfies it through the blanket impl. Sealed so the blanket
/// impl is the only one.
pub trait Handler: private::Sealed + Send + Sync + 'static {
    #[doc(hidden)]
    fn into_boxed_handler(self) -> BoxedHandler;
}

mod private {
    pub trait Sealed {}
}

impl<F, Fut> private::Sealed for F
where
    F: Fn(Context) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = ()> + Send + 'static,
{
}

impl<F, Fut> Handler for F
where
    F: Fn(Context) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = ()> + Send + 'static,
{
    fn into_boxed_handler(self) -> BoxedHandler {
        Arc::new(FnHandler(self))
    }
}

/// Bridges a concrete `F` into the trait-object world.
struct FnHandler<F>(F);

impl<F, Fut> ErasedHandler for FnHandler<F>
where
    F: Fn(Context) -> Fut + Send + Sync,
    Fut: Future<Output = ()> + Send + 'static,
{
    fn call(&self, ctx: Context) -> BoxFuture {
        Box::pin((self.0)(ctx))
    }
}
