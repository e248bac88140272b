//! Application wiring: shared state and the route table.
//!
//! Everything a handler needs arrives through [`AppState`] — stores behind
//! their trait objects and the token codec. No process-wide singletons;
//! `main` (or a test) decides what goes in.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use crate::auth::TokenCodec;
use crate::context::Context;
use crate::handler::Handler;
use crate::handlers;
use crate::middleware::{require_auth, timeout};
use crate::router::Router;
use crate::store::{PostStore, UserStore};

/// Dependency bundle shared by every handler.
pub struct AppState {
    pub users: Arc<dyn UserStore>,
    pub posts: Arc<dyn PostStore>,
    pub tokens: TokenCodec,
}

/// Builds the complete route table.
///
/// Every route runs under the timeout `budget`; protected routes add the
/// authentication check inside that envelope, so a stalled token lookup is
/// still bounded.
pub fn routes(state: Arc<AppState>, budget: Duration) -> Router {
    let tokens = state.tokens.clone();

    Router::new()
        .get("/health", timeout(budget, handlers::health))
        // accounts
        .post("/auth/signup", timeout(budget, with_state(&state, handlers::users::signup)))
        .post("/auth/login", timeout(budget, with_state(&state, handlers::users::login)))
        .get(
            "/auth/me",
            timeout(budget, require_auth(tokens.clone(), with_state(&state, handlers::users::me))),
        )
        // posts, public
        .get("/posts", timeout(budget, with_state(&state, handlers::posts::list)))
        .get("/posts/{id}", timeout(budget, with_state(&state, handlers::posts::get)))
        // posts, protected
        .post(
            "/posts",
            timeout(budget, require_auth(tokens.clone(), with_state(&state, handlers::posts::create))),
        )
        .put(
            "/posts/{id}",
            timeout(budget, require_auth(tokens.clone(), with_state(&state, handlers::posts::update))),
        )
        .delete(
            "/posts/{id}",
            timeout(budget, require_auth(tokens.clone(), with_state(&state, handlers::posts::delete))),
        )
        .get(
            "/posts/me",
            timeout(budget, require_auth(tokens, with_state(&state, handlers::posts::mine))),
        )
}

/// Adapts an `async fn(Arc<AppState>, Context)` into a route handler by
/// capturing the state.
fn with_state<F, Fut>(state: &Arc<AppState>, f: F) -> impl Handler
where
    F: Fn(Arc<AppState>, Context) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = ()> + Send + 'static,
{
    let state = Arc::clone(state);
    move |ctx: Context| f(Arc::clone(&state), ctx)
}
