//! # pluma
//!
//! A token-authenticated JSON API for users and posts, built on a deliberately
//! small HTTP core: a method+path router, a per-request [`Context`], and a
//! nesting middleware chain. Everything else — validation, password hashing,
//! SQL — is ordinary glue behind that core.
//!
//! ## The shape of a request
//!
//! ```text
//! accept → route match → Context built → middleware chain → handler
//!                                        (timeout(auth(handler)))
//! ```
//!
//! - The **router** holds one radix tree per method ([`matchit`]); patterns
//!   are literal paths with at most one trailing `{id}` segment, fixed at
//!   startup.
//! - The **Context** is the only per-request mutable state: buffered body,
//!   path parameters, the authenticated identity (set once by the auth
//!   middleware), a write-once response slot, and a cancellation token.
//! - **Middleware** are plain `impl Handler -> impl Handler` functions,
//!   composed by nesting. The timeout adapter races the inner handler
//!   against a budget; on expiry the handler is abandoned (cancellation is
//!   signalled, not enforced) and the write-once slot keeps its late output
//!   off the wire.
//!
//! ## Quick start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use std::time::Duration;
//! use pluma::store::memory::{MemPostStore, MemUserStore};
//! use pluma::{AppState, Server, TokenCodec, routes};
//!
//! #[tokio::main]
//! async fn main() {
//!     let state = Arc::new(AppState {
//!         users: Arc::new(MemUserStore::new()),
//!         posts: Arc::new(MemPostStore::new()),
//!         tokens: TokenCodec::new("dev-secret"),
//!     });
//!     let app = routes(state, Duration::from_secs(10));
//!     Server::bind("0.0.0.0:8080").serve(app).await.unwrap();
//! }
//! ```

mod app;
mod auth;
mod config;
mod context;
mod error;
mod handler;
mod router;
mod server;

pub mod handlers;
pub mod middleware;
pub mod store;

pub use app::{AppState, routes};
pub use auth::{TokenCodec, hash_password, verify_password};
pub use config::Config;
pub use context::Context;
pub use error::{AppError, ErrorBody};
pub use handler::Handler;
pub use router::Router;
pub use server::Server;
