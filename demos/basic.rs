//! Run the full API against in-memory stores — no database required.
//!
//! Run with:
//!   RUST_LOG=info cargo run --example basic
//!
//! Try:
//!   curl http://localhost:8080/health
//!   curl -X POST http://localhost:8080/auth/signup \
//!        -H 'content-type: application/json' \
//!        -d '{"name":"alice","email":"alice@example.com","password":"hunter2"}'
//!   curl -X POST http://localhost:8080/auth/login \
//!        -H 'content-type: application/json' \
//!        -d '{"email":"alice@example.com","password":"hunter2"}'
//!   curl http://localhost:8080/auth/me -H "Authorization: Bearer <token>"

use std::sync::Arc;
use std::time::Duration;

use pluma::store::memory::{MemPostStore, MemUserStore};
use pluma::{AppState, Server, TokenCodec, routes};

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt::init();

    let state = Arc::new(AppState {
        users: Arc::new(MemUserStore::new()),
        posts: Arc::new(MemPostStore::new()),
        tokens: TokenCodec::new("demo-secret"),
    });

    let app = routes(state, Duration::from_secs(10));

    Server::bind("0.0.0.0:8080")
        .serve(app)
        .await
        .expect("server error");
}
