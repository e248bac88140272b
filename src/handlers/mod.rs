//! Terminal business handlers for every route the API exposes.
//!
//! Handlers validate, call the store contract, and write their outcome
//! through the [`Context`] — success envelopes on the happy path, structured
//! errors everywhere else. They are pure functions of `(AppState, Context)`;
//! authentication and budgets are the middleware chain's problem.

pub mod posts;
pub mod users;

use http::StatusCode;

use crate::context::Context;

/// `GET /health` — no dependencies, answers as long as the process serves.
pub async fn health(ctx: Context) {
    ctx.respond_json(
        StatusCode::OK,
        &serde_json::json!({
            "status": "ok",
            "message": "the service is running",
        }),
    );
}
