//! Account handlers: signup, login, and the authenticated `me` lookup.

use std::sync::Arc;

use http::StatusCode;
use serde::Deserialize;
use serde_json::json;

use crate::app::AppState;
use crate::auth;
use crate::context::Context;
use crate::error::AppError;
use crate::store::StoreError;

// Missing fields decode as empty and fail the same required-field check,
// so `{}` and `{"name":""}` answer identically.
#[derive(Deserialize)]
struct SignupRequest {
    #[serde(default)]
    name: String,
    #[serde(default)]
    email: String,
    #[serde(default)]
    password: String,
}

#[derive(Deserialize)]
struct LoginRequest {
    #[serde(default)]
    email: String,
    #[serde(default)]
    password: String,
}

/// `POST /auth/signup`
pub async fn signup(state: Arc<AppState>, ctx: Context) {
    let req: SignupRequest = match ctx.decode_json() {
        Ok(req) => req,
        Err(e) => return ctx.fail(&e),
    };
    if req.name.is_empty() || req.email.is_empty() || req.password.is_empty() {
        return ctx.fail(&AppError::bad_request("name, email and password are required"));
    }

    match state.users.email_exists(&req.email).await {
        Ok(false) => {}
        Ok(true) => return ctx.fail(&AppError::bad_request("email is already registered")),
        Err(e) => return ctx.fail(&e.into()),
    }

    let hash = match auth::hash_password(&req.password) {
        Ok(hash) => hash,
        Err(e) => return ctx.fail(&e),
    };

    match state.users.create(&req.name, &req.email, &hash).await {
        Ok(user) => ctx.respond_json(
            StatusCode::CREATED,
            &json!({
                "message": "user registered successfully",
                "user": user,
            }),
        ),
        // a concurrent signup can win between the pre-check and the insert;
        // the store's uniqueness error keeps that a 400, not a 500
        Err(StoreError::Conflict) => {
            ctx.fail(&AppError::bad_request("email is already registered"))
        }
        Err(e) => ctx.fail(&e.into()),
    }
}

/// `POST /auth/login`
///
/// Unknown email and wrong password are indistinguishable on the wire.
pub async fn login(state: Arc<AppState>, ctx: Context) {
    let req: LoginRequest = match ctx.decode_json() {
        Ok(req) => req,
        Err(e) => return ctx.fail(&e),
    };
    if req.email.is_empty() || req.password.is_empty() {
        return ctx.fail(&AppError::bad_request("email and password are required"));
    }

    let user = match state.users.find_by_email(&req.email).await {
        Ok(user) => user,
        Err(_) => return ctx.fail(&AppError::unauthorized("invalid credentials")),
    };
    if !auth::verify_password(&req.password, &user.password_hash) {
        return ctx.fail(&AppError::unauthorized("invalid credentials"));
    }

    match state.tokens.issue(user.id) {
        Ok(token) => ctx.respond_json(
            StatusCode::OK,
            &json!({
                "message": "login successful",
                "token": token,
            }),
        ),
        Err(e) => ctx.fail(&e),
    }
}

/// `GET /auth/me` (authenticated)
pub async fn me(state: Arc<AppState>, ctx: Context) {
    let Some(user_id) = ctx.identity() else {
        return ctx.fail(&AppError::unauthorized("not authenticated"));
    };

    match state.users.find_by_id(user_id).await {
        Ok(user) => ctx.respond_json(StatusCode::OK, &json!({ "user": user })),
        Err(StoreError::NotFound) => ctx.fail(&AppError::not_found("user not found")),
        Err(e) => ctx.fail(&e.into()),
    }
}
