//! Post CRUD handlers.
//!
//! Ownership policy: updating or deleting someone else's post is a
//! `BadRequest`, not a 403 — the API treats it as a client error.

use std::sync::Arc;

use http::StatusCode;
use serde::Deserialize;
use serde_json::json;

use crate::app::AppState;
use crate::context::Context;
use crate::error::AppError;
use crate::store::StoreError;

#[derive(Deserialize)]
struct PostRequest {
    #[serde(default)]
    title: String,
    #[serde(default)]
    content: String,
}

impl PostRequest {
    fn validate(&self) -> Result<(), AppError> {
        if self.title.is_empty() {
            return Err(AppError::bad_request("title is required"));
        }
        if self.content.is_empty() {
            return Err(AppError::bad_request("content is required"));
        }
        Ok(())
    }
}

fn path_id(ctx: &Context) -> Result<u64, AppError> {
    ctx.param("id")
        .and_then(|raw| raw.parse().ok())
        .ok_or_else(|| AppError::bad_request("invalid post id"))
}

fn identity(ctx: &Context) -> Result<u64, AppError> {
    ctx.identity()
        .ok_or_else(|| AppError::unauthorized("not authenticated"))
}

/// `GET /posts`
pub async fn list(state: Arc<AppState>, ctx: Context) {
    match state.posts.all().await {
        Ok(posts) => ctx.respond_json(StatusCode::OK, &json!({ "posts": posts })),
        Err(e) => ctx.fail(&e.into()),
    }
}

/// `GET /posts/{id}`
pub async fn get(state: Arc<AppState>, ctx: Context) {
    let id = match path_id(&ctx) {
        Ok(id) => id,
        Err(e) => return ctx.fail(&e),
    };
    match state.posts.find(id).await {
        Ok(post) => ctx.respond_json(StatusCode::OK, &json!({ "post": post })),
        Err(StoreError::NotFound) => ctx.fail(&AppError::not_found("post not found")),
        Err(e) => ctx.fail(&e.into()),
    }
}

/// `POST /posts` (authenticated)
pub async fn create(state: Arc<AppState>, ctx: Context) {
    let user_id = match identity(&ctx) {
        Ok(id) => id,
        Err(e) => return ctx.fail(&e),
    };
    let req: PostRequest = match ctx.decode_json() {
        Ok(req) => req,
        Err(e) => return ctx.fail(&e),
    };
    if let Err(e) = req.validate() {
        return ctx.fail(&e);
    }

    match state.posts.create(user_id, &req.title, &req.content).await {
        Ok(post) => ctx.respond_json(
            StatusCode::CREATED,
            &json!({
                "message": "post created successfully",
                "post": post,
            }),
        ),
        Err(e) => ctx.fail(&e.into()),
    }
}

/// `PUT /posts/{id}` (authenticated, owner only)
pub async fn update(state: Arc<AppState>, ctx: Context) {
    let user_id = match identity(&ctx) {
        Ok(id) => id,
        Err(e) => return ctx.fail(&e),
    };
    let id = match path_id(&ctx) {
        Ok(id) => id,
        Err(e) => return ctx.fail(&e),
    };
    let req: PostRequest = match ctx.decode_json() {
        Ok(req) => req,
        Err(e) => return ctx.fail(&e),
    };
    if let Err(e) = req.validate() {
        return ctx.fail(&e);
    }

    let mut post = match state.posts.find(id).await {
        Ok(post) => post,
        Err(StoreError::NotFound) => return ctx.fail(&AppError::not_found("post not found")),
        Err(e) => return ctx.fail(&e.into()),
    };
    if post.user_id != user_id {
        return ctx.fail(&AppError::bad_request("you do not have permission to modify this post"));
    }

    if let Err(e) = state.posts.update(id, &req.title, &req.content).await {
        return ctx.fail(&e.into());
    }
    post.title = req.title;
    post.content = req.content;
    ctx.respond_json(
        StatusCode::OK,
        &json!({
            "message": "post updated successfully",
            "post": post,
        }),
    );
}

/// `DELETE /posts/{id}` (authenticated, owner only)
pub async fn delete(state: Arc<AppState>, ctx: Context) {
    let user_id = match identity(&ctx) {
        Ok(id) => id,
        Err(e) => return ctx.fail(&e),
    };
    let id = match path_id(&ctx) {
        Ok(id) => id,
        Err(e) => return ctx.fail(&e),
    };

    let post = match state.posts.find(id).await {
        Ok(post) => post,
        Err(StoreError::NotFound) => return ctx.fail(&AppError::not_found("post not found")),
        Err(e) => return ctx.fail(&e.into()),
    };
    if post.user_id != user_id {
        return ctx.fail(&AppError::bad_request("you do not have permission to delete this post"));
    }

    match state.posts.delete(id).await {
        Ok(()) => ctx.respond_json(
            StatusCode::OK,
            &json!({ "message": "post deleted successfully" }),
        ),
        Err(e) => ctx.fail(&e.into()),
    }
}

/// `GET /posts/me` (authenticated)
pub async fn mine(state: Arc<AppState>, ctx: Context) {
    let user_id = match identity(&ctx) {
        Ok(id) => id,
        Err(e) => return ctx.fail(&e),
    };
    match state.posts.by_author(user_id).await {
        Ok(posts) => ctx.respond_json(StatusCode::OK, &json!({ "posts": posts })),
        Err(e) => ctx.fail(&e.into()),
    }
}
