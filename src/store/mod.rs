//! Persistence contract and entity models.
//!
//! Handlers talk to storage through the [`UserStore`] / [`PostStore`] traits
//! only — create / find / update / delete, with absence as a typed
//! [`StoreError::NotFound`] rather than an HTTP concern. Two implementations
//! exist: [`sql`] (MySQL via sqlx, production) and [`memory`] (mutex-guarded
//! maps, tests and demos).

pub mod memory;
pub mod sql;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use thiserror::Error;

use crate::error::AppError;

// ── Models ────────────────────────────────────────────────────────────────────

/// A registered account. The password hash never serializes — the struct can
/// be embedded in a response as-is and renders as the public user summary.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct User {
    pub id: u64,
    pub name: String,
    pub email: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct Post {
    pub id: u64,
    pub user_id: u64,
    pub title: String,
    pub content: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

// ── Errors ────────────────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("not found")]
    NotFound,

    /// A uniqueness constraint rejected the write. Stores raise this
    /// themselves (unique index, or the memory store's own check) so a
    /// concurrent duplicate insert stays a client error even when it slips
    /// past a handler's pre-check.
    #[error("already exists")]
    Conflict,

    #[error(transparent)]
    Backend(#[from] anyhow::Error),
}

impl From<sqlx::Error> for StoreError {
    fn from(e: sqlx::Error) -> Self {
        match e {
            sqlx::Error::RowNotFound => Self::NotFound,
            sqlx::Error::Database(db) if db.is_unique_violation() => Self::Conflict,
            other => Self::Backend(other.into()),
        }
    }
}

/// Default HTTP mapping. Handlers that want an entity-specific message map
/// [`StoreError::NotFound`] / [`StoreError::Conflict`] themselves before
/// falling back here.
impl From<StoreError> for AppError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::NotFound => AppError::not_found("resource not found"),
            StoreError::Conflict => AppError::bad_request("resource already exists"),
            StoreError::Backend(source) => AppError::internal(source),
        }
    }
}

// ── Contracts ─────────────────────────────────────────────────────────────────

#[async_trait]
pub trait UserStore: Send + Sync {
    async fn create(&self, name: &str, email: &str, password_hash: &str)
        -> Result<User, StoreError>;
    async fn find_by_id(&self, id: u64) -> Result<User, StoreError>;
    async fn find_by_email(&self, email: &str) -> Result<User, StoreError>;
    async fn email_exists(&self, email: &str) -> Result<bool, StoreError>;
}

#[async_trait]
pub trait PostStore: Send + Sync {
    async fn create(&self, user_id: u64, title: &str, content: &str)
        -> Result<Post, StoreError>;
    /// All posts, newest first.
    async fn all(&self) -> Result<Vec<Post>, StoreError>;
    async fn find(&self, id: u64) -> Result<Post, StoreError>;
    /// One author's posts, newest first.
    async fn by_author(&self, user_id: u64) -> Result<Vec<Post>, StoreError>;
    async fn update(&self, id: u64, title: &str, content: &str) -> Result<(), StoreError>;
    async fn delete(&self, id: u64) -> Result<(), StoreError>;
}
