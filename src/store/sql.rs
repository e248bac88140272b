//! MySQL-backed stores.
//!
//! Runtime-checked `query_as` (no compile-time database requirement), `?`
//! placeholders, and a fixed-size pool. Schema lives in
//! `migrations/schema.sql`.

use async_trait::async_trait;
use sqlx::MySqlPool;
use sqlx::mysql::MySqlPoolOptions;
use tracing::info;

use super::{Post, StoreError, User, UserStore, PostStore};

/// Pool ceiling — excess load waits here once every connection is busy.
const MAX_CONNECTIONS: u32 = 25;
/// Connections kept warm between bursts.
const MIN_CONNECTIONS: u32 = 10;

/// Opens the pool and verifies the database answers before the server
/// starts taking traffic.
pub async fn connect(url: &str) -> Result<MySqlPool, sqlx::Error> {
    let pool = MySqlPoolOptions::new()
        .max_connections(MAX_CONNECTIONS)
        .min_connections(MIN_CONNECTIONS)
        .connect(url)
        .await?;
    info!(max = MAX_CONNECTIONS, idle = MIN_CONNECTIONS, "database pool ready");
    Ok(pool)
}

// ── Users ─────────────────────────────────────────────────────────────────────

pub struct SqlUserStore {
    pool: MySqlPool,
}

impl SqlUserStore {
    pub fn new(pool: MySqlPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl UserStore for SqlUserStore {
    async fn create(
        &self,
        name: &str,
        email: &str,
        password_hash: &str,
    ) -> Result<User, StoreError> {
        let result = sqlx::query("INSERT INTO users (name, email, password_hash) VALUES (?, ?, ?)")
            .bind(name)
            .bind(email)
            .bind(password_hash)
            .execute(&self.pool)
            .await?;
        Ok(User {
            id: result.last_insert_id(),
            name: name.to_owned(),
            email: email.to_owned(),
            password_hash: password_hash.to_owned(),
        })
    }

    async fn find_by_id(&self, id: u64) -> Result<User, StoreError> {
        let user = sqlx::query_as::<_, User>(
            "SELECT id, name, email, password_hash FROM users WHERE id = ?",
        )
        .bind(id)
        .fetch_one(&self.pool)
        .await?;
        Ok(user)
    }

    async fn find_by_email(&self, email: &str) -> Result<User, StoreError> {
        let user = sqlx::query_as::<_, User>(
            "SELECT id, name, email, password_hash FROM users WHERE email = ?",
        )
        .bind(email)
        .fetch_one(&self.pool)
        .await?;
        Ok(user)
    }

    async fn email_exists(&self, email: &str) -> Result<bool, StoreError> {
        let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM users WHERE email = ?")
            .bind(email)
            .fetch_one(&self.pool)
            .await?;
        Ok(count > 0)
    }
}

// ── Posts ─────────────────────────────────────────────────────────────────────

const POST_COLUMNS: &str = "id, user_id, title, content, created_at, updated_at";

pub struct SqlPostStore {
    pool: MySqlPool,
}

impl SqlPostStore {
    pub fn new(pool: MySqlPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl PostStore for SqlPostStore {
    async fn create(&self, user_id: u64, title: &str, content: &str) -> Result<Post, StoreError> {
        let result = sqlx::query("INSERT INTO posts (user_id, title, content) VALUES (?, ?, ?)")
            .bind(user_id)
            .bind(title)
            .bind(content)
            .execute(&self.pool)
            .await?;
        // re-read for the database-assigned timestamps
        self.find(result.last_insert_id()).await
    }

    async fn all(&self) -> Result<Vec<Post>, StoreError> {
        let posts = sqlx::query_as::<_, Post>(&format!(
            "SELECT {POST_COLUMNS} FROM posts ORDER BY created_at DESC"
        ))
        .fetch_all(&self.pool)
        .await?;
        Ok(posts)
    }

    async fn find(&self, id: u64) -> Result<Post, StoreError> {
        let post = sqlx::query_as::<_, Post>(&format!(
            "SELECT {POST_COLUMNS} FROM posts WHERE id = ?"
        ))
        .bind(id)
        .fetch_one(&self.pool)
        .await?;
        Ok(post)
    }

    async fn by_author(&self, user_id: u64) -> Result<Vec<Post>, StoreError> {
        let posts = sqlx::query_as::<_, Post>(&format!(
            "SELECT {POST_COLUMNS} FROM posts WHERE user_id = ? ORDER BY created_at DESC"
        ))
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(posts)
    }

    async fn update(&self, id: u64, title: &str, content: &str) -> Result<(), StoreError> {
        let result = sqlx::query("UPDATE posts SET title = ?, content = ? WHERE id = ?")
            .bind(title)
            .bind(content)
            .bind(id)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound);
        }
        Ok(())
    }

    async fn delete(&self, id: u64) -> Result<(), StoreError> {
        let result = sqlx::query("DELETE FROM posts WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound);
        }
        Ok(())
    }
}
