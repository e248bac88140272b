//! In-memory stores.
//!
//! Same contract as the SQL stores, backed by mutex-guarded maps. Used by
//! the test suite and `demos/basic.rs`; not meant for production.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::Utc;

use super::{Post, PostStore, StoreError, User, UserStore};

struct Table<T> {
    next_id: u64,
    rows: HashMap<u64, T>,
}

// Manual impl: a derive would require `T: Default`, which the row types
// neither have nor need.
impl<T> Default for Table<T> {
    fn default() -> Self {
        Self { next_id: 0, rows: HashMap::new() }
    }
}

impl<T> Table<T> {
    fn allocate(&mut self) -> u64 {
        self.next_id += 1;
        self.next_id
    }
}

// ── Users ─────────────────────────────────────────────────────────────────────

#[derive(Default)]
pub struct MemUserStore {
    table: Mutex<Table<User>>,
}

impl MemUserStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl UserStore for MemUserStore {
    async fn create(
        &self,
        name: &str,
        email: &str,
        password_hash: &str,
    ) -> Result<User, StoreError> {
        let mut table = self.table.lock().expect("user table poisoned");
        // uniqueness check under the same lock as the insert, matching the
        // SQL store's unique index on email
        if table.rows.values().any(|u| u.email == email) {
            return Err(StoreError::Conflict);
        }
        let id = table.allocate();
        let user = User {
            id,
            name: name.to_owned(),
            email: email.to_owned(),
            password_hash: password_hash.to_owned(),
        };
        table.rows.insert(id, user.clone());
        Ok(user)
    }

    async fn find_by_id(&self, id: u64) -> Result<User, StoreError> {
        self.table
            .lock()
            .expect("user table poisoned")
            .rows
            .get(&id)
            .cloned()
            .ok_or(StoreError::NotFound)
    }

    async fn find_by_email(&self, email: &str) -> Result<User, StoreError> {
        self.table
            .lock()
            .expect("user table poisoned")
            .rows
            .values()
            .find(|u| u.email == email)
            .cloned()
            .ok_or(StoreError::NotFound)
    }

    async fn email_exists(&self, email: &str) -> Result<bool, StoreError> {
        Ok(self
            .table
            .lock()
            .expect("user table poisoned")
            .rows
            .values()
            .any(|u| u.email == email))
    }
}

// ── Posts ─────────────────────────────────────────────────────────────────────

#[derive(Default)]
pub struct MemPostStore {
    table: Mutex<Table<Post>>,
}

impl MemPostStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Newest first, id as the tie-break for same-instant rows.
    fn sorted(mut posts: Vec<Post>) -> Vec<Post> {
        posts.sort_by(|a, b| (b.created_at, b.id).cmp(&(a.created_at, a.id)));
        posts
    }
}

#[async_trait]
impl PostStore for MemPostStore {
    async fn create(&self, user_id: u64, title: &str, content: &str) -> Result<Post, StoreError> {
        let mut table = self.table.lock().expect("post table poisoned");
        let id = table.allocate();
        let now = Utc::now();
        let post = Post {
            id,
            user_id,
            title: title.to_owned(),
            content: content.to_owned(),
            created_at: now,
            updated_at: now,
        };
        table.rows.insert(id, post.clone());
        Ok(post)
    }

    async fn all(&self) -> Result<Vec<Post>, StoreError> {
        let posts = self
            .table
            .lock()
            .expect("post table poisoned")
            .rows
            .values()
            .cloned()
            .collect();
        Ok(Self::sorted(posts))
    }

    async fn find(&self, id: u64) -> Result<Post, StoreError> {
        self.table
            .lock()
            .expect("post table poisoned")
            .rows
            .get(&id)
            .cloned()
            .ok_or(StoreError::NotFound)
    }

    async fn by_author(&self, user_id: u64) -> Result<Vec<Post>, StoreError> {
        let posts = self
            .table
            .lock()
            .expect("post table poisoned")
            .rows
            .values()
            .filter(|p| p.user_id == user_id)
            .cloned()
            .collect();
        Ok(Self::sorted(posts))
    }

    async fn update(&self, id: u64, title: &str, content: &str) -> Result<(), StoreError> {
        let mut table = self.table.lock().expect("post table poisoned");
        let post = table.rows.get_mut(&id).ok_or(StoreError::NotFound)?;
        post.title = title.to_owned();
        post.content = content.to_owned();
        post.updated_at = Utc::now();
        Ok(())
    }

    async fn delete(&self, id: u64) -> Result<(), StoreError> {
        self.table
            .lock()
            .expect("post table poisoned")
            .rows
            .remove(&id)
            .map(|_| ())
            .ok_or(StoreError::NotFound)
    }
}
