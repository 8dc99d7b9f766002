//! Persistence ports.
//!
//! Services only see these traits. `PgStore` talks to Postgres through a
//! deadpool pool, `MemoryStore` keeps everything in process and backs the
//! tests and `BLOG_STORE=memory`.

pub mod memory_store;
pub mod pg_store;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;
use uuid::Uuid;

use crate::models::post::{NewPost, Post, PostWithAuthor};
use crate::models::session::SessionRecord;
use crate::models::settings::Settings;
use crate::models::user::{NewUser, User};

pub use memory_store::MemoryStore;
pub use pg_store::PgStore;

/// Column limits shared by both adapters.
pub const MAX_USERNAME_LEN: usize = 80;
pub const MAX_TITLE_LEN: usize = 100;
pub const MAX_HEAD_IMAGE_LEN: usize = 200;
pub const MAX_BLOG_TITLE_LEN: usize = 100;
pub const MAX_COPYRIGHT_LEN: usize = 200;

#[derive(Debug, Error)]
pub enum RepoError {
    #[error("postgres error: {0}")]
    Postgres(#[from] tokio_postgres::Error),
    #[error("pool error: {0}")]
    Pool(#[from] deadpool_postgres::PoolError),
    #[error("constraint violated: {0}")]
    Constraint(String),
    #[error("not found")]
    NotFound,
    #[error("other: {0}")]
    Other(String),
}

#[async_trait]
pub trait UserRepository: Send + Sync {
    async fn find_user_by_username(&self, username: &str) -> Result<Option<User>, RepoError>;

    async fn find_user_by_id(&self, id: i32) -> Result<Option<User>, RepoError>;

    /// Fails with `Constraint` when the username is taken.
    async fn insert_user(&self, new_user: NewUser) -> Result<User, RepoError>;
}

#[async_trait]
pub trait PostRepository: Send + Sync {
    async fn insert_post(&self, new_post: NewPost) -> Result<Post, RepoError>;

    async fn find_post(&self, id: i32) -> Result<Option<Post>, RepoError>;

    /// Overwrites title and content only. `NotFound` if the row is gone.
    async fn update_post(&self, id: i32, title: &str, content: &str) -> Result<Post, RepoError>;

    /// Returns whether a row was removed.
    async fn delete_post(&self, id: i32) -> Result<bool, RepoError>;

    /// Posts newest-first (created_at desc, id desc), optionally capped.
    async fn list_posts(&self, limit: Option<usize>) -> Result<Vec<PostWithAuthor>, RepoError>;
}

#[async_trait]
pub trait SettingsRepository: Send + Sync {
    /// Returns the singleton row, inserting `defaults` first if it is absent.
    async fn get_or_create_settings(&self, defaults: &Settings) -> Result<Settings, RepoError>;

    async fn save_settings(&self, settings: &Settings) -> Result<Settings, RepoError>;
}

#[async_trait]
pub trait SessionRepository: Send + Sync {
    async fn insert_session(&self, id: Uuid, user_id: i32, created_at: DateTime<Utc>) -> Result<(), RepoError>;

    async fn find_session(&self, id: Uuid) -> Result<Option<SessionRecord>, RepoError>;

    async fn delete_session(&self, id: Uuid) -> Result<(), RepoError>;

    /// Removes sessions created before `cutoff`. Returns how many went.
    async fn delete_sessions_before(&self, cutoff: DateTime<Utc>) -> Result<u64, RepoError>;
}

/// Everything the app needs from a single backing store.
pub trait Store: UserRepository + PostRepository + SettingsRepository + SessionRepository {}

impl<T> Store for T where T: UserRepository + PostRepository + SettingsRepository + SessionRepository {}

pub(crate) fn check_len(field: &str, value: &str, max: usize) -> Result<(), RepoError> {
    if value.chars().count() > max {
        return Err(RepoError::Constraint(format!(
            "{} must be at most {} characters",
            field, max
        )));
    }
    Ok(())
}

pub(crate) fn check_settings(settings: &Settings) -> Result<(), RepoError> {
    if let Some(ref title) = settings.blog_title {
        check_len("blog_title", title, MAX_BLOG_TITLE_LEN)?;
    }
    if let Some(ref image) = settings.head_image {
        check_len("head_image", image, MAX_HEAD_IMAGE_LEN)?;
    }
    if let Some(ref text) = settings.copyright_text {
        check_len("copyright_text", text, MAX_COPYRIGHT_LEN)?;
    }
    Ok(())
}
