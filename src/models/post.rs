use chrono::{DateTime, Utc};
use serde::Serialize;

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct Post {
    pub id: i32,
    pub title: String,
    pub content: String,
    pub created_at: DateTime<Utc>,
    pub user_id: i32,
}

#[derive(Debug, Clone)]
pub struct NewPost {
    pub title: String,
    pub content: String,
    pub created_at: DateTime<Utc>,
    pub user_id: i32,
}

/// A post joined with its author's username, as listed on the index.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct PostWithAuthor {
    #[serde(flatten)]
    pub post: Post,
    pub author: String,
}

impl Post {
    /// Newest first; equal timestamps fall back to the higher id.
    pub fn newest_first(a: &Post, b: &Post) -> std::cmp::Ordering {
        b.created_at
            .cmp(&a.created_at)
            .then_with(|| b.id.cmp(&a.id))
    }
}
