use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::post::{Post, PostWithAuthor};
use crate::models::settings::Settings;
use crate::models::user::UserPublic;
use crate::services::markdown::render_markdown;

/// Body of the new/edit post forms.
#[derive(Debug, Deserialize)]
pub struct PostForm {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub content: String,
}

#[derive(Debug, Serialize)]
pub struct PostOut {
    pub id: i32,
    pub title: String,
    pub content: String,
    pub content_html: String,
    pub created_at: DateTime<Utc>,
    pub user_id: i32,
    pub author: Option<String>,
}

impl PostOut {
    pub fn from_post(post: Post, author: Option<String>) -> Self {
        let content_html = render_markdown(&post.content);
        Self {
            id: post.id,
            title: post.title,
            content: post.content,
            content_html,
            created_at: post.created_at,
            user_id: post.user_id,
            author,
        }
    }
}

impl From<PostWithAuthor> for PostOut {
    fn from(listed: PostWithAuthor) -> Self {
        PostOut::from_post(listed.post, Some(listed.author))
    }
}

#[derive(Serialize)]
pub struct IndexPage {
    pub settings: Settings,
    pub posts: Vec<PostOut>,
    pub top_posts: Vec<PostOut>,
    pub current_user: Option<UserPublic>,
    pub notice: Option<String>,
}

#[derive(Serialize)]
pub struct PostFormPage {
    /// `None` on the new-post page.
    pub post: Option<PostOut>,
    pub current_user: UserPublic,
    pub notice: Option<String>,
}
