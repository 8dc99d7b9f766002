use std::sync::Arc;

use log::info;

use crate::errors::BlogError;
use crate::models::post::{NewPost, Post, PostWithAuthor};
use crate::models::user::User;
use crate::repositories::{PostRepository, RepoError};
use crate::services::clock::Clock;

/// Size of the "recent posts" projection shown beside the index.
pub const TOP_POSTS: usize = 10;

/// Create/edit/delete of posts. Only a post's author may change it.
pub struct PostService {
    posts: Arc<dyn PostRepository>,
    clock: Arc<dyn Clock>,
}

impl PostService {
    pub fn new(posts: Arc<dyn PostRepository>, clock: Arc<dyn Clock>) -> Self {
        Self { posts, clock }
    }

    pub async fn create(&self, author: &User, title: &str, content: &str) -> Result<Post, BlogError> {
        let post = self
            .posts
            .insert_post(NewPost {
                title: title.to_string(),
                content: content.to_string(),
                created_at: self.clock.now(),
                user_id: author.id,
            })
            .await?;
        info!("user {} created post {}", author.id, post.id);
        Ok(post)
    }

    /// Loads a post for mutation by `user`: `NotFound` if absent, `Forbidden`
    /// if someone else wrote it.
    pub async fn get_owned(&self, user: &User, post_id: i32) -> Result<Post, BlogError> {
        let post = self
            .posts
            .find_post(post_id)
            .await?
            .ok_or(BlogError::NotFound("Post"))?;
        if post.user_id != user.id {
            info!("user {} denied access to post {}", user.id, post_id);
            return Err(BlogError::Forbidden);
        }
        Ok(post)
    }

    pub async fn edit(&self, user: &User, post_id: i32, title: &str, content: &str) -> Result<Post, BlogError> {
        self.get_owned(user, post_id).await?;
        let post = self
            .posts
            .update_post(post_id, title, content)
            .await
            .map_err(|e| match e {
                RepoError::NotFound => BlogError::NotFound("Post"),
                other => other.into(),
            })?;
        info!("user {} edited post {}", user.id, post_id);
        Ok(post)
    }

    pub async fn delete(&self, user: &User, post_id: i32) -> Result<(), BlogError> {
        self.get_owned(user, post_id).await?;
        if !self.posts.delete_post(post_id).await? {
            return Err(BlogError::NotFound("Post"));
        }
        info!("user {} deleted post {}", user.id, post_id);
        Ok(())
    }

    /// All posts, newest first.
    pub async fn list(&self) -> Result<Vec<PostWithAuthor>, BlogError> {
        Ok(self.posts.list_posts(None).await?)
    }

    /// The first `TOP_POSTS` entries of [`list`](Self::list).
    pub async fn top(&self) -> Result<Vec<PostWithAuthor>, BlogError> {
        Ok(self.posts.list_posts(Some(TOP_POSTS)).await?)
    }
}
