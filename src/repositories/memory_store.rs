use std::collections::{BTreeMap, HashMap};
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use super::{
    check_len, check_settings, PostRepository, RepoError, SessionRepository, SettingsRepository,
    UserRepository, MAX_TITLE_LEN, MAX_USERNAME_LEN,
};
use crate::models::post::{NewPost, Post, PostWithAuthor};
use crate::models::session::SessionRecord;
use crate::models::settings::Settings;
use crate::models::user::{NewUser, User};

#[derive(Default)]
struct Tables {
    users: BTreeMap<i32, User>,
    posts: BTreeMap<i32, Post>,
    settings: Option<Settings>,
    sessions: HashMap<Uuid, SessionRecord>,
    next_user_id: i32,
    next_post_id: i32,
}

/// In-process store. Each call takes the lock once and never holds it across
/// an await point, so every operation is atomic on its own.
#[derive(Default)]
pub struct MemoryStore {
    tables: Mutex<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<MutexGuard<'_, Tables>, RepoError> {
        self.tables
            .lock()
            .map_err(|_| RepoError::Other("memory store lock poisoned".to_string()))
    }
}

#[async_trait]
impl UserRepository for MemoryStore {
    async fn find_user_by_username(&self, username: &str) -> Result<Option<User>, RepoError> {
        let tables = self.lock()?;
        Ok(tables.users.values().find(|u| u.username == username).cloned())
    }

    async fn find_user_by_id(&self, id: i32) -> Result<Option<User>, RepoError> {
        Ok(self.lock()?.users.get(&id).cloned())
    }

    async fn insert_user(&self, new_user: NewUser) -> Result<User, RepoError> {
        check_len("username", &new_user.username, MAX_USERNAME_LEN)?;
        let mut tables = self.lock()?;
        if tables.users.values().any(|u| u.username == new_user.username) {
            return Err(RepoError::Constraint(format!(
                "username `{}` already exists",
                new_user.username
            )));
        }
        tables.next_user_id += 1;
        let user = User {
            id: tables.next_user_id,
            username: new_user.username,
            password_hash: new_user.password_hash,
        };
        tables.users.insert(user.id, user.clone());
        Ok(user)
    }
}

#[async_trait]
impl PostRepository for MemoryStore {
    async fn insert_post(&self, new_post: NewPost) -> Result<Post, RepoError> {
        check_len("title", &new_post.title, MAX_TITLE_LEN)?;
        let mut tables = self.lock()?;
        if !tables.users.contains_key(&new_post.user_id) {
            return Err(RepoError::Constraint(format!(
                "user {} does not exist",
                new_post.user_id
            )));
        }
        tables.next_post_id += 1;
        let post = Post {
            id: tables.next_post_id,
            title: new_post.title,
            content: new_post.content,
            created_at: new_post.created_at,
            user_id: new_post.user_id,
        };
        tables.posts.insert(post.id, post.clone());
        Ok(post)
    }

    async fn find_post(&self, id: i32) -> Result<Option<Post>, RepoError> {
        Ok(self.lock()?.posts.get(&id).cloned())
    }

    async fn update_post(&self, id: i32, title: &str, content: &str) -> Result<Post, RepoError> {
        check_len("title", title, MAX_TITLE_LEN)?;
        let mut tables = self.lock()?;
        let post = tables.posts.get_mut(&id).ok_or(RepoError::NotFound)?;
        post.title = title.to_string();
        post.content = content.to_string();
        Ok(post.clone())
    }

    async fn delete_post(&self, id: i32) -> Result<bool, RepoError> {
        Ok(self.lock()?.posts.remove(&id).is_some())
    }

    async fn list_posts(&self, limit: Option<usize>) -> Result<Vec<PostWithAuthor>, RepoError> {
        let tables = self.lock()?;
        let mut posts: Vec<&Post> = tables.posts.values().collect();
        posts.sort_by(|a, b| Post::newest_first(a, b));

        let listed = posts
            .into_iter()
            .take(limit.unwrap_or(usize::MAX))
            .map(|post| PostWithAuthor {
                post: post.clone(),
                author: tables
                    .users
                    .get(&post.user_id)
                    .map(|u| u.username.clone())
                    .unwrap_or_default(),
            })
            .collect();
        Ok(listed)
    }
}

#[async_trait]
impl SettingsRepository for MemoryStore {
    async fn get_or_create_settings(&self, defaults: &Settings) -> Result<Settings, RepoError> {
        let mut tables = self.lock()?;
        Ok(tables.settings.get_or_insert_with(|| defaults.clone()).clone())
    }

    async fn save_settings(&self, settings: &Settings) -> Result<Settings, RepoError> {
        check_settings(settings)?;
        let mut tables = self.lock()?;
        tables.settings = Some(settings.clone());
        Ok(settings.clone())
    }
}

#[async_trait]
impl SessionRepository for MemoryStore {
    async fn insert_session(&self, id: Uuid, user_id: i32, created_at: DateTime<Utc>) -> Result<(), RepoError> {
        let mut tables = self.lock()?;
        tables.sessions.insert(id, SessionRecord { id, user_id, created_at });
        Ok(())
    }

    async fn find_session(&self, id: Uuid) -> Result<Option<SessionRecord>, RepoError> {
        Ok(self.lock()?.sessions.get(&id).cloned())
    }

    async fn delete_session(&self, id: Uuid) -> Result<(), RepoError> {
        self.lock()?.sessions.remove(&id);
        Ok(())
    }

    async fn delete_sessions_before(&self, cutoff: DateTime<Utc>) -> Result<u64, RepoError> {
        let mut tables = self.lock()?;
        let before = tables.sessions.len();
        tables.sessions.retain(|_, s| s.created_at >= cutoff);
        Ok((before - tables.sessions.len()) as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(1_700_000_000 + secs, 0).unwrap()
    }

    async fn seeded() -> (MemoryStore, User) {
        let store = MemoryStore::new();
        let user = store
            .insert_user(NewUser { username: "admin".into(), password_hash: "x".into() })
            .await
            .unwrap();
        (store, user)
    }

    #[tokio::test]
    async fn duplicate_username_is_rejected() {
        let (store, _) = seeded().await;
        let err = store
            .insert_user(NewUser { username: "admin".into(), password_hash: "y".into() })
            .await
            .unwrap_err();
        assert!(matches!(err, RepoError::Constraint(_)));
    }

    #[tokio::test]
    async fn list_orders_newest_first_and_caps() {
        let (store, user) = seeded().await;
        for (i, secs) in [5, 1, 9, 3].into_iter().enumerate() {
            store
                .insert_post(NewPost {
                    title: format!("p{}", i),
                    content: String::new(),
                    created_at: at(secs),
                    user_id: user.id,
                })
                .await
                .unwrap();
        }

        let all = store.list_posts(None).await.unwrap();
        let titles: Vec<_> = all.iter().map(|p| p.post.title.as_str()).collect();
        assert_eq!(titles, ["p2", "p0", "p3", "p1"]);
        assert!(all.iter().all(|p| p.author == "admin"));

        let top = store.list_posts(Some(2)).await.unwrap();
        assert_eq!(top, all[..2].to_vec());
    }

    #[tokio::test]
    async fn over_long_title_violates_constraint() {
        let (store, user) = seeded().await;
        let err = store
            .insert_post(NewPost {
                title: "t".repeat(MAX_TITLE_LEN + 1),
                content: String::new(),
                created_at: at(0),
                user_id: user.id,
            })
            .await
            .unwrap_err();
        assert!(matches!(err, RepoError::Constraint(_)));
    }

    #[tokio::test]
    async fn settings_created_once() {
        let store = MemoryStore::new();
        let first = store.get_or_create_settings(&Settings::default()).await.unwrap();
        let changed = Settings { blog_title: Some("Other".into()), ..Settings::default() };
        let second = store.get_or_create_settings(&changed).await.unwrap();
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn sessions_can_be_revoked() {
        let (store, user) = seeded().await;
        let sid = Uuid::new_v4();
        store.insert_session(sid, user.id, at(0)).await.unwrap();
        let record = store.find_session(sid).await.unwrap().unwrap();
        assert_eq!(record.user_id, user.id);
        assert_eq!(record.created_at, at(0));
        store.delete_session(sid).await.unwrap();
        assert_eq!(store.find_session(sid).await.unwrap(), None);
    }

    #[tokio::test]
    async fn old_sessions_are_purged() {
        let (store, user) = seeded().await;
        let (old, fresh) = (Uuid::new_v4(), Uuid::new_v4());
        store.insert_session(old, user.id, at(0)).await.unwrap();
        store.insert_session(fresh, user.id, at(100)).await.unwrap();

        assert_eq!(store.delete_sessions_before(at(100)).await.unwrap(), 1);
        assert_eq!(store.find_session(old).await.unwrap(), None);
        assert!(store.find_session(fresh).await.unwrap().is_some());
    }
}
