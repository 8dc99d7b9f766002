use async_trait::async_trait;
use chrono::{DateTime, Utc};
use deadpool_postgres::Pool;
use log::{debug, info};
use tokio_postgres::error::SqlState;
use tokio_postgres::Row;
use uuid::Uuid;

use super::{
    check_len, check_settings, PostRepository, RepoError, SessionRepository, SettingsRepository,
    UserRepository, MAX_TITLE_LEN, MAX_USERNAME_LEN,
};
use crate::models::post::{NewPost, Post, PostWithAuthor};
use crate::models::session::SessionRecord;
use crate::models::settings::{Settings, SETTINGS_ID};
use crate::models::user::{NewUser, User};

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS users (
    id            SERIAL PRIMARY KEY,
    username      VARCHAR(80) NOT NULL UNIQUE,
    password_hash VARCHAR(255) NOT NULL
);

CREATE TABLE IF NOT EXISTS posts (
    id         SERIAL PRIMARY KEY,
    title      VARCHAR(100) NOT NULL,
    content    TEXT NOT NULL,
    created_at TIMESTAMPTZ NOT NULL,
    user_id    INTEGER NOT NULL REFERENCES users(id)
);

CREATE INDEX IF NOT EXISTS posts_created_at_idx ON posts (created_at DESC, id DESC);

CREATE TABLE IF NOT EXISTS settings (
    id               SMALLINT PRIMARY KEY CHECK (id = 1),
    blog_title       VARCHAR(100),
    blog_description TEXT,
    head_image       VARCHAR(200),
    show_head_image  BOOLEAN NOT NULL DEFAULT TRUE,
    footer_html      TEXT,
    copyright_text   VARCHAR(200)
);

CREATE TABLE IF NOT EXISTS sessions (
    id         UUID PRIMARY KEY,
    user_id    INTEGER NOT NULL REFERENCES users(id),
    created_at TIMESTAMPTZ NOT NULL
);

CREATE INDEX IF NOT EXISTS sessions_created_at_idx ON sessions (created_at);
"#;

const POST_COLUMNS: &str = "p.id, p.title, p.content, p.created_at, p.user_id";
const SETTINGS_COLUMNS: &str =
    "blog_title, blog_description, head_image, show_head_image, footer_html, copyright_text";

/// Postgres adapter over a deadpool connection pool.
#[derive(Clone)]
pub struct PgStore {
    pool: Pool,
}

impl PgStore {
    pub fn new(pool: Pool) -> Self {
        Self { pool }
    }

    /// Creates any missing table. Safe to run on every start.
    pub async fn create_schema(&self) -> Result<(), RepoError> {
        let client = self.pool.get().await?;
        client.batch_execute(SCHEMA).await?;
        info!("database schema ready");
        Ok(())
    }
}

fn user_from_row(row: &Row) -> User {
    User {
        id: row.get("id"),
        username: row.get("username"),
        password_hash: row.get("password_hash"),
    }
}

fn post_from_row(row: &Row) -> Post {
    Post {
        id: row.get("id"),
        title: row.get("title"),
        content: row.get("content"),
        created_at: row.get("created_at"),
        user_id: row.get("user_id"),
    }
}

fn settings_from_row(row: &Row) -> Settings {
    Settings {
        blog_title: row.get("blog_title"),
        blog_description: row.get("blog_description"),
        head_image: row.get("head_image"),
        show_head_image: row.get("show_head_image"),
        footer_html: row.get("footer_html"),
        copyright_text: row.get("copyright_text"),
    }
}

/// Unique, length and foreign-key violations become `Constraint` so callers
/// can report them as bad input rather than a storage failure.
fn classify(err: tokio_postgres::Error) -> RepoError {
    let constraint = matches!(
        err.code(),
        Some(c) if *c == SqlState::UNIQUE_VIOLATION
            || *c == SqlState::STRING_DATA_RIGHT_TRUNCATION
            || *c == SqlState::FOREIGN_KEY_VIOLATION
    );
    if constraint {
        RepoError::Constraint(err.to_string())
    } else {
        RepoError::Postgres(err)
    }
}

#[async_trait]
impl UserRepository for PgStore {
    async fn find_user_by_username(&self, username: &str) -> Result<Option<User>, RepoError> {
        let client = self.pool.get().await?;
        let row = client
            .query_opt(
                "SELECT id, username, password_hash FROM users WHERE username = $1",
                &[&username],
            )
            .await?;
        Ok(row.as_ref().map(user_from_row))
    }

    async fn find_user_by_id(&self, id: i32) -> Result<Option<User>, RepoError> {
        let client = self.pool.get().await?;
        let row = client
            .query_opt("SELECT id, username, password_hash FROM users WHERE id = $1", &[&id])
            .await?;
        Ok(row.as_ref().map(user_from_row))
    }

    async fn insert_user(&self, new_user: NewUser) -> Result<User, RepoError> {
        check_len("username", &new_user.username, MAX_USERNAME_LEN)?;
        let client = self.pool.get().await?;
        let row = client
            .query_one(
                "INSERT INTO users (username, password_hash) VALUES ($1, $2) \
                 RETURNING id, username, password_hash",
                &[&new_user.username, &new_user.password_hash],
            )
            .await
            .map_err(classify)?;
        Ok(user_from_row(&row))
    }
}

#[async_trait]
impl PostRepository for PgStore {
    async fn insert_post(&self, new_post: NewPost) -> Result<Post, RepoError> {
        check_len("title", &new_post.title, MAX_TITLE_LEN)?;
        let client = self.pool.get().await?;
        let row = client
            .query_one(
                "INSERT INTO posts (title, content, created_at, user_id) VALUES ($1, $2, $3, $4) \
                 RETURNING id, title, content, created_at, user_id",
                &[&new_post.title, &new_post.content, &new_post.created_at, &new_post.user_id],
            )
            .await
            .map_err(classify)?;
        Ok(post_from_row(&row))
    }

    async fn find_post(&self, id: i32) -> Result<Option<Post>, RepoError> {
        let client = self.pool.get().await?;
        let sql = format!("SELECT {} FROM posts p WHERE p.id = $1", POST_COLUMNS);
        let row = client.query_opt(sql.as_str(), &[&id]).await?;
        Ok(row.as_ref().map(post_from_row))
    }

    async fn update_post(&self, id: i32, title: &str, content: &str) -> Result<Post, RepoError> {
        check_len("title", title, MAX_TITLE_LEN)?;
        let client = self.pool.get().await?;
        let row = client
            .query_opt(
                "UPDATE posts SET title = $2, content = $3 WHERE id = $1 \
                 RETURNING id, title, content, created_at, user_id",
                &[&id, &title, &content],
            )
            .await
            .map_err(classify)?;
        row.as_ref().map(post_from_row).ok_or(RepoError::NotFound)
    }

    async fn delete_post(&self, id: i32) -> Result<bool, RepoError> {
        let client = self.pool.get().await?;
        let removed = client.execute("DELETE FROM posts WHERE id = $1", &[&id]).await?;
        Ok(removed > 0)
    }

    async fn list_posts(&self, limit: Option<usize>) -> Result<Vec<PostWithAuthor>, RepoError> {
        let client = self.pool.get().await?;
        // LIMIT NULL means no limit in Postgres.
        let limit = limit.map(|n| i64::try_from(n).unwrap_or(i64::MAX));
        let sql = format!(
            "SELECT {}, u.username AS author FROM posts p JOIN users u ON u.id = p.user_id \
             ORDER BY p.created_at DESC, p.id DESC LIMIT $1",
            POST_COLUMNS
        );
        debug!("listing posts, limit {:?}", limit);
        let rows = client.query(sql.as_str(), &[&limit]).await?;
        Ok(rows
            .iter()
            .map(|row| PostWithAuthor {
                post: post_from_row(row),
                author: row.get("author"),
            })
            .collect())
    }
}

#[async_trait]
impl SettingsRepository for PgStore {
    async fn get_or_create_settings(&self, defaults: &Settings) -> Result<Settings, RepoError> {
        let client = self.pool.get().await?;
        client
            .execute(
                "INSERT INTO settings (id, blog_title, blog_description, head_image, show_head_image, \
                 footer_html, copyright_text) VALUES ($1, $2, $3, $4, $5, $6, $7) \
                 ON CONFLICT (id) DO NOTHING",
                &[
                    &SETTINGS_ID,
                    &defaults.blog_title,
                    &defaults.blog_description,
                    &defaults.head_image,
                    &defaults.show_head_image,
                    &defaults.footer_html,
                    &defaults.copyright_text,
                ],
            )
            .await
            .map_err(classify)?;

        let sql = format!("SELECT {} FROM settings WHERE id = $1", SETTINGS_COLUMNS);
        let row = client.query_one(sql.as_str(), &[&SETTINGS_ID]).await?;
        Ok(settings_from_row(&row))
    }

    async fn save_settings(&self, settings: &Settings) -> Result<Settings, RepoError> {
        check_settings(settings)?;
        let client = self.pool.get().await?;
        let sql = format!(
            "INSERT INTO settings (id, {cols}) VALUES ($1, $2, $3, $4, $5, $6, $7) \
             ON CONFLICT (id) DO UPDATE SET blog_title = EXCLUDED.blog_title, \
             blog_description = EXCLUDED.blog_description, head_image = EXCLUDED.head_image, \
             show_head_image = EXCLUDED.show_head_image, footer_html = EXCLUDED.footer_html, \
             copyright_text = EXCLUDED.copyright_text RETURNING {cols}",
            cols = SETTINGS_COLUMNS
        );
        let row = client
            .query_one(
                sql.as_str(),
                &[
                    &SETTINGS_ID,
                    &settings.blog_title,
                    &settings.blog_description,
                    &settings.head_image,
                    &settings.show_head_image,
                    &settings.footer_html,
                    &settings.copyright_text,
                ],
            )
            .await
            .map_err(classify)?;
        Ok(settings_from_row(&row))
    }
}

#[async_trait]
impl SessionRepository for PgStore {
    async fn insert_session(&self, id: Uuid, user_id: i32, created_at: DateTime<Utc>) -> Result<(), RepoError> {
        let client = self.pool.get().await?;
        client
            .execute(
                "INSERT INTO sessions (id, user_id, created_at) VALUES ($1, $2, $3)",
                &[&id, &user_id, &created_at],
            )
            .await
            .map_err(classify)?;
        Ok(())
    }

    async fn find_session(&self, id: Uuid) -> Result<Option<SessionRecord>, RepoError> {
        let client = self.pool.get().await?;
        let row = client
            .query_opt("SELECT id, user_id, created_at FROM sessions WHERE id = $1", &[&id])
            .await?;
        Ok(row.map(|r| SessionRecord {
            id: r.get("id"),
            user_id: r.get("user_id"),
            created_at: r.get("created_at"),
        }))
    }

    async fn delete_session(&self, id: Uuid) -> Result<(), RepoError> {
        let client = self.pool.get().await?;
        client.execute("DELETE FROM sessions WHERE id = $1", &[&id]).await?;
        Ok(())
    }

    async fn delete_sessions_before(&self, cutoff: DateTime<Utc>) -> Result<u64, RepoError> {
        let client = self.pool.get().await?;
        let removed = client
            .execute("DELETE FROM sessions WHERE created_at < $1", &[&cutoff])
            .await?;
        Ok(removed)
    }
}

// Needs a live database: `PG_HOST=... cargo test -- --ignored`.
#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    async fn store() -> Option<PgStore> {
        if std::env::var("PG_HOST").is_err() {
            eprintln!("PG_HOST not set, skipping");
            return None;
        }
        let store = PgStore::new(crate::config::get_pg_pool().unwrap());
        store.create_schema().await.unwrap();
        Some(store)
    }

    async fn fresh_user(store: &PgStore) -> User {
        store
            .insert_user(NewUser {
                username: format!("pg-test-{}", Uuid::new_v4().simple()),
                password_hash: "x".into(),
            })
            .await
            .unwrap()
    }

    #[tokio::test]
    #[ignore]
    async fn list_is_newest_first_and_limit_caps() {
        let Some(store) = store().await else { return };
        let user = fresh_user(&store).await;
        // Far-future stamps keep these rows at the head of the listing.
        let base = Utc.with_ymd_and_hms(2999, 1, 1, 0, 0, 0).unwrap();
        let mut ids = Vec::new();
        for i in 0..3 {
            let post = store
                .insert_post(NewPost {
                    title: format!("post {}", i),
                    content: String::new(),
                    created_at: base + Duration::seconds(i),
                    user_id: user.id,
                })
                .await
                .unwrap();
            ids.push(post.id);
        }

        let top = store.list_posts(Some(2)).await.unwrap();
        assert_eq!(top.len(), 2);
        assert_eq!(top[0].post.id, ids[2]);
        assert_eq!(top[1].post.id, ids[1]);
        assert_eq!(top[0].author, user.username);

        let all = store.list_posts(None).await.unwrap();
        assert!(all.len() >= 3);
        assert_eq!(all[2].post.id, ids[0]);

        for id in ids {
            assert!(store.delete_post(id).await.unwrap());
        }
    }

    #[tokio::test]
    #[ignore]
    async fn long_title_and_duplicate_username_are_constraints() {
        let Some(store) = store().await else { return };
        let user = fresh_user(&store).await;

        let dup = store
            .insert_user(NewUser { username: user.username.clone(), password_hash: "y".into() })
            .await
            .unwrap_err();
        assert!(matches!(dup, RepoError::Constraint(_)));

        let long = store
            .insert_post(NewPost {
                title: "t".repeat(MAX_TITLE_LEN + 1),
                content: String::new(),
                created_at: Utc::now(),
                user_id: user.id,
            })
            .await
            .unwrap_err();
        assert!(matches!(long, RepoError::Constraint(_)));
    }

    #[tokio::test]
    #[ignore]
    async fn settings_upsert_overwrites_singleton() {
        let Some(store) = store().await else { return };
        let original = store.get_or_create_settings(&Settings::default()).await.unwrap();

        let changed = Settings {
            blog_title: Some(format!("pg-test {}", Uuid::new_v4().simple())),
            footer_html: None,
            ..original.clone()
        };
        let saved = store.save_settings(&changed).await.unwrap();
        assert_eq!(saved, changed);
        assert_eq!(store.get_or_create_settings(&Settings::default()).await.unwrap(), changed);

        store.save_settings(&original).await.unwrap();
    }

    #[tokio::test]
    #[ignore]
    async fn sessions_round_trip_and_expire() {
        let Some(store) = store().await else { return };
        let user = fresh_user(&store).await;
        let created = Utc.with_ymd_and_hms(2000, 1, 1, 0, 0, 0).unwrap();
        let sid = Uuid::new_v4();

        store.insert_session(sid, user.id, created).await.unwrap();
        let record = store.find_session(sid).await.unwrap().unwrap();
        assert_eq!(record.user_id, user.id);
        assert_eq!(record.created_at, created);

        assert!(store.delete_sessions_before(created + Duration::seconds(1)).await.unwrap() >= 1);
        assert!(store.find_session(sid).await.unwrap().is_none());
    }
}
