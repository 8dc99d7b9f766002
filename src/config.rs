use std::env;
use std::path::PathBuf;
use anyhow::{bail, Context, Result};
use deadpool_postgres::{Config, Pool, Runtime, PoolConfig};
use tokio_postgres::NoTls;

/// 16 MiB, the default cap for a single uploaded file.
pub const DEFAULT_MAX_UPLOAD_BYTES: usize = 16 * 1024 * 1024;

/// Which persistence adapter backs the repositories.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreKind {
    Postgres,
    Memory,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub secret_key: String,
    pub max_upload_bytes: usize,
    pub upload_dir: PathBuf,
    pub session_ttl_hours: i64,
    pub admin_username: String,
    pub admin_password: String,
    pub store: StoreKind,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            secret_key: "dev".to_string(),
            max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
            upload_dir: PathBuf::from("uploads"),
            session_ttl_hours: 24,
            admin_username: "admin".to_string(),
            admin_password: "admin".to_string(),
            store: StoreKind::Postgres,
        }
    }
}

impl AppConfig {
    pub fn from_env() -> Result<Self> {
        let defaults = Self::default();

        let max_upload_bytes = match env::var("MAX_CONTENT_LENGTH") {
            Ok(v) => v
                .trim()
                .parse::<usize>()
                .with_context(|| format!("MAX_CONTENT_LENGTH is not a byte count: {}", v))?,
            Err(_) => defaults.max_upload_bytes,
        };

        let session_ttl_hours = match env::var("SESSION_TTL_HOURS") {
            Ok(v) => v
                .trim()
                .parse::<i64>()
                .with_context(|| format!("SESSION_TTL_HOURS is not a number: {}", v))?,
            Err(_) => defaults.session_ttl_hours,
        };
        if session_ttl_hours <= 0 {
            bail!("SESSION_TTL_HOURS must be positive");
        }

        let store = match env::var("BLOG_STORE").as_deref().map(str::trim) {
            Ok("memory") => StoreKind::Memory,
            Ok("postgres") | Err(_) => StoreKind::Postgres,
            Ok(other) => bail!("BLOG_STORE must be `postgres` or `memory`, got `{}`", other),
        };

        Ok(Self {
            secret_key: env::var("SECRET_KEY").unwrap_or(defaults.secret_key),
            max_upload_bytes,
            upload_dir: env::var("UPLOAD_FOLDER")
                .map(PathBuf::from)
                .unwrap_or(defaults.upload_dir),
            session_ttl_hours,
            admin_username: env::var("ADMIN_USERNAME").unwrap_or(defaults.admin_username),
            admin_password: env::var("ADMIN_PASSWORD").unwrap_or(defaults.admin_password),
            store,
        })
    }

    /// Request body cap for upload-carrying payloads. Base64 inflates by 4/3,
    /// so leave room above the decoded limit and let the gateway reject
    /// oversized blobs with a proper `TooLarge`.
    pub fn body_limit(&self) -> usize {
        self.max_upload_bytes.saturating_mul(2).saturating_add(64 * 1024)
    }
}

pub fn get_pg_pool() -> Result<Pool> {
    let mut cfg = Config::new();
    cfg.host = Some(env::var("PG_HOST").context("PG_HOST not set")?);
    cfg.user = Some(env::var("PG_USER").context("PG_USER not set")?);
    cfg.password = env::var("PG_PASS").ok();
    cfg.dbname = Some(env::var("PG_DB").context("PG_DB not set")?);

    if cfg.pool.is_none() {
        cfg.pool = Some(PoolConfig::default());
    }
    if let Some(ref mut pcfg) = cfg.pool {
        pcfg.max_size = 16;
    }

    cfg.create_pool(Some(Runtime::Tokio1), NoTls)
       .context("failed to create postgres pool")
}
