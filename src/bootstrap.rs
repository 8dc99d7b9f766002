use anyhow::{Context, Result};
use deadpool_postgres::Pool;
use log::info;
use std::sync::Arc;

use crate::config::AppConfig;
use crate::repositories::PgStore;
use crate::AppState;

/// Creates missing tables and hands back the Postgres store.
pub async fn prepare_postgres(pool: Pool) -> Result<Arc<PgStore>> {
    let store = PgStore::new(pool);
    store
        .create_schema()
        .await
        .context("failed to create database schema")?;
    Ok(Arc::new(store))
}

/// Seeds the default account and the settings row if they are missing.
pub async fn seed(state: &AppState, config: &AppConfig) -> Result<()> {
    let created = state
        .identity
        .ensure_account(&config.admin_username, &config.admin_password)
        .await
        .context("failed to seed default account")?;
    if !created {
        info!("default account `{}` already present", config.admin_username);
    }

    state
        .settings
        .get()
        .await
        .context("failed to seed default settings")?;
    Ok(())
}
