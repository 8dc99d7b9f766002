pub mod bootstrap;
pub mod config;
pub mod dtos;
pub mod errors;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod repositories;
pub mod services;

use std::sync::Arc;

use actix_web::error::{JsonPayloadError, UrlencodedError};
use actix_web::{web, HttpRequest};
use chrono::Duration;

use crate::config::AppConfig;
use crate::errors::BlogError;
use crate::handlers::ai_tools_handlers::ai_tools;
use crate::handlers::auth_handlers::{login, login_page, logout};
use crate::handlers::chat_handlers::{chat, chat_page};
use crate::handlers::post_handlers::{
    create_post, delete_post, edit_post, edit_post_page, index, new_post_page,
};
use crate::handlers::settings_handlers::{settings_page, update_settings};
use crate::handlers::upload_handlers::{serve_upload, upload_file};
use crate::repositories::Store;
use crate::services::clock::Clock;
use crate::services::identity_service::IdentityService;
use crate::services::password::Argon2Hashing;
use crate::services::post_service::PostService;
use crate::services::settings_service::SettingsService;
use crate::services::upload_service::{LocalBlobStore, UploadService};

/// Services shared by every worker. Each one gets its store handle at
/// construction.
#[derive(Clone)]
pub struct AppState {
    pub identity: Arc<IdentityService>,
    pub posts: Arc<PostService>,
    pub settings: Arc<SettingsService>,
    pub uploads: Arc<UploadService>,
}

impl AppState {
    pub fn build<S: Store + 'static>(
        config: &AppConfig,
        store: Arc<S>,
        clock: Arc<dyn Clock>,
    ) -> Result<Self, BlogError> {
        let blobs = LocalBlobStore::new(&config.upload_dir)?;
        let uploads = Arc::new(UploadService::new(
            Arc::new(blobs),
            clock.clone(),
            config.max_upload_bytes,
        ));

        let identity = IdentityService::new(
            store.clone(),
            store.clone(),
            Arc::new(Argon2Hashing::default()),
            clock.clone(),
            &config.secret_key,
            Duration::hours(config.session_ttl_hours),
        )?;

        Ok(Self {
            identity: Arc::new(identity),
            posts: Arc::new(PostService::new(store.clone(), clock)),
            settings: Arc::new(SettingsService::new(store, uploads.clone())),
            uploads,
        })
    }
}

/// Registers body limits and every route. Shared by `main` and the tests.
pub fn configure(cfg: &mut web::ServiceConfig, config: &AppConfig) {
    let max_upload_bytes = config.max_upload_bytes;

    cfg.app_data(
        web::JsonConfig::default()
            .limit(config.body_limit())
            .error_handler(move |err, _req: &HttpRequest| {
                let err = match err {
                    JsonPayloadError::OverflowKnownLength { .. } | JsonPayloadError::Overflow { .. } => {
                        BlogError::TooLarge { limit: max_upload_bytes }
                    }
                    other => BlogError::InvalidUpload(format!("Invalid upload request: {}", other)),
                };
                err.into()
            }),
    )
    .app_data(
        web::FormConfig::default()
            .limit(config.body_limit())
            .error_handler(move |err, _req: &HttpRequest| {
                let err = match err {
                    UrlencodedError::Overflow { .. } => BlogError::TooLarge { limit: max_upload_bytes },
                    other => BlogError::InvalidInput(format!("Invalid form submission: {}", other)),
                };
                err.into()
            }),
    )
    .service(index)
    .service(login_page)
    .service(login)
    .service(logout)
    .service(new_post_page)
    .service(create_post)
    .service(edit_post_page)
    .service(edit_post)
    .service(delete_post)
    .service(settings_page)
    .service(update_settings)
    .service(serve_upload)
    .service(upload_file)
    .service(chat_page)
    .service(chat)
    .service(ai_tools);
}
