use std::env;
use std::sync::Arc;

use actix_cors::Cors;
use actix_web::{middleware::Logger, web, App, HttpServer};
use log::{error, info, warn};

use quill_blog::config::{self, AppConfig, StoreKind};
use quill_blog::repositories::MemoryStore;
use quill_blog::services::clock::SystemClock;
use quill_blog::{bootstrap, configure, AppState};

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    dotenv::dotenv().ok();
    env_logger::init();

    let app_config = match AppConfig::from_env() {
        Ok(c) => c,
        Err(e) => {
            error!("Invalid configuration: {:#}", e);
            std::process::exit(1);
        }
    };
    if app_config.secret_key == "dev" {
        warn!("SECRET_KEY not set, using the development key");
    }
    info!("Upload folder: {}", app_config.upload_dir.display());
    info!("Max upload size: {} bytes", app_config.max_upload_bytes);

    let clock = Arc::new(SystemClock);
    let state = match app_config.store {
        StoreKind::Postgres => {
            let pool = match config::get_pg_pool() {
                Ok(p) => p,
                Err(e) => {
                    error!("Failed to create PG pool: {:#}", e);
                    std::process::exit(1);
                }
            };
            let store = match bootstrap::prepare_postgres(pool).await {
                Ok(s) => s,
                Err(e) => {
                    error!("{:#}", e);
                    std::process::exit(1);
                }
            };
            AppState::build(&app_config, store, clock)
        }
        StoreKind::Memory => {
            warn!("BLOG_STORE=memory: nothing survives a restart");
            AppState::build(&app_config, Arc::new(MemoryStore::new()), clock)
        }
    };
    let state = match state {
        Ok(s) => s,
        Err(e) => {
            error!("Failed to initialise services: {}", e);
            std::process::exit(1);
        }
    };

    if let Err(e) = bootstrap::seed(&state, &app_config).await {
        error!("{:#}", e);
        std::process::exit(1);
    }

    let state = web::Data::new(state);
    let app_config = web::Data::new(app_config);

    let allowed_origins = env::var("ALLOWED_ORIGINS")
        .unwrap_or_else(|_| "http://localhost:3000,http://127.0.0.1:3000".into());

    let port = env::var("PORT").unwrap_or_else(|_| "8080".to_string());
    let bind_address = format!("0.0.0.0:{}", port);

    info!("Starting server on {}", bind_address);

    HttpServer::new(move || {
        let mut cors = Cors::default()
            .allowed_methods(vec!["GET", "POST", "OPTIONS"])
            .allowed_headers(vec!["content-type", "accept", "x-requested-with"])
            .supports_credentials()
            .max_age(3600);

        for origin in allowed_origins.split(',').map(|s| s.trim()).filter(|s| !s.is_empty()) {
            cors = cors.allowed_origin(origin);
        }

        let app_config = app_config.clone();
        App::new()
            .wrap(cors)
            .wrap(Logger::default())
            .app_data(state.clone())
            .configure(move |cfg| configure(cfg, &app_config))
    })
    .bind(&bind_address)?
    .run()
    .await
}
