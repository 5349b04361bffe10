use std::sync::Arc;

use actix_web::middleware::NormalizePath;
use actix_web::web::Data;
use actix_web::{App, HttpServer};
use anyhow::Context;
use dotenvy::dotenv;

mod api;
mod auth;
mod config;
mod db;
mod docs;
mod error;
mod model;
mod models;
mod routes;
mod service;
mod state;
mod store;
mod utils;

use crate::auth::jwt::JwtIdentity;
use crate::config::{Config, StorageBackend};
use crate::db::init_db;
use crate::docs::ApiDoc;
use crate::routes::RateLimits;
use crate::service::attendance::AttendancePolicy;
use crate::state::AppState;
use crate::store::{MemoryStore, MySqlStore, Store};
use crate::utils::username_cache::UsernameCache;
use tracing::{info, warn};
use tracing_appender::rolling;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

async fn build_store(config: &Config) -> anyhow::Result<Arc<dyn Store>> {
    match config.storage_backend {
        StorageBackend::Mysql => {
            let url = config
                .database_url
                .as_deref()
                .context("DATABASE_URL must be set")?;
            let pool = init_db(url).await?;
            Ok(Arc::new(MySqlStore::new(pool)))
        }
        StorageBackend::Memory => {
            warn!("Using in-memory storage, data is lost on restart");
            Ok(Arc::new(MemoryStore::new()))
        }
    }
}

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();

    let config = Config::from_env()?;

    // Rolling daily log
    let file_appender = rolling::daily(&config.log_dir, "app.log");
    let (non_blocking, _guard) = tracing_appender::non_blocking(file_appender);

    tracing_subscriber::fmt()
        .with_writer(non_blocking)
        .with_max_level(config.log_level)
        .with_ansi(false)
        .with_target(false) // removes module path
        .with_level(true)
        .with_thread_ids(false)
        .with_thread_names(false)
        .pretty()
        .init();

    info!(backend = %config.storage_backend, addr = %config.server_addr, "Server starting...");

    let store = build_store(&config).await?;
    let usernames = UsernameCache::default();
    let policy = AttendancePolicy::new(config.workday_start, config.late_grace_minutes);
    let state = Data::new(AppState::new(store.clone(), usernames.clone(), policy));
    let identity = Data::new(JwtIdentity::new(
        config.jwt_secret.clone(),
        config.access_token_ttl,
        config.refresh_token_ttl,
    ));
    let limits = RateLimits::from_config(&config);
    let api_prefix = config.api_prefix.clone();

    let warmup_days = config.username_cache_warmup_days;
    actix_web::rt::spawn(async move {
        // Warm up recently active users in batches of 250
        if let Err(e) = usernames.warmup(store, warmup_days, 250).await {
            warn!(error = %e, "Failed to warm up username cache");
        }
    });

    HttpServer::new(move || {
        App::new()
            .wrap(actix_web::middleware::Logger::default())
            .wrap(NormalizePath::trim())
            .service(
                SwaggerUi::new("/swagger-ui/{_:.*}") // wildcard {_:.*} to match JS/CSS files
                    .url("/api-doc/openapi.json", ApiDoc::openapi()),
            )
            .app_data(state.clone())
            .app_data(identity.clone())
            .configure(|cfg| routes::configure(cfg, &api_prefix, &limits))
    })
    .bind(&config.server_addr)
    .with_context(|| format!("Failed to bind {}", config.server_addr))?
    .run()
    .await
    .context("HTTP server failed")
}
