use std::sync::Arc;

use actix_web::middleware::NormalizePath;
use actix_web::web::Data;
use actix_web::{App, HttpServer, Responder, get};
use anyhow::Context;
use dotenvy::dotenv;

mod api;
mod attendance;
mod auth;
mod config;
mod db;
mod docs;
mod error;
mod model;
mod routes;
mod service;
mod storage;
mod utils;

use crate::attendance::clock::SystemClock;
use crate::docs::ApiDoc;
use crate::service::AttendanceService;
use crate::storage::Store;
use crate::storage::csv_store::CsvStore;
use crate::storage::seed::seed_defaults;
use crate::storage::sql_store::SqlStore;
use config::{Config, StorageMode};
use db::init_db;
use tracing::info;
use tracing_appender::rolling;
use utoipa::OpenApi; // needed for ApiDoc::openapi()
use utoipa_swagger_ui::SwaggerUi;

#[get("/")]
async fn index() -> impl Responder {
    "Attendance service"
}

async fn open_store(config: &Config) -> anyhow::Result<Arc<dyn Store>> {
    let store: Arc<dyn Store> = match config.storage_mode {
        StorageMode::Csv => {
            info!(dir = %config.data_dir.display(), "Using flat-file storage");
            Arc::new(CsvStore::open(&config.data_dir).context("opening data directory")?)
        }
        StorageMode::Sql => {
            info!(url = %config.database_url, "Using SQLite storage");
            let pool = init_db(&config.database_url)
                .await
                .context("connecting to database")?;
            Arc::new(SqlStore::new(pool))
        }
    };
    Ok(store)
}

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();

    // Rolling daily log
    let file_appender = rolling::daily("logs", "app.log");
    let (non_blocking, _guard) = tracing_appender::non_blocking(file_appender);

    tracing_subscriber::fmt()
        .with_writer(non_blocking)
        .with_max_level(tracing::Level::DEBUG)
        .with_ansi(false)
        .with_target(false) // removes module path
        .with_level(true)
        .with_thread_ids(false)
        .with_thread_names(false)
        .pretty()
        .init();

    let config = Config::from_env();
    info!("Server starting...");

    let store = open_store(&config).await?;
    seed_defaults(store.as_ref(), &config.engine)
        .await
        .context("seeding defaults")?;

    // the phone filter must be warm before signups are accepted
    let clock = Arc::new(SystemClock::new(config.engine.tz_offset));
    let service = Data::new(AttendanceService::open(store, clock, config.engine.clone()).await?);

    let server_addr = config.server_addr.clone();
    let config_data = config.clone();

    HttpServer::new(move || {
        App::new()
            .wrap(actix_web::middleware::Logger::default())
            .wrap(NormalizePath::trim())
            .service(
                SwaggerUi::new("/swagger-ui/{_:.*}") // wildcard {_:.*} to match JS/CSS files
                    .url("/api-doc/openapi.json", ApiDoc::openapi()),
            )
            .app_data(service.clone())
            .app_data(Data::new(config.clone()))
            .service(index)
            // Configure auth + protected routes with rate limiting
            .configure(|cfg| routes::configure(cfg, config_data.clone()))
    })
    .bind(&server_addr)
    .with_context(|| format!("binding {server_addr}"))?
    .run()
    .await?;

    Ok(())
}
