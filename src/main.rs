use std::sync::Arc;
use std::time::Duration;

use actix_web::middleware::NormalizePath;
use actix_web::web::Data;
use actix_web::{App, HttpServer, Responder, get};
use anyhow::Context;
use dotenvy::dotenv;
use tracing::info;
use tracing_appender::rolling;
use utoipa::OpenApi; // ← needed for ApiDoc::openapi()
use utoipa_swagger_ui::SwaggerUi;

use timecard::config::{Config, StorageKind};
use timecard::db::init_db;
use timecard::docs::ApiDoc;
use timecard::routes;
use timecard::service::{AppService, SystemClock};
use timecard::store::{MemoryStore, MySqlStore, Storage};

#[get("/")]
async fn index() -> impl Responder {
    "Timecard is running"
}

async fn build_storage(config: &Config) -> anyhow::Result<Storage> {
    match config.storage {
        StorageKind::MySql => {
            let url = config
                .database_url
                .as_deref()
                .context("DATABASE_URL must be set")?;
            Ok(Storage::MySql(MySqlStore::new(init_db(url).await?)))
        }
        StorageKind::Memory => Ok(Storage::Memory(MemoryStore::new())),
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

    info!(storage = ?config.storage, "Server starting...");

    let storage = build_storage(&config).await?;
    let service: Data<AppService> = Data::new(AppService::new(
        storage,
        Arc::new(SystemClock),
        Duration::from_secs(config.lock_idle_secs),
    ));

    let server_addr = config.server_addr.clone();
    let config_data = Data::new(config);

    HttpServer::new(move || {
        App::new()
            .wrap(actix_web::middleware::Logger::default())
            .wrap(NormalizePath::trim())
            .service(
                SwaggerUi::new("/swagger-ui/{_:.*}") // ← important: wildcard {_:.*} to match JS/CSS files
                    .url("/api-doc/openapi.json", ApiDoc::openapi()),
            )
            .app_data(service.clone())
            .app_data(config_data.clone())
            .service(index)
            .configure(|cfg| routes::configure(cfg, &config_data))
    })
    .bind(&server_addr)
    .with_context(|| format!("Failed to bind {server_addr}"))?
    .run()
    .await?;

    Ok(())
}
