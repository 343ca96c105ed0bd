use actix_web::middleware::{Logger, NormalizePath};
use actix_web::web::Data;
use actix_web::{App, HttpServer};
use anyhow::Context;
use dotenvy::dotenv;

mod api;
mod auth;
mod config;
mod db;
mod docs;
mod leave;
mod model;
mod models;
mod routes;
mod utils;

use config::Config;
use db::init_db;

use crate::docs::ApiDoc;
use crate::utils::{email_cache, email_filter};
use tracing::{error, info};
use tracing_appender::rolling;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

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
        .with_target(false)
        .with_level(true)
        .with_thread_ids(false)
        .with_thread_names(false)
        .pretty()
        .init();

    let config = Config::from_env()?;
    info!(addr = %config.server_addr, prefix = %config.api_prefix, "Server starting...");

    let pool = init_db(&config.database_url).await?;

    if let Some(admin) = &config.seed_admin {
        auth::seed::ensure_admin(&pool, admin)
            .await
            .context("failed to seed admin user")?;
    }

    let pool_for_filter_warmup = pool.clone();
    let pool_for_cache_warmup = pool.clone();

    actix_web::rt::spawn(async move {
        if let Err(e) = email_filter::warmup_email_filter(&pool_for_filter_warmup, 100).await {
            error!(error = ?e, "Failed to warmup email filter");
        }
    });

    actix_web::rt::spawn(async move {
        // Users seen in the last 30 days, in batches of 250
        if let Err(e) = email_cache::warmup_email_cache(&pool_for_cache_warmup, 30, 250).await {
            error!(error = ?e, "Failed to warmup email cache");
        }
    });

    let server_addr = config.server_addr.clone();

    HttpServer::new(move || {
        App::new()
            .wrap(Logger::default())
            .wrap(NormalizePath::trim())
            .service(
                // wildcard {_:.*} matches the bundled JS/CSS files
                SwaggerUi::new("/swagger-ui/{_:.*}")
                    .url("/api-doc/openapi.json", ApiDoc::openapi()),
            )
            .app_data(Data::new(pool.clone()))
            .app_data(Data::new(config.clone()))
            .configure(|cfg| routes::configure(cfg, config.clone()))
    })
    .bind(&server_addr)
    .with_context(|| format!("failed to bind {server_addr}"))?
    .run()
    .await?;

    Ok(())
}
