use std::sync::Arc;
use std::time::Duration;

use actix_cors::Cors;
use actix_web::HttpServer;
use anyhow::Context;
use tracing::info;

use blog_server::data::Repositories;
use blog_server::infrastructure::cache::InMemoryPageCache;
use blog_server::infrastructure::config::AppConfig;
use blog_server::infrastructure::database::{create_pool, run_migrations};
use blog_server::infrastructure::logging::init_logging;
use blog_server::infrastructure::security::JwtKeys;
use blog_server::presentation::routes::{AppServices, build_app};

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    init_logging();

    let config = AppConfig::from_env().context("invalid configuration")?;
    let pool = create_pool(&config.database_url)
        .await
        .context("failed to connect to database")?;
    run_migrations(&pool)
        .await
        .context("failed to run migrations")?;

    let repos = Repositories::postgres(pool);
    let keys = JwtKeys::new(
        config.jwt_secret.clone(),
        chrono::Duration::hours(config.token_ttl_hours),
    );
    let services = AppServices::new(
        &repos,
        keys,
        Arc::new(InMemoryPageCache::with_limits(config.page_cache_max_entries)),
        Duration::from_secs(config.page_cache_ttl_secs),
    );

    info!(host = %config.host, port = config.port, "starting server");

    let config_data = config.clone();
    HttpServer::new(move || build_app(services.clone()).wrap(build_cors(&config_data)))
        .bind((config.host.as_str(), config.port))?
        .run()
        .await?;

    Ok(())
}

fn build_cors(config: &AppConfig) -> Cors {
    let mut cors = Cors::default()
        .allowed_methods(vec!["GET", "POST"])
        .allowed_headers(vec![
            actix_web::http::header::CONTENT_TYPE,
            actix_web::http::header::AUTHORIZATION,
        ])
        .supports_credentials()
        .max_age(3600);

    for origin in &config.cors_origins {
        cors = cors.allowed_origin(origin);
    }

    cors
}
