use std::str::FromStr;

use serde::Deserialize;

use crate::infrastructure::cache::DEFAULT_MAX_ENTRIES;

#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    pub database_url: String,
    pub jwt_secret: String,
    #[serde(default)]
    pub cors_origins: Vec<String>,
    pub page_cache_ttl_secs: u64,
    pub page_cache_max_entries: usize,
    pub token_ttl_hours: i64,
}

fn parse_or<T>(name: &str, default: T) -> anyhow::Result<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match std::env::var(name) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map_err(|e| anyhow::anyhow!("invalid {}: {}", name, e)),
        Err(_) => Ok(default),
    }
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        let host = std::env::var("HOST").unwrap_or_else(|_| "127.0.0.1".into());
        let port = parse_or("PORT", 8080)?;
        let database_url = std::env::var("DATABASE_URL")
            .map_err(|_| anyhow::anyhow!("DATABASE_URL must be set"))?;
        let jwt_secret =
            std::env::var("JWT_SECRET").map_err(|_| anyhow::anyhow!("JWT_SECRET must be set"))?;
        let cors_origins = parse_origins(&std::env::var("CORS_ORIGINS").unwrap_or_default());
        let page_cache_ttl_secs = parse_or("PAGE_CACHE_TTL_SECS", 1200)?;
        let page_cache_max_entries = parse_or("PAGE_CACHE_MAX_ENTRIES", DEFAULT_MAX_ENTRIES)?;
        let token_ttl_hours = parse_or("TOKEN_TTL_HOURS", 24)?;

        Ok(Self {
            host,
            port,
            database_url,
            jwt_secret,
            cors_origins,
            page_cache_ttl_secs,
            page_cache_max_entries,
            token_ttl_hours,
        })
    }
}

fn parse_origins(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}
