use std::{net::SocketAddr, time::Duration};

use anyhow::Context;

#[derive(Clone, Debug)]
pub struct Config {
    pub addr: SocketAddr,
    pub database_url: String,
    pub search_url: Option<String>,
    pub search_user: Option<String>,
    pub search_pass: Option<String>,
    pub search_index: String,
    pub cache_ttl_secs: i64,
    pub scrape_base_url: String,
    pub scrape_rps: u32,
    pub max_concurrent_fetches: usize,
    pub fetch_timeout: Duration,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        let host = std::env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string());
        let port: u16 =
            std::env::var("PORT").unwrap_or_else(|_| "5000".to_string()).parse().context("PORT")?;

        let database_url = std::env::var("DATABASE_URL")
            .unwrap_or_else(|_| "sqlite://filmapi.db?mode=rwc".to_string());

        let search_url = non_empty_var("SEARCH_URL");
        let search_user = non_empty_var("SEARCH_USER");
        let search_pass = non_empty_var("SEARCH_PASS");
        let search_index = std::env::var("SEARCH_INDEX").unwrap_or_else(|_| "films".to_string());

        let cache_ttl_secs: i64 =
            std::env::var("CACHE_TTL_SECS").ok().and_then(|s| s.parse().ok()).unwrap_or(30);

        let scrape_base_url = std::env::var("SCRAPE_BASE_URL")
            .unwrap_or_else(|_| "https://www.imdb.com".to_string());

        let scrape_rps: u32 =
            std::env::var("SCRAPE_RPS").ok().and_then(|s| s.parse().ok()).unwrap_or(10);

        let max_concurrent_fetches: usize =
            std::env::var("MAX_CONCURRENT_FETCHES").ok().and_then(|s| s.parse().ok()).unwrap_or(8);

        let fetch_timeout_secs: u64 =
            std::env::var("FETCH_TIMEOUT_SECS").ok().and_then(|s| s.parse().ok()).unwrap_or(30);

        Ok(Self {
            addr: format!("{host}:{port}").parse().context("HOST/PORT")?,
            database_url,
            search_url,
            search_user,
            search_pass,
            search_index,
            cache_ttl_secs,
            scrape_base_url,
            scrape_rps,
            max_concurrent_fetches,
            fetch_timeout: Duration::from_secs(fetch_timeout_secs),
        })
    }
}

fn non_empty_var(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}
