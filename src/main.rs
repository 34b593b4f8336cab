mod cache;
mod catalog;
mod config;
mod db;
mod entities;
mod error;
mod importer;
mod index_sync;
mod models;
mod routes;
mod scraper;
mod search;
mod tasks;

use std::sync::Arc;

use sea_orm::DatabaseConnection;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use crate::{
    cache::ResponseCache,
    config::Config,
    scraper::Scraper,
    search::{ElasticsearchIndex, MemoryIndex, SearchIndex},
};

pub struct AppState {
    pub db: DatabaseConnection,
    pub cache: ResponseCache,
    pub index: Arc<dyn SearchIndex>,
    pub scraper: Arc<Scraper>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            std::env::var("RUST_LOG")
                .unwrap_or_else(|_| "info,filmapi=debug,sqlx=warn".to_string()),
        )
        .init();

    let config = Config::from_env()?;

    let http = scraper::build_client(config.fetch_timeout)?;

    let db = db::connect_and_migrate(&config.database_url).await?;
    let cache = ResponseCache::new(config.cache_ttl_secs);

    let index: Arc<dyn SearchIndex> = match &config.search_url {
        Some(url) => {
            let credentials = config.search_user.clone().zip(config.search_pass.clone());
            tracing::info!(url = %url, index = %config.search_index, "using elasticsearch");
            Arc::new(ElasticsearchIndex::new(
                wreq::Client::builder().timeout(config.fetch_timeout).build()?,
                url.clone(),
                config.search_index.clone(),
                credentials,
            ))
        },
        None => {
            tracing::warn!("SEARCH_URL not set, search index kept in memory");
            Arc::new(MemoryIndex::new())
        },
    };

    let scraper = Scraper::new(
        http,
        config.scrape_base_url.clone(),
        config.scrape_rps,
        config.max_concurrent_fetches,
    );

    let state = Arc::new(AppState { db, cache, index, scraper: Arc::new(scraper) });

    let app = routes::router(state)
        .layer(CorsLayer::new().allow_origin(Any).allow_headers(Any).allow_methods(Any))
        .layer(TraceLayer::new_for_http());

    let listener = tokio::net::TcpListener::bind(config.addr).await?;
    tracing::info!(addr = %config.addr, "listening");
    axum::serve(listener, app).await?;

    Ok(())
}
