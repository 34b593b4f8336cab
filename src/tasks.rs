use std::sync::Arc;

use tracing::{error, info, warn};

use crate::{AppState, importer};

/// Fire-and-forget population run. With `link` only that page is scraped,
/// otherwise the whole chart.
pub fn spawn_populate(state: Arc<AppState>, link: Option<String>) {
    tokio::spawn(async move {
        match run_populate(&state, link).await {
            Ok(message) => info!(result = %message, "population task finished"),
            Err(err) => error!(error = ?err, "population task failed"),
        }
    });
}

pub async fn run_populate(state: &AppState, link: Option<String>) -> anyhow::Result<String> {
    let single = link.is_some();
    let records = state.scraper.scrape(link).await?;

    let (outcome, report) = importer::import_films(&state.db, state.index.as_ref(), records).await?;
    state.cache.invalidate_all().await;

    if !report.is_clean() {
        warn!(failed = report.failures.len(), "some films were not indexed");
    }

    let message = match (single, outcome.films.first()) {
        (true, Some(film)) => format!("{} added to database", film.title),
        _ => format!("{} films added to database", outcome.created),
    };
    Ok(message)
}
