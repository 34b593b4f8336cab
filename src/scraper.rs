use std::{num::NonZeroU32, sync::Arc, time::Duration};

use futures::{StreamExt, TryStreamExt, stream};
use governor::{
    Quota, RateLimiter,
    clock::DefaultClock,
    state::{InMemoryState, NotKeyed},
};
use scraper::{Html, Selector};
use serde_json::Value;
use tracing::debug;
use wreq::header::{HeaderMap, HeaderName, HeaderValue};

use crate::models::{FilmRecord, ReleaseDate};

/// Upper bound on pages parsed at the same time.
pub const PARSE_WORKERS: usize = 10;

const CHART_PATH: &str = "/chart/top/";

static MISSING: Value = Value::Null;

/// Sent with every request so the site serves the regular desktop markup.
const BROWSER_HEADERS: &[(&str, &str)] = &[
    (
        "accept",
        "text/html,application/xhtml+xml,application/xml;q=0.9,image/webp,image/apng,*/*;q=0.8,application/signed-exchange;v=b3;q=0.7",
    ),
    ("accept-language", "ru,en;q=0.9,en-GB;q=0.8,en-US;q=0.7,uk;q=0.6,de;q=0.5"),
    ("cache-control", "max-age=0"),
    ("sec-ch-ua", "\"Chromium\";v=\"116\", \"Not)A;Brand\";v=\"24\", \"Microsoft Edge\";v=\"116\""),
    ("sec-ch-ua-mobile", "?0"),
    ("sec-ch-ua-platform", "\"Linux\""),
    ("sec-fetch-dest", "document"),
    ("sec-fetch-mode", "navigate"),
    ("sec-fetch-site", "same-origin"),
    ("sec-fetch-user", "?1"),
    ("upgrade-insecure-requests", "1"),
    (
        "user-agent",
        "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/116.0.0.0 Safari/537.36 Edg/116.0.1938.43",
    ),
];

#[derive(Debug, thiserror::Error)]
pub enum ScrapeError {
    #[error("request failed: {0}")]
    Http(#[from] wreq::Error),
    #[error("page has no __NEXT_DATA__ block")]
    MissingStructuredData,
    #[error("malformed structured data: {0}")]
    Json(#[from] serde_json::Error),
    #[error("parse worker failed: {0}")]
    Worker(#[from] tokio::task::JoinError),
}

pub fn browser_headers() -> HeaderMap {
    let mut headers = HeaderMap::new();
    for &(name, value) in BROWSER_HEADERS {
        headers.insert(HeaderName::from_static(name), HeaderValue::from_static(value));
    }
    headers
}

pub fn build_client(timeout: Duration) -> Result<wreq::Client, wreq::Error> {
    wreq::Client::builder().default_headers(browser_headers()).timeout(timeout).build()
}

pub struct Scraper {
    client: wreq::Client,
    base_url: String,
    max_concurrent: usize,
    limiter: Arc<RateLimiter<NotKeyed, InMemoryState, DefaultClock>>,
}

impl Scraper {
    pub fn new(client: wreq::Client, base_url: String, rps: u32, max_concurrent: usize) -> Self {
        let rps = NonZeroU32::new(rps).unwrap_or(NonZeroU32::MIN);
        let limiter = Arc::new(RateLimiter::direct(Quota::per_second(rps)));
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            max_concurrent: max_concurrent.max(1),
            limiter,
        }
    }

    /// Scrapes one explicit film page, or every film on the chart when `link`
    /// is `None`. Any failed fetch or parse fails the whole run.
    pub async fn scrape(&self, link: Option<String>) -> Result<Vec<FilmRecord>, ScrapeError> {
        let links = match link {
            Some(link) => vec![link],
            None => self.discover_links().await?,
        };
        debug!(links = links.len(), "fetching film pages");

        let pages = self.fetch_pages(&links).await?;
        let films = parse_pages(pages).await?;

        debug!(films = films.len(), "scrape finished");
        Ok(films)
    }

    pub async fn discover_links(&self) -> Result<Vec<String>, ScrapeError> {
        let url = format!("{}{}", self.base_url, CHART_PATH);
        debug!(url = %url, "fetching chart");
        let html = self.fetch(&url).await?;
        let links = parse_chart_links(&html, &self.base_url);
        debug!(links = links.len(), "parsed chart");
        Ok(links)
    }

    /// Bodies come back in the order of `links`.
    pub async fn fetch_pages(&self, links: &[String]) -> Result<Vec<String>, ScrapeError> {
        stream::iter(links)
            .map(|link| self.fetch(link))
            .buffered(self.max_concurrent)
            .try_collect()
            .await
    }

    async fn fetch(&self, url: &str) -> Result<String, ScrapeError> {
        self.limiter.until_ready().await;
        debug!(url = %url, "fetching page");
        let html = self.client.get(url).send().await?.error_for_status()?.text().await?;
        Ok(html)
    }
}

pub fn parse_chart_links(html: &str, base_url: &str) -> Vec<String> {
    let doc = Html::parse_document(html);
    let item_selector = Selector::parse("li.ipc-metadata-list-summary-item").unwrap();
    let link_selector = Selector::parse("a[href]").unwrap();

    doc.select(&item_selector)
        .filter_map(|item| item.select(&link_selector).next())
        .filter_map(|a| a.value().attr("href"))
        .map(|href| resolve_link(base_url, href))
        .collect()
}

fn resolve_link(base_url: &str, href: &str) -> String {
    if href.starts_with("http://") || href.starts_with("https://") {
        href.to_string()
    } else {
        format!("{}/{}", base_url.trim_end_matches('/'), href.trim_start_matches('/'))
    }
}

/// Parses on the blocking pool, at most [`PARSE_WORKERS`] pages at once,
/// keeping input order.
pub async fn parse_pages(pages: Vec<String>) -> Result<Vec<FilmRecord>, ScrapeError> {
    stream::iter(pages)
        .map(|html| tokio::task::spawn_blocking(move || parse_film_page(&html)))
        .buffered(PARSE_WORKERS)
        .map(|joined| match joined {
            Ok(parsed) => parsed,
            Err(err) => Err(ScrapeError::from(err)),
        })
        .try_collect()
        .await
}

pub fn parse_film_page(html: &str) -> Result<FilmRecord, ScrapeError> {
    let doc = Html::parse_document(html);
    let selector = Selector::parse("script#__NEXT_DATA__").unwrap();
    let script = doc.select(&selector).next().ok_or(ScrapeError::MissingStructuredData)?;

    let data: Value = serde_json::from_str(&script.text().collect::<String>())?;
    let fold = data.pointer("/props/pageProps/aboveTheFoldData").unwrap_or(&MISSING);
    let main = data.pointer("/props/pageProps/mainColumnData").unwrap_or(&MISSING);

    let defaults = ReleaseDate::default();
    let release_date = ReleaseDate {
        year: component(fold, "/releaseDate/year", defaults.year),
        month: component(fold, "/releaseDate/month", defaults.month),
        day: component(fold, "/releaseDate/day", defaults.day),
    };

    let budget = match main.pointer("/productionBudget/budget/amount").and_then(scalar) {
        Some(amount) => {
            let currency = text(main, "/productionBudget/budget/currency");
            format!("{amount} {currency}").trim_end().to_string()
        },
        None => String::new(),
    };

    let film = FilmRecord {
        title: text(main, "/titleText/text"),
        title_original: text(main, "/originalTitleText/text"),
        release_date,
        length: (fold.pointer("/runtime/seconds").and_then(Value::as_i64).unwrap_or(0) / 60) as i32,
        rating: fold.pointer("/ratingsSummary/aggregateRating").and_then(Value::as_f64).unwrap_or(0.0),
        description: text(fold, "/plot/plotText/plainText"),
        distributed_by: text(main, "/production/edges/0/node/company/companyText/text"),
        budget,
        poster: text(fold, "/primaryImage/url"),
        trailer: text(fold, "/primaryVideos/edges/0/node/playbackURLs/0/url"),
        genres: texts(fold, "/genres/genres", "/text"),
        actors: texts(main, "/cast/edges", "/node/name/nameText/text"),
    };

    debug!(title = %film.title, title_original = %film.title_original, "parsed film page");
    Ok(film)
}

fn text(value: &Value, pointer: &str) -> String {
    value.pointer(pointer).and_then(Value::as_str).unwrap_or_default().to_string()
}

fn texts(value: &Value, list: &str, item: &str) -> Vec<String> {
    value
        .pointer(list)
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .filter_map(|entry| entry.pointer(item).and_then(Value::as_str))
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default()
}

fn positive(value: &Value, pointer: &str) -> Option<i64> {
    value.pointer(pointer).and_then(Value::as_i64).filter(|n| *n > 0)
}

/// A date part that does not fit its type counts as missing.
fn component<T: TryFrom<i64>>(value: &Value, pointer: &str, default: T) -> T {
    positive(value, pointer).and_then(|n| T::try_from(n).ok()).unwrap_or(default)
}

fn scalar(value: &Value) -> Option<String> {
    match value {
        Value::Number(n) => Some(n.to_string()),
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        _ => None,
    }
}
