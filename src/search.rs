use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tokio::sync::RwLock;
use tracing::debug;

use crate::entities::film;

/// Denormalized film as stored in the search index.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FilmDocument {
    pub title: String,
    pub title_original: String,
    pub release_date: String,
    pub uuid: String,
    pub description: String,
    pub distributed_by: String,
    pub length: i32,
    pub rating: f64,
    pub budget: String,
    pub poster: String,
    pub trailer: String,
}

impl From<&film::Model> for FilmDocument {
    fn from(film: &film::Model) -> Self {
        Self {
            title: film.title.clone(),
            title_original: film.title_original.clone(),
            release_date: film.release_date.clone(),
            uuid: film.uuid.clone(),
            description: film.description.clone(),
            distributed_by: film.distributed_by.clone(),
            length: film.length,
            rating: film.rating,
            budget: film.budget.clone(),
            poster: film.poster.clone(),
            trailer: film.trailer.clone(),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum SearchError {
    #[error("search request failed: {0}")]
    Http(#[from] wreq::Error),
    #[error("search index answered {status}: {body}")]
    Status { status: u16, body: String },
    #[error("search index unavailable: {0}")]
    Unavailable(String),
}

#[async_trait]
pub trait SearchIndex: Send + Sync {
    async fn index_film(&self, doc: &FilmDocument) -> Result<(), SearchError>;

    /// Removes every document whose `uuid` matches exactly; returns how many went.
    async fn delete_by_uuid(&self, uuid: &str) -> Result<u64, SearchError>;

    /// Fuzzy match over title, original title and description.
    async fn search(&self, query: &str) -> Result<Vec<FilmDocument>, SearchError>;

    async fn clear(&self) -> Result<(), SearchError>;
}

/// Unanalyzed sub-field of `uuid`; the text field is split on hyphens.
const UUID_KEYWORD: &str = "uuid.keyword";

pub struct ElasticsearchIndex {
    client: wreq::Client,
    base_url: String,
    index: String,
    credentials: Option<(String, String)>,
}

impl ElasticsearchIndex {
    pub fn new(
        client: wreq::Client,
        base_url: String,
        index: String,
        credentials: Option<(String, String)>,
    ) -> Self {
        Self { client, base_url, index, credentials }
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}/{}", self.base_url.trim_end_matches('/'), self.index, path)
    }

    fn authorize(&self, req: wreq::RequestBuilder) -> wreq::RequestBuilder {
        match &self.credentials {
            Some((user, pass)) => req.basic_auth(user, Some(pass)),
            None => req,
        }
    }

    async fn check(resp: wreq::Response) -> Result<wreq::Response, SearchError> {
        let status = resp.status();
        if status.is_success() {
            return Ok(resp);
        }
        let body = resp.text().await.unwrap_or_default();
        Err(SearchError::Status { status: status.as_u16(), body })
    }
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    hits: SearchHits,
}

#[derive(Debug, Deserialize)]
struct SearchHits {
    hits: Vec<SearchHit>,
}

#[derive(Debug, Deserialize)]
struct SearchHit {
    #[serde(rename = "_source")]
    source: FilmDocument,
}

#[derive(Debug, Deserialize)]
struct DeleteByQueryResponse {
    #[serde(default)]
    deleted: u64,
}

#[async_trait]
impl SearchIndex for ElasticsearchIndex {
    async fn index_film(&self, doc: &FilmDocument) -> Result<(), SearchError> {
        let req = self.client.post(self.url("_doc?refresh=true")).json(doc);
        Self::check(self.authorize(req).send().await?).await?;
        debug!(uuid = %doc.uuid, "indexed film");
        Ok(())
    }

    async fn delete_by_uuid(&self, uuid: &str) -> Result<u64, SearchError> {
        let body = json!({ "query": { "term": { UUID_KEYWORD: uuid } } });
        let req = self.client.post(self.url("_delete_by_query?refresh=true")).json(&body);
        let resp: DeleteByQueryResponse =
            Self::check(self.authorize(req).send().await?).await?.json().await?;
        debug!(uuid = %uuid, deleted = resp.deleted, "deleted film documents");
        Ok(resp.deleted)
    }

    async fn search(&self, query: &str) -> Result<Vec<FilmDocument>, SearchError> {
        let body = json!({
            "query": {
                "multi_match": {
                    "query": query,
                    "fields": ["title", "title_original", "description"],
                    "fuzziness": "AUTO",
                }
            }
        });
        let req = self.client.post(self.url("_search")).json(&body);
        let resp: SearchResponse =
            Self::check(self.authorize(req).send().await?).await?.json().await?;
        Ok(resp.hits.hits.into_iter().map(|h| h.source).collect())
    }

    async fn clear(&self) -> Result<(), SearchError> {
        let url = format!("{}/{}", self.base_url.trim_end_matches('/'), self.index);
        let resp = self.authorize(self.client.delete(url)).send().await?;
        if resp.status().as_u16() == 404 {
            return Ok(());
        }
        Self::check(resp).await?;
        Ok(())
    }
}

/// In-process index used when no search cluster is configured.
#[derive(Default)]
pub struct MemoryIndex {
    docs: RwLock<Vec<FilmDocument>>,
}

impl MemoryIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn documents(&self) -> Vec<FilmDocument> {
        self.docs.read().await.clone()
    }
}

#[async_trait]
impl SearchIndex for MemoryIndex {
    async fn index_film(&self, doc: &FilmDocument) -> Result<(), SearchError> {
        self.docs.write().await.push(doc.clone());
        Ok(())
    }

    async fn delete_by_uuid(&self, uuid: &str) -> Result<u64, SearchError> {
        let mut docs = self.docs.write().await;
        let before = docs.len();
        docs.retain(|d| d.uuid != uuid);
        Ok((before - docs.len()) as u64)
    }

    async fn search(&self, query: &str) -> Result<Vec<FilmDocument>, SearchError> {
        let needle = query.to_lowercase();
        let docs = self.docs.read().await;
        Ok(docs
            .iter()
            .filter(|d| {
                [&d.title, &d.title_original, &d.description]
                    .iter()
                    .any(|field| field.to_lowercase().contains(&needle))
            })
            .cloned()
            .collect())
    }

    async fn clear(&self) -> Result<(), SearchError> {
        self.docs.write().await.clear();
        Ok(())
    }
}

#[cfg(test)]
pub(crate) fn document(uuid: &str, title: &str) -> FilmDocument {
    FilmDocument {
        title: title.to_string(),
        title_original: title.to_string(),
        release_date: "1999-03-31".to_string(),
        uuid: uuid.to_string(),
        description: String::new(),
        distributed_by: "Warner Bros.".to_string(),
        length: 136,
        rating: 8.7,
        budget: "63000000 USD".to_string(),
        poster: String::new(),
        trailer: String::new(),
    }
}
