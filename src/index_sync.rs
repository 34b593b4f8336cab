use std::{future::Future, time::Duration};

use tracing::{debug, warn};

use crate::{
    entities::film,
    search::{FilmDocument, SearchError, SearchIndex},
};

pub const INDEX_RETRY_ATTEMPTS: u32 = 3;
const RETRY_BACKOFF: Duration = Duration::from_millis(100);

#[derive(Debug)]
pub struct SyncFailure {
    pub uuid: String,
    pub error: String,
}

/// Outcome of mirroring committed rows into the search index. The relational
/// commit has already happened when this is produced.
#[derive(Debug, Default)]
pub struct SyncReport {
    pub indexed: usize,
    pub deleted: u64,
    pub failures: Vec<SyncFailure>,
}

impl SyncReport {
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }

    fn fail(&mut self, uuid: &str, err: SearchError) {
        warn!(uuid = %uuid, error = %err, "search index out of sync with catalog");
        self.failures.push(SyncFailure { uuid: uuid.to_string(), error: err.to_string() });
    }
}

pub async fn sync_created(index: &dyn SearchIndex, films: &[film::Model]) -> SyncReport {
    let mut report = SyncReport::default();
    for film in films {
        let doc = FilmDocument::from(film);
        match with_retry(&film.uuid, || index.index_film(&doc)).await {
            Ok(()) => report.indexed += 1,
            Err(err) => report.fail(&film.uuid, err),
        }
    }
    debug!(indexed = report.indexed, failed = report.failures.len(), "synced created films");
    report
}

pub async fn sync_deleted(index: &dyn SearchIndex, uuid: &str) -> SyncReport {
    let mut report = SyncReport::default();
    match with_retry(uuid, || index.delete_by_uuid(uuid)).await {
        Ok(deleted) => report.deleted = deleted,
        Err(err) => report.fail(uuid, err),
    }
    report
}

/// Replaces the indexed copy of an updated film.
pub async fn sync_updated(index: &dyn SearchIndex, film: &film::Model) -> SyncReport {
    let mut report = sync_deleted(index, &film.uuid).await;
    let created = sync_created(index, std::slice::from_ref(film)).await;
    report.indexed = created.indexed;
    report.failures.extend(created.failures);
    report
}

async fn with_retry<T, F, Fut>(uuid: &str, mut op: F) -> Result<T, SearchError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, SearchError>>,
{
    let mut attempt = 1;
    loop {
        match op().await {
            Ok(value) => return Ok(value),
            Err(err) if attempt < INDEX_RETRY_ATTEMPTS => {
                debug!(uuid = %uuid, attempt = attempt, error = %err, "retrying index write");
                tokio::time::sleep(RETRY_BACKOFF * attempt).await;
                attempt += 1;
            },
            Err(err) => return Err(err),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicU32, Ordering};

    use async_trait::async_trait;

    use super::*;
    use crate::search::MemoryIndex;

    fn film(id: i32, uuid: &str) -> film::Model {
        film::Model {
            id,
            uuid: uuid.to_string(),
            title: format!("Film {id}"),
            title_original: format!("Film {id}"),
            release_date: "2010-07-16".to_string(),
            description: String::new(),
            distributed_by: "Warner Bros.".to_string(),
            length: 148,
            rating: 8.8,
            budget: String::new(),
            poster: String::new(),
            trailer: String::new(),
        }
    }

    /// Fails the first `failures` calls, then behaves like a memory index.
    struct FlakyIndex {
        inner: MemoryIndex,
        failures: u32,
        calls: AtomicU32,
    }

    impl FlakyIndex {
        fn new(failures: u32) -> Self {
            Self { inner: MemoryIndex::new(), failures, calls: AtomicU32::new(0) }
        }

        fn trip(&self) -> Result<(), SearchError> {
            if self.calls.fetch_add(1, Ordering::SeqCst) < self.failures {
                return Err(SearchError::Unavailable("connection refused".to_string()));
            }
            Ok(())
        }
    }

    #[async_trait]
    impl SearchIndex for FlakyIndex {
        async fn index_film(&self, doc: &FilmDocument) -> Result<(), SearchError> {
            self.trip()?;
            self.inner.index_film(doc).await
        }

        async fn delete_by_uuid(&self, uuid: &str) -> Result<u64, SearchError> {
            self.trip()?;
            self.inner.delete_by_uuid(uuid).await
        }

        async fn search(&self, query: &str) -> Result<Vec<FilmDocument>, SearchError> {
            self.inner.search(query).await
        }

        async fn clear(&self) -> Result<(), SearchError> {
            self.inner.clear().await
        }
    }

    #[tokio::test]
    async fn created_films_are_indexed() {
        let index = MemoryIndex::new();
        let report = sync_created(&index, &[film(1, "u1"), film(2, "u2")]).await;
        assert!(report.is_clean());
        assert_eq!(report.indexed, 2);
        assert_eq!(index.documents().await.len(), 2);
    }

    #[tokio::test]
    async fn transient_failures_are_retried() {
        let index = FlakyIndex::new(INDEX_RETRY_ATTEMPTS - 1);
        let report = sync_created(&index, &[film(1, "u1")]).await;
        assert!(report.is_clean());
        assert_eq!(index.inner.documents().await.len(), 1);
    }

    #[tokio::test]
    async fn persistent_failures_are_reported() {
        let index = FlakyIndex::new(u32::MAX);
        let report = sync_deleted(&index, "u1").await;
        assert!(!report.is_clean());
        assert_eq!(report.failures[0].uuid, "u1");
        assert_eq!(index.calls.load(Ordering::SeqCst), INDEX_RETRY_ATTEMPTS);
    }

    #[tokio::test]
    async fn update_replaces_document() {
        let index = MemoryIndex::new();
        let mut model = film(1, "u1");
        sync_created(&index, std::slice::from_ref(&model)).await;
        model.title = "Inception".to_string();
        let report = sync_updated(&index, &model).await;
        assert_eq!(report.deleted, 1);
        let docs = index.documents().await;
        assert_eq!(docs.len(), 1);
        assert_eq!(docs[0].title, "Inception");
    }
}
