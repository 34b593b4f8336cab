use std::{collections::HashMap, sync::Arc};

use serde_json::Value;
use tokio::sync::RwLock;

struct CachedResponse {
    body: Value,
    cached_at: i64,
}

/// Time-based cache of GET response bodies keyed by request URI.
#[derive(Clone)]
pub struct ResponseCache {
    entries: Arc<RwLock<HashMap<String, CachedResponse>>>,
    ttl_seconds: i64,
}

impl ResponseCache {
    pub fn new(ttl_seconds: i64) -> Self {
        Self { entries: Arc::new(RwLock::new(HashMap::new())), ttl_seconds }
    }

    pub async fn get(&self, key: &str) -> Option<Value> {
        let entries = self.entries.read().await;
        entries.get(key).filter(|e| self.is_fresh(e.cached_at)).map(|e| e.body.clone())
    }

    pub async fn put(&self, key: String, body: Value) {
        if self.ttl_seconds <= 0 {
            return;
        }
        let mut entries = self.entries.write().await;
        entries.retain(|_, e| self.is_fresh(e.cached_at));
        entries.insert(key, CachedResponse { body, cached_at: now_sec() });
    }

    /// Drops everything; called after any catalog write.
    pub async fn invalidate_all(&self) {
        self.entries.write().await.clear();
    }

    fn is_fresh(&self, cached_at: i64) -> bool {
        now_sec().saturating_sub(cached_at) < self.ttl_seconds
    }
}

fn now_sec() -> i64 {
    jiff::Timestamp::now().as_second()
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[tokio::test]
    async fn returns_fresh_entries() {
        let cache = ResponseCache::new(30);
        cache.put("/api/v1/genres".to_string(), json!([{"id": 1, "name": "Drama"}])).await;
        assert_eq!(cache.get("/api/v1/genres").await, Some(json!([{"id": 1, "name": "Drama"}])));
        assert_eq!(cache.get("/api/v1/actors").await, None);
    }

    #[tokio::test]
    async fn zero_ttl_disables_caching() {
        let cache = ResponseCache::new(0);
        cache.put("/api/v1/films".to_string(), json!([])).await;
        assert_eq!(cache.get("/api/v1/films").await, None);
    }

    #[tokio::test]
    async fn invalidate_clears_everything() {
        let cache = ResponseCache::new(30);
        cache.put("a".to_string(), json!(1)).await;
        cache.put("b".to_string(), json!(2)).await;
        cache.invalidate_all().await;
        assert_eq!(cache.get("a").await, None);
        assert_eq!(cache.get("b").await, None);
    }
}
