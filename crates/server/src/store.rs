//! Abstract, fire-and-forget persistence. The core never awaits this on a
//! hot path — a no-op or in-memory implementation satisfies every code path
//! with no real database behind it.

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::Value;

#[async_trait]
pub trait Store: Send + Sync {
    async fn record(&self, session_id: &str, kind: &str, payload: Value);
}

pub struct NoopStore;

#[async_trait]
impl Store for NoopStore {
    async fn record(&self, _session_id: &str, _kind: &str, _payload: Value) {}
}

/// Keeps everything in process memory. Useful for tests and for running a
/// session with no external store configured at all.
#[derive(Default)]
pub struct InMemoryStore {
    entries: Mutex<Vec<(String, String, Value)>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn entries(&self) -> Vec<(String, String, Value)> {
        self.entries.lock().clone()
    }
}

#[async_trait]
impl Store for InMemoryStore {
    async fn record(&self, session_id: &str, kind: &str, payload: Value) {
        self.entries.lock().push((session_id.to_string(), kind.to_string(), payload));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn in_memory_store_records_entries() {
        let store = InMemoryStore::new();
        store.record("s1", "exchange_resolved", serde_json::json!({"outcome": "satisfied"})).await;
        let entries = store.entries();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].0, "s1");
        assert_eq!(entries[0].1, "exchange_resolved");
    }
}
