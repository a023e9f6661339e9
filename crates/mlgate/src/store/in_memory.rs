use async_trait::async_trait;
use mlgate_core::ProjectId;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

use super::{ProjectStore, StoreEntry, StoreResult, Updater};

type ProjectEntries = HashMap<String, StoreEntry>;

/// In-memory implementation of ProjectStore
#[derive(Clone)]
pub struct InMemoryProjectStore {
    projects: Arc<RwLock<HashMap<ProjectId, ProjectEntries>>>,
}

impl InMemoryProjectStore {
    /// Create a new in-memory project store
    pub fn new() -> Self {
        Self {
            projects: Arc::new(RwLock::new(HashMap::new())),
        }
    }
}

impl Default for InMemoryProjectStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ProjectStore for InMemoryProjectStore {
    async fn get(&self, project: &ProjectId, key: &str) -> StoreResult<Option<Value>> {
        Ok(self.entry(project, key).await?.map(|entry| entry.value))
    }

    async fn entry(&self, project: &ProjectId, key: &str) -> StoreResult<Option<StoreEntry>> {
        let projects = self.projects.read().await;
        Ok(projects
            .get(project)
            .and_then(|entries| entries.get(key))
            .cloned())
    }

    async fn set(&self, project: &ProjectId, key: &str, value: Value) -> StoreResult<()> {
        let mut projects = self.projects.write().await;
        projects
            .entry(project.clone())
            .or_default()
            .insert(key.to_string(), StoreEntry::new(value));
        Ok(())
    }

    async fn update(&self, project: &ProjectId, key: &str, f: Updater) -> StoreResult<Value> {
        let mut projects = self.projects.write().await;
        let entries = projects.entry(project.clone()).or_default();

        let current = entries.remove(key).map(|entry| entry.value);
        let next = f(current);
        entries.insert(key.to_string(), StoreEntry::new(next.clone()));
        Ok(next)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::StoreError;
    use serde_json::json;

    fn project(id: &str) -> ProjectId {
        ProjectId::from_string(id)
    }

    #[tokio::test]
    async fn test_set_and_get() {
        let store = InMemoryProjectStore::new();

        store
            .set(&project("1"), "model_version", json!("v1"))
            .await
            .unwrap();

        let value = store.get(&project("1"), "model_version").await.unwrap();
        assert_eq!(value, Some(json!("v1")));
        assert!(store.get(&project("1"), "missing").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_projects_are_isolated() {
        let store = InMemoryProjectStore::new();

        store.set(&project("1"), "k", json!(1)).await.unwrap();
        store.set(&project("2"), "k", json!(2)).await.unwrap();

        assert_eq!(store.get(&project("1"), "k").await.unwrap(), Some(json!(1)));
        assert_eq!(store.get(&project("2"), "k").await.unwrap(), Some(json!(2)));
        assert!(store.get(&project("3"), "k").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_get_as_decodes_or_reports_shape_mismatch() {
        let store: Arc<dyn ProjectStore> = Arc::new(InMemoryProjectStore::new());
        store.set(&project("1"), "rounds", json!(3)).await.unwrap();
        store.set(&project("1"), "name", json!("x")).await.unwrap();

        let rounds = store.get_as::<u64>(&project("1"), "rounds").await.unwrap();
        assert_eq!(rounds, Some(3));
        let missing = store.get_as::<u64>(&project("1"), "missing").await.unwrap();
        assert_eq!(missing, None);

        let err = store.get_as::<u64>(&project("1"), "name").await.unwrap_err();
        assert!(matches!(err, StoreError::Serialization(_)));
    }

    #[tokio::test]
    async fn test_entry_records_write_time() {
        let store = InMemoryProjectStore::new();
        let before = chrono::Utc::now();

        store.set(&project("1"), "k", json!("x")).await.unwrap();

        let entry = store.entry(&project("1"), "k").await.unwrap().unwrap();
        assert_eq!(entry.value, json!("x"));
        assert!(entry.updated_at >= before);
    }

    #[tokio::test]
    async fn test_update_starts_from_none() {
        let store = InMemoryProjectStore::new();

        let next = store
            .update(
                &project("1"),
                "rounds",
                Box::new(|current| json!(current.and_then(|v| v.as_u64()).unwrap_or(0) + 1)),
            )
            .await
            .unwrap();

        assert_eq!(next, json!(1));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_updates_are_not_lost() {
        let store = InMemoryProjectStore::new();

        let mut joins = Vec::new();
        for _ in 0..50 {
            let store = store.clone();
            joins.push(tokio::spawn(async move {
                store
                    .update(
                        &project("1"),
                        "counter",
                        Box::new(|current| {
                            json!(current.and_then(|v| v.as_u64()).unwrap_or(0) + 1)
                        }),
                    )
                    .await
                    .unwrap();
            }));
        }
        for join in joins {
            join.await.unwrap();
        }

        let value = store.get(&project("1"), "counter").await.unwrap();
        assert_eq!(value, Some(json!(50)));
    }
}
