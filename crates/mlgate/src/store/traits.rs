use async_trait::async_trait;
use mlgate_core::ProjectId;
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use serde_json::Value;

use super::StoreResult;

/// Read-modify-write step applied atomically by [`ProjectStore::update`]
pub type Updater = Box<dyn FnOnce(Option<Value>) -> Value + Send>;

/// Per-project key/value state kept by model handlers
///
/// Handlers are constructed per request, so anything they learn between
/// requests (current model version, accumulated annotations, extra params)
/// lives here, scoped by project.
#[async_trait]
pub trait ProjectStore: Send + Sync {
    /// Get a value
    async fn get(&self, project: &ProjectId, key: &str) -> StoreResult<Option<Value>>;

    /// Get a value with its bookkeeping
    async fn entry(&self, project: &ProjectId, key: &str) -> StoreResult<Option<StoreEntry>>;

    /// Set a value, replacing any previous one
    async fn set(&self, project: &ProjectId, key: &str, value: Value) -> StoreResult<()>;

    /// Atomically replace a value with `f(current)` and return the new value
    async fn update(&self, project: &ProjectId, key: &str, f: Updater) -> StoreResult<Value>;
}

impl dyn ProjectStore {
    /// Get a value decoded into `T`
    ///
    /// A stored value of the wrong shape is a [`StoreError::Serialization`].
    ///
    /// [`StoreError::Serialization`]: super::StoreError::Serialization
    pub async fn get_as<T: DeserializeOwned>(
        &self,
        project: &ProjectId,
        key: &str,
    ) -> StoreResult<Option<T>> {
        match self.get(project, key).await? {
            Some(value) => Ok(Some(serde_json::from_value(value)?)),
            None => Ok(None),
        }
    }
}

/// Stored value plus when it was last written
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoreEntry {
    pub value: Value,
    pub updated_at: chrono::DateTime<chrono::Utc>,
}

impl StoreEntry {
    pub fn new(value: Value) -> Self {
        Self {
            value,
            updated_at: chrono::Utc::now(),
        }
    }
}
