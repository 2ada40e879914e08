use crate::errors::ServiceError;
use async_trait::async_trait;
use serde_json::Value;

/// Untyped access to the backend's JSON collections.
///
/// Every record is a JSON object with a string `id`. Implementations do no
/// filtering, sorting or paging; callers fetch a whole collection and work
/// on it in memory.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    async fn list(&self, collection: &str) -> Result<Vec<Value>, ServiceError>;

    /// `Ok(None)` when no record has this id.
    async fn get(&self, collection: &str, id: &str) -> Result<Option<Value>, ServiceError>;

    async fn create(&self, collection: &str, document: Value) -> Result<Value, ServiceError>;

    /// Shallow-merges `changes` into the stored record. `NotFound` when absent.
    async fn patch(&self, collection: &str, id: &str, changes: Value)
        -> Result<Value, ServiceError>;

    /// Replaces the whole record. `NotFound` when absent.
    async fn replace(&self, collection: &str, id: &str, document: Value)
        -> Result<Value, ServiceError>;

    /// `NotFound` when absent.
    async fn delete(&self, collection: &str, id: &str) -> Result<(), ServiceError>;
}

pub(crate) fn not_found(collection: &str, id: &str) -> ServiceError {
    ServiceError::NotFound(format!("{} record '{}' not found", collection, id))
}
