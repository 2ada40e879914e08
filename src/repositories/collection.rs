use super::document_store::DocumentStore;
use crate::errors::ServiceError;
use crate::models::{ids::next_sequential_id, Document};
use serde_json::Value;
use std::marker::PhantomData;
use std::sync::Arc;
use tracing::warn;

/// Typed handle on one backend collection.
pub struct Collection<T: Document> {
    store: Arc<dyn DocumentStore>,
    _marker: PhantomData<fn() -> T>,
}

impl<T: Document> Clone for Collection<T> {
    fn clone(&self) -> Self {
        Self {
            store: self.store.clone(),
            _marker: PhantomData,
        }
    }
}

impl<T: Document> std::fmt::Debug for Collection<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Collection").field("name", &T::COLLECTION).finish()
    }
}

impl<T: Document> Collection<T> {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self {
            store,
            _marker: PhantomData,
        }
    }

    pub fn name(&self) -> &'static str {
        T::COLLECTION
    }

    /// Every record in backend order. A row that does not decode fails the
    /// whole call; a half-read list would hide records from the views.
    pub async fn list(&self) -> Result<Vec<T>, ServiceError> {
        let rows = self.store.list(T::COLLECTION).await?;
        rows.into_iter().map(decode).collect()
    }

    pub async fn get(&self, id: &str) -> Result<Option<T>, ServiceError> {
        match self.store.get(T::COLLECTION, id).await? {
            Some(row) => decode(row).map(Some),
            None => Ok(None),
        }
    }

    /// Like `get`, but a missing record is `NotFound`.
    pub async fn fetch(&self, id: &str) -> Result<T, ServiceError> {
        self.get(id).await?.ok_or_else(|| {
            ServiceError::NotFound(format!("{} record '{}' not found", T::COLLECTION, id))
        })
    }

    pub async fn create(&self, record: &T) -> Result<T, ServiceError> {
        let row = self
            .store
            .create(T::COLLECTION, serde_json::to_value(record)?)
            .await?;
        decode(row)
    }

    /// Applies a partial update given as a JSON object of camelCase fields.
    pub async fn patch(&self, id: &str, changes: Value) -> Result<T, ServiceError> {
        let row = self.store.patch(T::COLLECTION, id, changes).await?;
        decode(row)
    }

    pub async fn replace(&self, record: &T) -> Result<T, ServiceError> {
        let row = self
            .store
            .replace(T::COLLECTION, record.id(), serde_json::to_value(record)?)
            .await?;
        decode(row)
    }

    /// Replaces the record when it exists, inserts it otherwise.
    pub async fn upsert(&self, record: &T) -> Result<T, ServiceError> {
        if self.get(record.id()).await?.is_some() {
            self.replace(record).await
        } else {
            self.create(record).await
        }
    }

    pub async fn delete(&self, id: &str) -> Result<(), ServiceError> {
        self.store.delete(T::COLLECTION, id).await
    }

    /// Next free `PREFIX###` id in this collection.
    pub async fn next_id(&self, prefix: &str) -> Result<String, ServiceError> {
        let rows = self.store.list(T::COLLECTION).await?;
        let ids: Vec<String> = rows
            .iter()
            .filter_map(|row| row.get("id").and_then(Value::as_str))
            .map(str::to_string)
            .collect();
        Ok(next_sequential_id(prefix, ids.iter().map(String::as_str)))
    }
}

fn decode<T: Document>(row: Value) -> Result<T, ServiceError> {
    serde_json::from_value(row).map_err(|e| {
        warn!(collection = T::COLLECTION, error = %e, "failed to decode backend record");
        ServiceError::SerializationError(format!("{} record: {}", T::COLLECTION, e))
    })
}
