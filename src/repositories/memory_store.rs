use super::document_store::{not_found, DocumentStore};
use crate::errors::ServiceError;
use async_trait::async_trait;
use dashmap::DashMap;
use serde_json::Value;

/// Process-local store used for tests and `--offline` runs.
/// Each collection keeps insertion order, like the HTTP backend does.
#[derive(Debug, Default)]
pub struct InMemoryDocumentStore {
    collections: DashMap<String, Vec<Value>>,
}

fn id_of(document: &Value) -> Option<&str> {
    document.get("id").and_then(Value::as_str)
}

impl InMemoryDocumentStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seeds a collection, replacing whatever it held.
    pub fn seed(&self, collection: &str, documents: Vec<Value>) {
        self.collections.insert(collection.to_string(), documents);
    }

    pub fn len(&self, collection: &str) -> usize {
        self.collections.get(collection).map_or(0, |rows| rows.len())
    }

    pub fn is_empty(&self, collection: &str) -> bool {
        self.len(collection) == 0
    }
}

#[async_trait]
impl DocumentStore for InMemoryDocumentStore {
    async fn list(&self, collection: &str) -> Result<Vec<Value>, ServiceError> {
        Ok(self
            .collections
            .get(collection)
            .map(|rows| rows.clone())
            .unwrap_or_default())
    }

    async fn get(&self, collection: &str, id: &str) -> Result<Option<Value>, ServiceError> {
        Ok(self.collections.get(collection).and_then(|rows| {
            rows.iter().find(|doc| id_of(doc) == Some(id)).cloned()
        }))
    }

    async fn create(&self, collection: &str, document: Value) -> Result<Value, ServiceError> {
        let id = id_of(&document)
            .ok_or_else(|| ServiceError::ValidationError("document has no string id".to_string()))?
            .to_string();
        let mut rows = self.collections.entry(collection.to_string()).or_default();
        if rows.iter().any(|doc| id_of(doc) == Some(id.as_str())) {
            return Err(ServiceError::Conflict(format!(
                "{} record '{}' already exists",
                collection, id
            )));
        }
        rows.push(document.clone());
        Ok(document)
    }

    async fn patch(
        &self,
        collection: &str,
        id: &str,
        changes: Value,
    ) -> Result<Value, ServiceError> {
        let mut rows = self
            .collections
            .get_mut(collection)
            .ok_or_else(|| not_found(collection, id))?;
        let doc = rows
            .iter_mut()
            .find(|doc| id_of(doc) == Some(id))
            .ok_or_else(|| not_found(collection, id))?;

        match (doc.as_object_mut(), changes) {
            (Some(target), Value::Object(fields)) => {
                for (key, value) in fields {
                    target.insert(key, value);
                }
            }
            _ => {
                return Err(ServiceError::ValidationError(
                    "patch body must be a JSON object".to_string(),
                ))
            }
        }
        Ok(doc.clone())
    }

    async fn replace(
        &self,
        collection: &str,
        id: &str,
        document: Value,
    ) -> Result<Value, ServiceError> {
        let mut rows = self
            .collections
            .get_mut(collection)
            .ok_or_else(|| not_found(collection, id))?;
        let doc = rows
            .iter_mut()
            .find(|doc| id_of(doc) == Some(id))
            .ok_or_else(|| not_found(collection, id))?;
        *doc = document.clone();
        Ok(document)
    }

    async fn delete(&self, collection: &str, id: &str) -> Result<(), ServiceError> {
        let mut rows = self
            .collections
            .get_mut(collection)
            .ok_or_else(|| not_found(collection, id))?;
        let position = rows
            .iter()
            .position(|doc| id_of(doc) == Some(id))
            .ok_or_else(|| not_found(collection, id))?;
        rows.remove(position);
        Ok(())
    }
}
