use crate::config::AppConfig;
use crate::errors::ServiceError;
use crate::models::{
    AvailableItem, ConsumptionRecord, IssuedItem, Kit, ReceiveItem, Request, StockItem,
    SterilizationProcess,
};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, MutexGuard};

pub mod collection;
pub mod document_store;
pub mod http_store;
pub mod memory_store;

pub use collection::Collection;
pub use document_store::DocumentStore;
pub use http_store::HttpDocumentStore;
pub use memory_store::InMemoryDocumentStore;

/// The one client-side store every service shares: a typed handle per
/// backend collection plus the lock that serializes lifecycle commands.
#[derive(Debug)]
pub struct CssdStore {
    pub requests: Collection<Request>,
    pub receive_items: Collection<ReceiveItem>,
    pub kits: Collection<Kit>,
    pub processes: Collection<SterilizationProcess>,
    pub available_items: Collection<AvailableItem>,
    pub issued_items: Collection<IssuedItem>,
    pub stock_items: Collection<StockItem>,
    pub consumption_records: Collection<ConsumptionRecord>,
    lifecycle: Mutex<()>,
}

impl CssdStore {
    pub fn new(backend: Arc<dyn DocumentStore>) -> Self {
        Self {
            requests: Collection::new(backend.clone()),
            receive_items: Collection::new(backend.clone()),
            kits: Collection::new(backend.clone()),
            processes: Collection::new(backend.clone()),
            available_items: Collection::new(backend.clone()),
            issued_items: Collection::new(backend.clone()),
            stock_items: Collection::new(backend.clone()),
            consumption_records: Collection::new(backend),
            lifecycle: Mutex::new(()),
        }
    }

    pub fn in_memory() -> Self {
        Self::new(Arc::new(InMemoryDocumentStore::new()))
    }

    pub fn http(config: &AppConfig) -> Result<Self, ServiceError> {
        let backend = HttpDocumentStore::new(
            &config.backend_url,
            Duration::from_secs(config.request_timeout_secs),
        )?;
        Ok(Self::new(Arc::new(backend)))
    }

    /// Held for the whole read-check-write sequence of a lifecycle command.
    /// Only excludes other commands in this process.
    pub async fn lock_lifecycle(&self) -> MutexGuard<'_, ()> {
        self.lifecycle.lock().await
    }
}
