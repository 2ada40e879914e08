#![allow(dead_code)]

use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use cssd_api::{
    clock::{Clock, FixedClock},
    config::AppConfig,
    errors::ServiceError,
    events::{self, Event},
    models::{Document, Priority, Request},
    repositories::{CssdStore, DocumentStore, InMemoryDocumentStore},
    services::{requests::RequestDraft, AppServices},
};
use serde_json::Value;
use tokio::sync::mpsc;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Op {
    List,
    Get,
    Create,
    Patch,
    Replace,
    Delete,
}

/// In-memory backend that counts calls and fails chosen (op, collection)
/// pairs with an `ExternalServiceError`.
#[derive(Debug, Default)]
pub struct FlakyStore {
    inner: InMemoryDocumentStore,
    failures: Mutex<HashSet<(Op, String)>>,
    calls: AtomicUsize,
}

impl FlakyStore {
    pub fn fail(&self, op: Op, collection: &str) {
        self.failures
            .lock()
            .unwrap()
            .insert((op, collection.to_string()));
    }

    pub fn heal(&self) {
        self.failures.lock().unwrap().clear();
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn len(&self, collection: &str) -> usize {
        self.inner.len(collection)
    }

    pub fn seed(&self, collection: &str, documents: Vec<Value>) {
        self.inner.seed(collection, documents);
    }

    fn check(&self, op: Op, collection: &str) -> Result<(), ServiceError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self
            .failures
            .lock()
            .unwrap()
            .contains(&(op, collection.to_string()))
        {
            return Err(ServiceError::ExternalServiceError(format!(
                "injected {:?} failure on {}",
                op, collection
            )));
        }
        Ok(())
    }
}

#[async_trait]
impl DocumentStore for FlakyStore {
    async fn list(&self, collection: &str) -> Result<Vec<Value>, ServiceError> {
        self.check(Op::List, collection)?;
        self.inner.list(collection).await
    }

    async fn get(&self, collection: &str, id: &str) -> Result<Option<Value>, ServiceError> {
        self.check(Op::Get, collection)?;
        self.inner.get(collection, id).await
    }

    async fn create(&self, collection: &str, document: Value) -> Result<Value, ServiceError> {
        self.check(Op::Create, collection)?;
        self.inner.create(collection, document).await
    }

    async fn patch(&self, collection: &str, id: &str, changes: Value) -> Result<Value, ServiceError> {
        self.check(Op::Patch, collection)?;
        self.inner.patch(collection, id, changes).await
    }

    async fn replace(
        &self,
        collection: &str,
        id: &str,
        document: Value,
    ) -> Result<Value, ServiceError> {
        self.check(Op::Replace, collection)?;
        self.inner.replace(collection, id, document).await
    }

    async fn delete(&self, collection: &str, id: &str) -> Result<(), ServiceError> {
        self.check(Op::Delete, collection)?;
        self.inner.delete(collection, id).await
    }
}

/// Services wired over a `FlakyStore` and a clock fixed at 2024-06-10 08:00 UTC.
pub struct TestApp {
    pub services: AppServices,
    pub store: Arc<CssdStore>,
    pub backend: Arc<FlakyStore>,
    pub clock: Arc<FixedClock>,
    events: Mutex<mpsc::Receiver<Event>>,
}

pub fn start_time() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 6, 10, 8, 0, 0).unwrap()
}

impl TestApp {
    pub fn new() -> Self {
        Self::with_config(AppConfig::default())
    }

    pub fn with_config(config: AppConfig) -> Self {
        let backend = Arc::new(FlakyStore::default());
        let store = Arc::new(CssdStore::new(backend.clone()));
        let clock = Arc::new(FixedClock::new(start_time()));
        let (event_sender, rx) = events::channel(1024);
        let services = AppServices::new(store.clone(), Arc::new(event_sender), clock.clone(), &config);

        Self {
            services,
            store,
            backend,
            clock,
            events: Mutex::new(rx),
        }
    }

    /// Events published since the last call.
    pub fn drain_events(&self) -> Vec<Event> {
        let mut rx = self.events.lock().unwrap();
        let mut events = Vec::new();
        while let Ok(event) = rx.try_recv() {
            events.push(event);
        }
        events
    }

    /// Saves a request through the service with one line per `(item, qty)`.
    pub async fn create_request(&self, department: &str, lines: &[(&str, &str)]) -> Request {
        let mut draft = RequestDraft::new(department, Priority::High, self.clock.today(), "Nurse Joy");
        for (item, quantity) in lines {
            draft.add_line(item, quantity).unwrap();
        }
        self.services.requests.save(&mut draft).await.unwrap()
    }

    /// Creates and approves a request, returning it in its approved state.
    pub async fn approved_request(&self, department: &str) -> Request {
        let request = self.create_request(department, &[("Forceps", "5")]).await;
        let receive_item = self.receive_item_for(&request.id).await;
        self.services
            .receiving
            .approve(&receive_item)
            .await
            .unwrap()
            .request
    }

    pub async fn receive_item_for(&self, request_id: &str) -> String {
        self.store
            .receive_items
            .list()
            .await
            .unwrap()
            .into_iter()
            .find(|r| r.request_id == request_id)
            .map(|r| r.id)
            .unwrap()
    }

    pub fn seed<T: Document>(&self, rows: &[T]) {
        let values = rows
            .iter()
            .map(|row| serde_json::to_value(row).unwrap())
            .collect();
        self.backend.seed(T::COLLECTION, values);
    }
}
