use std::sync::Arc;
use tracing::instrument;

use crate::{
    clock::Clock,
    commands::{issuing::IssueItemCommand, Command},
    errors::ServiceError,
    events::EventSender,
    models::{ids::compare_ids, AvailableItem, IssuedItem},
    repositories::CssdStore,
};

/// Issue Item view: sterilized requests waiting in the pool, and the log of
/// what was handed out
#[derive(Clone)]
pub struct IssuingService {
    store: Arc<CssdStore>,
    event_sender: Arc<EventSender>,
    clock: Arc<dyn Clock>,
}

impl IssuingService {
    pub fn new(store: Arc<CssdStore>, event_sender: Arc<EventSender>, clock: Arc<dyn Clock>) -> Self {
        Self {
            store,
            event_sender,
            clock,
        }
    }

    /// Only sterilized items can be issued; nothing else is offered.
    pub async fn candidates(&self, search: &str) -> Result<Vec<AvailableItem>, ServiceError> {
        let mut rows: Vec<AvailableItem> = self
            .store
            .available_items
            .list()
            .await?
            .into_iter()
            .filter(|item| item.matches(search))
            .collect();
        rows.sort_by(|a, b| compare_ids(&a.id, &b.id));
        Ok(rows)
    }

    #[instrument(skip(self))]
    pub async fn issue(&self, item_id: &str, department: &str) -> Result<IssuedItem, ServiceError> {
        IssueItemCommand {
            item_id: item_id.to_string(),
            department: department.to_string(),
            issued_at: self.clock.now(),
        }
        .execute(self.store.clone(), self.event_sender.clone())
        .await
    }

    pub async fn list_issued(&self, search: &str) -> Result<Vec<IssuedItem>, ServiceError> {
        let mut rows: Vec<IssuedItem> = self
            .store
            .issued_items
            .list()
            .await?
            .into_iter()
            .filter(|item| item.matches(search))
            .collect();
        rows.sort_by(|a, b| compare_ids(&a.id, &b.id));
        Ok(rows)
    }
}
