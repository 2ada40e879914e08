use std::sync::Arc;
use tracing::instrument;

use crate::{
    commands::{
        receiving::{
            ReceiveDecision, ReconcileReceiveItemsCommand, ReconcileReport,
            UpdateReceiveStatusCommand,
        },
        Command,
    },
    errors::ServiceError,
    events::EventSender,
    models::{ids::compare_ids, ReceiveItem, RequestStatus},
    repositories::CssdStore,
};

/// Receive Items: the CSSD desk's queue of incoming requests
#[derive(Clone)]
pub struct ReceivingService {
    store: Arc<CssdStore>,
    event_sender: Arc<EventSender>,
}

impl ReceivingService {
    pub fn new(store: Arc<CssdStore>, event_sender: Arc<EventSender>) -> Self {
        Self {
            store,
            event_sender,
        }
    }

    #[instrument(skip(self))]
    pub async fn list(
        &self,
        search: &str,
        status: Option<RequestStatus>,
    ) -> Result<Vec<ReceiveItem>, ServiceError> {
        let mut rows: Vec<ReceiveItem> = self
            .store
            .receive_items
            .list()
            .await?
            .into_iter()
            .filter(|item| item.matches(search, status))
            .collect();
        rows.sort_by(|a, b| compare_ids(&a.id, &b.id));
        Ok(rows)
    }

    pub async fn approve(&self, receive_item_id: &str) -> Result<ReceiveDecision, ServiceError> {
        self.decide(receive_item_id, RequestStatus::Approved).await
    }

    pub async fn reject(&self, receive_item_id: &str) -> Result<ReceiveDecision, ServiceError> {
        self.decide(receive_item_id, RequestStatus::Rejected).await
    }

    /// Repairs receive items that disagree with their requests.
    pub async fn reconcile(&self) -> Result<ReconcileReport, ServiceError> {
        ReconcileReceiveItemsCommand
            .execute(self.store.clone(), self.event_sender.clone())
            .await
    }

    async fn decide(
        &self,
        receive_item_id: &str,
        status: RequestStatus,
    ) -> Result<ReceiveDecision, ServiceError> {
        UpdateReceiveStatusCommand {
            receive_item_id: receive_item_id.trim().to_string(),
            status,
        }
        .execute(self.store.clone(), self.event_sender.clone())
        .await
    }
}
