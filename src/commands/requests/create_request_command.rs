use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{error, info, instrument, warn};
use validator::Validate;

use crate::{
    commands::Command,
    errors::ServiceError,
    events::{Event, EventSender},
    metrics,
    models::{
        ids::{RECEIVE_PREFIX, REQUEST_PREFIX},
        line_item::collapse,
        LineItem, Priority, ReceiveItem, Request, RequestStatus,
    },
    repositories::CssdStore,
};

/// Saves a staged request: one `cssd_requests` row plus its receive-desk mirror.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct CreateRequestCommand {
    #[validate(length(min = 1, message = "department is required"))]
    pub department: String,
    pub priority: Priority,
    pub requested_by: String,
    pub date: NaiveDate,
    /// `HH:MM`
    pub time: String,
    #[validate(length(min = 1, message = "add at least one item before saving"))]
    pub lines: Vec<LineItem>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateRequestResult {
    pub request: Request,
    pub receive_item: ReceiveItem,
}

#[async_trait::async_trait]
impl Command for CreateRequestCommand {
    type Result = CreateRequestResult;

    #[instrument(skip(self, store, event_sender), fields(department = %self.department))]
    async fn execute(
        &self,
        store: Arc<CssdStore>,
        event_sender: Arc<EventSender>,
    ) -> Result<Self::Result, ServiceError> {
        self.validate()?;

        let _guard = store.lock_lifecycle().await;

        let (items, quantity) = collapse(&self.lines);
        let request = Request {
            id: store.requests.next_id(REQUEST_PREFIX).await?,
            department: self.department.trim().to_string(),
            items,
            quantity,
            priority: self.priority,
            requested_by: self.requested_by.trim().to_string(),
            status: RequestStatus::Requested,
            date: self.date,
            time: self.time.clone(),
        };
        let request = store.requests.create(&request).await.map_err(|e| {
            error!(request_id = %request.id, error = %e, "Failed to save request");
            e
        })?;

        let receive_item = self.create_mirror(&store, &request).await?;

        info!(
            request_id = %request.id,
            receive_item_id = %receive_item.id,
            quantity = request.quantity,
            "Request created"
        );
        metrics::increment(metrics::REQUESTS_CREATED);
        event_sender
            .publish(Event::RequestCreated {
                request_id: request.id.clone(),
                receive_item_id: receive_item.id.clone(),
            })
            .await;

        Ok(CreateRequestResult {
            request,
            receive_item,
        })
    }
}

impl CreateRequestCommand {
    /// The request row already exists when this runs. A failure here leaves
    /// it without a mirror, which `ReconcileReceiveItemsCommand` recreates.
    async fn create_mirror(
        &self,
        store: &CssdStore,
        request: &Request,
    ) -> Result<ReceiveItem, ServiceError> {
        let result = async {
            let id = store.receive_items.next_id(RECEIVE_PREFIX).await?;
            store
                .receive_items
                .create(&ReceiveItem::mirror_of(id, request))
                .await
        }
        .await;

        result.map_err(|e| {
            warn!(request_id = %request.id, error = %e, "Receive item was not created");
            metrics::increment(metrics::PARTIAL_WRITES);
            ServiceError::PartialWrite(format!(
                "request {} was saved but its receive item was not ({}); run reconcile to recreate it",
                request.id, e
            ))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events;
    use assert_matches::assert_matches;

    fn command(lines: Vec<LineItem>) -> CreateRequestCommand {
        CreateRequestCommand {
            department: "Cardiology".to_string(),
            priority: Priority::High,
            requested_by: "Nurse Jo".to_string(),
            date: NaiveDate::from_ymd_opt(2024, 6, 10).unwrap(),
            time: "09:30".to_string(),
            lines,
        }
    }

    #[tokio::test]
    async fn creates_request_and_mirror() {
        let store = Arc::new(CssdStore::in_memory());
        let (sender, mut rx) = events::channel(8);

        let result = command(vec![
            LineItem::parse("Syringe", "10").unwrap(),
            LineItem::parse("Gloves", "5").unwrap(),
        ])
        .execute(store.clone(), Arc::new(sender))
        .await
        .unwrap();

        assert_eq!(result.request.id, "REQ001");
        assert_eq!(result.request.items, "Syringe, Gloves");
        assert_eq!(result.request.quantity, 15);
        assert_eq!(result.request.status, RequestStatus::Requested);
        assert_eq!(result.receive_item.id, "REC001");
        assert_eq!(result.receive_item.request_id, "REQ001");
        assert_eq!(
            rx.recv().await,
            Some(Event::RequestCreated {
                request_id: "REQ001".into(),
                receive_item_id: "REC001".into()
            })
        );
    }

    #[tokio::test]
    async fn empty_draft_is_rejected_before_any_write() {
        let store = Arc::new(CssdStore::in_memory());
        let (sender, _rx) = events::channel(8);
        let err = command(vec![])
            .execute(store.clone(), Arc::new(sender))
            .await
            .unwrap_err();
        assert_matches!(err, ServiceError::ValidationError(_));
        assert!(store.requests.list().await.unwrap().is_empty());
    }
}
