use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;
use tracing::{error, info, instrument, warn};

use crate::{
    commands::Command,
    errors::ServiceError,
    events::{Event, EventSender},
    metrics,
    models::{ReceiveItem, Request, RequestStatus},
    repositories::CssdStore,
};

/// Approves or rejects a receive item and the request it mirrors.
///
/// The receive item is written first. If the request write then fails the
/// receive item is put back to its previous status and the caller gets
/// `PartialWrite`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdateReceiveStatusCommand {
    pub receive_item_id: String,
    pub status: RequestStatus,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReceiveDecision {
    pub receive_item: ReceiveItem,
    pub request: Request,
}

#[async_trait::async_trait]
impl Command for UpdateReceiveStatusCommand {
    type Result = ReceiveDecision;

    #[instrument(skip(self, store, event_sender), fields(receive_item_id = %self.receive_item_id, status = %self.status))]
    async fn execute(
        &self,
        store: Arc<CssdStore>,
        event_sender: Arc<EventSender>,
    ) -> Result<Self::Result, ServiceError> {
        if !matches!(self.status, RequestStatus::Approved | RequestStatus::Rejected) {
            return Err(ServiceError::InvalidStatus(format!(
                "receive items can only be approved or rejected, not set to '{}'",
                self.status
            )));
        }
        if self.receive_item_id.trim().is_empty() {
            return Err(ServiceError::missing_fields(&["receiveItemId"]));
        }

        let _guard = store.lock_lifecycle().await;

        let receive_item = store.receive_items.fetch(&self.receive_item_id).await?;
        let request = store.requests.fetch(&receive_item.request_id).await?;

        if request.status == self.status && receive_item.status == self.status {
            return Ok(ReceiveDecision {
                receive_item,
                request,
            });
        }
        // The request's status is authoritative; the mirror may lag.
        request.status.transition(self.status)?;

        let updated_item = store
            .receive_items
            .patch(&receive_item.id, json!({ "status": self.status }))
            .await
            .map_err(|e| {
                error!(error = %e, "Failed to update receive item status");
                e
            })?;

        let updated_request = match store
            .requests
            .patch(&request.id, json!({ "status": self.status }))
            .await
        {
            Ok(updated) => updated,
            Err(e) => return Err(self.compensate(&store, &receive_item, &request, e).await),
        };

        info!(
            request_id = %updated_request.id,
            old_status = %request.status,
            new_status = %self.status,
            "Receive item decision recorded"
        );
        metrics::increment(match self.status {
            RequestStatus::Approved => metrics::REQUESTS_APPROVED,
            _ => metrics::REQUESTS_REJECTED,
        });
        event_sender
            .publish(Event::RequestStatusChanged {
                request_id: updated_request.id.clone(),
                old_status: request.status,
                new_status: self.status,
            })
            .await;

        Ok(ReceiveDecision {
            receive_item: updated_item,
            request: updated_request,
        })
    }
}

impl UpdateReceiveStatusCommand {
    async fn compensate(
        &self,
        store: &CssdStore,
        previous: &ReceiveItem,
        request: &Request,
        cause: ServiceError,
    ) -> ServiceError {
        metrics::increment(metrics::PARTIAL_WRITES);
        warn!(
            request_id = %request.id,
            error = %cause,
            "Request status write failed; restoring receive item"
        );

        match store
            .receive_items
            .patch(&previous.id, json!({ "status": previous.status }))
            .await
        {
            Ok(_) => ServiceError::PartialWrite(format!(
                "request {} was not updated ({}); receive item {} restored to '{}'",
                request.id, cause, previous.id, previous.status
            )),
            Err(restore_err) => {
                error!(error = %restore_err, "Failed to restore receive item");
                ServiceError::PartialWrite(format!(
                    "request {} was not updated ({}); receive item {} is now '{}' and could not be restored ({}); run reconcile",
                    request.id, cause, previous.id, self.status, restore_err
                ))
            }
        }
    }
}
