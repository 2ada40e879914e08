use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{error, info, instrument, warn};

use crate::{
    commands::Command,
    errors::ServiceError,
    events::{Event, EventSender},
    metrics,
    models::{ids::ISSUE_PREFIX, IssueStatus, IssuedItem},
    repositories::CssdStore,
};

/// Hands a sterilized request to a department: appends an `ISS###` row and
/// takes the entry out of the available pool. An id can be issued once.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IssueItemCommand {
    /// Available item id (the request id)
    pub item_id: String,
    pub department: String,
    pub issued_at: DateTime<Utc>,
}

#[async_trait::async_trait]
impl Command for IssueItemCommand {
    type Result = IssuedItem;

    #[instrument(skip(self, store, event_sender), fields(item_id = %self.item_id, department = %self.department))]
    async fn execute(
        &self,
        store: Arc<CssdStore>,
        event_sender: Arc<EventSender>,
    ) -> Result<Self::Result, ServiceError> {
        let mut missing = Vec::new();
        if self.item_id.trim().is_empty() {
            missing.push("item");
        }
        if self.department.trim().is_empty() {
            missing.push("department");
        }
        if !missing.is_empty() {
            return Err(ServiceError::missing_fields(&missing));
        }

        let _guard = store.lock_lifecycle().await;

        let available = store
            .available_items
            .get(self.item_id.trim())
            .await?
            .ok_or_else(|| {
                ServiceError::NotFound(format!(
                    "item {} is not available for issue",
                    self.item_id.trim()
                ))
            })?;

        let issued = IssuedItem {
            id: store.issued_items.next_id(ISSUE_PREFIX).await?,
            request_id: available.id.clone(),
            department: self.department.trim().to_string(),
            items: available.items.clone(),
            quantity: available.quantity,
            issued_time: self.issued_at.format("%H:%M").to_string(),
            issued_date: self.issued_at.date_naive(),
            status: IssueStatus::Issued,
        };
        let issued = store.issued_items.create(&issued).await?;

        if let Err(e) = store.available_items.delete(&available.id).await {
            metrics::increment(metrics::PARTIAL_WRITES);
            warn!(issue_id = %issued.id, error = %e, "Pool entry was not removed; withdrawing issue");
            return Err(match store.issued_items.delete(&issued.id).await {
                Ok(()) => ServiceError::PartialWrite(format!(
                    "item {} stayed in the pool ({}); issue {} withdrawn",
                    available.id, e, issued.id
                )),
                Err(cleanup) => {
                    error!(error = %cleanup, "Failed to withdraw issue");
                    ServiceError::PartialWrite(format!(
                        "item {} stayed in the pool ({}) and issue {} could not be withdrawn ({})",
                        available.id, e, issued.id, cleanup
                    ))
                }
            });
        }

        info!(issue_id = %issued.id, quantity = issued.quantity, "Item issued");
        metrics::increment(metrics::ITEMS_ISSUED);
        event_sender
            .publish(Event::ItemIssued {
                issue_id: issued.id.clone(),
                request_id: issued.request_id.clone(),
                department: issued.department.clone(),
            })
            .await;

        Ok(issued)
    }
}
