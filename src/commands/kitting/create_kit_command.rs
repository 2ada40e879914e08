use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, instrument};
use validator::Validate;

use crate::{
    commands::Command,
    errors::ServiceError,
    events::{Event, EventSender},
    metrics,
    models::{ids::KIT_PREFIX, line_item::collapse, Kit, KitStatus, LineItem, Priority},
    repositories::CssdStore,
};

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct CreateKitCommand {
    #[validate(length(min = 1, message = "kit name is required"))]
    pub name: String,
    #[validate(length(min = 1, message = "department is required"))]
    pub department: String,
    pub priority: Priority,
    pub date: NaiveDate,
    pub time: String,
    #[validate(length(min = 1, message = "add at least one item before saving"))]
    pub lines: Vec<LineItem>,
}

#[async_trait::async_trait]
impl Command for CreateKitCommand {
    type Result = Kit;

    #[instrument(skip(self, store, event_sender), fields(name = %self.name))]
    async fn execute(
        &self,
        store: Arc<CssdStore>,
        event_sender: Arc<EventSender>,
    ) -> Result<Self::Result, ServiceError> {
        self.validate()?;

        let _guard = store.lock_lifecycle().await;

        let (items, quantity) = collapse(&self.lines);
        let kit = Kit {
            id: store.kits.next_id(KIT_PREFIX).await?,
            name: self.name.trim().to_string(),
            department: self.department.trim().to_string(),
            items,
            quantity,
            priority: self.priority,
            status: KitStatus::Active,
            date: self.date,
            time: self.time.clone(),
        };
        let kit = store.kits.create(&kit).await?;

        info!(kit_id = %kit.id, quantity = kit.quantity, "Kit created");
        metrics::increment(metrics::KITS_CREATED);
        event_sender.publish(Event::KitCreated(kit.id.clone())).await;

        Ok(kit)
    }
}
