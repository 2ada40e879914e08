use serde::{Deserialize, Serialize};
use serde_json::json;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tracing::{info, instrument, warn};

use crate::{
    commands::Command,
    errors::ServiceError,
    events::{Event, EventSender},
    metrics,
    models::{ids::RECEIVE_PREFIX, ReceiveItem},
    repositories::CssdStore,
};

/// Brings every receive item back in line with its request: copies the
/// request status onto mirrors that disagree and recreates missing mirrors.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ReconcileReceiveItemsCommand;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ReconcileReport {
    /// Receive items whose status was rewritten
    pub repaired: Vec<String>,
    /// Receive items created for requests that had none
    pub recreated: Vec<String>,
    /// Receive items pointing at a request that does not exist
    pub orphaned: Vec<String>,
}

impl ReconcileReport {
    pub fn changed(&self) -> usize {
        self.repaired.len() + self.recreated.len()
    }
}

#[async_trait::async_trait]
impl Command for ReconcileReceiveItemsCommand {
    type Result = ReconcileReport;

    #[instrument(skip(self, store, event_sender))]
    async fn execute(
        &self,
        store: Arc<CssdStore>,
        event_sender: Arc<EventSender>,
    ) -> Result<Self::Result, ServiceError> {
        let _guard = store.lock_lifecycle().await;

        let requests = store.requests.list().await?;
        let receive_items = store.receive_items.list().await?;
        let by_id: HashMap<&str, _> = requests.iter().map(|r| (r.id.as_str(), r)).collect();

        let mut report = ReconcileReport::default();
        let mut mirrored = HashSet::new();

        for item in &receive_items {
            let Some(request) = by_id.get(item.request_id.as_str()) else {
                warn!(receive_item_id = %item.id, request_id = %item.request_id, "Receive item has no request");
                report.orphaned.push(item.id.clone());
                continue;
            };
            mirrored.insert(request.id.as_str());
            if item.status != request.status {
                store
                    .receive_items
                    .patch(&item.id, json!({ "status": request.status }))
                    .await?;
                info!(
                    receive_item_id = %item.id,
                    from = %item.status,
                    to = %request.status,
                    "Receive item status repaired"
                );
                report.repaired.push(item.id.clone());
            }
        }

        for request in requests.iter().filter(|r| !mirrored.contains(r.id.as_str())) {
            let id = store.receive_items.next_id(RECEIVE_PREFIX).await?;
            store
                .receive_items
                .create(&ReceiveItem::mirror_of(id.clone(), request))
                .await?;
            info!(receive_item_id = %id, request_id = %request.id, "Receive item recreated");
            report.recreated.push(id);
        }

        metrics::increment_by(metrics::RECEIVE_ITEMS_REPAIRED, report.changed() as u64);
        if report.changed() > 0 {
            let mut changed = report.repaired.clone();
            changed.extend(report.recreated.iter().cloned());
            event_sender
                .publish(Event::ReceiveItemsReconciled { repaired: changed })
                .await;
        }

        Ok(report)
    }
}
