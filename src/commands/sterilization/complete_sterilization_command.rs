use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;
use tracing::{info, instrument};

use crate::{
    commands::Command,
    errors::ServiceError,
    events::{Event, EventSender},
    metrics,
    models::{AvailableItem, ProcessStatus, RequestStatus, SterilizationProcess},
    repositories::CssdStore,
};

/// Finishes a run and hands its request to the issue pool.
///
/// Writes go pool entry, then request, then process. The process row turns
/// `Completed` last, so a failure part-way leaves it running and the whole
/// command can simply be run again.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompleteSterilizationCommand {
    pub process_id: String,
    pub completed_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompletedRun {
    pub process: SterilizationProcess,
    /// `None` when the run had already been completed
    pub available_item: Option<AvailableItem>,
}

#[async_trait::async_trait]
impl Command for CompleteSterilizationCommand {
    type Result = CompletedRun;

    #[instrument(skip(self, store, event_sender), fields(process_id = %self.process_id))]
    async fn execute(
        &self,
        store: Arc<CssdStore>,
        event_sender: Arc<EventSender>,
    ) -> Result<Self::Result, ServiceError> {
        let _guard = store.lock_lifecycle().await;

        let process = store.processes.fetch(&self.process_id).await?;
        if process.status == ProcessStatus::Completed {
            return Ok(CompletedRun {
                process,
                available_item: None,
            });
        }
        process.status.transition(ProcessStatus::Completed)?;

        let request = store.requests.fetch(&process.item_id).await?;
        if request.status != RequestStatus::Completed {
            request.status.transition(RequestStatus::Completed)?;
        }

        let paused_seconds = match (process.status, process.paused_at) {
            (ProcessStatus::Paused, Some(since)) => {
                process.paused_seconds + (self.completed_at - since).num_seconds().max(0)
            }
            _ => process.paused_seconds,
        };
        let mut finished = process.clone();
        finished.status = ProcessStatus::Completed;
        finished.end_time = Some(self.completed_at);
        finished.paused_at = None;
        finished.paused_seconds = paused_seconds;

        let available_item = store
            .available_items
            .upsert(&AvailableItem::from_completion(&request, &finished))
            .await?;

        if request.status != RequestStatus::Completed {
            store
                .requests
                .patch(&request.id, json!({ "status": RequestStatus::Completed }))
                .await?;
        }

        let finished = store
            .processes
            .patch(
                &process.id,
                json!({
                    "status": ProcessStatus::Completed,
                    "endTime": self.completed_at,
                    "pausedAt": null,
                    "pausedSeconds": paused_seconds,
                }),
            )
            .await?;

        info!(
            request_id = %request.id,
            machine = %finished.machine,
            "Sterilization completed; items ready for issue"
        );
        metrics::increment(metrics::STERILIZATION_COMPLETED);
        event_sender
            .publish(Event::SterilizationCompleted {
                process_id: finished.id.clone(),
                request_id: request.id.clone(),
                completed_at: self.completed_at,
            })
            .await;

        Ok(CompletedRun {
            process: finished,
            available_item: Some(available_item),
        })
    }
}
