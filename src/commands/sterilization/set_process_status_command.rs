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
    models::{ProcessStatus, SterilizationProcess},
    repositories::CssdStore,
};

/// Pauses or resumes a run. Completion goes through
/// `CompleteSterilizationCommand` instead.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SetProcessStatusCommand {
    pub process_id: String,
    pub status: ProcessStatus,
    pub at: DateTime<Utc>,
}

#[async_trait::async_trait]
impl Command for SetProcessStatusCommand {
    type Result = SterilizationProcess;

    #[instrument(skip(self, store, event_sender), fields(process_id = %self.process_id, status = %self.status))]
    async fn execute(
        &self,
        store: Arc<CssdStore>,
        event_sender: Arc<EventSender>,
    ) -> Result<Self::Result, ServiceError> {
        if self.status == ProcessStatus::Completed {
            return Err(ServiceError::InvalidStatus(
                "use the complete operation to finish a sterilization run".to_string(),
            ));
        }

        let _guard = store.lock_lifecycle().await;

        let process = store.processes.fetch(&self.process_id).await?;
        process.status.transition(self.status)?;
        if process.status == self.status {
            return Ok(process);
        }

        let changes = match self.status {
            ProcessStatus::Paused => json!({
                "status": ProcessStatus::Paused,
                "pausedAt": self.at,
            }),
            _ => {
                let paused_for = process
                    .paused_at
                    .map(|since| (self.at - since).num_seconds().max(0))
                    .unwrap_or(0);
                json!({
                    "status": ProcessStatus::InProgress,
                    "pausedAt": null,
                    "pausedSeconds": process.paused_seconds + paused_for,
                })
            }
        };
        let updated = store.processes.patch(&process.id, changes).await?;

        let event = if self.status == ProcessStatus::Paused {
            metrics::increment(metrics::STERILIZATION_PAUSED);
            Event::SterilizationPaused(updated.id.clone())
        } else {
            metrics::increment(metrics::STERILIZATION_RESUMED);
            Event::SterilizationResumed(updated.id.clone())
        };
        info!(paused_seconds = updated.paused_seconds, "Sterilization {}", event.name());
        event_sender.publish(event).await;

        Ok(updated)
    }
}
