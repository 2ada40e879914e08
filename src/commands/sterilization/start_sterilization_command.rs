use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;
use tracing::{error, info, instrument, warn};

use crate::{
    commands::Command,
    errors::ServiceError,
    events::{Event, EventSender},
    metrics,
    models::{
        ids::PROCESS_PREFIX, ProcessStatus, RequestStatus, SterilizationMethod,
        SterilizationProcess,
    },
    repositories::CssdStore,
};

/// Puts a request's items into a machine.
///
/// Creates an `In Progress` process and moves the request to `In Progress`.
/// If the request write fails the new process is deleted again.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StartSterilizationCommand {
    pub request_id: String,
    pub machine: String,
    pub method: SterilizationMethod,
    /// Request statuses a run may start from
    pub eligible_statuses: Vec<RequestStatus>,
    pub started_at: DateTime<Utc>,
}

#[async_trait::async_trait]
impl Command for StartSterilizationCommand {
    type Result = SterilizationProcess;

    #[instrument(skip(self, store, event_sender), fields(request_id = %self.request_id, machine = %self.machine))]
    async fn execute(
        &self,
        store: Arc<CssdStore>,
        event_sender: Arc<EventSender>,
    ) -> Result<Self::Result, ServiceError> {
        let mut missing = Vec::new();
        if self.machine.trim().is_empty() {
            missing.push("machine");
        }
        if self.method.name.trim().is_empty() {
            missing.push("method");
        }
        if self.request_id.trim().is_empty() {
            missing.push("requestId");
        }
        if !missing.is_empty() {
            return Err(ServiceError::missing_fields(&missing));
        }

        let _guard = store.lock_lifecycle().await;

        let request = store.requests.fetch(&self.request_id).await?;
        if !self.eligible_statuses.contains(&request.status) {
            return Err(ServiceError::InvalidStatus(format!(
                "request {} is '{}'; sterilization can start from: {}",
                request.id,
                request.status,
                self.eligible_statuses
                    .iter()
                    .map(ToString::to_string)
                    .collect::<Vec<_>>()
                    .join(", ")
            )));
        }
        if !request.status.can_start_sterilization() {
            return Err(ServiceError::InvalidStatus(format!(
                "cannot move request {} from '{}' to '{}'",
                request.id,
                request.status,
                RequestStatus::InProgress
            )));
        }

        let process = SterilizationProcess {
            id: store.processes.next_id(PROCESS_PREFIX).await?,
            machine: self.machine.trim().to_string(),
            process: self.method.name.clone(),
            item_id: request.id.clone(),
            start_time: Some(self.started_at),
            end_time: None,
            status: ProcessStatus::InProgress,
            duration: self.method.duration,
            paused_at: None,
            paused_seconds: 0,
        };
        let process = store.processes.create(&process).await?;

        if let Err(e) = store
            .requests
            .patch(&request.id, json!({ "status": RequestStatus::InProgress }))
            .await
        {
            metrics::increment(metrics::PARTIAL_WRITES);
            warn!(process_id = %process.id, error = %e, "Request status write failed; removing process");
            return Err(match store.processes.delete(&process.id).await {
                Ok(()) => ServiceError::PartialWrite(format!(
                    "request {} was not moved to In Progress ({}); process {} removed",
                    request.id, e, process.id
                )),
                Err(cleanup) => {
                    error!(error = %cleanup, "Failed to remove orphaned process");
                    ServiceError::PartialWrite(format!(
                        "request {} was not moved to In Progress ({}); process {} could not be removed ({})",
                        request.id, e, process.id, cleanup
                    ))
                }
            });
        }

        info!(
            process_id = %process.id,
            method = %process.process,
            duration_minutes = process.duration,
            "Sterilization started"
        );
        metrics::increment(metrics::STERILIZATION_STARTED);
        event_sender
            .publish(Event::SterilizationStarted {
                process_id: process.id.clone(),
                request_id: request.id.clone(),
                machine: process.machine.clone(),
            })
            .await;

        Ok(process)
    }
}
