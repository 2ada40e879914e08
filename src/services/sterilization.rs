use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tokio::task::JoinHandle;
use tracing::{info, instrument, warn};

use crate::{
    clock::Clock,
    commands::{
        sterilization::{
            CompleteSterilizationCommand, CompletedRun, SetProcessStatusCommand,
            StartSterilizationCommand,
        },
        Command,
    },
    errors::ServiceError,
    events::EventSender,
    metrics,
    models::{
        ids::compare_ids,
        sterilization::{default_machines, default_methods},
        Machine, MachineStatus, ProcessStatus, Request, RequestStatus, SterilizationMethod,
        SterilizationProcess,
    },
    repositories::CssdStore,
};

/// Form input for starting a run. Names are matched case-insensitively
/// against the machine and method registries.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StartSterilization {
    pub machine: String,
    pub method: String,
    pub request_id: String,
}

impl StartSterilization {
    fn missing_fields(&self) -> Vec<&'static str> {
        let mut missing = Vec::new();
        if self.machine.trim().is_empty() {
            missing.push("machine");
        }
        if self.method.trim().is_empty() {
            missing.push("method");
        }
        if self.request_id.trim().is_empty() {
            missing.push("requestId");
        }
        missing
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SterilizationSummary {
    pub in_progress: usize,
    pub paused: usize,
    pub completed: usize,
    /// Machines currently in maintenance
    pub maintenance_alerts: usize,
}

/// Sterilization Process view plus the auto-completion scheduler
#[derive(Clone)]
pub struct SterilizationService {
    store: Arc<CssdStore>,
    event_sender: Arc<EventSender>,
    clock: Arc<dyn Clock>,
    machines: Arc<RwLock<Vec<Machine>>>,
    methods: Arc<Vec<SterilizationMethod>>,
    eligible_statuses: Vec<RequestStatus>,
}

impl SterilizationService {
    pub fn new(
        store: Arc<CssdStore>,
        event_sender: Arc<EventSender>,
        clock: Arc<dyn Clock>,
        eligible_statuses: Vec<RequestStatus>,
    ) -> Self {
        Self {
            store,
            event_sender,
            clock,
            machines: Arc::new(RwLock::new(default_machines())),
            methods: Arc::new(default_methods()),
            eligible_statuses,
        }
    }

    pub async fn machines(&self) -> Vec<Machine> {
        self.machines.read().await.clone()
    }

    pub fn methods(&self) -> &[SterilizationMethod] {
        &self.methods
    }

    pub async fn set_machine_status(
        &self,
        name: &str,
        status: MachineStatus,
    ) -> Result<Machine, ServiceError> {
        let mut machines = self.machines.write().await;
        let machine = machines
            .iter_mut()
            .find(|m| m.name.eq_ignore_ascii_case(name.trim()))
            .ok_or_else(|| ServiceError::NotFound(format!("machine '{}' not found", name.trim())))?;
        machine.status = status;
        info!(machine = %machine.name, %status, "Machine status set");
        Ok(machine.clone())
    }

    /// Requests that may be put into a machine right now.
    pub async fn eligible_requests(&self) -> Result<Vec<Request>, ServiceError> {
        let mut rows: Vec<Request> = self
            .store
            .requests
            .list()
            .await?
            .into_iter()
            .filter(|r| {
                self.eligible_statuses.contains(&r.status) && r.status.can_start_sterilization()
            })
            .collect();
        rows.sort_by(|a, b| compare_ids(&a.id, &b.id));
        Ok(rows)
    }

    #[instrument(skip(self))]
    pub async fn start(&self, input: StartSterilization) -> Result<SterilizationProcess, ServiceError> {
        let missing = input.missing_fields();
        if !missing.is_empty() {
            return Err(ServiceError::missing_fields(&missing));
        }

        let method = self
            .methods
            .iter()
            .find(|m| m.name.eq_ignore_ascii_case(input.method.trim()))
            .cloned()
            .ok_or_else(|| {
                ServiceError::ValidationError(format!(
                    "unknown sterilization method '{}'",
                    input.method.trim()
                ))
            })?;

        let machine = self
            .machines
            .read()
            .await
            .iter()
            .find(|m| m.name.eq_ignore_ascii_case(input.machine.trim()))
            .cloned()
            .ok_or_else(|| {
                ServiceError::ValidationError(format!("unknown machine '{}'", input.machine.trim()))
            })?;
        if machine.status == MachineStatus::Maintenance {
            return Err(ServiceError::InvalidStatus(format!(
                "machine {} is under maintenance",
                machine.name
            )));
        }

        let process = StartSterilizationCommand {
            request_id: input.request_id.trim().to_string(),
            machine: machine.name.clone(),
            method,
            eligible_statuses: self.eligible_statuses.clone(),
            started_at: self.clock.now(),
        }
        .execute(self.store.clone(), self.event_sender.clone())
        .await?;

        self.set_machine_status(&machine.name, MachineStatus::InUse)
            .await?;
        Ok(process)
    }

    pub async fn pause(&self, process_id: &str) -> Result<SterilizationProcess, ServiceError> {
        self.set_status(process_id, ProcessStatus::Paused).await
    }

    pub async fn resume(&self, process_id: &str) -> Result<SterilizationProcess, ServiceError> {
        self.set_status(process_id, ProcessStatus::InProgress).await
    }

    #[instrument(skip(self))]
    pub async fn complete(&self, process_id: &str) -> Result<CompletedRun, ServiceError> {
        let run = CompleteSterilizationCommand {
            process_id: process_id.trim().to_string(),
            completed_at: self.clock.now(),
        }
        .execute(self.store.clone(), self.event_sender.clone())
        .await?;

        if run.available_item.is_some() {
            self.release_machine(&run.process.machine).await;
        }
        Ok(run)
    }

    #[instrument(skip(self))]
    pub async fn list(
        &self,
        search: &str,
        status: Option<ProcessStatus>,
    ) -> Result<Vec<SterilizationProcess>, ServiceError> {
        let mut rows: Vec<SterilizationProcess> = self
            .store
            .processes
            .list()
            .await?
            .into_iter()
            .filter(|p| p.matches(search, status))
            .collect();
        rows.sort_by(|a, b| compare_ids(&a.id, &b.id));
        Ok(rows)
    }

    pub async fn summary(&self) -> Result<SterilizationSummary, ServiceError> {
        let processes = self.store.processes.list().await?;
        let count = |status: ProcessStatus| processes.iter().filter(|p| p.status == status).count();
        let maintenance_alerts = self
            .machines
            .read()
            .await
            .iter()
            .filter(|m| m.status == MachineStatus::Maintenance)
            .count();

        Ok(SterilizationSummary {
            in_progress: count(ProcessStatus::InProgress),
            paused: count(ProcessStatus::Paused),
            completed: count(ProcessStatus::Completed),
            maintenance_alerts,
        })
    }

    /// Completes every running process whose running time has reached its
    /// duration. One failing run does not stop the others.
    #[instrument(skip(self))]
    pub async fn auto_complete_due(&self) -> Result<Vec<String>, ServiceError> {
        let now = self.clock.now();
        let due: Vec<String> = self
            .store
            .processes
            .list()
            .await?
            .into_iter()
            .filter(|p| p.is_due(now))
            .map(|p| p.id)
            .collect();

        let mut completed = Vec::with_capacity(due.len());
        for id in due {
            match self.complete(&id).await {
                Ok(run) if run.available_item.is_some() => completed.push(id),
                Ok(_) => {}
                Err(e) => warn!(process_id = %id, error = %e, "Auto-completion failed"),
            }
        }

        metrics::increment_by(metrics::STERILIZATION_AUTO_COMPLETED, completed.len() as u64);
        Ok(completed)
    }

    /// Runs `auto_complete_due` every `interval` until the handle is aborted.
    pub fn spawn_auto_completion(&self, interval: Duration) -> JoinHandle<()> {
        let service = self.clone();
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            info!(interval_secs = interval.as_secs(), "Auto-completion scheduler started");
            loop {
                ticker.tick().await;
                match service.auto_complete_due().await {
                    Ok(ids) if !ids.is_empty() => {
                        info!(count = ids.len(), ids = ?ids, "Auto-completed sterilization runs")
                    }
                    Ok(_) => {}
                    Err(e) => warn!(error = %e, "Auto-completion pass failed"),
                }
            }
        })
    }

    async fn set_status(
        &self,
        process_id: &str,
        status: ProcessStatus,
    ) -> Result<SterilizationProcess, ServiceError> {
        SetProcessStatusCommand {
            process_id: process_id.trim().to_string(),
            status,
            at: self.clock.now(),
        }
        .execute(self.store.clone(), self.event_sender.clone())
        .await
    }

    /// Marks the machine available again once no unfinished run names it,
    /// unless it was sent to maintenance.
    async fn release_machine(&self, name: &str) {
        let still_busy = match self.store.processes.list().await {
            Ok(processes) => processes.iter().any(|p| {
                p.status != ProcessStatus::Completed && p.machine.eq_ignore_ascii_case(name)
            }),
            Err(e) => {
                warn!(machine = %name, error = %e, "Could not check for other runs; machine stays in use");
                true
            }
        };
        if still_busy {
            return;
        }

        let mut machines = self.machines.write().await;
        if let Some(machine) = machines
            .iter_mut()
            .find(|m| m.name.eq_ignore_ascii_case(name))
        {
            if machine.status == MachineStatus::InUse {
                machine.status = MachineStatus::Available;
            }
        }
    }
}
