use super::{deserialize_optional_timestamp, matches_search, Document, MachineStatus, ProcessStatus};
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// One run of a request's items through a machine.
/// Stored in `sterilizationProcesses`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SterilizationProcess {
    /// `STE###`
    pub id: String,
    pub machine: String,
    /// Method name, e.g. "Steam Sterilization"
    pub process: String,
    /// Id of the request being sterilized
    pub item_id: String,
    /// `None` for rows that only recorded a clock time
    #[serde(default, deserialize_with = "deserialize_optional_timestamp")]
    pub start_time: Option<DateTime<Utc>>,
    #[serde(default, deserialize_with = "deserialize_optional_timestamp")]
    pub end_time: Option<DateTime<Utc>>,
    pub status: ProcessStatus,
    /// Minutes
    pub duration: i64,
    #[serde(default, deserialize_with = "deserialize_optional_timestamp")]
    pub paused_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub paused_seconds: i64,
}

impl SterilizationProcess {
    /// Time spent actually running: wall time since start minus every
    /// paused interval, including the current one. Zero when the start is unknown.
    pub fn running_time(&self, now: DateTime<Utc>) -> Duration {
        let Some(start_time) = self.start_time else {
            return Duration::zero();
        };
        let until = self.end_time.unwrap_or(now);
        let mut paused = Duration::seconds(self.paused_seconds);
        if let Some(paused_at) = self.paused_at {
            if self.status == ProcessStatus::Paused && until > paused_at {
                paused = paused + (until - paused_at);
            }
        }
        let running = (until - start_time) - paused;
        running.max(Duration::zero())
    }

    /// Running and at or past its duration. Undated runs are only ever completed by hand.
    pub fn is_due(&self, now: DateTime<Utc>) -> bool {
        self.status == ProcessStatus::InProgress
            && self.start_time.is_some()
            && self.running_time(now) >= Duration::minutes(self.duration)
    }

    pub fn matches(&self, search: &str, status: Option<ProcessStatus>) -> bool {
        matches_search(search, &[&self.id, &self.item_id, &self.machine, &self.process])
            && status.map_or(true, |s| self.status == s)
    }
}

impl Document for SterilizationProcess {
    const COLLECTION: &'static str = "sterilizationProcesses";

    fn id(&self) -> &str {
        &self.id
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Machine {
    pub id: String,
    pub name: String,
    pub status: MachineStatus,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SterilizationMethod {
    pub id: String,
    pub name: String,
    /// Minutes
    pub duration: i64,
}

fn machine(id: &str, name: &str, status: MachineStatus) -> Machine {
    Machine {
        id: id.to_string(),
        name: name.to_string(),
        status,
    }
}

fn method(id: &str, name: &str, duration: i64) -> SterilizationMethod {
    SterilizationMethod {
        id: id.to_string(),
        name: name.to_string(),
        duration,
    }
}

pub fn default_machines() -> Vec<Machine> {
    vec![
        machine("M001", "Autoclave-1", MachineStatus::Available),
        machine("M002", "Autoclave-2", MachineStatus::InUse),
        machine("M003", "Autoclave-3", MachineStatus::Maintenance),
        machine("M004", "Chemical Sterilizer-1", MachineStatus::Available),
    ]
}

pub fn default_methods() -> Vec<SterilizationMethod> {
    vec![
        method("SM001", "Steam Sterilization", 45),
        method("SM002", "Chemical Sterilization", 75),
        method("SM003", "Plasma Sterilization", 60),
    ]
}
