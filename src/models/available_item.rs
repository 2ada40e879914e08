use super::{
    deserialize_quantity, matches_search, AvailabilityStatus, Document, Request,
    SterilizationProcess,
};
use serde::{Deserialize, Serialize};

/// A sterilized request waiting to be issued. Keyed by the request id, so a
/// request has at most one entry in `availableItems`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AvailableItem {
    pub id: String,
    pub department: String,
    pub items: String,
    #[serde(deserialize_with = "deserialize_quantity")]
    pub quantity: i64,
    pub status: AvailabilityStatus,
    /// RFC 3339 time the run finished
    pub ready_time: String,
    #[serde(default)]
    pub sterilization_id: String,
    #[serde(default)]
    pub machine: String,
    #[serde(default)]
    pub process: String,
}

impl AvailableItem {
    pub fn from_completion(request: &Request, process: &SterilizationProcess) -> Self {
        let ready = process
            .end_time
            .or(process.start_time)
            .map(|t| t.to_rfc3339())
            .unwrap_or_default();
        Self {
            id: request.id.clone(),
            department: request.department.clone(),
            items: request.items.clone(),
            quantity: request.quantity,
            status: AvailabilityStatus::Sterilized,
            ready_time: ready,
            sterilization_id: process.id.clone(),
            machine: process.machine.clone(),
            process: process.process.clone(),
        }
    }

    pub fn matches(&self, search: &str) -> bool {
        matches_search(search, &[&self.id, &self.department, &self.items])
    }
}

impl Document for AvailableItem {
    const COLLECTION: &'static str = "availableItems";

    fn id(&self) -> &str {
        &self.id
    }
}
