use super::{deserialize_quantity, matches_search, Document, Priority, Request, RequestStatus};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// The receiving desk's copy of a request. Stored in `receive_items`;
/// its status is kept in step with the request it points at.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReceiveItem {
    /// `REC###`
    pub id: String,
    pub request_id: String,
    pub department: String,
    pub items: String,
    #[serde(deserialize_with = "deserialize_quantity")]
    pub quantity: i64,
    pub priority: Priority,
    #[serde(default)]
    pub requested_by: String,
    pub status: RequestStatus,
    pub date: NaiveDate,
    pub time: String,
}

impl ReceiveItem {
    pub fn mirror_of(id: String, request: &Request) -> Self {
        Self {
            id,
            request_id: request.id.clone(),
            department: request.department.clone(),
            items: request.items.clone(),
            quantity: request.quantity,
            priority: request.priority,
            requested_by: request.requested_by.clone(),
            status: request.status,
            date: request.date,
            time: request.time.clone(),
        }
    }

    pub fn matches(&self, search: &str, status: Option<RequestStatus>) -> bool {
        matches_search(
            search,
            &[&self.id, &self.request_id, &self.department, &self.items],
        ) && status.map_or(true, |s| self.status == s)
    }
}

impl Document for ReceiveItem {
    const COLLECTION: &'static str = "receive_items";

    fn id(&self) -> &str {
        &self.id
    }
}
