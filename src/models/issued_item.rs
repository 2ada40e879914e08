use super::{deserialize_quantity, matches_search, Document, IssueStatus};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Hand-over of a sterilized request to a department. Stored in `issuedItems`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IssuedItem {
    /// `ISS###`
    pub id: String,
    pub request_id: String,
    pub department: String,
    pub items: String,
    #[serde(deserialize_with = "deserialize_quantity")]
    pub quantity: i64,
    pub issued_time: String,
    pub issued_date: NaiveDate,
    pub status: IssueStatus,
}

impl IssuedItem {
    pub fn matches(&self, search: &str) -> bool {
        matches_search(search, &[&self.id, &self.request_id, &self.department])
    }
}

impl Document for IssuedItem {
    const COLLECTION: &'static str = "issuedItems";

    fn id(&self) -> &str {
        &self.id
    }
}
