use super::{deserialize_quantity, matches_search, Document, KitStatus, Priority};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// A named bundle of instruments. Stored in `createdKits`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Kit {
    /// `KIT###`
    pub id: String,
    pub name: String,
    pub department: String,
    pub items: String,
    #[serde(deserialize_with = "deserialize_quantity")]
    pub quantity: i64,
    pub priority: Priority,
    pub status: KitStatus,
    pub date: NaiveDate,
    pub time: String,
}

impl Kit {
    pub fn matches(&self, search: &str) -> bool {
        matches_search(search, &[&self.id, &self.name, &self.department, &self.items])
    }
}

impl Document for Kit {
    const COLLECTION: &'static str = "createdKits";

    fn id(&self) -> &str {
        &self.id
    }
}
