use super::{deserialize_quantity, Document};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Instrument counts before and after one surgery.
/// Stored in `consumptionRecords`, keyed by surgery id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConsumptionRecord {
    pub id: String,
    #[serde(rename = "type")]
    pub surgery_type: String,
    pub dept: String,
    pub date: NaiveDate,
    #[serde(deserialize_with = "deserialize_quantity")]
    pub before: i64,
    #[serde(deserialize_with = "deserialize_quantity")]
    pub after: i64,
    #[serde(deserialize_with = "deserialize_quantity")]
    pub used: i64,
    pub items: String,
}

impl Document for ConsumptionRecord {
    const COLLECTION: &'static str = "consumptionRecords";

    fn id(&self) -> &str {
        &self.id
    }
}
