//! Records stored in the CSSD document backend.
//!
//! Field names serialize in camelCase because that is how the backend
//! collections were first written and existing rows must keep loading.

use serde::{de::DeserializeOwned, Deserialize, Deserializer, Serialize};

pub mod available_item;
pub mod consumption;
pub mod ids;
pub mod issued_item;
pub mod kit;
pub mod line_item;
pub mod receive_item;
pub mod request;
pub mod status;
pub mod sterilization;
pub mod stock_item;

pub use available_item::AvailableItem;
pub use consumption::ConsumptionRecord;
pub use issued_item::IssuedItem;
pub use kit::Kit;
pub use line_item::LineItem;
pub use receive_item::ReceiveItem;
pub use request::Request;
pub use status::{
    AvailabilityStatus, IssueStatus, KitStatus, MachineStatus, Priority, ProcessStatus,
    RequestStatus, StockStatus,
};
pub use sterilization::{Machine, SterilizationMethod, SterilizationProcess};
pub use stock_item::StockItem;

/// A record that lives in a named backend collection and is addressed by `id`.
pub trait Document: Serialize + DeserializeOwned + Clone + Send + Sync + 'static {
    /// Backend collection name (also the URL path segment).
    const COLLECTION: &'static str;

    fn id(&self) -> &str;
}

/// Quantities were stored as numbers by most writers and as numeric text by
/// some older ones; accept both.
pub(crate) fn deserialize_quantity<'de, D>(deserializer: D) -> Result<i64, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum NumberOrText {
        Number(i64),
        Float(f64),
        Text(String),
    }

    match NumberOrText::deserialize(deserializer)? {
        NumberOrText::Number(n) => Ok(n),
        NumberOrText::Float(f) if f.fract() == 0.0 => Ok(f as i64),
        NumberOrText::Float(f) => Err(serde::de::Error::custom(format!(
            "quantity must be a whole number, got {}",
            f
        ))),
        NumberOrText::Text(s) => s
            .trim()
            .parse::<i64>()
            .map_err(|_| serde::de::Error::custom(format!("invalid quantity '{}'", s))),
    }
}

/// Older rows store "" for timestamps that were never set, or a bare
/// "HH:MM" clock time with no date. Neither names an instant.
pub(crate) fn deserialize_optional_timestamp<'de, D>(
    deserializer: D,
) -> Result<Option<chrono::DateTime<chrono::Utc>>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<String> = Option::deserialize(deserializer)?;
    match raw.as_deref().map(str::trim) {
        None | Some("") => Ok(None),
        Some(text) if chrono::NaiveTime::parse_from_str(text, "%H:%M").is_ok() => Ok(None),
        Some(text) => chrono::DateTime::parse_from_rfc3339(text)
            .map(|dt| Some(dt.with_timezone(&chrono::Utc)))
            .map_err(serde::de::Error::custom),
    }
}

/// Case-insensitive substring match used by every list search box.
pub fn contains_ignore_case(haystack: &str, needle: &str) -> bool {
    haystack.to_lowercase().contains(&needle.to_lowercase())
}

/// True when `term` is blank or appears in any of `fields`.
pub fn matches_search(term: &str, fields: &[&str]) -> bool {
    let term = term.trim();
    term.is_empty() || fields.iter().any(|field| contains_ignore_case(field, term))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Deserialize)]
    struct Row {
        #[serde(deserialize_with = "deserialize_quantity")]
        quantity: i64,
    }

    #[test]
    fn quantity_accepts_numbers_and_numeric_text() {
        let row: Row = serde_json::from_str(r#"{"quantity": 7}"#).unwrap();
        assert_eq!(row.quantity, 7);
        let row: Row = serde_json::from_str(r#"{"quantity": "12"}"#).unwrap();
        assert_eq!(row.quantity, 12);
        let row: Row = serde_json::from_str(r#"{"quantity": 3.0}"#).unwrap();
        assert_eq!(row.quantity, 3);
        assert!(serde_json::from_str::<Row>(r#"{"quantity": "ten"}"#).is_err());
    }

    #[derive(Deserialize)]
    struct Stamped {
        #[serde(default, deserialize_with = "deserialize_optional_timestamp")]
        at: Option<chrono::DateTime<chrono::Utc>>,
    }

    #[test]
    fn timestamps_without_a_date_load_as_none() {
        for raw in [r#"{"at": ""}"#, r#"{"at": "10:30"}"#, r#"{"at": null}"#, "{}"] {
            let row: Stamped = serde_json::from_str(raw).unwrap();
            assert_eq!(row.at, None, "{}", raw);
        }
        let row: Stamped = serde_json::from_str(r#"{"at": "2024-06-10T08:00:00+02:00"}"#).unwrap();
        assert_eq!(row.at.map(|t| t.to_rfc3339()), Some("2024-06-10T06:00:00+00:00".to_string()));
        assert!(serde_json::from_str::<Stamped>(r#"{"at": "half past ten"}"#).is_err());
    }

    #[test]
    fn search_is_case_insensitive_and_blank_matches_everything() {
        assert!(matches_search("", &["anything"]));
        assert!(matches_search("cardio", &["REQ001", "Cardiology"]));
        assert!(!matches_search("neuro", &["REQ001", "Cardiology"]));
    }
}
