use super::{deserialize_quantity, matches_search, Document, Priority, RequestStatus};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// A ward's sterilization request. Stored in `cssd_requests`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Request {
    /// `REQ###`
    pub id: String,
    pub department: String,
    /// Item names joined with ", "
    pub items: String,
    #[serde(deserialize_with = "deserialize_quantity")]
    pub quantity: i64,
    pub priority: Priority,
    #[serde(default)]
    pub requested_by: String,
    pub status: RequestStatus,
    pub date: NaiveDate,
    /// Local time of creation, `HH:MM`
    pub time: String,
}

impl Document for Request {
    const COLLECTION: &'static str = "cssd_requests";

    fn id(&self) -> &str {
        &self.id
    }
}

/// Filters applied to the request list. Every predicate must hold.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RequestFilter {
    /// Matched against id, department, items and requestedBy
    pub search: String,
    pub status: Option<RequestStatus>,
    pub priority: Option<Priority>,
    /// Inclusive lower bound on `date`
    pub date_from: Option<NaiveDate>,
    /// Inclusive upper bound on `date`
    pub date_to: Option<NaiveDate>,
}

impl RequestFilter {
    pub fn matches(&self, request: &Request) -> bool {
        matches_search(
            &self.search,
            &[
                &request.id,
                &request.department,
                &request.items,
                &request.requested_by,
            ],
        ) && self.status.map_or(true, |s| request.status == s)
            && self.priority.map_or(true, |p| request.priority == p)
            && self.date_from.map_or(true, |from| request.date >= from)
            && self.date_to.map_or(true, |to| request.date <= to)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(id: &str, status: RequestStatus, priority: Priority, date: &str) -> Request {
        Request {
            id: id.to_string(),
            department: "Cardiology".to_string(),
            items: "Syringe, Gloves".to_string(),
            quantity: 10,
            priority,
            requested_by: "Nurse Jo".to_string(),
            status,
            date: date.parse().unwrap(),
            time: "10:00".to_string(),
        }
    }

    #[test]
    fn loads_legacy_rows() {
        let raw = r#"{
            "id": "REQ003",
            "department": "Orthopedics",
            "items": "Bandage, Tape",
            "quantity": "8",
            "priority": "Low",
            "status": "Pending",
            "date": "2024-06-03",
            "time": "09:15 AM"
        }"#;
        let parsed: Request = serde_json::from_str(raw).unwrap();
        assert_eq!(parsed.quantity, 8);
        assert_eq!(parsed.status, RequestStatus::Requested);
        assert_eq!(parsed.requested_by, "");
    }

    #[test]
    fn writes_camel_case_fields() {
        let value = serde_json::to_value(request(
            "REQ001",
            RequestStatus::Requested,
            Priority::High,
            "2024-06-01",
        ))
        .unwrap();
        assert_eq!(value["requestedBy"], "Nurse Jo");
        assert_eq!(value["status"], "Requested");
        assert_eq!(value["date"], "2024-06-01");
    }

    #[test]
    fn date_range_is_inclusive() {
        let filter = RequestFilter {
            date_from: Some("2024-06-01".parse().unwrap()),
            date_to: Some("2024-06-03".parse().unwrap()),
            ..Default::default()
        };
        assert!(filter.matches(&request("REQ1", RequestStatus::Requested, Priority::Low, "2024-06-01")));
        assert!(filter.matches(&request("REQ2", RequestStatus::Requested, Priority::Low, "2024-06-03")));
        assert!(!filter.matches(&request("REQ3", RequestStatus::Requested, Priority::Low, "2024-06-04")));
    }

    #[test]
    fn search_covers_requested_by() {
        let filter = RequestFilter {
            search: "nurse jo".to_string(),
            ..Default::default()
        };
        assert!(filter.matches(&request("REQ1", RequestStatus::Approved, Priority::Medium, "2024-06-01")));
    }
}
