//! Every status a CSSD record can occupy, and the legal moves between them.
//!
//! Status text arrives from the backend in whatever casing the writer used
//! ("Pending", "in_progress", "IN PROGRESS"). Parsing here is the one place
//! that text is interpreted; everything past this module compares enums.

use crate::errors::ServiceError;
use serde::{de, Deserialize, Deserializer, Serialize, Serializer};
use std::str::FromStr;
use strum::{Display, EnumIter, EnumString, IntoEnumIterator};

fn normalize(raw: &str) -> String {
    raw.split(|c: char| c == '_' || c == '-' || c.is_whitespace())
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

macro_rules! status_enum {
    ($ty:ident, $label:literal) => {
        impl Serialize for $ty {
            fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
                serializer.collect_str(self)
            }
        }

        impl<'de> Deserialize<'de> for $ty {
            fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
                let raw = String::deserialize(deserializer)?;
                $ty::parse(&raw).map_err(de::Error::custom)
            }
        }

        impl $ty {
            /// Parses case-insensitively; `_`, `-` and spaces between words are equivalent.
            pub fn parse(raw: &str) -> Result<Self, ServiceError> {
                <$ty as FromStr>::from_str(&normalize(raw)).map_err(|_| {
                    ServiceError::InvalidStatus(format!("unknown {} '{}'", $label, raw.trim()))
                })
            }

            /// Parses a filter value where empty text or "all" means no filter.
            pub fn parse_filter(raw: &str) -> Result<Option<Self>, ServiceError> {
                let trimmed = raw.trim();
                if trimmed.is_empty() || trimmed.eq_ignore_ascii_case("all") {
                    Ok(None)
                } else {
                    Self::parse(trimmed).map(Some)
                }
            }

            pub fn all() -> Vec<Self> {
                Self::iter().collect()
            }
        }
    };
}

/// Lifecycle of a sterilization request (and of its receive-item mirror).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, EnumIter)]
#[strum(ascii_case_insensitive)]
pub enum RequestStatus {
    #[strum(to_string = "Requested", serialize = "Pending")]
    Requested,
    #[strum(to_string = "Approved")]
    Approved,
    #[strum(to_string = "Rejected")]
    Rejected,
    #[strum(to_string = "In Progress", serialize = "InProgress", serialize = "Processing")]
    InProgress,
    #[strum(to_string = "Completed")]
    Completed,
}

status_enum!(RequestStatus, "request status");

impl RequestStatus {
    pub fn can_transition_to(self, next: RequestStatus) -> bool {
        use RequestStatus::*;
        match (self, next) {
            (from, to) if from == to => true,
            (Requested, Approved) | (Requested, Rejected) => true,
            (Approved, InProgress) => true,
            (InProgress, Completed) => true,
            _ => false,
        }
    }

    /// Validates a move to `next`, returning the new status.
    pub fn transition(self, next: RequestStatus) -> Result<RequestStatus, ServiceError> {
        if self.can_transition_to(next) {
            Ok(next)
        } else {
            Err(ServiceError::InvalidStatus(format!(
                "cannot move request from '{}' to '{}'",
                self, next
            )))
        }
    }

    /// A sterilization run may begin from this status.
    pub fn can_start_sterilization(self) -> bool {
        self != RequestStatus::InProgress && self.can_transition_to(RequestStatus::InProgress)
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, RequestStatus::Rejected | RequestStatus::Completed)
    }

    /// Still waiting on CSSD work: counted as an active request on the dashboard.
    pub fn is_active(self) -> bool {
        matches!(
            self,
            RequestStatus::Requested | RequestStatus::Approved | RequestStatus::InProgress
        )
    }
}

/// Lifecycle of a single sterilization run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, EnumIter)]
#[strum(ascii_case_insensitive)]
pub enum ProcessStatus {
    #[strum(to_string = "In Progress", serialize = "InProgress", serialize = "Running")]
    InProgress,
    #[strum(to_string = "Paused")]
    Paused,
    #[strum(to_string = "Completed")]
    Completed,
}

status_enum!(ProcessStatus, "process status");

impl ProcessStatus {
    pub fn can_transition_to(self, next: ProcessStatus) -> bool {
        use ProcessStatus::*;
        match (self, next) {
            (from, to) if from == to => true,
            (InProgress, Paused) | (Paused, InProgress) => true,
            (InProgress, Completed) | (Paused, Completed) => true,
            _ => false,
        }
    }

    pub fn transition(self, next: ProcessStatus) -> Result<ProcessStatus, ServiceError> {
        if self.can_transition_to(next) {
            Ok(next)
        } else {
            Err(ServiceError::InvalidStatus(format!(
                "cannot move sterilization process from '{}' to '{}'",
                self, next
            )))
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, EnumIter)]
#[strum(ascii_case_insensitive)]
pub enum AvailabilityStatus {
    #[strum(to_string = "Sterilized")]
    Sterilized,
}

status_enum!(AvailabilityStatus, "availability status");

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, EnumIter)]
#[strum(ascii_case_insensitive)]
pub enum IssueStatus {
    #[strum(to_string = "Issued")]
    Issued,
}

status_enum!(IssueStatus, "issue status");

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, EnumIter)]
#[strum(ascii_case_insensitive)]
pub enum KitStatus {
    #[strum(to_string = "Active")]
    Active,
}

status_enum!(KitStatus, "kit status");

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, EnumIter)]
#[strum(ascii_case_insensitive)]
pub enum StockStatus {
    #[strum(to_string = "In Stock", serialize = "InStock")]
    InStock,
    #[strum(to_string = "Low Stock", serialize = "LowStock")]
    LowStock,
    #[strum(to_string = "In Sterilization", serialize = "InSterilization")]
    InSterilization,
}

status_enum!(StockStatus, "stock status");

impl StockStatus {
    /// Base status from stock levels: strictly above the minimum is in stock.
    pub fn for_levels(quantity: i64, min_level: i64) -> StockStatus {
        if quantity > min_level {
            StockStatus::InStock
        } else {
            StockStatus::LowStock
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, EnumIter)]
#[strum(ascii_case_insensitive)]
pub enum MachineStatus {
    #[strum(to_string = "Available")]
    Available,
    #[strum(to_string = "In Use", serialize = "InUse")]
    InUse,
    #[strum(to_string = "Maintenance")]
    Maintenance,
}

status_enum!(MachineStatus, "machine status");

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, EnumIter)]
#[strum(ascii_case_insensitive)]
pub enum Priority {
    #[strum(to_string = "High")]
    High,
    #[strum(to_string = "Medium")]
    Medium,
    #[strum(to_string = "Low")]
    Low,
}

status_enum!(Priority, "priority");

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("Requested", RequestStatus::Requested)]
    #[case("pending", RequestStatus::Requested)]
    #[case("APPROVED", RequestStatus::Approved)]
    #[case("in_progress", RequestStatus::InProgress)]
    #[case("In-Progress", RequestStatus::InProgress)]
    #[case("  in   progress ", RequestStatus::InProgress)]
    #[case("processing", RequestStatus::InProgress)]
    #[case("completed", RequestStatus::Completed)]
    fn request_status_parses_loosely(#[case] raw: &str, #[case] expected: RequestStatus) {
        assert_eq!(RequestStatus::parse(raw).unwrap(), expected);
    }

    #[test]
    fn unknown_status_is_rejected() {
        let err = RequestStatus::parse("shipped").unwrap_err();
        assert!(matches!(err, ServiceError::InvalidStatus(_)));
    }

    #[test]
    fn filter_values_all_and_empty_mean_no_filter() {
        assert_eq!(RequestStatus::parse_filter("all").unwrap(), None);
        assert_eq!(RequestStatus::parse_filter("  ").unwrap(), None);
        assert_eq!(
            Priority::parse_filter("high").unwrap(),
            Some(Priority::High)
        );
    }

    #[test]
    fn serializes_canonical_display_strings() {
        assert_eq!(
            serde_json::to_string(&RequestStatus::InProgress).unwrap(),
            "\"In Progress\""
        );
        assert_eq!(
            serde_json::to_string(&StockStatus::LowStock).unwrap(),
            "\"Low Stock\""
        );
        let parsed: RequestStatus = serde_json::from_str("\"Pending\"").unwrap();
        assert_eq!(parsed, RequestStatus::Requested);
    }

    #[rstest]
    #[case(RequestStatus::Requested, RequestStatus::Approved, true)]
    #[case(RequestStatus::Requested, RequestStatus::Rejected, true)]
    #[case(RequestStatus::Approved, RequestStatus::InProgress, true)]
    #[case(RequestStatus::InProgress, RequestStatus::Completed, true)]
    #[case(RequestStatus::Approved, RequestStatus::Approved, true)]
    #[case(RequestStatus::Requested, RequestStatus::InProgress, false)]
    #[case(RequestStatus::Rejected, RequestStatus::Approved, false)]
    #[case(RequestStatus::Completed, RequestStatus::Requested, false)]
    #[case(RequestStatus::Approved, RequestStatus::Rejected, false)]
    fn request_transitions(
        #[case] from: RequestStatus,
        #[case] to: RequestStatus,
        #[case] allowed: bool,
    ) {
        assert_eq!(from.can_transition_to(to), allowed);
        assert_eq!(from.transition(to).is_ok(), allowed);
    }

    #[test]
    fn completed_process_is_terminal() {
        assert!(ProcessStatus::InProgress
            .transition(ProcessStatus::Paused)
            .is_ok());
        assert!(ProcessStatus::Paused
            .transition(ProcessStatus::Completed)
            .is_ok());
        assert!(ProcessStatus::Completed
            .transition(ProcessStatus::InProgress)
            .is_err());
        assert!(ProcessStatus::Completed
            .transition(ProcessStatus::Paused)
            .is_err());
    }

    #[test]
    fn stock_status_from_levels() {
        assert_eq!(StockStatus::for_levels(11, 10), StockStatus::InStock);
        assert_eq!(StockStatus::for_levels(10, 10), StockStatus::LowStock);
        assert_eq!(StockStatus::for_levels(0, 5), StockStatus::LowStock);
    }

    #[test]
    fn active_requests() {
        let active: Vec<_> = RequestStatus::all()
            .into_iter()
            .filter(|s| s.is_active())
            .collect();
        assert_eq!(
            active,
            vec![
                RequestStatus::Requested,
                RequestStatus::Approved,
                RequestStatus::InProgress
            ]
        );
    }
}
