use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{info, instrument};

use crate::{
    errors::ServiceError,
    events::{Event, EventSender},
    metrics,
    models::{ids::compare_ids, ConsumptionRecord},
    repositories::CssdStore,
};

/// Form input for one surgery's counts. `used` is derived when left out.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NewConsumptionRecord {
    /// Surgery id
    pub id: String,
    pub surgery_type: String,
    pub dept: String,
    pub date: Option<NaiveDate>,
    pub before: Option<i64>,
    pub after: Option<i64>,
    pub used: Option<i64>,
    pub items: String,
}

impl NewConsumptionRecord {
    fn into_record(self) -> Result<ConsumptionRecord, ServiceError> {
        let mut missing = Vec::new();
        for (name, value) in [
            ("id", &self.id),
            ("type", &self.surgery_type),
            ("dept", &self.dept),
            ("items", &self.items),
        ] {
            if value.trim().is_empty() {
                missing.push(name);
            }
        }
        if self.date.is_none() {
            missing.push("date");
        }
        if self.before.is_none() {
            missing.push("before");
        }
        if self.after.is_none() {
            missing.push("after");
        }
        let (Some(date), Some(before), Some(after)) = (self.date, self.before, self.after) else {
            return Err(ServiceError::missing_fields(&missing));
        };
        if !missing.is_empty() {
            return Err(ServiceError::missing_fields(&missing));
        }

        if before < 0 || after < 0 {
            return Err(ServiceError::ValidationError(
                "counts cannot be negative".to_string(),
            ));
        }
        if after > before {
            return Err(ServiceError::ValidationError(format!(
                "after count ({}) cannot exceed before count ({})",
                after, before
            )));
        }
        let used = self.used.unwrap_or(before - after);
        if used < 0 {
            return Err(ServiceError::ValidationError(
                "used count cannot be negative".to_string(),
            ));
        }

        Ok(ConsumptionRecord {
            id: self.id.trim().to_string(),
            surgery_type: self.surgery_type.trim().to_string(),
            dept: self.dept.trim().to_string(),
            date,
            before,
            after,
            used,
            items: self.items.trim().to_string(),
        })
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ReportFilter {
    pub date_from: Option<NaiveDate>,
    pub date_to: Option<NaiveDate>,
    /// Case-insensitive exact match on `dept`
    pub department: Option<String>,
}

impl ReportFilter {
    fn matches(&self, record: &ConsumptionRecord) -> bool {
        self.date_from.map_or(true, |from| record.date >= from)
            && self.date_to.map_or(true, |to| record.date <= to)
            && self.department.as_deref().map(str::trim).map_or(true, |dept| {
                dept.is_empty() || record.dept.eq_ignore_ascii_case(dept)
            })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DepartmentUsage {
    pub department: String,
    pub used: i64,
    pub surgeries: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WeeklyUsage {
    /// ISO week, `YYYY-Www`
    pub week: String,
    pub used: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ConsumptionReport {
    pub records: Vec<ConsumptionRecord>,
    pub total_consumption: i64,
    pub total_surgeries: usize,
    pub average_per_surgery: f64,
    pub by_department: Vec<DepartmentUsage>,
    pub by_week: Vec<WeeklyUsage>,
}

impl ConsumptionReport {
    pub fn build(mut records: Vec<ConsumptionRecord>) -> Self {
        records.sort_by(|a, b| a.date.cmp(&b.date).then_with(|| compare_ids(&a.id, &b.id)));

        let total_consumption: i64 = records.iter().map(|r| r.used).sum();
        let total_surgeries = records.len();
        let average_per_surgery = if total_surgeries == 0 {
            0.0
        } else {
            total_consumption as f64 / total_surgeries as f64
        };

        let mut departments: BTreeMap<&str, (i64, usize)> = BTreeMap::new();
        let mut weeks: BTreeMap<String, i64> = BTreeMap::new();
        for record in &records {
            let entry = departments.entry(record.dept.as_str()).or_default();
            entry.0 += record.used;
            entry.1 += 1;
            *weeks.entry(iso_week_label(record.date)).or_default() += record.used;
        }

        let by_department = departments
            .into_iter()
            .map(|(department, (used, surgeries))| DepartmentUsage {
                department: department.to_string(),
                used,
                surgeries,
            })
            .collect();
        let by_week = weeks
            .into_iter()
            .map(|(week, used)| WeeklyUsage { week, used })
            .collect();

        Self {
            records,
            total_consumption,
            total_surgeries,
            average_per_surgery,
            by_department,
            by_week,
        }
    }
}

pub fn iso_week_label(date: NaiveDate) -> String {
    let week = date.iso_week();
    format!("{:04}-W{:02}", week.year(), week.week())
}

/// Consumption Reports: per-surgery instrument usage
#[derive(Clone)]
pub struct ConsumptionService {
    store: Arc<CssdStore>,
    event_sender: Arc<EventSender>,
}

impl ConsumptionService {
    pub fn new(store: Arc<CssdStore>, event_sender: Arc<EventSender>) -> Self {
        Self {
            store,
            event_sender,
        }
    }

    #[instrument(skip(self))]
    pub async fn add(&self, input: NewConsumptionRecord) -> Result<ConsumptionRecord, ServiceError> {
        let record = input.into_record()?;

        let _guard = self.store.lock_lifecycle().await;
        if self.store.consumption_records.get(&record.id).await?.is_some() {
            return Err(ServiceError::Conflict(format!(
                "consumption for surgery {} is already recorded",
                record.id
            )));
        }
        let record = self.store.consumption_records.create(&record).await?;

        info!(surgery_id = %record.id, used = record.used, "Consumption recorded");
        metrics::increment(metrics::CONSUMPTION_RECORDED);
        self.event_sender
            .publish(Event::ConsumptionRecorded(record.id.clone()))
            .await;
        Ok(record)
    }

    #[instrument(skip(self))]
    pub async fn report(&self, filter: &ReportFilter) -> Result<ConsumptionReport, ServiceError> {
        let records = self
            .store
            .consumption_records
            .list()
            .await?
            .into_iter()
            .filter(|r| filter.matches(r))
            .collect();
        Ok(ConsumptionReport::build(records))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(id: &str, dept: &str, date: &str, used: i64) -> ConsumptionRecord {
        ConsumptionRecord {
            id: id.to_string(),
            surgery_type: "Appendectomy".to_string(),
            dept: dept.to_string(),
            date: date.parse().unwrap(),
            before: 20,
            after: 20 - used,
            used,
            items: "Basic Surgery Kit".to_string(),
        }
    }

    #[test]
    fn report_totals_and_groupings() {
        let report = ConsumptionReport::build(vec![
            record("SURG002", "OR-2", "2024-06-10", 3),
            record("SURG001", "OR-1", "2024-06-10", 7),
            record("SURG003", "OR-1", "2024-06-09", 3),
            record("SURG004", "OR-2", "2024-06-12", 5),
        ]);

        assert_eq!(report.total_consumption, 18);
        assert_eq!(report.total_surgeries, 4);
        assert!((report.average_per_surgery - 4.5).abs() < f64::EPSILON);
        assert_eq!(report.records[0].id, "SURG003");
        assert_eq!(
            report.by_department,
            vec![
                DepartmentUsage { department: "OR-1".into(), used: 10, surgeries: 2 },
                DepartmentUsage { department: "OR-2".into(), used: 8, surgeries: 2 },
            ]
        );
        // 2024-06-09 is a Sunday, the last day of ISO week 23
        assert_eq!(
            report.by_week,
            vec![
                WeeklyUsage { week: "2024-W23".into(), used: 3 },
                WeeklyUsage { week: "2024-W24".into(), used: 15 },
            ]
        );
    }

    #[test]
    fn empty_report_averages_zero() {
        let report = ConsumptionReport::build(vec![]);
        assert_eq!(report.total_surgeries, 0);
        assert_eq!(report.average_per_surgery, 0.0);
    }

    #[test]
    fn iso_week_crosses_year_boundary() {
        assert_eq!(iso_week_label("2024-12-30".parse().unwrap()), "2025-W01");
        assert_eq!(iso_week_label("2021-01-03".parse().unwrap()), "2020-W53");
    }

    #[test]
    fn used_defaults_to_difference_and_after_cannot_exceed_before() {
        let input = NewConsumptionRecord {
            id: "SURG009".into(),
            surgery_type: "Cardiac Surgery".into(),
            dept: "OR-1".into(),
            date: "2024-06-10".parse().ok(),
            before: Some(25),
            after: Some(18),
            used: None,
            items: "Forceps".into(),
        };
        assert_eq!(input.clone().into_record().unwrap().used, 7);

        let bad = NewConsumptionRecord { after: Some(30), ..input.clone() };
        assert!(matches!(bad.into_record(), Err(ServiceError::ValidationError(_))));

        let missing = NewConsumptionRecord { dept: " ".into(), before: None, ..input };
        let err = missing.into_record().unwrap_err();
        assert_eq!(
            err.to_string(),
            "Validation error: missing required fields: dept, before"
        );
    }
}
