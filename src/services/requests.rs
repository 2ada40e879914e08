use chrono::NaiveDate;
use std::sync::Arc;
use tracing::instrument;

use crate::{
    clock::Clock,
    commands::{requests::CreateRequestCommand, Command},
    errors::ServiceError,
    events::EventSender,
    models::{ids::compare_ids, request::RequestFilter, LineItem, Priority, Request},
    repositories::CssdStore,
    Page,
};

/// Lines staged on the request form before anything is saved.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RequestDraft {
    pub department: String,
    pub priority: Option<Priority>,
    pub date: Option<NaiveDate>,
    pub requested_by: String,
    lines: Vec<LineItem>,
}

impl RequestDraft {
    pub fn new(department: &str, priority: Priority, date: NaiveDate, requested_by: &str) -> Self {
        Self {
            department: department.trim().to_string(),
            priority: Some(priority),
            date: Some(date),
            requested_by: requested_by.trim().to_string(),
            lines: Vec::new(),
        }
    }

    /// Stages one line. Every missing field is named in the error, header
    /// fields included.
    pub fn add_line(&mut self, item: &str, quantity: &str) -> Result<&LineItem, ServiceError> {
        let mut missing = Vec::new();
        if item.trim().is_empty() {
            missing.push("item");
        }
        if quantity.trim().is_empty() {
            missing.push("quantity");
        }
        missing.extend(self.missing_header_fields());
        if !missing.is_empty() {
            return Err(ServiceError::missing_fields(&missing));
        }

        self.lines.push(LineItem::parse(item, quantity)?);
        Ok(&self.lines[self.lines.len() - 1])
    }

    pub fn remove_line(&mut self, index: usize) -> Option<LineItem> {
        (index < self.lines.len()).then(|| self.lines.remove(index))
    }

    pub fn lines(&self) -> &[LineItem] {
        &self.lines
    }

    pub fn clear(&mut self) {
        self.lines.clear();
    }

    fn missing_header_fields(&self) -> Vec<&'static str> {
        let mut missing = Vec::new();
        if self.department.trim().is_empty() {
            missing.push("department");
        }
        if self.priority.is_none() {
            missing.push("priority");
        }
        if self.date.is_none() {
            missing.push("date");
        }
        missing
    }
}

/// Request Management: staging, saving and listing sterilization requests
#[derive(Clone)]
pub struct RequestService {
    store: Arc<CssdStore>,
    event_sender: Arc<EventSender>,
    clock: Arc<dyn Clock>,
    page_size: u32,
}

impl RequestService {
    pub fn new(
        store: Arc<CssdStore>,
        event_sender: Arc<EventSender>,
        clock: Arc<dyn Clock>,
        page_size: u32,
    ) -> Self {
        Self {
            store,
            event_sender,
            clock,
            page_size,
        }
    }

    /// Saves the staged lines as one request and clears them on success.
    #[instrument(skip(self, draft))]
    pub async fn save(&self, draft: &mut RequestDraft) -> Result<Request, ServiceError> {
        let missing = draft.missing_header_fields();
        if !missing.is_empty() {
            return Err(ServiceError::missing_fields(&missing));
        }
        let (Some(priority), Some(date)) = (draft.priority, draft.date) else {
            return Err(ServiceError::missing_fields(&["priority", "date"]));
        };

        let command = CreateRequestCommand {
            department: draft.department.clone(),
            priority,
            requested_by: draft.requested_by.clone(),
            date,
            time: self.clock.time_of_day(),
            lines: draft.lines.clone(),
        };
        let result = command
            .execute(self.store.clone(), self.event_sender.clone())
            .await?;

        draft.clear();
        Ok(result.request)
    }

    /// Filtered, id-sorted page of requests.
    #[instrument(skip(self))]
    pub async fn list(&self, filter: &RequestFilter, page: u64) -> Result<Page<Request>, ServiceError> {
        let mut rows: Vec<Request> = self
            .store
            .requests
            .list()
            .await?
            .into_iter()
            .filter(|request| filter.matches(request))
            .collect();
        rows.sort_by(|a, b| compare_ids(&a.id, &b.id));

        Ok(Page::paginate(rows, page, u64::from(self.page_size)))
    }

    pub async fn get(&self, id: &str) -> Result<Request, ServiceError> {
        self.store.requests.fetch(id).await
    }
}
