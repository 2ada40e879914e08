use std::sync::Arc;
use tracing::instrument;

use crate::{
    clock::Clock,
    commands::{kitting::CreateKitCommand, Command},
    errors::ServiceError,
    events::EventSender,
    models::{ids::compare_ids, Kit, LineItem, Priority},
    repositories::CssdStore,
};

/// Kit form staging. Lines follow the same rules as request lines.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct KitDraft {
    pub name: String,
    pub department: String,
    pub priority: Option<Priority>,
    lines: Vec<LineItem>,
}

impl KitDraft {
    pub fn new(name: &str, department: &str, priority: Priority) -> Self {
        Self {
            name: name.trim().to_string(),
            department: department.trim().to_string(),
            priority: Some(priority),
            lines: Vec::new(),
        }
    }

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

    pub fn lines(&self) -> &[LineItem] {
        &self.lines
    }

    fn missing_header_fields(&self) -> Vec<&'static str> {
        let mut missing = Vec::new();
        if self.name.trim().is_empty() {
            missing.push("name");
        }
        if self.department.trim().is_empty() {
            missing.push("department");
        }
        if self.priority.is_none() {
            missing.push("priority");
        }
        missing
    }
}

#[derive(Clone)]
pub struct KitService {
    store: Arc<CssdStore>,
    event_sender: Arc<EventSender>,
    clock: Arc<dyn Clock>,
}

impl KitService {
    pub fn new(store: Arc<CssdStore>, event_sender: Arc<EventSender>, clock: Arc<dyn Clock>) -> Self {
        Self {
            store,
            event_sender,
            clock,
        }
    }

    /// Saves the draft as an `Active` kit and clears its lines.
    #[instrument(skip(self, draft))]
    pub async fn save(&self, draft: &mut KitDraft) -> Result<Kit, ServiceError> {
        let missing = draft.missing_header_fields();
        if !missing.is_empty() {
            return Err(ServiceError::missing_fields(&missing));
        }
        let Some(priority) = draft.priority else {
            return Err(ServiceError::missing_fields(&["priority"]));
        };

        let kit = CreateKitCommand {
            name: draft.name.clone(),
            department: draft.department.clone(),
            priority,
            date: self.clock.today(),
            time: self.clock.time_of_day(),
            lines: draft.lines.clone(),
        }
        .execute(self.store.clone(), self.event_sender.clone())
        .await?;

        draft.lines.clear();
        Ok(kit)
    }

    pub async fn list(&self, search: &str) -> Result<Vec<Kit>, ServiceError> {
        let mut rows: Vec<Kit> = self
            .store
            .kits
            .list()
            .await?
            .into_iter()
            .filter(|kit| kit.matches(search))
            .collect();
        rows.sort_by(|a, b| compare_ids(&a.id, &b.id));
        Ok(rows)
    }
}
