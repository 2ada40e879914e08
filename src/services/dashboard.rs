use serde::Serialize;
use std::sync::Arc;

use crate::{
    errors::ServiceError,
    models::{ProcessStatus, StockStatus},
    repositories::CssdStore,
};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DashboardStats {
    /// Requested, Approved or In Progress
    pub active_requests: usize,
    pub sterilization_in_progress: usize,
    /// Entries in the available pool
    pub items_ready: usize,
    pub low_stock_items: usize,
}

#[derive(Clone)]
pub struct DashboardService {
    store: Arc<CssdStore>,
}

impl DashboardService {
    pub fn new(store: Arc<CssdStore>) -> Self {
        Self { store }
    }

    pub async fn stats(&self) -> Result<DashboardStats, ServiceError> {
        let (requests, processes, available, stock) = tokio::try_join!(
            self.store.requests.list(),
            self.store.processes.list(),
            self.store.available_items.list(),
            self.store.stock_items.list(),
        )?;

        Ok(DashboardStats {
            active_requests: requests.iter().filter(|r| r.status.is_active()).count(),
            sterilization_in_progress: processes
                .iter()
                .filter(|p| p.status == ProcessStatus::InProgress)
                .count(),
            items_ready: available.len(),
            low_stock_items: stock
                .iter()
                .filter(|s| StockStatus::for_levels(s.quantity, s.min_level) == StockStatus::LowStock)
                .count(),
        })
    }
}
