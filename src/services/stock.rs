use std::collections::HashSet;
use std::sync::Arc;
use tracing::{info, instrument};
use validator::Validate;

use crate::{
    errors::ServiceError,
    events::{Event, EventSender},
    metrics,
    models::{
        ids::{compare_ids, STOCK_PREFIX}, stock_item::NewStockItem, ProcessStatus, StockItem, StockStatus,
    },
    repositories::CssdStore,
};

/// Stock Management: shelf levels against minimums
#[derive(Clone)]
pub struct StockService {
    store: Arc<CssdStore>,
    event_sender: Arc<EventSender>,
}

impl StockService {
    pub fn new(store: Arc<CssdStore>, event_sender: Arc<EventSender>) -> Self {
        Self {
            store,
            event_sender,
        }
    }

    #[instrument(skip(self))]
    pub async fn add(&self, input: NewStockItem) -> Result<StockItem, ServiceError> {
        input.validate()?;

        let _guard = self.store.lock_lifecycle().await;
        let id = self.store.stock_items.next_id(STOCK_PREFIX).await?;
        let item = self.store.stock_items.create(&StockItem::new(id, input)).await?;

        info!(stock_id = %item.id, status = %item.status, "Stock item added");
        metrics::increment(metrics::STOCK_CHANGES);
        self.event_sender
            .publish(Event::StockItemAdded(item.id.clone()))
            .await;
        Ok(item)
    }

    /// Replaces every editable field and recomputes the status.
    #[instrument(skip(self))]
    pub async fn update(&self, id: &str, input: NewStockItem) -> Result<StockItem, ServiceError> {
        input.validate()?;

        let _guard = self.store.lock_lifecycle().await;
        let existing = self.store.stock_items.fetch(id).await?;
        let item = self
            .store
            .stock_items
            .replace(&StockItem::new(existing.id, input))
            .await?;

        info!(stock_id = %item.id, status = %item.status, "Stock item updated");
        metrics::increment(metrics::STOCK_CHANGES);
        self.event_sender
            .publish(Event::StockItemUpdated(item.id.clone()))
            .await;
        Ok(item)
    }

    #[instrument(skip(self))]
    pub async fn delete(&self, id: &str) -> Result<(), ServiceError> {
        let _guard = self.store.lock_lifecycle().await;
        self.store.stock_items.delete(id).await?;

        info!(stock_id = %id, "Stock item deleted");
        metrics::increment(metrics::STOCK_CHANGES);
        self.event_sender
            .publish(Event::StockItemDeleted(id.to_string()))
            .await;
        Ok(())
    }

    /// Items matching `search`, sorted by id. Anything currently in a
    /// running sterilization process is reported as `In Sterilization`.
    pub async fn list(&self, search: &str) -> Result<Vec<StockItem>, ServiceError> {
        let running: HashSet<String> = self
            .store
            .processes
            .list()
            .await?
            .into_iter()
            .filter(|p| p.status == ProcessStatus::InProgress)
            .map(|p| p.item_id)
            .collect();

        let mut rows: Vec<StockItem> = self
            .store
            .stock_items
            .list()
            .await?
            .into_iter()
            .filter(|item| item.matches(search))
            .map(|mut item| {
                if running.contains(&item.id) {
                    item.status = StockStatus::InSterilization;
                }
                item
            })
            .collect();
        rows.sort_by(|a, b| compare_ids(&a.id, &b.id));
        Ok(rows)
    }

    /// Items at or below their minimum level.
    pub async fn low_stock(&self) -> Result<Vec<StockItem>, ServiceError> {
        let mut rows: Vec<StockItem> = self
            .store
            .stock_items
            .list()
            .await?
            .into_iter()
            .filter(|item| StockStatus::for_levels(item.quantity, item.min_level) == StockStatus::LowStock)
            .collect();
        rows.sort_by(|a, b| compare_ids(&a.id, &b.id));
        Ok(rows)
    }
}
