use super::{deserialize_quantity, matches_search, Document, StockStatus};
use serde::{Deserialize, Serialize};
use validator::Validate;

/// Instruments and consumables on the shelf. Stored in `stockItems`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StockItem {
    /// `STK###`
    pub id: String,
    pub name: String,
    pub category: String,
    #[serde(deserialize_with = "deserialize_quantity")]
    pub quantity: i64,
    pub location: String,
    #[serde(deserialize_with = "deserialize_quantity")]
    pub min_level: i64,
    pub status: StockStatus,
}

impl StockItem {
    pub fn new(id: String, input: NewStockItem) -> Self {
        let status = StockStatus::for_levels(input.quantity, input.min_level);
        Self {
            id,
            name: input.name.trim().to_string(),
            category: input.category.trim().to_string(),
            quantity: input.quantity,
            location: input.location.trim().to_string(),
            min_level: input.min_level,
            status,
        }
    }

    pub fn matches(&self, search: &str) -> bool {
        matches_search(search, &[&self.id, &self.name, &self.category, &self.location])
    }
}

impl Document for StockItem {
    const COLLECTION: &'static str = "stockItems";

    fn id(&self) -> &str {
        &self.id
    }
}

/// Form input for adding or editing a stock item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct NewStockItem {
    #[validate(length(min = 1, message = "name is required"))]
    pub name: String,
    #[validate(length(min = 1, message = "category is required"))]
    pub category: String,
    #[validate(range(min = 0, message = "quantity cannot be negative"))]
    pub quantity: i64,
    #[validate(length(min = 1, message = "location is required"))]
    pub location: String,
    #[validate(range(min = 0, message = "minimum level cannot be negative"))]
    pub min_level: i64,
}
