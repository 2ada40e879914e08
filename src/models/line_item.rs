use crate::errors::ServiceError;
use serde::{Deserialize, Serialize};

/// One staged line of a request or kit before it is saved.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineItem {
    pub item: String,
    pub quantity: i64,
}

impl LineItem {
    /// Builds a line from form text. The quantity is parsed as a whole
    /// number so that later totals add numerically.
    pub fn parse(item: &str, quantity: &str) -> Result<Self, ServiceError> {
        let item = item.trim();
        let quantity_text = quantity.trim();

        let mut missing = Vec::new();
        if item.is_empty() {
            missing.push("item");
        }
        if quantity_text.is_empty() {
            missing.push("quantity");
        }
        if !missing.is_empty() {
            return Err(ServiceError::missing_fields(&missing));
        }

        let quantity = quantity_text.parse::<i64>().map_err(|_| {
            ServiceError::ValidationError(format!(
                "quantity must be a whole number, got '{}'",
                quantity_text
            ))
        })?;
        if quantity <= 0 {
            return Err(ServiceError::ValidationError(format!(
                "quantity must be positive, got {}",
                quantity
            )));
        }

        Ok(Self {
            item: item.to_string(),
            quantity,
        })
    }
}

/// Joins item names with ", " and sums quantities.
pub fn collapse(lines: &[LineItem]) -> (String, i64) {
    let names = lines
        .iter()
        .map(|line| line.item.as_str())
        .collect::<Vec<_>>()
        .join(", ");
    let total = lines.iter().map(|line| line.quantity).sum();
    (names, total)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn numeric_text_quantities_sum_as_numbers() {
        let lines = vec![
            LineItem::parse("Syringe", "10").unwrap(),
            LineItem::parse("Gloves", " 5 ").unwrap(),
        ];
        let (items, total) = collapse(&lines);
        assert_eq!(items, "Syringe, Gloves");
        // "10" + "5" must be 15, never "105"
        assert_eq!(total, 15);
    }

    #[test]
    fn rejects_blank_and_non_numeric_lines() {
        assert!(matches!(
            LineItem::parse("", ""),
            Err(ServiceError::ValidationError(msg)) if msg.contains("item, quantity")
        ));
        assert!(LineItem::parse("Scalpel", "two").is_err());
        assert!(LineItem::parse("Scalpel", "0").is_err());
        assert!(LineItem::parse("Scalpel", "-3").is_err());
    }
}
