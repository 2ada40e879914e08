use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tracing::{error, info, warn};

use crate::models::RequestStatus;

#[derive(Debug, Clone)]
pub struct EventSender {
    sender: mpsc::Sender<Event>,
}

impl EventSender {
    /// Creates a new EventSender
    pub fn new(sender: mpsc::Sender<Event>) -> Self {
        Self { sender }
    }

    /// Sends an event asynchronously
    pub async fn send(&self, event: Event) -> Result<(), String> {
        self.sender
            .send(event)
            .await
            .map_err(|e| format!("Failed to send event: {}", e))
    }

    /// Sends after a write has already landed. The write stands either way,
    /// so a closed channel is logged rather than returned.
    pub async fn publish(&self, event: Event) {
        if let Err(e) = self.send(event).await {
            warn!(error = %e, "dropping lifecycle event");
        }
    }
}

/// Bounded channel pair for lifecycle events.
pub fn channel(capacity: usize) -> (EventSender, mpsc::Receiver<Event>) {
    let (tx, rx) = mpsc::channel(capacity.max(1));
    (EventSender::new(tx), rx)
}

// Lifecycle events raised after successful writes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Event {
    // Request events
    RequestCreated {
        request_id: String,
        receive_item_id: String,
    },
    RequestStatusChanged {
        request_id: String,
        old_status: RequestStatus,
        new_status: RequestStatus,
    },
    ReceiveItemsReconciled {
        repaired: Vec<String>,
    },

    // Sterilization events
    SterilizationStarted {
        process_id: String,
        request_id: String,
        machine: String,
    },
    SterilizationPaused(String),
    SterilizationResumed(String),
    SterilizationCompleted {
        process_id: String,
        request_id: String,
        completed_at: DateTime<Utc>,
    },

    // Issue events
    ItemIssued {
        issue_id: String,
        request_id: String,
        department: String,
    },

    // Stock and kit events
    StockItemAdded(String),
    StockItemUpdated(String),
    StockItemDeleted(String),
    KitCreated(String),
    ConsumptionRecorded(String),
}

impl Event {
    pub fn name(&self) -> &'static str {
        match self {
            Event::RequestCreated { .. } => "request_created",
            Event::RequestStatusChanged { .. } => "request_status_changed",
            Event::ReceiveItemsReconciled { .. } => "receive_items_reconciled",
            Event::SterilizationStarted { .. } => "sterilization_started",
            Event::SterilizationPaused(_) => "sterilization_paused",
            Event::SterilizationResumed(_) => "sterilization_resumed",
            Event::SterilizationCompleted { .. } => "sterilization_completed",
            Event::ItemIssued { .. } => "item_issued",
            Event::StockItemAdded(_) => "stock_item_added",
            Event::StockItemUpdated(_) => "stock_item_updated",
            Event::StockItemDeleted(_) => "stock_item_deleted",
            Event::KitCreated(_) => "kit_created",
            Event::ConsumptionRecorded(_) => "consumption_recorded",
        }
    }
}

pub async fn process_events(mut rx: mpsc::Receiver<Event>) {
    info!("Starting event processing loop");

    while let Some(event) = rx.recv().await {
        match &event {
            Event::RequestStatusChanged {
                request_id,
                old_status,
                new_status,
            } => {
                info!(
                    event = event.name(),
                    %request_id,
                    %old_status,
                    %new_status,
                    "request status changed"
                );
            }
            Event::ReceiveItemsReconciled { repaired } if !repaired.is_empty() => {
                warn!(
                    event = event.name(),
                    count = repaired.len(),
                    ids = ?repaired,
                    "receive items disagreed with their requests and were repaired"
                );
            }
            Event::SterilizationCompleted {
                process_id,
                request_id,
                completed_at,
            } => {
                info!(
                    event = event.name(),
                    %process_id,
                    %request_id,
                    %completed_at,
                    "sterilization completed"
                );
            }
            other => match serde_json::to_string(other) {
                Ok(payload) => info!(event = other.name(), %payload, "lifecycle event"),
                Err(e) => error!(event = other.name(), error = %e, "failed to encode event"),
            },
        }
    }

    info!("Event processing loop stopped");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn publish_on_closed_channel_is_not_an_error() {
        let (sender, rx) = channel(4);
        drop(rx);
        assert!(sender.send(Event::KitCreated("KIT001".into())).await.is_err());
        sender.publish(Event::KitCreated("KIT001".into())).await;
    }

    #[tokio::test]
    async fn events_arrive_in_order() {
        let (sender, mut rx) = channel(4);
        sender.publish(Event::SterilizationPaused("STE001".into())).await;
        sender.publish(Event::SterilizationResumed("STE001".into())).await;
        assert_eq!(rx.recv().await, Some(Event::SterilizationPaused("STE001".into())));
        assert_eq!(rx.recv().await, Some(Event::SterilizationResumed("STE001".into())));
    }
}
