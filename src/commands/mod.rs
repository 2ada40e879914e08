use crate::{errors::ServiceError, events::EventSender, repositories::CssdStore};
use async_trait::async_trait;
use std::sync::Arc;

/// Command trait for implementing the Command Pattern
///
/// Every status change in the CSSD lifecycle goes through exactly one
/// command. A command validates its input, takes the store's lifecycle
/// lock for its read-check-write sequence, and publishes an event once the
/// writes have landed.
#[async_trait]
pub trait Command: Send + Sync {
    /// The return type of the command when executed successfully
    type Result;

    /// Execute the command with the given dependencies
    ///
    /// # Arguments
    /// * `store` - Typed handles on the backend collections
    /// * `event_sender` - Channel to publish domain events
    async fn execute(
        &self,
        store: Arc<CssdStore>,
        event_sender: Arc<EventSender>,
    ) -> Result<Self::Result, ServiceError>;
}

pub mod issuing;
pub mod kitting;
pub mod receiving;
pub mod requests;
pub mod sterilization;
