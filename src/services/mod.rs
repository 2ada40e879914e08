use std::sync::Arc;

use crate::{clock::Clock, config::AppConfig, events::EventSender, repositories::CssdStore};

// Request intake and receiving
pub mod receiving;
pub mod requests;

// Sterilization and issue
pub mod issuing;
pub mod sterilization;

// Inventory and reporting
pub mod consumption;
pub mod dashboard;
pub mod kits;
pub mod stock;

pub use consumption::ConsumptionService;
pub use dashboard::DashboardService;
pub use issuing::IssuingService;
pub use kits::KitService;
pub use receiving::ReceivingService;
pub use requests::RequestService;
pub use sterilization::SterilizationService;
pub use stock::StockService;

/// Service container holding all service instances over one shared store
#[derive(Clone)]
pub struct AppServices {
    pub requests: RequestService,
    pub receiving: ReceivingService,
    pub sterilization: SterilizationService,
    pub issuing: IssuingService,
    pub stock: StockService,
    pub kits: KitService,
    pub consumption: ConsumptionService,
    pub dashboard: DashboardService,
    store: Arc<CssdStore>,
    event_sender: Arc<EventSender>,
}

impl AppServices {
    /// Creates every service with the given dependencies
    pub fn new(
        store: Arc<CssdStore>,
        event_sender: Arc<EventSender>,
        clock: Arc<dyn Clock>,
        config: &AppConfig,
    ) -> Self {
        Self {
            requests: RequestService::new(
                store.clone(),
                event_sender.clone(),
                clock.clone(),
                config.page_size,
            ),
            receiving: ReceivingService::new(store.clone(), event_sender.clone()),
            sterilization: SterilizationService::new(
                store.clone(),
                event_sender.clone(),
                clock.clone(),
                config.eligible_statuses(),
            ),
            issuing: IssuingService::new(store.clone(), event_sender.clone(), clock.clone()),
            stock: StockService::new(store.clone(), event_sender.clone()),
            kits: KitService::new(store.clone(), event_sender.clone(), clock),
            consumption: ConsumptionService::new(store.clone(), event_sender.clone()),
            dashboard: DashboardService::new(store.clone()),
            store,
            event_sender,
        }
    }

    /// Gets a reference to the shared store
    pub fn store(&self) -> &Arc<CssdStore> {
        &self.store
    }

    /// Gets a reference to the event sender
    pub fn event_sender(&self) -> &Arc<EventSender> {
        &self.event_sender
    }
}
