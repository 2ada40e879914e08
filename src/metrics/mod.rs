//! Counter names recorded through the `metrics` facade.
//!
//! Nothing here installs a recorder; without one the macros are no-ops, so
//! the library never decides where numbers go.

use metrics::counter;

pub const REQUESTS_CREATED: &str = "cssd.requests.created";
pub const REQUESTS_APPROVED: &str = "cssd.requests.approved";
pub const REQUESTS_REJECTED: &str = "cssd.requests.rejected";
pub const RECEIVE_ITEMS_REPAIRED: &str = "cssd.receive_items.repaired";
pub const PARTIAL_WRITES: &str = "cssd.partial_writes";
pub const STERILIZATION_STARTED: &str = "cssd.sterilization.started";
pub const STERILIZATION_PAUSED: &str = "cssd.sterilization.paused";
pub const STERILIZATION_RESUMED: &str = "cssd.sterilization.resumed";
pub const STERILIZATION_COMPLETED: &str = "cssd.sterilization.completed";
pub const STERILIZATION_AUTO_COMPLETED: &str = "cssd.sterilization.auto_completed";
pub const ITEMS_ISSUED: &str = "cssd.items.issued";
pub const KITS_CREATED: &str = "cssd.kits.created";
pub const STOCK_CHANGES: &str = "cssd.stock.changes";
pub const CONSUMPTION_RECORDED: &str = "cssd.consumption.recorded";

pub fn increment(name: &'static str) {
    counter!(name, 1);
}

pub fn increment_by(name: &'static str, value: u64) {
    if value > 0 {
        counter!(name, value);
    }
}
