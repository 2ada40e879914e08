pub mod reconcile_receive_items_command;
pub mod update_receive_status_command;

pub use reconcile_receive_items_command::{ReconcileReceiveItemsCommand, ReconcileReport};
pub use update_receive_status_command::{ReceiveDecision, UpdateReceiveStatusCommand};
