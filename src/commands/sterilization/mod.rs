pub mod complete_sterilization_command;
pub mod set_process_status_command;
pub mod start_sterilization_command;

pub use complete_sterilization_command::{CompleteSterilizationCommand, CompletedRun};
pub use set_process_status_command::SetProcessStatusCommand;
pub use start_sterilization_command::StartSterilizationCommand;
