pub mod create_kit_command;

pub use create_kit_command::CreateKitCommand;
