pub mod issue_item_command;

pub use issue_item_command::IssueItemCommand;
