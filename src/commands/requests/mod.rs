pub mod create_request_command;

pub use create_request_command::{CreateRequestCommand, CreateRequestResult};
