use serde::{Deserialize, Serialize};

/// Error payload rendered by the CLI when `--json` output is requested
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// Stable machine-readable code (e.g., "not_found", "validation_error")
    pub error: String,
    /// Human-readable error description
    pub message: String,
    /// ISO 8601 timestamp when the error was rendered
    pub timestamp: String,
}

impl From<&ServiceError> for ErrorResponse {
    fn from(error: &ServiceError) -> Self {
        Self {
            error: error.error_code().to_string(),
            message: error.to_string(),
            timestamp: chrono::Utc::now().to_rfc3339(),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Invalid status: {0}")]
    InvalidStatus(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    /// The first write of a multi-collection update landed and a later one
    /// did not. The message says what was (or could not be) rolled back.
    #[error("Partial write: {0}")]
    PartialWrite(String),

    #[error("External service error: {0}")]
    ExternalServiceError(String),

    #[error("Serialization error: {0}")]
    SerializationError(String),

    #[error("Event error: {0}")]
    EventError(String),

    #[error("Internal error: {0}")]
    InternalError(String),

    #[error("Other error: {0}")]
    Other(#[from] anyhow::Error),
}

impl From<validator::ValidationErrors> for ServiceError {
    fn from(err: validator::ValidationErrors) -> Self {
        ServiceError::ValidationError(err.to_string())
    }
}

impl From<serde_json::Error> for ServiceError {
    fn from(err: serde_json::Error) -> Self {
        ServiceError::SerializationError(err.to_string())
    }
}

impl From<reqwest::Error> for ServiceError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            ServiceError::SerializationError(err.to_string())
        } else if err.is_timeout() {
            ServiceError::ExternalServiceError(format!("backend request timed out: {}", err))
        } else {
            ServiceError::ExternalServiceError(err.to_string())
        }
    }
}

impl ServiceError {
    /// Validation error naming every required field that was left empty.
    pub fn missing_fields(fields: &[&str]) -> Self {
        let noun = if fields.len() == 1 { "field" } else { "fields" };
        ServiceError::ValidationError(format!("missing required {}: {}", noun, fields.join(", ")))
    }

    /// Returns a stable snake_case code for this error.
    /// This is the single source of truth for error-to-code mapping.
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::NotFound(_) => "not_found",
            Self::ValidationError(_) => "validation_error",
            Self::InvalidStatus(_) => "invalid_status",
            Self::Conflict(_) => "conflict",
            Self::PartialWrite(_) => "partial_write",
            Self::ExternalServiceError(_) => "external_service_error",
            Self::SerializationError(_) => "serialization_error",
            Self::EventError(_) => "event_error",
            Self::InternalError(_) | Self::Other(_) => "internal_error",
        }
    }

    /// True for errors raised before anything was sent to the backend.
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            Self::NotFound(_) | Self::ValidationError(_) | Self::InvalidStatus(_) | Self::Conflict(_)
        )
    }
}

// Result extensions for easier error handling
pub trait ResultExt<T> {
    fn map_err_to_service(self) -> Result<T, ServiceError>;
}

impl<T, E> ResultExt<T> for Result<T, E>
where
    E: Into<ServiceError>,
{
    fn map_err_to_service(self) -> Result<T, ServiceError> {
        self.map_err(|e| e.into())
    }
}
