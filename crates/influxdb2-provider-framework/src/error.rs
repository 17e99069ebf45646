//! Framework error types

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FrameworkError {
    #[error("operation cancelled")]
    Cancelled,

    #[error("operation deadline exceeded")]
    DeadlineExceeded,

    #[error("resource type not found: {0}")]
    UnknownResourceType(String),

    #[error("data source type not found: {0}")]
    UnknownDataSourceType(String),

    #[error("type name registered twice: {0}")]
    DuplicateTypeName(String),

    #[error("provider has not been configured")]
    NotConfigured,

    #[error("value does not match {target}: {reason}")]
    TypeMismatch { target: String, reason: String },
}

impl FrameworkError {
    /// Short title used when the error is surfaced as a diagnostic
    pub fn summary(&self) -> &'static str {
        match self {
            FrameworkError::Cancelled | FrameworkError::DeadlineExceeded => "Operation Interrupted",
            FrameworkError::UnknownResourceType(_) => "Unknown Resource Type",
            FrameworkError::UnknownDataSourceType(_) => "Unknown Data Source Type",
            FrameworkError::DuplicateTypeName(_) => "Duplicate Type Name",
            FrameworkError::NotConfigured => "Provider Not Configured",
            FrameworkError::TypeMismatch { .. } => "Value Conversion Error",
        }
    }
}

pub type Result<T> = std::result::Result<T, FrameworkError>;
