use records_core::DomainError;
use records_shared::{AppError, RecordId};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum WorkerError {
    #[error("Contract not found: {0}")]
    ContractNotFound(RecordId),

    #[error("Unsupported output format: {0}")]
    UnsupportedFormat(String),

    #[error("Render error: {0}")]
    RenderError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error(transparent)]
    Domain(#[from] DomainError),

    #[error("Configuration error: {0}")]
    ConfigError(#[from] AppError),
}

impl WorkerError {
    /// Failures that may succeed on a later poll; everything else is final.
    pub fn is_transient(&self) -> bool {
        match self {
            WorkerError::IoError(_) => true,
            WorkerError::Domain(err) => err.is_transient(),
            _ => false,
        }
    }
}

impl From<handlebars::RenderError> for WorkerError {
    fn from(err: handlebars::RenderError) -> Self {
        WorkerError::RenderError(err.to_string())
    }
}
