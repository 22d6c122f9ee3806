//! Domain errors

use records_shared::RecordId;
use thiserror::Error;

use crate::domain::ContractStatus;

#[derive(Error, Debug)]
pub enum DomainError {
    // Validation (raised before any statement is executed)
    #[error("Invalid identifier: {0}")]
    InvalidIdentifier(String),

    #[error("Table not allowed: {0}")]
    TableNotAllowed(String),

    #[error("Invalid filter operator: {0}")]
    InvalidOperator(String),

    #[error("Invalid sort direction: {0}")]
    InvalidSortDirection(String),

    #[error("Invalid value: {0}")]
    InvalidValue(String),

    #[error("Invalid pagination: {0}")]
    InvalidPagination(String),

    #[error("Validation error: {0}")]
    ValidationError(String),

    // Not found / unauthorized
    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: RecordId },

    #[error("{entity} {id} does not belong to this tenant")]
    Unauthorized { entity: &'static str, id: RecordId },

    // Conflicts
    #[error("Contract number already exists: {0}")]
    ContractNumberExists(String),

    #[error("Invalid status transition: {from} -> {to}")]
    InvalidStatusTransition { from: ContractStatus, to: ContractStatus },

    #[error("Contract cannot be updated in status {0}")]
    ContractCannotUpdate(ContractStatus),

    #[error("Contract cannot be signed in status {0}")]
    ContractCannotSign(ContractStatus),

    #[error("Contract cannot be deleted in status {0}")]
    ContractCannotDelete(ContractStatus),

    #[error("Contract items can only change in DRAFT (current: {0})")]
    ContractNotDraft(ContractStatus),

    #[error("Unsupported output format: {0}")]
    UnsupportedFormat(String),

    // Procedure-level rejection (success flag false)
    #[error("Procedure failed [{}]: {message}", .code.as_deref().unwrap_or("UNKNOWN"))]
    ProcedureFailed { code: Option<String>, message: String },

    // Infrastructure
    #[error("Database error: {0}")]
    DatabaseError(String),

    #[error("Database unavailable: {0}")]
    ConnectionError(String),

    #[error("IO error: {0}")]
    IoError(String),

    #[error("Internal error: {0}")]
    InternalError(String),
}

impl DomainError {
    pub fn not_found(entity: &'static str, id: RecordId) -> Self {
        DomainError::NotFound { entity, id }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, DomainError::NotFound { .. })
    }

    /// Failures worth retrying on a later poll (connectivity, filesystem).
    pub fn is_transient(&self) -> bool {
        matches!(self, DomainError::ConnectionError(_) | DomainError::IoError(_))
    }
}

impl From<std::io::Error> for DomainError {
    fn from(err: std::io::Error) -> Self {
        DomainError::IoError(err.to_string())
    }
}

impl From<validator::ValidationErrors> for DomainError {
    fn from(err: validator::ValidationErrors) -> Self {
        DomainError::ValidationError(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transient_classification() {
        assert!(DomainError::IoError("disk full".into()).is_transient());
        assert!(DomainError::ConnectionError("pool timed out".into()).is_transient());
        assert!(!DomainError::DatabaseError("syntax".into()).is_transient());
        assert!(!DomainError::not_found("Contract", 7).is_transient());
    }

    #[test]
    fn test_procedure_failed_display() {
        let err = DomainError::ProcedureFailed {
            code: Some("DUPLICATE".into()),
            message: "customer code exists".into(),
        };
        assert_eq!(err.to_string(), "Procedure failed [DUPLICATE]: customer code exists");

        let err = DomainError::ProcedureFailed { code: None, message: "boom".into() };
        assert_eq!(err.to_string(), "Procedure failed [UNKNOWN]: boom");
    }
}
