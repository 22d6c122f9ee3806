//! Infrastructure errors and their mapping into `DomainError`

use records_core::DomainError;
use records_shared::RecordId;
use thiserror::Error;
use tracing::error;

/// Errors raised by the SQL safety layer and the generic CRUD engine.
/// Everything except `Database` is detected before a statement is sent.
#[derive(Error, Debug)]
pub enum CrudError {
    #[error("Invalid identifier: {0}")]
    InvalidIdentifier(String),

    #[error("Table not allowed: {0}")]
    TableNotAllowed(String),

    #[error("Invalid filter operator: {0}")]
    InvalidOperator(String),

    #[error("Invalid sort direction: {0}")]
    InvalidDirection(String),

    #[error("Invalid value for {column}: {reason}")]
    InvalidValue { column: String, reason: String },

    #[error("Invalid pagination: {0}")]
    InvalidPagination(String),

    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: RecordId },

    #[error("Procedure failed [{}]: {message}", .code.as_deref().unwrap_or("UNKNOWN"))]
    ProcedureFailed { code: Option<String>, message: String },

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

impl CrudError {
    /// Build a `ProcedureFailed` from the procedure's error text, splitting
    /// off a leading `CODE: ` when the prefix is an upper-case token.
    pub fn procedure_failed(raw: Option<String>) -> Self {
        let raw = raw.unwrap_or_else(|| "procedure reported failure".to_string());
        match raw.split_once(": ") {
            Some((code, message)) if is_error_code(code) => CrudError::ProcedureFailed {
                code: Some(code.to_string()),
                message: message.to_string(),
            },
            _ => CrudError::ProcedureFailed { code: None, message: raw },
        }
    }
}

fn is_error_code(token: &str) -> bool {
    !token.is_empty()
        && token.chars().all(|c| c.is_ascii_uppercase() || c.is_ascii_digit() || c == '_')
        && token.chars().next().is_some_and(|c| c.is_ascii_uppercase())
}

impl From<CrudError> for DomainError {
    fn from(err: CrudError) -> Self {
        match err {
            CrudError::InvalidIdentifier(s) => DomainError::InvalidIdentifier(s),
            CrudError::TableNotAllowed(s) => DomainError::TableNotAllowed(s),
            CrudError::InvalidOperator(s) => DomainError::InvalidOperator(s),
            CrudError::InvalidDirection(s) => DomainError::InvalidSortDirection(s),
            CrudError::InvalidValue { column, reason } => {
                DomainError::InvalidValue(format!("{}: {}", column, reason))
            }
            CrudError::InvalidPagination(s) => DomainError::InvalidPagination(s),
            CrudError::NotFound { entity, id } => DomainError::NotFound { entity, id },
            CrudError::ProcedureFailed { code, message } => DomainError::ProcedureFailed { code, message },
            CrudError::Database(e) => map_sqlx_error(e),
        }
    }
}

/// Connectivity problems become `ConnectionError` so callers can retry.
pub fn map_sqlx_error(err: sqlx::Error) -> DomainError {
    match err {
        sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed => DomainError::ConnectionError(err.to_string()),
        sqlx::Error::Io(e) => DomainError::ConnectionError(e.to_string()),
        other => DomainError::DatabaseError(other.to_string()),
    }
}

pub fn is_unique_violation(err: &sqlx::Error) -> bool {
    err.as_database_error().is_some_and(|e| e.is_unique_violation())
}

/// `map_err` adapter that logs with context before converting.
pub fn db_error(context: &'static str) -> impl FnOnce(sqlx::Error) -> DomainError {
    move |e| {
        error!("Database error {}: {}", context, e);
        map_sqlx_error(e)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_procedure_error_code_extracted() {
        match CrudError::procedure_failed(Some("DUPLICATE_KEY: customer code exists".into())) {
            CrudError::ProcedureFailed { code, message } => {
                assert_eq!(code.as_deref(), Some("DUPLICATE_KEY"));
                assert_eq!(message, "customer code exists");
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_lowercase_prefix_is_not_a_code() {
        match CrudError::procedure_failed(Some("note: something odd".into())) {
            CrudError::ProcedureFailed { code, message } => {
                assert!(code.is_none());
                assert_eq!(message, "note: something odd");
            }
            other => panic!("unexpected {:?}", other),
        }
        assert!(matches!(
            CrudError::procedure_failed(None),
            CrudError::ProcedureFailed { code: None, .. }
        ));
    }

    #[test]
    fn test_domain_mapping() {
        let err: DomainError = CrudError::TableNotAllowed("users".into()).into();
        assert!(matches!(err, DomainError::TableNotAllowed(_)));

        let err: DomainError = CrudError::Database(sqlx::Error::PoolTimedOut).into();
        assert!(err.is_transient());

        let err: DomainError = CrudError::Database(sqlx::Error::RowNotFound).into();
        assert!(!err.is_transient());
    }
}
