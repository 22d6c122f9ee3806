//! Application services

pub mod contract_service;
pub mod history_service;
pub mod print_job_service;
pub mod catalog_service;
pub mod generation_service;

pub use contract_service::ContractService;
pub use history_service::HistoryRecorder;
pub use print_job_service::PrintJobService;
pub use catalog_service::CatalogService;
pub use generation_service::GenerationService;

use records_shared::{ActorId, Pagination};

use crate::error::DomainError;

/// Who performs a mutation, plus the client details kept in the audit trail.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuditContext {
    pub actor: ActorId,
    pub client_ip: Option<String>,
    pub user_agent: Option<String>,
}

impl AuditContext {
    pub fn new(actor: ActorId) -> Self {
        Self { actor, client_ip: None, user_agent: None }
    }

    pub fn with_client(mut self, client_ip: Option<String>, user_agent: Option<String>) -> Self {
        self.client_ip = client_ip;
        self.user_agent = user_agent;
        self
    }
}

/// Reject negative offsets/limits, then apply the default and maximum page size.
pub(crate) fn checked_page(page: Pagination) -> Result<Pagination, DomainError> {
    if !page.is_valid() {
        return Err(DomainError::InvalidPagination(format!(
            "offset={} limit={}",
            page.offset, page.limit
        )));
    }
    Ok(page.clamped())
}
