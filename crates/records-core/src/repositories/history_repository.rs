//! Contract history repository trait (port)

use async_trait::async_trait;
use records_shared::{Page, Pagination, RecordId, TenantId};

use crate::domain::{HistoryEntry, NewHistoryEntry};
use crate::error::DomainError;

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait HistoryRepository: Send + Sync {
    /// Append-only insert.
    async fn append(&self, tenant_id: TenantId, entry: &NewHistoryEntry) -> Result<HistoryEntry, DomainError>;

    async fn find_by_id(&self, tenant_id: TenantId, id: RecordId) -> Result<Option<HistoryEntry>, DomainError>;

    async fn list_for_contract(
        &self,
        tenant_id: TenantId,
        contract_id: RecordId,
        page: Pagination,
    ) -> Result<Page<HistoryEntry>, DomainError>;

    /// Persist cleared personal fields; the audit payload itself is immutable.
    async fn store_anonymized(&self, tenant_id: TenantId, entry: &HistoryEntry) -> Result<(), DomainError>;
}
