//! Customer repository trait (port)

use async_trait::async_trait;
use records_shared::{ActorId, Page, Pagination, RecordId, TenantId};

use crate::domain::{Customer, CustomerChanges, CustomerFilter, NewCustomer};
use crate::error::DomainError;

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CustomerRepository: Send + Sync {
    async fn find_by_id(&self, tenant_id: TenantId, id: RecordId) -> Result<Option<Customer>, DomainError>;
    async fn list(
        &self,
        tenant_id: TenantId,
        filter: &CustomerFilter,
        page: Pagination,
    ) -> Result<Page<Customer>, DomainError>;
    async fn create(&self, tenant_id: TenantId, customer: &NewCustomer, actor: ActorId) -> Result<Customer, DomainError>;
    async fn update(
        &self,
        tenant_id: TenantId,
        id: RecordId,
        changes: &CustomerChanges,
        actor: ActorId,
    ) -> Result<Customer, DomainError>;
    /// Soft delete.
    async fn deactivate(&self, tenant_id: TenantId, id: RecordId, actor: ActorId) -> Result<(), DomainError>;
}
