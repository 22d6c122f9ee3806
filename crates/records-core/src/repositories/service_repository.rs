//! Catalog service repository trait (port)

use async_trait::async_trait;
use records_shared::{ActorId, Page, Pagination, RecordId, TenantId};

use crate::domain::{NewService, Service, ServiceChanges, ServiceFilter};
use crate::error::DomainError;

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ServiceRepository: Send + Sync {
    async fn find_by_id(&self, tenant_id: TenantId, id: RecordId) -> Result<Option<Service>, DomainError>;
    async fn find_by_code(&self, tenant_id: TenantId, code: &str) -> Result<Option<Service>, DomainError>;
    async fn list(
        &self,
        tenant_id: TenantId,
        filter: &ServiceFilter,
        page: Pagination,
    ) -> Result<Page<Service>, DomainError>;
    async fn create(&self, tenant_id: TenantId, service: &NewService, actor: ActorId) -> Result<Service, DomainError>;
    async fn update(
        &self,
        tenant_id: TenantId,
        id: RecordId,
        changes: &ServiceChanges,
        actor: ActorId,
    ) -> Result<Service, DomainError>;
    /// Soft delete.
    async fn deactivate(&self, tenant_id: TenantId, id: RecordId, actor: ActorId) -> Result<(), DomainError>;
}
