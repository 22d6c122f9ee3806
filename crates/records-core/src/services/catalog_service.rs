//! Customer and catalog service maintenance

use std::sync::Arc;

use records_shared::{ActorId, Page, Pagination, RecordId, TenantId};
use tracing::{info, warn};
use validator::Validate;

use super::checked_page;
use crate::domain::{
    Customer, CustomerChanges, CustomerFilter, NewCustomer, NewService, Service, ServiceChanges,
    ServiceFilter,
};
use crate::error::DomainError;
use crate::repositories::{CustomerRepository, ServiceRepository};

pub struct CatalogService<CR: CustomerRepository, SR: ServiceRepository> {
    customer_repo: Arc<CR>,
    service_repo: Arc<SR>,
}

impl<CR: CustomerRepository, SR: ServiceRepository> CatalogService<CR, SR> {
    pub fn new(customer_repo: Arc<CR>, service_repo: Arc<SR>) -> Self {
        Self { customer_repo, service_repo }
    }

    // ---- customers ----

    pub async fn create_customer(
        &self,
        tenant_id: TenantId,
        customer: NewCustomer,
        actor: ActorId,
    ) -> Result<Customer, DomainError> {
        customer.validate()?;
        let created = self.customer_repo.create(tenant_id, &customer, actor).await?;
        info!(tenant_id = %tenant_id, customer_id = created.id, "Customer created");
        Ok(created)
    }

    pub async fn get_customer(&self, tenant_id: TenantId, id: RecordId) -> Result<Customer, DomainError> {
        self.customer_repo
            .find_by_id(tenant_id, id)
            .await?
            .ok_or_else(|| DomainError::not_found("Customer", id))
    }

    pub async fn list_customers(
        &self,
        tenant_id: TenantId,
        filter: &CustomerFilter,
        page: Pagination,
    ) -> Result<Page<Customer>, DomainError> {
        self.customer_repo.list(tenant_id, filter, checked_page(page)?).await
    }

    pub async fn update_customer(
        &self,
        tenant_id: TenantId,
        id: RecordId,
        changes: CustomerChanges,
        actor: ActorId,
    ) -> Result<Customer, DomainError> {
        if changes.is_empty() {
            return self.get_customer(tenant_id, id).await;
        }
        self.customer_repo.update(tenant_id, id, &changes, actor).await
    }

    pub async fn deactivate_customer(&self, tenant_id: TenantId, id: RecordId, actor: ActorId) -> Result<(), DomainError> {
        self.customer_repo.deactivate(tenant_id, id, actor).await?;
        warn!(tenant_id = %tenant_id, customer_id = id, "Customer deactivated");
        Ok(())
    }

    // ---- services ----

    pub async fn create_service(
        &self,
        tenant_id: TenantId,
        service: NewService,
        actor: ActorId,
    ) -> Result<Service, DomainError> {
        service.validate()?;
        if self.service_repo.find_by_code(tenant_id, service.service_code.trim()).await?.is_some() {
            return Err(DomainError::ProcedureFailed {
                code: Some("DUPLICATE".into()),
                message: format!("service code {} already exists", service.service_code.trim()),
            });
        }
        let created = self.service_repo.create(tenant_id, &service, actor).await?;
        info!(tenant_id = %tenant_id, service_id = created.id, "Service created");
        Ok(created)
    }

    pub async fn get_service(&self, tenant_id: TenantId, id: RecordId) -> Result<Service, DomainError> {
        self.service_repo
            .find_by_id(tenant_id, id)
            .await?
            .ok_or_else(|| DomainError::not_found("Service", id))
    }

    pub async fn list_services(
        &self,
        tenant_id: TenantId,
        filter: &ServiceFilter,
        page: Pagination,
    ) -> Result<Page<Service>, DomainError> {
        self.service_repo.list(tenant_id, filter, checked_page(page)?).await
    }

    pub async fn update_service(
        &self,
        tenant_id: TenantId,
        id: RecordId,
        changes: ServiceChanges,
        actor: ActorId,
    ) -> Result<Service, DomainError> {
        if changes.is_empty() {
            return self.get_service(tenant_id, id).await;
        }
        self.service_repo.update(tenant_id, id, &changes, actor).await
    }

    pub async fn deactivate_service(&self, tenant_id: TenantId, id: RecordId, actor: ActorId) -> Result<(), DomainError> {
        self.service_repo.deactivate(tenant_id, id, actor).await?;
        warn!(tenant_id = %tenant_id, service_id = id, "Service deactivated");
        Ok(())
    }
}
