//! Contract repository trait (port)
//!
//! Owns the contract and contract item read/write path. Every mutating
//! method that touches more than one row runs in a single transaction and
//! keeps `total_value` consistent with the items.

use async_trait::async_trait;
use records_shared::{ActorId, Page, Pagination, RecordId, TenantId};
use rust_decimal::Decimal;

use crate::domain::{
    Contract, ContractChanges, ContractFilter, ContractItem, ContractStatus, ContractWithItems,
    NewContract, NewContractItem,
};
use crate::error::DomainError;

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ContractRepository: Send + Sync {
    async fn find_by_id(&self, tenant_id: TenantId, id: RecordId) -> Result<Option<Contract>, DomainError>;

    async fn find_with_items(
        &self,
        tenant_id: TenantId,
        id: RecordId,
    ) -> Result<Option<ContractWithItems>, DomainError>;

    async fn list(
        &self,
        tenant_id: TenantId,
        filter: &ContractFilter,
        page: Pagination,
    ) -> Result<Page<Contract>, DomainError>;

    async fn list_items(&self, tenant_id: TenantId, contract_id: RecordId) -> Result<Vec<ContractItem>, DomainError>;

    /// Insert the contract and all items, then persist the total; all or nothing.
    async fn create(
        &self,
        tenant_id: TenantId,
        request: &NewContract,
        actor: ActorId,
    ) -> Result<ContractWithItems, DomainError>;

    /// Apply field edits through the generic engine.
    async fn update_fields(
        &self,
        tenant_id: TenantId,
        id: RecordId,
        changes: &ContractChanges,
        actor: ActorId,
    ) -> Result<Contract, DomainError>;

    /// Compare-and-set status change: fails with `InvalidStatusTransition`
    /// when the stored status is no longer `from`.
    async fn update_status(
        &self,
        tenant_id: TenantId,
        id: RecordId,
        from: ContractStatus,
        to: ContractStatus,
        actor: ActorId,
    ) -> Result<Contract, DomainError>;

    /// PENDING -> ACTIVE with signed-at / signed-by stamped.
    async fn sign(&self, tenant_id: TenantId, id: RecordId, actor: ActorId) -> Result<Contract, DomainError>;

    async fn add_item(
        &self,
        tenant_id: TenantId,
        contract_id: RecordId,
        item: &NewContractItem,
        actor: ActorId,
    ) -> Result<ContractItem, DomainError>;

    async fn delete_item(
        &self,
        tenant_id: TenantId,
        contract_id: RecordId,
        item_id: RecordId,
        actor: ActorId,
    ) -> Result<(), DomainError>;

    async fn delete(&self, tenant_id: TenantId, id: RecordId, actor: ActorId) -> Result<(), DomainError>;

    /// Ask the database to recompute the stored total; returns the new value.
    async fn recompute_total(&self, tenant_id: TenantId, id: RecordId) -> Result<Decimal, DomainError>;
}
