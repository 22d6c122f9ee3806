// ============================================================================
// Records Core - Contract Service
// File: crates/records-core/src/services/contract_service.rs
// ============================================================================
//! Contract lifecycle: creation with items, field edits, status changes,
//! signing and item maintenance. Every mutation is followed by a
//! best-effort audit entry written after the repository has committed.

use std::sync::Arc;

use records_shared::{Page, Pagination, RecordId, TenantId};
use tracing::{info, warn};
use validator::Validate;

use super::{checked_page, AuditContext, HistoryRecorder};
use crate::domain::{
    ensure_date_range, Column, Contract, ContractColumn, ContractFilter, ContractItem, ContractStatus, ContractWithItems,
    FieldValue, HistoryAction, HistoryEntry, NewContract, NewContractItem, NewHistoryEntry,
    UpdateContractRequest,
};
use crate::error::DomainError;
use crate::repositories::{ContractRepository, HistoryRepository};

pub struct ContractService<C: ContractRepository, H: HistoryRepository> {
    contract_repo: Arc<C>,
    history: HistoryRecorder<H>,
}

impl<C: ContractRepository, H: HistoryRepository> ContractService<C, H> {
    pub fn new(contract_repo: Arc<C>, history: HistoryRecorder<H>) -> Self {
        Self { contract_repo, history }
    }

    async fn load(&self, tenant_id: TenantId, id: RecordId) -> Result<Contract, DomainError> {
        self.contract_repo
            .find_by_id(tenant_id, id)
            .await?
            .ok_or_else(|| DomainError::not_found("Contract", id))
    }

    fn audit(&self, contract_id: RecordId, action: HistoryAction, ctx: &AuditContext) -> NewHistoryEntry {
        NewHistoryEntry::new(contract_id, action, Some(ctx.actor))
            .client(ctx.client_ip.clone(), ctx.user_agent.clone())
    }

    /// Create a DRAFT contract with its initial items.
    pub async fn create(
        &self,
        tenant_id: TenantId,
        request: NewContract,
        ctx: &AuditContext,
    ) -> Result<ContractWithItems, DomainError> {
        request.validate()?;
        info!(
            tenant_id = %tenant_id,
            contract_number = %request.contract_number,
            items = request.items.len(),
            "Creating contract"
        );

        let created = self.contract_repo.create(tenant_id, &request, ctx.actor).await?;

        let computed = created.computed_total()?;
        if created.contract.total_value != computed {
            warn!(
                contract_id = created.contract.id,
                stored = %created.contract.total_value,
                computed = %computed,
                "Stored contract total differs from item sum"
            );
        }

        let entry = self
            .audit(created.contract.id, HistoryAction::Create, ctx)
            .description(format!("Contract {} created", created.contract.contract_number));
        self.history.record_best_effort(tenant_id, entry).await;

        info!(contract_id = created.contract.id, total = %created.contract.total_value, "Contract created");
        Ok(created)
    }

    pub async fn get(&self, tenant_id: TenantId, id: RecordId) -> Result<ContractWithItems, DomainError> {
        self.contract_repo
            .find_with_items(tenant_id, id)
            .await?
            .ok_or_else(|| DomainError::not_found("Contract", id))
    }

    pub async fn list(
        &self,
        tenant_id: TenantId,
        filter: &ContractFilter,
        page: Pagination,
    ) -> Result<Page<Contract>, DomainError> {
        let page = checked_page(page)?;
        self.contract_repo.list(tenant_id, filter, page).await
    }

    pub async fn list_items(&self, tenant_id: TenantId, contract_id: RecordId) -> Result<Vec<ContractItem>, DomainError> {
        self.load(tenant_id, contract_id).await?;
        self.contract_repo.list_items(tenant_id, contract_id).await
    }

    pub async fn history(
        &self,
        tenant_id: TenantId,
        contract_id: RecordId,
        page: Pagination,
    ) -> Result<Page<HistoryEntry>, DomainError> {
        self.history.list(tenant_id, contract_id, page).await
    }

    /// Edit fields while DRAFT or PENDING. An empty request returns the
    /// stored contract without writing.
    pub async fn update(
        &self,
        tenant_id: TenantId,
        id: RecordId,
        request: UpdateContractRequest,
        ctx: &AuditContext,
    ) -> Result<Contract, DomainError> {
        request.validate()?;
        let current = self.load(tenant_id, id).await?;

        if !current.status.allows_field_edits() {
            warn!(contract_id = id, status = %current.status, "Update rejected");
            return Err(DomainError::ContractCannotUpdate(current.status));
        }

        let changes = request.into_changes();
        if changes.is_empty() {
            return Ok(current);
        }
        let (start, end) = changes.merged_dates(current.start_date, current.end_date);
        ensure_date_range(start, end)?;

        let updated = self.contract_repo.update_fields(tenant_id, id, &changes, ctx.actor).await?;

        for (column, value) in changes.entries() {
            let old = stored_value(&current, column);
            let new = text_value(value);
            if old == new {
                continue;
            }
            let entry = self
                .audit(id, HistoryAction::Update, ctx)
                .field(column.name())
                .values(old, new);
            self.history.record_best_effort(tenant_id, entry).await;
        }

        info!(contract_id = id, fields = changes.len(), "Contract updated");
        Ok(updated)
    }

    pub async fn update_status(
        &self,
        tenant_id: TenantId,
        id: RecordId,
        next: ContractStatus,
        ctx: &AuditContext,
    ) -> Result<Contract, DomainError> {
        let current = self.load(tenant_id, id).await?;
        let from = current.status;

        if !from.can_transition_to(next) {
            warn!(contract_id = id, from = %from, to = %next, "Invalid status transition");
            return Err(DomainError::InvalidStatusTransition { from, to: next });
        }

        let updated = self.contract_repo.update_status(tenant_id, id, from, next, ctx.actor).await?;

        let entry = self
            .audit(id, HistoryAction::StatusChange, ctx)
            .field("status")
            .values(Some(from.to_string()), Some(next.to_string()));
        self.history.record_best_effort(tenant_id, entry).await;

        info!(contract_id = id, from = %from, to = %next, "Contract status changed");
        Ok(updated)
    }

    /// PENDING -> ACTIVE with signature stamp.
    pub async fn sign(&self, tenant_id: TenantId, id: RecordId, ctx: &AuditContext) -> Result<Contract, DomainError> {
        let current = self.load(tenant_id, id).await?;
        if !current.status.can_sign() {
            warn!(contract_id = id, status = %current.status, "Sign rejected");
            return Err(DomainError::ContractCannotSign(current.status));
        }

        let signed = self.contract_repo.sign(tenant_id, id, ctx.actor).await?;

        let entry = self
            .audit(id, HistoryAction::Sign, ctx)
            .field("status")
            .values(Some(current.status.to_string()), Some(signed.status.to_string()))
            .description(format!("Contract {} signed", signed.contract_number));
        self.history.record_best_effort(tenant_id, entry).await;

        info!(contract_id = id, "Contract signed");
        Ok(signed)
    }

    pub async fn add_item(
        &self,
        tenant_id: TenantId,
        contract_id: RecordId,
        item: NewContractItem,
        ctx: &AuditContext,
    ) -> Result<ContractItem, DomainError> {
        item.validate()?;
        let current = self.load(tenant_id, contract_id).await?;
        if !current.status.allows_item_changes() {
            return Err(DomainError::ContractNotDraft(current.status));
        }

        let added = self.contract_repo.add_item(tenant_id, contract_id, &item, ctx.actor).await?;

        let entry = self
            .audit(contract_id, HistoryAction::Update, ctx)
            .field("items")
            .values(None, Some(added.id.to_string()))
            .description(format!("Item added (line total {})", added.line_total));
        self.history.record_best_effort(tenant_id, entry).await;

        info!(contract_id, item_id = added.id, "Contract item added");
        Ok(added)
    }

    pub async fn delete_item(
        &self,
        tenant_id: TenantId,
        contract_id: RecordId,
        item_id: RecordId,
        ctx: &AuditContext,
    ) -> Result<(), DomainError> {
        let current = self.load(tenant_id, contract_id).await?;
        if !current.status.allows_item_changes() {
            return Err(DomainError::ContractNotDraft(current.status));
        }

        self.contract_repo.delete_item(tenant_id, contract_id, item_id, ctx.actor).await?;

        let entry = self
            .audit(contract_id, HistoryAction::Update, ctx)
            .field("items")
            .values(Some(item_id.to_string()), None)
            .description("Item removed");
        self.history.record_best_effort(tenant_id, entry).await;

        info!(contract_id, item_id, "Contract item removed");
        Ok(())
    }

    /// Hard delete, DRAFT only.
    pub async fn delete(&self, tenant_id: TenantId, id: RecordId, ctx: &AuditContext) -> Result<(), DomainError> {
        let current = self.load(tenant_id, id).await?;
        if !current.status.can_delete() {
            return Err(DomainError::ContractCannotDelete(current.status));
        }

        self.contract_repo.delete(tenant_id, id, ctx.actor).await?;

        let entry = self
            .audit(id, HistoryAction::Delete, ctx)
            .description(format!("Contract {} deleted", current.contract_number));
        self.history.record_best_effort(tenant_id, entry).await;

        info!(contract_id = id, "Contract deleted");
        Ok(())
    }
}

fn text_value(value: &FieldValue) -> Option<String> {
    match value {
        FieldValue::Null => None,
        other => Some(other.to_string()),
    }
}

fn stored_value(contract: &Contract, column: ContractColumn) -> Option<String> {
    match column {
        ContractColumn::ContractType => Some(contract.contract_type.as_str().to_string()),
        ContractColumn::CustomerId => Some(contract.customer_id.to_string()),
        ContractColumn::Title => Some(contract.title.clone()),
        ContractColumn::Notes => contract.notes.clone(),
        ContractColumn::StartDate => Some(contract.start_date.format("%Y-%m-%d").to_string()),
        ContractColumn::EndDate => contract.end_date.map(|d| d.format("%Y-%m-%d").to_string()),
        ContractColumn::BillingCycle => Some(contract.billing_cycle.as_str().to_string()),
        ContractColumn::Currency => Some(contract.currency.clone()),
    }
}
