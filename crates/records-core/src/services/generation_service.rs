//! Thin facade over the database-side contract generation procedures.

use std::sync::Arc;

use records_shared::{ActorId, RecordId, TenantId};
use tracing::{info, warn};

use crate::domain::{
    ContractTemplate, ContractType, GeneratedContract, GenerationAction, GenerationStats,
    IntegrityStatus,
};
use crate::error::DomainError;
use crate::repositories::ContractGenerationGateway;

pub struct GenerationService<G: ContractGenerationGateway> {
    gateway: Arc<G>,
}

impl<G: ContractGenerationGateway> GenerationService<G> {
    pub fn new(gateway: Arc<G>) -> Self {
        Self { gateway }
    }

    pub async fn generate(
        &self,
        tenant_id: TenantId,
        contract_id: RecordId,
        template_id: Option<RecordId>,
        actor: ActorId,
    ) -> Result<GeneratedContract, DomainError> {
        let generated = self.gateway.generate(tenant_id, contract_id, template_id, actor).await?;
        info!(tenant_id = %tenant_id, contract_id, generated_id = generated.id, "Contract document generated");
        Ok(generated)
    }

    /// Fetch a snapshot and log the access.
    pub async fn open(
        &self,
        tenant_id: TenantId,
        generated_id: RecordId,
        action: GenerationAction,
        actor: ActorId,
    ) -> Result<GeneratedContract, DomainError> {
        let generated = self
            .gateway
            .get_generated(tenant_id, generated_id)
            .await?
            .ok_or_else(|| DomainError::not_found("GeneratedContract", generated_id))?;

        if let Err(e) = self.gateway.log_action(tenant_id, generated_id, action, actor).await {
            warn!(generated_id, action = action.as_str(), "Failed to log generation action: {}", e);
        }
        Ok(generated)
    }

    pub async fn latest(&self, tenant_id: TenantId, contract_id: RecordId) -> Result<Option<GeneratedContract>, DomainError> {
        self.gateway.get_latest_generated(tenant_id, contract_id).await
    }

    pub async fn verify(&self, tenant_id: TenantId, generated_id: RecordId) -> Result<IntegrityStatus, DomainError> {
        let status = self.gateway.verify_integrity(tenant_id, generated_id).await?;
        if status == IntegrityStatus::Mismatch {
            warn!(tenant_id = %tenant_id, generated_id, "Generated contract content hash mismatch");
        }
        Ok(status)
    }

    pub async fn stats(&self, tenant_id: TenantId) -> Result<GenerationStats, DomainError> {
        self.gateway.get_stats(tenant_id).await
    }

    pub async fn templates(
        &self,
        tenant_id: TenantId,
        contract_type: Option<ContractType>,
    ) -> Result<Vec<ContractTemplate>, DomainError> {
        self.gateway.list_templates(tenant_id, contract_type).await
    }
}
