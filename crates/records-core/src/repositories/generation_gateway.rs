//! Contract generation procedures (external, opaque)

use async_trait::async_trait;
use records_shared::{ActorId, RecordId, TenantId};

use crate::domain::{
    ContractTemplate, ContractType, GeneratedContract, GenerationAction, GenerationStats,
    IntegrityStatus,
};
use crate::error::DomainError;

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ContractGenerationGateway: Send + Sync {
    async fn generate(
        &self,
        tenant_id: TenantId,
        contract_id: RecordId,
        template_id: Option<RecordId>,
        actor: ActorId,
    ) -> Result<GeneratedContract, DomainError>;

    async fn get_generated(&self, tenant_id: TenantId, id: RecordId) -> Result<Option<GeneratedContract>, DomainError>;

    async fn get_latest_generated(
        &self,
        tenant_id: TenantId,
        contract_id: RecordId,
    ) -> Result<Option<GeneratedContract>, DomainError>;

    async fn log_action(
        &self,
        tenant_id: TenantId,
        generated_id: RecordId,
        action: GenerationAction,
        actor: ActorId,
    ) -> Result<(), DomainError>;

    async fn verify_integrity(&self, tenant_id: TenantId, generated_id: RecordId) -> Result<IntegrityStatus, DomainError>;

    async fn get_stats(&self, tenant_id: TenantId) -> Result<GenerationStats, DomainError>;

    async fn list_templates(
        &self,
        tenant_id: TenantId,
        contract_type: Option<ContractType>,
    ) -> Result<Vec<ContractTemplate>, DomainError>;
}
