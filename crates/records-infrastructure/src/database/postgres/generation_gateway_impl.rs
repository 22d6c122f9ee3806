// ============================================================================
// Records Infrastructure - Contract Generation Gateway
// File: crates/records-infrastructure/src/database/postgres/generation_gateway_impl.rs
// ============================================================================
//! Calls into the database-side generation procedures. Their result codes
//! are trusted as returned.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgPool};
use tracing::info;
use uuid::Uuid;

use records_core::domain::{
    ContractTemplate, ContractType, GeneratedContract, GenerationAction, GenerationStats,
    IntegrityStatus,
};
use records_core::error::DomainError;
use records_core::repositories::ContractGenerationGateway;
use records_shared::{ActorId, RecordId, TenantId};

use crate::error::db_error;

pub struct PgContractGenerationGateway {
    pool: PgPool,
}

impl PgContractGenerationGateway {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(Debug, FromRow)]
struct GeneratedRow {
    pub id: i64,
    pub tenant_id: Uuid,
    pub contract_id: i64,
    pub template_id: Option<i64>,
    pub content: String,
    pub content_hash: String,
    pub generated_at: DateTime<Utc>,
    pub generated_by: Option<Uuid>,
}

impl From<GeneratedRow> for GeneratedContract {
    fn from(row: GeneratedRow) -> Self {
        GeneratedContract {
            id: row.id,
            tenant_id: row.tenant_id,
            contract_id: row.contract_id,
            template_id: row.template_id,
            content: row.content,
            content_hash: row.content_hash,
            generated_at: row.generated_at,
            generated_by: row.generated_by,
        }
    }
}

#[derive(Debug, FromRow)]
struct TemplateRow {
    pub id: i64,
    pub tenant_id: Uuid,
    pub template_code: String,
    pub name: String,
    pub contract_type: Option<String>,
    pub version: i32,
    pub is_default: bool,
    pub is_active: bool,
}

impl From<TemplateRow> for ContractTemplate {
    fn from(row: TemplateRow) -> Self {
        ContractTemplate {
            id: row.id,
            tenant_id: row.tenant_id,
            template_code: row.template_code,
            name: row.name,
            contract_type: row.contract_type,
            version: row.version,
            is_default: row.is_default,
            is_active: row.is_active,
        }
    }
}

#[derive(Debug, FromRow)]
struct StatsRow {
    pub total_generated: i64,
    pub contracts_with_documents: i64,
    pub total_actions: i64,
    pub last_generated_at: Option<DateTime<Utc>>,
}

#[async_trait]
impl ContractGenerationGateway for PgContractGenerationGateway {
    async fn generate(
        &self,
        tenant_id: TenantId,
        contract_id: RecordId,
        template_id: Option<RecordId>,
        actor: ActorId,
    ) -> Result<GeneratedContract, DomainError> {
        let row: Option<GeneratedRow> = sqlx::query_as("SELECT * FROM sp_generate_contract($1, $2, $3, $4)")
            .bind(tenant_id)
            .bind(contract_id)
            .bind(template_id)
            .bind(actor)
            .fetch_optional(&self.pool)
            .await
            .map_err(db_error("calling sp_generate_contract"))?;

        let generated: GeneratedContract = row
            .map(Into::into)
            .ok_or_else(|| DomainError::not_found("Contract", contract_id))?;
        info!(contract_id, generated_id = generated.id, "Contract document generated");
        Ok(generated)
    }

    async fn get_generated(&self, tenant_id: TenantId, id: RecordId) -> Result<Option<GeneratedContract>, DomainError> {
        let row: Option<GeneratedRow> = sqlx::query_as("SELECT * FROM sp_get_generated_contract($1, $2)")
            .bind(tenant_id)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(db_error("calling sp_get_generated_contract"))?;

        Ok(row.map(Into::into))
    }

    async fn get_latest_generated(
        &self,
        tenant_id: TenantId,
        contract_id: RecordId,
    ) -> Result<Option<GeneratedContract>, DomainError> {
        let row: Option<GeneratedRow> = sqlx::query_as("SELECT * FROM sp_get_latest_generated_contract($1, $2)")
            .bind(tenant_id)
            .bind(contract_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(db_error("calling sp_get_latest_generated_contract"))?;

        Ok(row.map(Into::into))
    }

    async fn log_action(
        &self,
        tenant_id: TenantId,
        generated_id: RecordId,
        action: GenerationAction,
        actor: ActorId,
    ) -> Result<(), DomainError> {
        sqlx::query("SELECT sp_log_contract_action($1, $2, $3, $4)")
            .bind(tenant_id)
            .bind(generated_id)
            .bind(action.as_str())
            .bind(actor)
            .execute(&self.pool)
            .await
            .map_err(db_error("calling sp_log_contract_action"))?;
        Ok(())
    }

    async fn verify_integrity(&self, tenant_id: TenantId, generated_id: RecordId) -> Result<IntegrityStatus, DomainError> {
        let code: i32 = sqlx::query_scalar("SELECT sp_verify_contract_integrity($1, $2)")
            .bind(tenant_id)
            .bind(generated_id)
            .fetch_one(&self.pool)
            .await
            .map_err(db_error("calling sp_verify_contract_integrity"))?;

        Ok(IntegrityStatus::from_code(code))
    }

    async fn get_stats(&self, tenant_id: TenantId) -> Result<GenerationStats, DomainError> {
        let row: Option<StatsRow> = sqlx::query_as("SELECT * FROM sp_contract_generation_stats($1)")
            .bind(tenant_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(db_error("calling sp_contract_generation_stats"))?;

        Ok(row
            .map(|r| GenerationStats {
                total_generated: r.total_generated,
                contracts_with_documents: r.contracts_with_documents,
                total_actions: r.total_actions,
                last_generated_at: r.last_generated_at,
            })
            .unwrap_or_default())
    }

    async fn list_templates(
        &self,
        tenant_id: TenantId,
        contract_type: Option<ContractType>,
    ) -> Result<Vec<ContractTemplate>, DomainError> {
        let rows: Vec<TemplateRow> = sqlx::query_as("SELECT * FROM sp_list_contract_templates($1, $2)")
            .bind(tenant_id)
            .bind(contract_type.map(|t| t.as_str()))
            .fetch_all(&self.pool)
            .await
            .map_err(db_error("calling sp_list_contract_templates"))?;

        Ok(rows.into_iter().map(ContractTemplate::from).collect())
    }
}
