//! Print job repository trait (port)

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use records_shared::{ActorId, RecordId, TenantId};

use crate::domain::{OutputFormat, PrintJob, PrintOutput};
use crate::error::DomainError;

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait PrintJobRepository: Send + Sync {
    async fn create(
        &self,
        tenant_id: TenantId,
        contract_id: RecordId,
        format: OutputFormat,
        requested_by: ActorId,
    ) -> Result<PrintJob, DomainError>;

    async fn find_by_id(&self, tenant_id: TenantId, id: RecordId) -> Result<Option<PrintJob>, DomainError>;

    async fn list_for_contract(&self, tenant_id: TenantId, contract_id: RecordId) -> Result<Vec<PrintJob>, DomainError>;

    /// Oldest QUEUED jobs across all tenants, `queued_at` ascending.
    async fn fetch_queued(&self, limit: i64) -> Result<Vec<PrintJob>, DomainError>;

    /// QUEUED -> PROCESSING. `false` when another pass claimed it first.
    async fn claim(&self, tenant_id: TenantId, id: RecordId) -> Result<bool, DomainError>;

    /// PROCESSING -> COMPLETED
    async fn complete(&self, tenant_id: TenantId, id: RecordId, output: &PrintOutput) -> Result<(), DomainError>;

    /// PROCESSING -> FAILED
    async fn fail(&self, tenant_id: TenantId, id: RecordId, error: &str) -> Result<(), DomainError>;

    /// PROCESSING -> QUEUED with the retry count bumped, for the next poll.
    async fn requeue(&self, tenant_id: TenantId, id: RecordId, error: &str) -> Result<(), DomainError>;

    /// Release claims stuck in PROCESSING since before `claimed_before`.
    /// Jobs with retries left are re-queued, the rest fail.
    async fn reap_stale(&self, claimed_before: DateTime<Utc>, max_retries: i32) -> Result<u64, DomainError>;
}
