//! Print job queue: request side. Rendering happens in the worker.

use std::sync::Arc;

use records_shared::{RecordId, TenantId};
use tracing::info;

use super::{AuditContext, HistoryRecorder};
use crate::domain::{HistoryAction, NewHistoryEntry, OutputFormat, PrintJob};
use crate::error::DomainError;
use crate::repositories::{ContractRepository, HistoryRepository, PrintJobRepository};

pub struct PrintJobService<P, C, H>
where
    P: PrintJobRepository,
    C: ContractRepository,
    H: HistoryRepository,
{
    print_job_repo: Arc<P>,
    contract_repo: Arc<C>,
    history: HistoryRecorder<H>,
}

impl<P, C, H> PrintJobService<P, C, H>
where
    P: PrintJobRepository,
    C: ContractRepository,
    H: HistoryRepository,
{
    pub fn new(print_job_repo: Arc<P>, contract_repo: Arc<C>, history: HistoryRecorder<H>) -> Self {
        Self { print_job_repo, contract_repo, history }
    }

    /// Queue a render of the contract. The contract must belong to the tenant.
    pub async fn create_job(
        &self,
        tenant_id: TenantId,
        contract_id: RecordId,
        format: OutputFormat,
        ctx: &AuditContext,
    ) -> Result<PrintJob, DomainError> {
        self.contract_repo
            .find_by_id(tenant_id, contract_id)
            .await?
            .ok_or_else(|| DomainError::not_found("Contract", contract_id))?;

        let job = self
            .print_job_repo
            .create(tenant_id, contract_id, format, ctx.actor)
            .await?;

        let entry = NewHistoryEntry::new(contract_id, HistoryAction::Print, Some(ctx.actor))
            .client(ctx.client_ip.clone(), ctx.user_agent.clone())
            .description(format!("Print job {} queued ({})", job.id, format.as_str()));
        self.history.record_best_effort(tenant_id, entry).await;

        info!(tenant_id = %tenant_id, contract_id, job_id = job.id, format = format.as_str(), "Print job queued");
        Ok(job)
    }

    pub async fn get_job(&self, tenant_id: TenantId, id: RecordId) -> Result<PrintJob, DomainError> {
        self.print_job_repo
            .find_by_id(tenant_id, id)
            .await?
            .ok_or_else(|| DomainError::not_found("PrintJob", id))
    }

    pub async fn list_jobs(&self, tenant_id: TenantId, contract_id: RecordId) -> Result<Vec<PrintJob>, DomainError> {
        self.print_job_repo.list_for_contract(tenant_id, contract_id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{
        BillingCycle, Contract, ContractStatus, ContractType, PrintJobStatus, RetentionPolicyCell,
    };
    use crate::repositories::{MockContractRepository, MockHistoryRepository, MockPrintJobRepository};
    use chrono::{NaiveDate, Utc};
    use rust_decimal::Decimal;
    use uuid::Uuid;

    fn contract(id: RecordId) -> Contract {
        Contract {
            id,
            tenant_id: Uuid::nil(),
            contract_number: "CTR-7".into(),
            contract_type: ContractType::Maintenance,
            customer_id: 1,
            title: "Maintenance".into(),
            notes: None,
            start_date: NaiveDate::from_ymd_opt(2024, 3, 1).unwrap(),
            end_date: None,
            billing_cycle: BillingCycle::Yearly,
            status: ContractStatus::Active,
            signed_at: None,
            signed_by: None,
            total_value: Decimal::from(1200),
            currency: "EUR".into(),
            created_at: Utc::now(),
            created_by: None,
            modified_at: None,
            modified_by: None,
        }
    }

    fn queued(id: RecordId, contract_id: RecordId, format: OutputFormat) -> PrintJob {
        PrintJob {
            id,
            tenant_id: Uuid::nil(),
            contract_id,
            status: PrintJobStatus::Queued,
            output_format: format,
            output_path: None,
            file_size: None,
            page_count: None,
            retry_count: 0,
            error_message: None,
            queued_at: Utc::now(),
            started_at: None,
            completed_at: None,
            requested_by: None,
        }
    }

    fn service(
        jobs: MockPrintJobRepository,
        contracts: MockContractRepository,
        history: MockHistoryRepository,
    ) -> PrintJobService<MockPrintJobRepository, MockContractRepository, MockHistoryRepository> {
        PrintJobService::new(
            Arc::new(jobs),
            Arc::new(contracts),
            HistoryRecorder::new(Arc::new(history), RetentionPolicyCell::default()),
        )
    }

    #[tokio::test]
    async fn test_create_job_for_missing_contract() {
        let mut contracts = MockContractRepository::new();
        contracts.expect_find_by_id().returning(|_, _| Ok(None));
        let mut jobs = MockPrintJobRepository::new();
        jobs.expect_create().never();

        let err = service(jobs, contracts, MockHistoryRepository::new())
            .create_job(Uuid::nil(), 4, OutputFormat::Html, &AuditContext::new(Uuid::nil()))
            .await
            .unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn test_create_job_survives_history_failure() {
        let mut contracts = MockContractRepository::new();
        contracts.expect_find_by_id().returning(|_, id| Ok(Some(contract(id))));
        let mut jobs = MockPrintJobRepository::new();
        jobs.expect_create()
            .times(1)
            .returning(|_, contract_id, format, _| Ok(queued(11, contract_id, format)));
        let mut history = MockHistoryRepository::new();
        history
            .expect_append()
            .withf(|_, e| e.action == HistoryAction::Print)
            .times(1)
            .returning(|_, _| Err(DomainError::ConnectionError("pool timed out".into())));

        let job = service(jobs, contracts, history)
            .create_job(Uuid::nil(), 4, OutputFormat::Html, &AuditContext::new(Uuid::nil()))
            .await
            .unwrap();
        assert_eq!(job.status, PrintJobStatus::Queued);
        assert_eq!(job.contract_id, 4);
    }

    #[tokio::test]
    async fn test_get_job_not_found() {
        let mut jobs = MockPrintJobRepository::new();
        jobs.expect_find_by_id().returning(|_, _| Ok(None));

        let err = service(jobs, MockContractRepository::new(), MockHistoryRepository::new())
            .get_job(Uuid::nil(), 8)
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::NotFound { entity: "PrintJob", id: 8 }));
    }
}
