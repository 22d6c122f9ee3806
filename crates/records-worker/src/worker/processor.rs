//! One pass over the print queue.

use std::sync::Arc;

use chrono::Utc;
use records_core::repositories::{ContractRepository, PrintJobRepository};
use records_core::{OutputFormat, PrintJob, PrintOutput};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::config::ProcessorSettings;
use crate::render::render_contract;
use crate::storage::OutputStore;
use crate::utils::error::WorkerError;

/// What happened to a single fetched job.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobOutcome {
    Completed,
    Failed,
    /// Transient failure; back in QUEUED for the next tick.
    Requeued,
    /// Another pass claimed it first, or the claim itself errored.
    Skipped,
}

/// Per-pass tally. Job failures are counted here, never returned as errors.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BatchReport {
    pub fetched: usize,
    pub completed: usize,
    pub failed: usize,
    pub requeued: usize,
    pub skipped: usize,
    pub reaped: u64,
    pub cancelled: bool,
}

impl BatchReport {
    fn record(&mut self, outcome: JobOutcome) {
        match outcome {
            JobOutcome::Completed => self.completed += 1,
            JobOutcome::Failed => self.failed += 1,
            JobOutcome::Requeued => self.requeued += 1,
            JobOutcome::Skipped => self.skipped += 1,
        }
    }

    pub fn processed(&self) -> usize {
        self.completed + self.failed + self.requeued + self.skipped
    }
}

pub struct PrintJobProcessor<P, C>
where
    P: PrintJobRepository,
    C: ContractRepository,
{
    jobs: Arc<P>,
    contracts: Arc<C>,
    store: OutputStore,
    settings: ProcessorSettings,
}

impl<P, C> PrintJobProcessor<P, C>
where
    P: PrintJobRepository,
    C: ContractRepository,
{
    pub fn new(jobs: Arc<P>, contracts: Arc<C>, settings: ProcessorSettings) -> Self {
        let store = OutputStore::new(settings.output_root.clone());
        Self { jobs, contracts, store, settings }
    }

    pub fn settings(&self) -> &ProcessorSettings {
        &self.settings
    }

    pub async fn process_pending_jobs(&self, limit: usize) -> Result<BatchReport, WorkerError> {
        self.process_pending_jobs_until(limit, &CancellationToken::new()).await
    }

    /// Fetch up to `limit` queued jobs (oldest first) and process them one
    /// by one. `cancel` is checked between jobs; a job that has been claimed
    /// always runs to a final status.
    pub async fn process_pending_jobs_until(
        &self,
        limit: usize,
        cancel: &CancellationToken,
    ) -> Result<BatchReport, WorkerError> {
        let mut report = BatchReport { reaped: self.reap_stale_claims().await, ..Default::default() };

        let limit = i64::try_from(limit).unwrap_or(i64::MAX);
        let queued = self.jobs.fetch_queued(limit).await?;
        report.fetched = queued.len();
        if queued.is_empty() {
            debug!("No queued print jobs");
            return Ok(report);
        }

        info!("Processing {} queued print jobs", queued.len());
        for job in queued {
            if cancel.is_cancelled() {
                info!("Cancellation requested, leaving {} jobs queued", report.fetched - report.processed());
                report.cancelled = true;
                break;
            }
            let outcome = self.process_job(&job).await;
            report.record(outcome);
        }

        info!(
            completed = report.completed,
            failed = report.failed,
            requeued = report.requeued,
            skipped = report.skipped,
            "Print batch finished"
        );
        Ok(report)
    }

    /// Claim and process one job. Never fails: every error ends up on the job row.
    pub async fn process_job(&self, job: &PrintJob) -> JobOutcome {
        match self.jobs.claim(job.tenant_id, job.id).await {
            Ok(true) => {}
            Ok(false) => {
                debug!(job_id = job.id, "Print job already claimed, skipping");
                return JobOutcome::Skipped;
            }
            Err(e) => {
                error!(job_id = job.id, "Failed to claim print job: {}", e);
                return JobOutcome::Skipped;
            }
        }

        let result = match self.render_job(job).await {
            Ok(output) => match self.jobs.complete(job.tenant_id, job.id, &output).await {
                Ok(()) => Ok(output),
                Err(e) => Err(WorkerError::from(e)),
            },
            Err(e) => Err(e),
        };

        match result {
            Ok(output) => {
                info!(
                    tenant_id = %job.tenant_id,
                    job_id = job.id,
                    contract_id = job.contract_id,
                    path = %output.output_path,
                    "Print job completed"
                );
                JobOutcome::Completed
            }
            Err(err) => self.handle_failure(job, err).await,
        }
    }

    async fn render_job(&self, job: &PrintJob) -> Result<PrintOutput, WorkerError> {
        if job.output_format != OutputFormat::Html {
            return Err(WorkerError::UnsupportedFormat(job.output_format.as_str().to_string()));
        }

        let document = self
            .contracts
            .find_with_items(job.tenant_id, job.contract_id)
            .await?
            .ok_or(WorkerError::ContractNotFound(job.contract_id))?;

        let now = Utc::now();
        let rendered = render_contract(&document, now)?;
        let stored = self
            .store
            .write(
                job.tenant_id,
                job.id,
                &document.contract.contract_number,
                job.output_format,
                &rendered.content,
                now,
            )
            .await?;

        Ok(PrintOutput {
            output_path: stored.path.display().to_string(),
            file_size: i64::try_from(stored.size).unwrap_or(i64::MAX),
            page_count: rendered.page_count,
        })
    }

    async fn handle_failure(&self, job: &PrintJob, err: WorkerError) -> JobOutcome {
        let message = err.to_string();

        if err.is_transient() && job.can_retry(self.settings.max_retries) {
            warn!(
                job_id = job.id,
                retry = job.retry_count + 1,
                "Print job hit a transient error, re-queueing: {}",
                message
            );
            return match self.jobs.requeue(job.tenant_id, job.id, &message).await {
                Ok(()) => JobOutcome::Requeued,
                Err(e) => {
                    error!(job_id = job.id, "Failed to re-queue print job: {}", e);
                    JobOutcome::Failed
                }
            };
        }

        error!(tenant_id = %job.tenant_id, job_id = job.id, "Print job failed: {}", message);
        if let Err(e) = self.jobs.fail(job.tenant_id, job.id, &message).await {
            // Stays PROCESSING; the stale-claim reaper picks it up.
            error!(job_id = job.id, "Failed to record print job failure: {}", e);
        }
        JobOutcome::Failed
    }

    async fn reap_stale_claims(&self) -> u64 {
        let cutoff = self.settings.stale_cutoff(Utc::now());
        match self.jobs.reap_stale(cutoff, self.settings.max_retries).await {
            Ok(0) => 0,
            Ok(n) => {
                debug!(released = n, "Stale claims released before pass");
                n
            }
            Err(e) => {
                warn!("Stale claim reaping failed: {}", e);
                0
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::worker::test_support::{contract_with_items, queued_job, settings, MockContracts, MockJobs};
    use mockall::predicate::*;
    use records_core::DomainError;
    use records_shared::TenantId;

    fn processor(jobs: MockJobs, contracts: MockContracts, root: &std::path::Path) -> PrintJobProcessor<MockJobs, MockContracts> {
        PrintJobProcessor::new(Arc::new(jobs), Arc::new(contracts), settings(root))
    }

    #[tokio::test]
    async fn test_missing_contract_fails_and_valid_job_completes() {
        let dir = tempfile::tempdir().unwrap();
        let tenant = TenantId::new_v4();
        let missing = queued_job(1, tenant, 100, OutputFormat::Html);
        let valid = queued_job(2, tenant, 200, OutputFormat::Html);

        let mut jobs = MockJobs::new();
        jobs.expect_reap_stale().returning(|_, _| Ok(0));
        let fetched = vec![missing.clone(), valid.clone()];
        jobs.expect_fetch_queued().with(eq(10)).times(1).returning(move |_| Ok(fetched.clone()));
        jobs.expect_claim().times(2).returning(|_, _| Ok(true));
        jobs.expect_fail()
            .withf(|_, id, msg| *id == 1 && msg.contains("not found"))
            .times(1)
            .returning(|_, _, _| Ok(()));
        jobs.expect_complete()
            .withf(|_, id, out| *id == 2 && out.file_size > 0 && out.page_count == 1)
            .times(1)
            .returning(|_, _, _| Ok(()));

        let mut contracts = MockContracts::new();
        contracts.expect_find_with_items().with(always(), eq(100)).returning(|_, _| Ok(None));
        contracts
            .expect_find_with_items()
            .with(always(), eq(200))
            .returning(move |t, id| Ok(Some(contract_with_items(t, id, "CTR/2024:001"))));

        let report = processor(jobs, contracts, dir.path()).process_pending_jobs(10).await.unwrap();

        assert_eq!(report.fetched, 2);
        assert_eq!(report.completed, 1);
        assert_eq!(report.failed, 1);

        let tenant_dir = dir.path().join(tenant.to_string());
        let files: Vec<_> = std::fs::read_dir(&tenant_dir).unwrap().collect();
        assert_eq!(files.len(), 1);
        let name = files[0].as_ref().unwrap().file_name().into_string().unwrap();
        assert!(name.starts_with("contract_CTR_2024_001_"));
        assert!(name.ends_with("_job2.html"));
    }

    #[tokio::test]
    async fn test_lost_claim_is_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let job = queued_job(5, TenantId::new_v4(), 50, OutputFormat::Html);

        let mut jobs = MockJobs::new();
        jobs.expect_reap_stale().returning(|_, _| Ok(0));
        jobs.expect_fetch_queued().returning(move |_| Ok(vec![job.clone()]));
        jobs.expect_claim().returning(|_, _| Ok(false));
        jobs.expect_complete().never();
        jobs.expect_fail().never();

        let mut contracts = MockContracts::new();
        contracts.expect_find_with_items().never();

        let report = processor(jobs, contracts, dir.path()).process_pending_jobs(10).await.unwrap();
        assert_eq!(report.skipped, 1);
        assert_eq!(report.completed, 0);
    }

    #[tokio::test]
    async fn test_unsupported_format_fails_without_loading_contract() {
        let dir = tempfile::tempdir().unwrap();
        let job = queued_job(6, TenantId::new_v4(), 60, OutputFormat::Pdf);

        let mut jobs = MockJobs::new();
        jobs.expect_reap_stale().returning(|_, _| Ok(0));
        jobs.expect_fetch_queued().returning(move |_| Ok(vec![job.clone()]));
        jobs.expect_claim().returning(|_, _| Ok(true));
        jobs.expect_fail()
            .withf(|_, _, msg| msg.contains("PDF"))
            .times(1)
            .returning(|_, _, _| Ok(()));

        let mut contracts = MockContracts::new();
        contracts.expect_find_with_items().never();

        let report = processor(jobs, contracts, dir.path()).process_pending_jobs(10).await.unwrap();
        assert_eq!(report.failed, 1);
    }

    #[tokio::test]
    async fn test_transient_error_requeues_until_retries_exhausted() {
        let dir = tempfile::tempdir().unwrap();
        let tenant = TenantId::new_v4();
        let fresh = queued_job(7, tenant, 70, OutputFormat::Html);
        let mut exhausted = queued_job(8, tenant, 80, OutputFormat::Html);
        exhausted.retry_count = 3;

        let mut jobs = MockJobs::new();
        jobs.expect_reap_stale().returning(|_, _| Ok(0));
        let fetched = vec![fresh, exhausted];
        jobs.expect_fetch_queued().returning(move |_| Ok(fetched.clone()));
        jobs.expect_claim().returning(|_, _| Ok(true));
        jobs.expect_requeue().withf(|_, id, _| *id == 7).times(1).returning(|_, _, _| Ok(()));
        jobs.expect_fail().withf(|_, id, _| *id == 8).times(1).returning(|_, _, _| Ok(()));

        let mut contracts = MockContracts::new();
        contracts
            .expect_find_with_items()
            .returning(|_, _| Err(DomainError::ConnectionError("pool timed out".into())));

        let report = processor(jobs, contracts, dir.path()).process_pending_jobs(10).await.unwrap();
        assert_eq!(report.requeued, 1);
        assert_eq!(report.failed, 1);
    }

    #[tokio::test]
    async fn test_fail_write_error_does_not_abort_batch() {
        let dir = tempfile::tempdir().unwrap();
        let tenant = TenantId::new_v4();
        let first = queued_job(1, tenant, 10, OutputFormat::Html);
        let second = queued_job(2, tenant, 20, OutputFormat::Html);

        let mut jobs = MockJobs::new();
        jobs.expect_reap_stale().returning(|_, _| Err(DomainError::DatabaseError("boom".into())));
        let fetched = vec![first, second];
        jobs.expect_fetch_queued().returning(move |_| Ok(fetched.clone()));
        jobs.expect_claim().returning(|_, _| Ok(true));
        jobs.expect_fail()
            .withf(|_, id, _| *id == 1)
            .returning(|_, _, _| Err(DomainError::DatabaseError("write failed".into())));
        jobs.expect_complete().withf(|_, id, _| *id == 2).times(1).returning(|_, _, _| Ok(()));

        let mut contracts = MockContracts::new();
        contracts.expect_find_with_items().with(always(), eq(10)).returning(|_, _| Ok(None));
        contracts
            .expect_find_with_items()
            .with(always(), eq(20))
            .returning(|t, id| Ok(Some(contract_with_items(t, id, "CTR-20"))));

        let report = processor(jobs, contracts, dir.path()).process_pending_jobs(10).await.unwrap();
        assert_eq!(report.failed, 1);
        assert_eq!(report.completed, 1);
        assert_eq!(report.reaped, 0);
    }

    #[tokio::test]
    async fn test_cancelled_before_first_job() {
        let dir = tempfile::tempdir().unwrap();
        let job = queued_job(1, TenantId::new_v4(), 10, OutputFormat::Html);

        let mut jobs = MockJobs::new();
        jobs.expect_reap_stale().returning(|_, _| Ok(2));
        jobs.expect_fetch_queued().returning(move |_| Ok(vec![job.clone()]));
        jobs.expect_claim().never();

        let cancel = CancellationToken::new();
        cancel.cancel();

        let report = processor(jobs, MockContracts::new(), dir.path())
            .process_pending_jobs_until(10, &cancel)
            .await
            .unwrap();
        assert!(report.cancelled);
        assert_eq!(report.processed(), 0);
        assert_eq!(report.reaped, 2);
    }

    #[tokio::test]
    async fn test_fetch_error_propagates() {
        let dir = tempfile::tempdir().unwrap();
        let mut jobs = MockJobs::new();
        jobs.expect_reap_stale().returning(|_, _| Ok(0));
        jobs.expect_fetch_queued()
            .returning(|_| Err(DomainError::ConnectionError("refused".into())));

        let result = processor(jobs, MockContracts::new(), dir.path()).process_pending_jobs(5).await;
        assert!(matches!(result, Err(WorkerError::Domain(DomainError::ConnectionError(_)))));
    }
}
