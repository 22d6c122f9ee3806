// ============================================================================
// Records Infrastructure - PostgreSQL Print Job Repository
// File: crates/records-infrastructure/src/database/postgres/print_job_repo_impl.rs
// ============================================================================
//! Queue table for contract renders. Every status change is a
//! compare-and-set on the expected current status.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgPool};
use tracing::{info, warn};
use uuid::Uuid;

use records_core::domain::{OutputFormat, PrintJob, PrintJobStatus, PrintOutput};
use records_core::error::DomainError;
use records_core::repositories::PrintJobRepository;
use records_shared::{ActorId, RecordId, TenantId};

use crate::error::db_error;

pub struct PgPrintJobRepository {
    pool: PgPool,
}

impl PgPrintJobRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn transition(
        &self,
        sql: &str,
        tenant_id: TenantId,
        id: RecordId,
        message: &str,
        context: &'static str,
    ) -> Result<(), DomainError> {
        let updated = sqlx::query(sql)
            .bind(id)
            .bind(tenant_id)
            .bind(message)
            .execute(&self.pool)
            .await
            .map_err(db_error(context))?
            .rows_affected();

        if updated == 0 {
            warn!(job_id = id, "{}: job not in PROCESSING", context);
            return Err(DomainError::not_found("PrintJob", id));
        }
        Ok(())
    }
}

#[derive(Debug, FromRow)]
struct PrintJobRow {
    pub id: i64,
    pub tenant_id: Uuid,
    pub contract_id: i64,
    pub status: String,
    pub output_format: String,
    pub output_path: Option<String>,
    pub file_size: Option<i64>,
    pub page_count: Option<i32>,
    pub retry_count: i32,
    pub error_message: Option<String>,
    pub queued_at: DateTime<Utc>,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub requested_by: Option<Uuid>,
}

impl From<PrintJobRow> for PrintJob {
    fn from(row: PrintJobRow) -> Self {
        PrintJob {
            id: row.id,
            tenant_id: row.tenant_id,
            contract_id: row.contract_id,
            status: PrintJobStatus::from_str(&row.status).unwrap_or_default(),
            output_format: OutputFormat::from_str(&row.output_format).unwrap_or_default(),
            output_path: row.output_path,
            file_size: row.file_size,
            page_count: row.page_count,
            retry_count: row.retry_count,
            error_message: row.error_message,
            queued_at: row.queued_at,
            started_at: row.started_at,
            completed_at: row.completed_at,
            requested_by: row.requested_by,
        }
    }
}

const JOB_COLUMNS: &str = r#"
    id, tenant_id, contract_id, status, output_format, output_path, file_size,
    page_count, retry_count, error_message, queued_at, started_at, completed_at,
    requested_by
"#;

#[async_trait]
impl PrintJobRepository for PgPrintJobRepository {
    async fn create(
        &self,
        tenant_id: TenantId,
        contract_id: RecordId,
        format: OutputFormat,
        requested_by: ActorId,
    ) -> Result<PrintJob, DomainError> {
        let sql = format!(
            r#"
            INSERT INTO contract_print_jobs (
                tenant_id, contract_id, status, output_format, retry_count, queued_at, requested_by
            )
            VALUES ($1, $2, 'QUEUED', $3, 0, NOW(), $4)
            RETURNING {}
            "#,
            JOB_COLUMNS
        );
        let row: PrintJobRow = sqlx::query_as(&sql)
            .bind(tenant_id)
            .bind(contract_id)
            .bind(format.as_str())
            .bind(requested_by)
            .fetch_one(&self.pool)
            .await
            .map_err(db_error("creating print job"))?;

        Ok(row.into())
    }

    async fn find_by_id(&self, tenant_id: TenantId, id: RecordId) -> Result<Option<PrintJob>, DomainError> {
        let sql = format!(
            "SELECT {} FROM contract_print_jobs WHERE id = $1 AND tenant_id = $2",
            JOB_COLUMNS
        );
        let row: Option<PrintJobRow> = sqlx::query_as(&sql)
            .bind(id)
            .bind(tenant_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(db_error("finding print job"))?;

        Ok(row.map(|r| r.into()))
    }

    async fn list_for_contract(&self, tenant_id: TenantId, contract_id: RecordId) -> Result<Vec<PrintJob>, DomainError> {
        let sql = format!(
            "SELECT {} FROM contract_print_jobs WHERE contract_id = $1 AND tenant_id = $2 ORDER BY queued_at DESC, id DESC",
            JOB_COLUMNS
        );
        let rows: Vec<PrintJobRow> = sqlx::query_as(&sql)
            .bind(contract_id)
            .bind(tenant_id)
            .fetch_all(&self.pool)
            .await
            .map_err(db_error("listing print jobs"))?;

        Ok(rows.into_iter().map(PrintJob::from).collect())
    }

    async fn fetch_queued(&self, limit: i64) -> Result<Vec<PrintJob>, DomainError> {
        let sql = format!(
            "SELECT {} FROM contract_print_jobs WHERE status = 'QUEUED' ORDER BY queued_at ASC, id ASC LIMIT $1",
            JOB_COLUMNS
        );
        let rows: Vec<PrintJobRow> = sqlx::query_as(&sql)
            .bind(limit)
            .fetch_all(&self.pool)
            .await
            .map_err(db_error("fetching queued print jobs"))?;

        Ok(rows.into_iter().map(PrintJob::from).collect())
    }

    async fn claim(&self, tenant_id: TenantId, id: RecordId) -> Result<bool, DomainError> {
        let claimed = sqlx::query(
            r#"
            UPDATE contract_print_jobs
            SET status = 'PROCESSING', started_at = NOW(), completed_at = NULL
            WHERE id = $1 AND tenant_id = $2 AND status = 'QUEUED'
            "#,
        )
        .bind(id)
        .bind(tenant_id)
        .execute(&self.pool)
        .await
        .map_err(db_error("claiming print job"))?
        .rows_affected();

        Ok(claimed == 1)
    }

    async fn complete(&self, tenant_id: TenantId, id: RecordId, output: &PrintOutput) -> Result<(), DomainError> {
        let updated = sqlx::query(
            r#"
            UPDATE contract_print_jobs
            SET status = 'COMPLETED', output_path = $3, file_size = $4, page_count = $5,
                error_message = NULL, completed_at = NOW()
            WHERE id = $1 AND tenant_id = $2 AND status = 'PROCESSING'
            "#,
        )
        .bind(id)
        .bind(tenant_id)
        .bind(&output.output_path)
        .bind(output.file_size)
        .bind(output.page_count)
        .execute(&self.pool)
        .await
        .map_err(db_error("completing print job"))?
        .rows_affected();

        if updated == 0 {
            return Err(DomainError::not_found("PrintJob", id));
        }
        Ok(())
    }

    async fn fail(&self, tenant_id: TenantId, id: RecordId, error: &str) -> Result<(), DomainError> {
        self.transition(
            r#"
            UPDATE contract_print_jobs
            SET status = 'FAILED', error_message = $3, completed_at = NOW()
            WHERE id = $1 AND tenant_id = $2 AND status = 'PROCESSING'
            "#,
            tenant_id,
            id,
            error,
            "failing print job",
        )
        .await
    }

    async fn requeue(&self, tenant_id: TenantId, id: RecordId, error: &str) -> Result<(), DomainError> {
        self.transition(
            r#"
            UPDATE contract_print_jobs
            SET status = 'QUEUED', error_message = $3, retry_count = retry_count + 1,
                started_at = NULL
            WHERE id = $1 AND tenant_id = $2 AND status = 'PROCESSING'
            "#,
            tenant_id,
            id,
            error,
            "re-queueing print job",
        )
        .await
    }

    async fn reap_stale(&self, claimed_before: DateTime<Utc>, max_retries: i32) -> Result<u64, DomainError> {
        let mut tx = self.pool.begin().await.map_err(db_error("starting transaction"))?;

        let requeued = sqlx::query(
            r#"
            UPDATE contract_print_jobs
            SET status = 'QUEUED', retry_count = retry_count + 1, started_at = NULL,
                error_message = 'claim expired'
            WHERE status = 'PROCESSING' AND started_at < $1 AND retry_count < $2
            "#,
        )
        .bind(claimed_before)
        .bind(max_retries)
        .execute(&mut *tx)
        .await
        .map_err(db_error("re-queueing stale print jobs"))?
        .rows_affected();

        let failed = sqlx::query(
            r#"
            UPDATE contract_print_jobs
            SET status = 'FAILED', completed_at = NOW(),
                error_message = 'claim expired, retries exhausted'
            WHERE status = 'PROCESSING' AND started_at < $1 AND retry_count >= $2
            "#,
        )
        .bind(claimed_before)
        .bind(max_retries)
        .execute(&mut *tx)
        .await
        .map_err(db_error("failing stale print jobs"))?
        .rows_affected();

        tx.commit().await.map_err(db_error("committing stale claim release"))?;

        if requeued + failed > 0 {
            info!(requeued, failed, "Released stale print job claims");
        }
        Ok(requeued + failed)
    }
}
