// ============================================================================
// Records Infrastructure - PostgreSQL Contract History Repository
// File: crates/records-infrastructure/src/database/postgres/history_repo_impl.rs
// ============================================================================

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

use records_core::domain::{HistoryAction, HistoryEntry, NewHistoryEntry};
use records_core::error::DomainError;
use records_core::repositories::HistoryRepository;
use records_shared::{Page, Pagination, RecordId, TenantId};

use crate::error::db_error;

pub struct PgHistoryRepository {
    pool: PgPool,
}

impl PgHistoryRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(Debug, FromRow)]
struct HistoryRow {
    pub id: i64,
    pub tenant_id: Uuid,
    pub contract_id: i64,
    pub action: String,
    pub field_name: Option<String>,
    pub old_value: Option<String>,
    pub new_value: Option<String>,
    pub description: Option<String>,
    pub performed_by: Option<Uuid>,
    pub client_ip: Option<String>,
    pub client_user_agent: Option<String>,
    pub created_at: DateTime<Utc>,
    pub anonymized_at: Option<DateTime<Utc>>,
}

impl TryFrom<HistoryRow> for HistoryEntry {
    type Error = DomainError;

    fn try_from(row: HistoryRow) -> Result<Self, Self::Error> {
        let action = HistoryAction::from_str(&row.action)
            .ok_or_else(|| DomainError::DatabaseError(format!("unknown history action {}", row.action)))?;
        Ok(HistoryEntry {
            id: row.id,
            tenant_id: row.tenant_id,
            contract_id: row.contract_id,
            action,
            field_name: row.field_name,
            old_value: row.old_value,
            new_value: row.new_value,
            description: row.description,
            performed_by: row.performed_by,
            client_ip: row.client_ip,
            client_user_agent: row.client_user_agent,
            created_at: row.created_at,
            anonymized_at: row.anonymized_at,
        })
    }
}

const HISTORY_COLUMNS: &str = r#"
    id, tenant_id, contract_id, action, field_name, old_value, new_value,
    description, performed_by, client_ip, client_user_agent, created_at, anonymized_at
"#;

#[async_trait]
impl HistoryRepository for PgHistoryRepository {
    async fn append(&self, tenant_id: TenantId, entry: &NewHistoryEntry) -> Result<HistoryEntry, DomainError> {
        let sql = format!(
            r#"
            INSERT INTO contract_history (
                tenant_id, contract_id, action, field_name, old_value, new_value,
                description, performed_by, client_ip, client_user_agent, created_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, NOW())
            RETURNING {}
            "#,
            HISTORY_COLUMNS
        );
        let row: HistoryRow = sqlx::query_as(&sql)
            .bind(tenant_id)
            .bind(entry.contract_id)
            .bind(entry.action.as_str())
            .bind(&entry.field_name)
            .bind(&entry.old_value)
            .bind(&entry.new_value)
            .bind(&entry.description)
            .bind(entry.performed_by)
            .bind(&entry.client_ip)
            .bind(&entry.client_user_agent)
            .fetch_one(&self.pool)
            .await
            .map_err(db_error("appending history entry"))?;

        row.try_into()
    }

    async fn find_by_id(&self, tenant_id: TenantId, id: RecordId) -> Result<Option<HistoryEntry>, DomainError> {
        let sql = format!(
            "SELECT {} FROM contract_history WHERE id = $1 AND tenant_id = $2",
            HISTORY_COLUMNS
        );
        let row: Option<HistoryRow> = sqlx::query_as(&sql)
            .bind(id)
            .bind(tenant_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(db_error("finding history entry"))?;

        row.map(HistoryEntry::try_from).transpose()
    }

    async fn list_for_contract(
        &self,
        tenant_id: TenantId,
        contract_id: RecordId,
        page: Pagination,
    ) -> Result<Page<HistoryEntry>, DomainError> {
        let total: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM contract_history WHERE contract_id = $1 AND tenant_id = $2",
        )
        .bind(contract_id)
        .bind(tenant_id)
        .fetch_one(&self.pool)
        .await
        .map_err(db_error("counting history entries"))?;

        let sql = format!(
            r#"
            SELECT {} FROM contract_history
            WHERE contract_id = $1 AND tenant_id = $2
            ORDER BY created_at DESC, id DESC
            OFFSET $3 LIMIT $4
            "#,
            HISTORY_COLUMNS
        );
        let rows: Vec<HistoryRow> = sqlx::query_as(&sql)
            .bind(contract_id)
            .bind(tenant_id)
            .bind(page.offset)
            .bind(page.limit)
            .fetch_all(&self.pool)
            .await
            .map_err(db_error("listing history entries"))?;

        let items = rows
            .into_iter()
            .map(HistoryEntry::try_from)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Page { items, total, offset: page.offset, limit: page.limit })
    }

    async fn store_anonymized(&self, tenant_id: TenantId, entry: &HistoryEntry) -> Result<(), DomainError> {
        let updated = sqlx::query(
            r#"
            UPDATE contract_history
            SET client_ip = $3, client_user_agent = $4, anonymized_at = $5
            WHERE id = $1 AND tenant_id = $2
            "#,
        )
        .bind(entry.id)
        .bind(tenant_id)
        .bind(&entry.client_ip)
        .bind(&entry.client_user_agent)
        .bind(entry.anonymized_at)
        .execute(&self.pool)
        .await
        .map_err(db_error("storing anonymized history entry"))?
        .rows_affected();

        if updated == 0 {
            return Err(DomainError::not_found("ContractHistory", entry.id));
        }
        Ok(())
    }
}
