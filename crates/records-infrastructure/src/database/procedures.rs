//! `ProcedureExecutor` over a PostgreSQL pool

use async_trait::async_trait;
use records_shared::{ActorId, RecordId, TenantId};
use sqlx::{Executor, FromRow, PgPool, Postgres};
use tracing::error;

use super::crud::{ProcedureExecutor, ProcedureOutcome, QueryStatement};
use super::sql::{SqlFragment, Table};
use crate::error::CrudError;

#[derive(Clone)]
pub struct PgProcedureExecutor {
    pool: PgPool,
}

impl PgProcedureExecutor {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(Debug, FromRow)]
struct OutcomeRow {
    out_value: Option<i64>,
    out_success: bool,
    out_error: Option<String>,
}

impl From<OutcomeRow> for ProcedureOutcome {
    fn from(row: OutcomeRow) -> Self {
        ProcedureOutcome {
            value: row.out_value.unwrap_or(0),
            success: row.out_success,
            error: row.out_error,
        }
    }
}

fn logged(procedure: &'static str) -> impl FnOnce(sqlx::Error) -> CrudError {
    move |e| {
        error!("Database error calling {}: {}", procedure, e);
        CrudError::Database(e)
    }
}

/// `sp_dynamic_update` on any executor. Lets a caller holding a transaction
/// run the update under its own row locks.
pub(crate) async fn call_update<'e, X>(
    executor: X,
    table: Table,
    tenant_id: TenantId,
    id: RecordId,
    columns: &SqlFragment,
    actor: ActorId,
) -> Result<ProcedureOutcome, CrudError>
where
    X: Executor<'e, Database = Postgres>,
{
    let sql = format!(
        "SELECT out_rows AS out_value, out_success, out_error FROM sp_dynamic_update($1, $2, $3, {}, $4)",
        columns
    );
    let row: OutcomeRow = sqlx::query_as(&sql)
        .bind(table.as_str())
        .bind(tenant_id)
        .bind(id)
        .bind(actor)
        .fetch_one(executor)
        .await
        .map_err(logged("sp_dynamic_update"))?;
    Ok(row.into())
}

#[async_trait]
impl ProcedureExecutor for PgProcedureExecutor {
    async fn insert(
        &self,
        table: Table,
        tenant_id: TenantId,
        columns: &SqlFragment,
        actor: ActorId,
    ) -> Result<ProcedureOutcome, CrudError> {
        let sql = format!(
            "SELECT out_id AS out_value, out_success, out_error FROM sp_dynamic_insert($1, $2, {}, $3)",
            columns
        );
        let row: OutcomeRow = sqlx::query_as(&sql)
            .bind(table.as_str())
            .bind(tenant_id)
            .bind(actor)
            .fetch_one(&self.pool)
            .await
            .map_err(logged("sp_dynamic_insert"))?;
        Ok(row.into())
    }

    async fn update(
        &self,
        table: Table,
        tenant_id: TenantId,
        id: RecordId,
        columns: &SqlFragment,
        actor: ActorId,
    ) -> Result<ProcedureOutcome, CrudError> {
        call_update(&self.pool, table, tenant_id, id, columns, actor).await
    }

    async fn delete(
        &self,
        table: Table,
        tenant_id: TenantId,
        id: RecordId,
        soft: bool,
        actor: ActorId,
    ) -> Result<ProcedureOutcome, CrudError> {
        let row: OutcomeRow = sqlx::query_as(
            "SELECT out_rows AS out_value, out_success, out_error FROM sp_dynamic_delete($1, $2, $3, $4, $5)",
        )
        .bind(table.as_str())
        .bind(tenant_id)
        .bind(id)
        .bind(soft)
        .bind(actor)
        .fetch_one(&self.pool)
        .await
        .map_err(logged("sp_dynamic_delete"))?;
        Ok(row.into())
    }

    async fn query(
        &self,
        table: Table,
        tenant_id: TenantId,
        statement: &QueryStatement,
    ) -> Result<Vec<serde_json::Value>, CrudError> {
        let sql = format!(
            "SELECT row_data FROM sp_dynamic_query($1, $2, {}, {}, {}, $3, $4) AS row_data",
            statement.projection, statement.filters, statement.sort
        );
        sqlx::query_scalar::<_, serde_json::Value>(&sql)
            .bind(table.as_str())
            .bind(tenant_id)
            .bind(statement.offset)
            .bind(statement.limit)
            .fetch_all(&self.pool)
            .await
            .map_err(logged("sp_dynamic_query"))
    }

    async fn count(&self, table: Table, tenant_id: TenantId, filters: &SqlFragment) -> Result<i64, CrudError> {
        let sql = format!("SELECT sp_dynamic_count($1, $2, {})", filters);
        sqlx::query_scalar::<_, i64>(&sql)
            .bind(table.as_str())
            .bind(tenant_id)
            .fetch_one(&self.pool)
            .await
            .map_err(logged("sp_dynamic_count"))
    }

    async fn aggregate(
        &self,
        parent: Table,
        parent_id: RecordId,
        tenant_id: TenantId,
        child: Table,
    ) -> Result<(), CrudError> {
        sqlx::query("SELECT sp_aggregate_children($1, $2, $3, $4)")
            .bind(parent.as_str())
            .bind(parent_id)
            .bind(tenant_id)
            .bind(child.as_str())
            .execute(&self.pool)
            .await
            .map_err(logged("sp_aggregate_children"))?;
        Ok(())
    }
}
