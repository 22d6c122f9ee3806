// ============================================================================
// Records Infrastructure - Generic CRUD Engine
// File: crates/records-infrastructure/src/database/crud.rs
// ============================================================================
//! Table-agnostic insert/update/delete/query/count over the
//! `sp_dynamic_*` stored procedures.
//!
//! Every operation validates the table name against the allowlist and
//! builds its arguments before the executor is touched, so a rejected
//! request never reaches the database.

use std::sync::Arc;

use async_trait::async_trait;
use records_shared::constants::{DEFAULT_PAGE_SIZE, MAX_PAGE_SIZE};
use records_shared::{ActorId, RecordId, TenantId};
use tracing::debug;

use super::sql::{
    build_columns, build_filters, build_projection, build_sort, validate_table, ColumnValue, Filter,
    Identifier, SortSpec, SqlFragment, Table,
};
use crate::error::CrudError;

/// Raw output row of the insert/update/delete procedures.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProcedureOutcome {
    /// Generated id (insert) or rows affected (update/delete).
    pub value: i64,
    pub success: bool,
    pub error: Option<String>,
}

/// Arguments of `sp_dynamic_query`.
#[derive(Debug, Clone, PartialEq)]
pub struct QueryStatement {
    pub projection: SqlFragment,
    pub filters: SqlFragment,
    pub sort: SqlFragment,
    pub offset: i64,
    pub limit: i64,
}

/// Executes the stored-procedure contract. Implemented over a `PgPool` in
/// production and mocked in tests.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ProcedureExecutor: Send + Sync {
    async fn insert(
        &self,
        table: Table,
        tenant_id: TenantId,
        columns: &SqlFragment,
        actor: ActorId,
    ) -> Result<ProcedureOutcome, CrudError>;

    async fn update(
        &self,
        table: Table,
        tenant_id: TenantId,
        id: RecordId,
        columns: &SqlFragment,
        actor: ActorId,
    ) -> Result<ProcedureOutcome, CrudError>;

    async fn delete(
        &self,
        table: Table,
        tenant_id: TenantId,
        id: RecordId,
        soft: bool,
        actor: ActorId,
    ) -> Result<ProcedureOutcome, CrudError>;

    async fn query(
        &self,
        table: Table,
        tenant_id: TenantId,
        statement: &QueryStatement,
    ) -> Result<Vec<serde_json::Value>, CrudError>;

    async fn count(&self, table: Table, tenant_id: TenantId, filters: &SqlFragment) -> Result<i64, CrudError>;

    async fn aggregate(
        &self,
        parent: Table,
        parent_id: RecordId,
        tenant_id: TenantId,
        child: Table,
    ) -> Result<(), CrudError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InsertResult {
    pub generated_id: RecordId,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateResult {
    /// Nothing to write; no statement was issued.
    Unchanged,
    Updated { rows_affected: u64 },
}

impl UpdateResult {
    /// A failed procedure or zero affected rows is an error.
    pub(crate) fn from_outcome(table: Table, id: RecordId, outcome: ProcedureOutcome) -> Result<Self, CrudError> {
        if !outcome.success {
            return Err(CrudError::procedure_failed(outcome.error));
        }
        if outcome.value == 0 {
            return Err(CrudError::NotFound { entity: table.entity(), id });
        }
        Ok(UpdateResult::Updated { rows_affected: outcome.value as u64 })
    }
}

/// Projection, filters, sort and window for `query`.
#[derive(Debug, Clone, Default)]
pub struct QueryOptions {
    /// Empty selects all columns.
    pub columns: Vec<Identifier>,
    pub filters: Vec<Filter>,
    pub sort: Vec<SortSpec>,
    pub offset: i64,
    /// Zero means the default page size.
    pub limit: i64,
}

impl QueryOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn filter(mut self, filter: Filter) -> Self {
        self.filters.push(filter);
        self
    }

    pub fn sort(mut self, sort: SortSpec) -> Self {
        self.sort.push(sort);
        self
    }

    pub fn window(mut self, offset: i64, limit: i64) -> Self {
        self.offset = offset;
        self.limit = limit;
        self
    }
}

pub struct CrudEngine<E: ProcedureExecutor> {
    executor: Arc<E>,
}

impl<E: ProcedureExecutor> Clone for CrudEngine<E> {
    fn clone(&self) -> Self {
        Self { executor: Arc::clone(&self.executor) }
    }
}

impl<E: ProcedureExecutor> CrudEngine<E> {
    pub fn new(executor: Arc<E>) -> Self {
        Self { executor }
    }

    pub async fn insert(
        &self,
        table: &str,
        tenant_id: TenantId,
        columns: &[ColumnValue],
        actor: ActorId,
    ) -> Result<InsertResult, CrudError> {
        let table = validate_table(table)?;
        let columns = build_columns(columns);
        debug!(table = %table, tenant_id = %tenant_id, "sp_dynamic_insert");

        let outcome = self.executor.insert(table, tenant_id, &columns, actor).await?;
        if !outcome.success {
            return Err(CrudError::procedure_failed(outcome.error));
        }
        Ok(InsertResult { generated_id: outcome.value })
    }

    pub async fn update(
        &self,
        table: &str,
        tenant_id: TenantId,
        id: RecordId,
        columns: &[ColumnValue],
        actor: ActorId,
    ) -> Result<UpdateResult, CrudError> {
        let table = validate_table(table)?;
        if columns.is_empty() {
            return Ok(UpdateResult::Unchanged);
        }
        let columns = build_columns(columns);
        debug!(table = %table, tenant_id = %tenant_id, id, "sp_dynamic_update");

        let outcome = self.executor.update(table, tenant_id, id, &columns, actor).await?;
        UpdateResult::from_outcome(table, id, outcome)
    }

    pub async fn delete(
        &self,
        table: &str,
        tenant_id: TenantId,
        id: RecordId,
        soft: bool,
        actor: ActorId,
    ) -> Result<u64, CrudError> {
        let table = validate_table(table)?;
        debug!(table = %table, tenant_id = %tenant_id, id, soft, "sp_dynamic_delete");

        let outcome = self.executor.delete(table, tenant_id, id, soft, actor).await?;
        if !outcome.success {
            return Err(CrudError::procedure_failed(outcome.error));
        }
        if outcome.value == 0 {
            return Err(CrudError::NotFound { entity: table.entity(), id });
        }
        Ok(outcome.value as u64)
    }

    pub async fn query(
        &self,
        table: &str,
        tenant_id: TenantId,
        options: &QueryOptions,
    ) -> Result<Vec<serde_json::Value>, CrudError> {
        let table = validate_table(table)?;
        let (offset, limit) = window(options.offset, options.limit)?;
        let statement = QueryStatement {
            projection: build_projection(&options.columns),
            filters: build_filters(&options.filters),
            sort: build_sort(&options.sort),
            offset,
            limit,
        };
        debug!(table = %table, tenant_id = %tenant_id, offset, limit, "sp_dynamic_query");
        self.executor.query(table, tenant_id, &statement).await
    }

    pub async fn count(&self, table: &str, tenant_id: TenantId, filters: &[Filter]) -> Result<i64, CrudError> {
        let table = validate_table(table)?;
        let filters = build_filters(filters);
        self.executor.count(table, tenant_id, &filters).await
    }

    /// Ask the database to recompute a parent's aggregate from its children.
    pub async fn aggregate(
        &self,
        parent: &str,
        parent_id: RecordId,
        tenant_id: TenantId,
        child: &str,
    ) -> Result<(), CrudError> {
        let parent = validate_table(parent)?;
        let child = validate_table(child)?;
        debug!(parent = %parent, child = %child, parent_id, "sp_aggregate_children");
        self.executor.aggregate(parent, parent_id, tenant_id, child).await
    }
}

fn window(offset: i64, limit: i64) -> Result<(i64, i64), CrudError> {
    if offset < 0 || limit < 0 {
        return Err(CrudError::InvalidPagination(format!("offset={} limit={}", offset, limit)));
    }
    let limit = if limit == 0 { DEFAULT_PAGE_SIZE } else { limit.min(MAX_PAGE_SIZE) };
    Ok((offset, limit))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::sql::FilterOperator;
    use uuid::Uuid;

    fn engine(executor: MockProcedureExecutor) -> CrudEngine<MockProcedureExecutor> {
        CrudEngine::new(Arc::new(executor))
    }

    fn no_calls() -> MockProcedureExecutor {
        let mut executor = MockProcedureExecutor::new();
        executor.expect_insert().never();
        executor.expect_update().never();
        executor.expect_delete().never();
        executor.expect_query().never();
        executor.expect_count().never();
        executor.expect_aggregate().never();
        executor
    }

    fn ok(value: i64) -> ProcedureOutcome {
        ProcedureOutcome { value, success: true, error: None }
    }

    #[tokio::test]
    async fn test_unknown_table_never_reaches_executor() {
        let engine = engine(no_calls());
        let tenant = Uuid::new_v4();
        let actor = Uuid::new_v4();
        let cols = vec![ColumnValue::new("name", "x").unwrap()];

        assert!(matches!(engine.insert("users", tenant, &cols, actor).await, Err(CrudError::TableNotAllowed(_))));
        assert!(matches!(engine.update("pg_user", tenant, 1, &cols, actor).await, Err(CrudError::TableNotAllowed(_))));
        assert!(matches!(engine.delete("users", tenant, 1, true, actor).await, Err(CrudError::TableNotAllowed(_))));
        assert!(matches!(
            engine.query("users", tenant, &QueryOptions::new()).await,
            Err(CrudError::TableNotAllowed(_))
        ));
        assert!(matches!(engine.count("users", tenant, &[]).await, Err(CrudError::TableNotAllowed(_))));
        assert!(matches!(
            engine.aggregate("contracts", 1, tenant, "users").await,
            Err(CrudError::TableNotAllowed(_))
        ));
    }

    #[tokio::test]
    async fn test_insert_returns_generated_id() {
        let mut executor = MockProcedureExecutor::new();
        executor
            .expect_insert()
            .withf(|table, _, columns, _| {
                *table == Table::Customers && columns.as_str().starts_with("ARRAY[ROW(E'customer_code'")
            })
            .times(1)
            .returning(|_, _, _, _| Ok(ok(41)));

        let cols = vec![ColumnValue::new("customer_code", "C-001").unwrap()];
        let result = engine(executor)
            .insert("customers", Uuid::nil(), &cols, Uuid::nil())
            .await
            .unwrap();
        assert_eq!(result.generated_id, 41);
    }

    #[tokio::test]
    async fn test_procedure_failure_surfaces_code() {
        let mut executor = MockProcedureExecutor::new();
        executor.expect_insert().returning(|_, _, _, _| {
            Ok(ProcedureOutcome {
                value: 0,
                success: false,
                error: Some("DUPLICATE: contract_number CTR-1 exists".into()),
            })
        });

        let cols = vec![ColumnValue::new("contract_number", "CTR-1").unwrap()];
        let err = engine(executor)
            .insert("contracts", Uuid::nil(), &cols, Uuid::nil())
            .await
            .unwrap_err();
        match err {
            CrudError::ProcedureFailed { code, message } => {
                assert_eq!(code.as_deref(), Some("DUPLICATE"));
                assert_eq!(message, "contract_number CTR-1 exists");
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_empty_update_is_unchanged_without_statement() {
        let result = engine(no_calls())
            .update("contracts", Uuid::nil(), 7, &[], Uuid::nil())
            .await
            .unwrap();
        assert_eq!(result, UpdateResult::Unchanged);
    }

    #[tokio::test]
    async fn test_zero_rows_is_not_found() {
        let mut executor = MockProcedureExecutor::new();
        executor.expect_update().returning(|_, _, _, _, _| Ok(ok(0)));
        executor.expect_delete().returning(|_, _, _, _, _| Ok(ok(0)));
        let engine = engine(executor);
        let cols = vec![ColumnValue::new("title", "x").unwrap()];

        assert!(matches!(
            engine.update("contracts", Uuid::nil(), 9, &cols, Uuid::nil()).await,
            Err(CrudError::NotFound { entity: "Contract", id: 9 })
        ));
        assert!(matches!(
            engine.delete("services", Uuid::nil(), 9, true, Uuid::nil()).await,
            Err(CrudError::NotFound { entity: "Service", id: 9 })
        ));
    }

    #[tokio::test]
    async fn test_query_window_validation_and_cap() {
        let engine_neg = engine(no_calls());
        let err = engine_neg
            .query("contracts", Uuid::nil(), &QueryOptions::new().window(-1, 10))
            .await
            .unwrap_err();
        assert!(matches!(err, CrudError::InvalidPagination(_)));

        let mut executor = MockProcedureExecutor::new();
        executor
            .expect_query()
            .withf(|_, _, s| s.limit == MAX_PAGE_SIZE && s.projection.as_str() == "ARRAY[]::text[]")
            .times(1)
            .returning(|_, _, _| Ok(vec![serde_json::json!({"id": 1})]));

        let options = QueryOptions::new()
            .filter(Filter::new("status", FilterOperator::Eq, "DRAFT").unwrap())
            .sort(SortSpec::desc("created_at").unwrap())
            .window(0, 100_000);
        let rows = engine(executor).query("contracts", Uuid::nil(), &options).await.unwrap();
        assert_eq!(rows.len(), 1);
    }
}
