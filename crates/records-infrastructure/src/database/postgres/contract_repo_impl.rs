// ============================================================================
// Records Infrastructure - PostgreSQL Contract Repository
// File: crates/records-infrastructure/src/database/postgres/contract_repo_impl.rs
// ============================================================================
//! Contracts and their line items. Multi-row writes run in one transaction;
//! an early return drops the uncommitted transaction, which rolls it back.

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use sqlx::{FromRow, PgConnection, PgPool};
use tracing::{error, info, warn};
use uuid::Uuid;

use records_core::domain::{
    ensure_date_range, BillingCycle, Contract, ContractChanges, ContractFilter, ContractItem, ContractStatus,
    ContractType, ContractWithItems, ItemStatus, NewContract, NewContractItem,
};
use records_core::error::DomainError;
use records_core::repositories::ContractRepository;
use records_shared::{ActorId, Page, Pagination, RecordId, TenantId};

use crate::database::crud::{CrudEngine, UpdateResult};
use crate::database::procedures::{call_update, PgProcedureExecutor};
use crate::database::sql::{build_columns, column_values, Table};
use crate::error::{db_error, is_unique_violation, map_sqlx_error};

pub struct PgContractRepository {
    pool: PgPool,
    engine: CrudEngine<PgProcedureExecutor>,
}

impl PgContractRepository {
    pub fn new(pool: PgPool, engine: CrudEngine<PgProcedureExecutor>) -> Self {
        Self { pool, engine }
    }

    async fn require(&self, tenant_id: TenantId, id: RecordId) -> Result<Contract, DomainError> {
        self.find_by_id(tenant_id, id)
            .await?
            .ok_or_else(|| DomainError::not_found("Contract", id))
    }
}

// Internal row types for SQLx mapping
#[derive(Debug, FromRow)]
struct ContractRow {
    pub id: i64,
    pub tenant_id: Uuid,
    pub contract_number: String,
    pub contract_type: String,
    pub customer_id: i64,
    pub title: String,
    pub notes: Option<String>,
    pub start_date: NaiveDate,
    pub end_date: Option<NaiveDate>,
    pub billing_cycle: String,
    pub status: String,
    pub signed_at: Option<DateTime<Utc>>,
    pub signed_by: Option<Uuid>,
    pub total_value: Decimal,
    pub currency: String,
    pub created_at: DateTime<Utc>,
    pub created_by: Option<Uuid>,
    pub modified_at: Option<DateTime<Utc>>,
    pub modified_by: Option<Uuid>,
}

impl From<ContractRow> for Contract {
    fn from(row: ContractRow) -> Self {
        Contract {
            id: row.id,
            tenant_id: row.tenant_id,
            contract_number: row.contract_number,
            contract_type: ContractType::from_str(&row.contract_type).unwrap_or_default(),
            customer_id: row.customer_id,
            title: row.title,
            notes: row.notes,
            start_date: row.start_date,
            end_date: row.end_date,
            billing_cycle: BillingCycle::from_str(&row.billing_cycle).unwrap_or_default(),
            status: ContractStatus::from_str(&row.status).unwrap_or_default(),
            signed_at: row.signed_at,
            signed_by: row.signed_by,
            total_value: row.total_value,
            currency: row.currency,
            created_at: row.created_at,
            created_by: row.created_by,
            modified_at: row.modified_at,
            modified_by: row.modified_by,
        }
    }
}

#[derive(Debug, FromRow)]
struct ContractItemRow {
    pub id: i64,
    pub tenant_id: Uuid,
    pub contract_id: i64,
    pub service_id: i64,
    pub description: Option<String>,
    pub quantity: Decimal,
    pub unit_price: Decimal,
    pub discount_pct: Decimal,
    pub line_total: Decimal,
    pub status: String,
    pub sort_order: i32,
    pub created_at: DateTime<Utc>,
}

impl From<ContractItemRow> for ContractItem {
    fn from(row: ContractItemRow) -> Self {
        ContractItem {
            id: row.id,
            tenant_id: row.tenant_id,
            contract_id: row.contract_id,
            service_id: row.service_id,
            description: row.description,
            quantity: row.quantity,
            unit_price: row.unit_price,
            discount_pct: row.discount_pct,
            line_total: row.line_total,
            status: ItemStatus::from_str(&row.status).unwrap_or_default(),
            sort_order: row.sort_order,
            created_at: row.created_at,
        }
    }
}

const CONTRACT_COLUMNS: &str = r#"
    id, tenant_id, contract_number, contract_type, customer_id, title, notes,
    start_date, end_date, billing_cycle, status, signed_at, signed_by,
    total_value, currency, created_at, created_by, modified_at, modified_by
"#;

const ITEM_COLUMNS: &str = r#"
    id, tenant_id, contract_id, service_id, description, quantity, unit_price,
    discount_pct, line_total, status, sort_order, created_at
"#;

/// Referenced customer/service must exist and belong to the tenant.
async fn ensure_owned(
    conn: &mut PgConnection,
    table: Table,
    id: RecordId,
    tenant_id: TenantId,
) -> Result<(), DomainError> {
    let sql = format!("SELECT tenant_id FROM {} WHERE id = $1", table.as_str());
    let owner: Option<Uuid> = sqlx::query_scalar(&sql)
        .bind(id)
        .fetch_optional(&mut *conn)
        .await
        .map_err(db_error("checking reference ownership"))?;

    check_owner(table, id, tenant_id, owner)
}

fn check_owner(table: Table, id: RecordId, tenant_id: TenantId, owner: Option<Uuid>) -> Result<(), DomainError> {
    match owner {
        None => Err(DomainError::not_found(table.entity(), id)),
        Some(owner) if owner != tenant_id => {
            warn!(entity = table.entity(), id, tenant_id = %tenant_id, "Cross-tenant reference rejected");
            Err(DomainError::Unauthorized { entity: table.entity(), id })
        }
        Some(_) => Ok(()),
    }
}

#[derive(Debug)]
struct LockedContract {
    status: ContractStatus,
    start_date: NaiveDate,
    end_date: Option<NaiveDate>,
}

#[derive(Debug, FromRow)]
struct LockedRow {
    status: String,
    start_date: NaiveDate,
    end_date: Option<NaiveDate>,
}

/// Lock the contract row for the rest of the transaction.
async fn lock_contract(conn: &mut PgConnection, tenant_id: TenantId, id: RecordId) -> Result<LockedContract, DomainError> {
    let row: Option<LockedRow> = sqlx::query_as(
        "SELECT status, start_date, end_date FROM contracts WHERE id = $1 AND tenant_id = $2 FOR UPDATE",
    )
    .bind(id)
    .bind(tenant_id)
    .fetch_optional(&mut *conn)
    .await
    .map_err(db_error("locking contract"))?;

    row.map(|r| LockedContract {
        status: ContractStatus::from_str(&r.status).unwrap_or_default(),
        start_date: r.start_date,
        end_date: r.end_date,
    })
    .ok_or_else(|| DomainError::not_found("Contract", id))
}

async fn insert_item(
    conn: &mut PgConnection,
    tenant_id: TenantId,
    contract_id: RecordId,
    item: &NewContractItem,
    sort_order: i32,
) -> Result<ContractItemRow, DomainError> {
    let line_total = item.line_total()?;
    ensure_owned(conn, Table::Services, item.service_id, tenant_id).await?;

    let sql = format!(
        r#"
        INSERT INTO contract_items (
            tenant_id, contract_id, service_id, description, quantity,
            unit_price, discount_pct, line_total, status, sort_order, created_at
        )
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, NOW())
        RETURNING {}
        "#,
        ITEM_COLUMNS
    );
    sqlx::query_as(&sql)
        .bind(tenant_id)
        .bind(contract_id)
        .bind(item.service_id)
        .bind(&item.description)
        .bind(item.quantity)
        .bind(item.unit_price)
        .bind(item.discount_pct)
        .bind(line_total)
        .bind(ItemStatus::Pending.as_str())
        .bind(item.sort_order.unwrap_or(sort_order))
        .fetch_one(&mut *conn)
        .await
        .map_err(db_error("inserting contract item"))
}

/// `total_value = COALESCE(SUM(line_total), 0)` over the current items.
async fn recompute_total_in(conn: &mut PgConnection, tenant_id: TenantId, contract_id: RecordId) -> Result<Decimal, DomainError> {
    sqlx::query_scalar(
        r#"
        UPDATE contracts
        SET total_value = (
                SELECT COALESCE(SUM(line_total), 0)
                FROM contract_items
                WHERE contract_id = $1 AND tenant_id = $2
            ),
            modified_at = NOW()
        WHERE id = $1 AND tenant_id = $2
        RETURNING total_value
        "#,
    )
    .bind(contract_id)
    .bind(tenant_id)
    .fetch_one(&mut *conn)
    .await
    .map_err(db_error("recomputing contract total"))
}

#[async_trait]
impl ContractRepository for PgContractRepository {
    async fn find_by_id(&self, tenant_id: TenantId, id: RecordId) -> Result<Option<Contract>, DomainError> {
        let sql = format!("SELECT {} FROM contracts WHERE id = $1 AND tenant_id = $2", CONTRACT_COLUMNS);
        let row: Option<ContractRow> = sqlx::query_as(&sql)
            .bind(id)
            .bind(tenant_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(db_error("finding contract by id"))?;

        Ok(row.map(|r| r.into()))
    }

    async fn find_with_items(
        &self,
        tenant_id: TenantId,
        id: RecordId,
    ) -> Result<Option<ContractWithItems>, DomainError> {
        let Some(contract) = self.find_by_id(tenant_id, id).await? else {
            return Ok(None);
        };
        let items = self.list_items(tenant_id, id).await?;
        Ok(Some(ContractWithItems { contract, items }))
    }

    async fn list(
        &self,
        tenant_id: TenantId,
        filter: &ContractFilter,
        page: Pagination,
    ) -> Result<Page<Contract>, DomainError> {
        let status = filter.status.map(|s| s.as_str());
        let prefix = filter.number_prefix.as_deref().filter(|p| !p.is_empty());
        let predicate = r#"
            WHERE tenant_id = $1
              AND ($2::text IS NULL OR status = $2)
              AND ($3::bigint IS NULL OR customer_id = $3)
              AND ($4::text IS NULL OR starts_with(contract_number, $4))
        "#;

        let total: i64 = sqlx::query_scalar(&format!("SELECT COUNT(*) FROM contracts {}", predicate))
            .bind(tenant_id)
            .bind(status)
            .bind(filter.customer_id)
            .bind(prefix)
            .fetch_one(&self.pool)
            .await
            .map_err(db_error("counting contracts"))?;

        let sql = format!(
            "SELECT {} FROM contracts {} ORDER BY created_at DESC, id DESC OFFSET $5 LIMIT $6",
            CONTRACT_COLUMNS, predicate
        );
        let rows: Vec<ContractRow> = sqlx::query_as(&sql)
            .bind(tenant_id)
            .bind(status)
            .bind(filter.customer_id)
            .bind(prefix)
            .bind(page.offset)
            .bind(page.limit)
            .fetch_all(&self.pool)
            .await
            .map_err(db_error("listing contracts"))?;

        Ok(Page {
            items: rows.into_iter().map(Contract::from).collect(),
            total,
            offset: page.offset,
            limit: page.limit,
        })
    }

    async fn list_items(&self, tenant_id: TenantId, contract_id: RecordId) -> Result<Vec<ContractItem>, DomainError> {
        let sql = format!(
            "SELECT {} FROM contract_items WHERE contract_id = $1 AND tenant_id = $2 ORDER BY sort_order, id",
            ITEM_COLUMNS
        );
        let rows: Vec<ContractItemRow> = sqlx::query_as(&sql)
            .bind(contract_id)
            .bind(tenant_id)
            .fetch_all(&self.pool)
            .await
            .map_err(db_error("listing contract items"))?;

        Ok(rows.into_iter().map(ContractItem::from).collect())
    }

    async fn create(
        &self,
        tenant_id: TenantId,
        request: &NewContract,
        actor: ActorId,
    ) -> Result<ContractWithItems, DomainError> {
        let mut tx = self.pool.begin().await.map_err(db_error("starting transaction"))?;

        ensure_owned(&mut *tx, Table::Customers, request.customer_id, tenant_id).await?;

        let contract_id: i64 = sqlx::query_scalar(
            r#"
            INSERT INTO contracts (
                tenant_id, contract_number, contract_type, customer_id, title, notes,
                start_date, end_date, billing_cycle, status, total_value, currency,
                created_at, created_by
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, 0, $11, NOW(), $12)
            RETURNING id
            "#,
        )
        .bind(tenant_id)
        .bind(request.contract_number.trim())
        .bind(request.contract_type.as_str())
        .bind(request.customer_id)
        .bind(request.title.trim())
        .bind(&request.notes)
        .bind(request.start_date)
        .bind(request.end_date)
        .bind(request.billing_cycle.as_str())
        .bind(ContractStatus::Draft.as_str())
        .bind(request.currency.to_uppercase())
        .bind(actor)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                DomainError::ContractNumberExists(request.contract_number.clone())
            } else {
                error!("Database error creating contract: {}", e);
                map_sqlx_error(e)
            }
        })?;

        for (index, item) in request.items.iter().enumerate() {
            insert_item(&mut *tx, tenant_id, contract_id, item, index as i32).await?;
        }

        let total = recompute_total_in(&mut *tx, tenant_id, contract_id).await?;
        let expected = request.expected_total()?;
        if total != expected {
            warn!(contract_id, stored = %total, expected = %expected, "Contract total differs from request items");
        }

        tx.commit().await.map_err(db_error("committing contract"))?;
        info!(tenant_id = %tenant_id, contract_id, total = %total, "Contract created");

        self.find_with_items(tenant_id, contract_id)
            .await?
            .ok_or_else(|| DomainError::not_found("Contract", contract_id))
    }

    /// Runs under the contract row lock: the status gate, the customer
    /// reference and the merged date range are checked against what is
    /// stored at write time.
    async fn update_fields(
        &self,
        tenant_id: TenantId,
        id: RecordId,
        changes: &ContractChanges,
        actor: ActorId,
    ) -> Result<Contract, DomainError> {
        let columns = column_values(changes)?;
        if columns.is_empty() {
            return self.require(tenant_id, id).await;
        }

        let mut tx = self.pool.begin().await.map_err(db_error("starting transaction"))?;

        let locked = lock_contract(&mut *tx, tenant_id, id).await?;
        if !locked.status.allows_field_edits() {
            return Err(DomainError::ContractCannotUpdate(locked.status));
        }
        if let Some(customer_id) = changes.new_customer() {
            ensure_owned(&mut *tx, Table::Customers, customer_id, tenant_id).await?;
        }
        let (start, end) = changes.merged_dates(locked.start_date, locked.end_date);
        ensure_date_range(start, end)?;

        let outcome = call_update(&mut *tx, Table::Contracts, tenant_id, id, &build_columns(&columns), actor).await?;
        UpdateResult::from_outcome(Table::Contracts, id, outcome)?;

        tx.commit().await.map_err(db_error("committing contract update"))?;
        self.require(tenant_id, id).await
    }

    async fn update_status(
        &self,
        tenant_id: TenantId,
        id: RecordId,
        from: ContractStatus,
        to: ContractStatus,
        actor: ActorId,
    ) -> Result<Contract, DomainError> {
        if !from.can_transition_to(to) {
            return Err(DomainError::InvalidStatusTransition { from, to });
        }

        let sql = format!(
            r#"
            UPDATE contracts
            SET status = $4, modified_at = NOW(), modified_by = $5
            WHERE id = $1 AND tenant_id = $2 AND status = $3
            RETURNING {}
            "#,
            CONTRACT_COLUMNS
        );
        let row: Option<ContractRow> = sqlx::query_as(&sql)
            .bind(id)
            .bind(tenant_id)
            .bind(from.as_str())
            .bind(to.as_str())
            .bind(actor)
            .fetch_optional(&self.pool)
            .await
            .map_err(db_error("updating contract status"))?;

        match row {
            Some(row) => Ok(row.into()),
            None => {
                // Lost the race: report against the status that is actually stored.
                let current = self.require(tenant_id, id).await?;
                warn!(contract_id = id, expected = %from, actual = %current.status, "Status changed concurrently");
                Err(DomainError::InvalidStatusTransition { from: current.status, to })
            }
        }
    }

    async fn sign(&self, tenant_id: TenantId, id: RecordId, actor: ActorId) -> Result<Contract, DomainError> {
        let sql = format!(
            r#"
            UPDATE contracts
            SET status = $3, signed_at = NOW(), signed_by = $4, modified_at = NOW(), modified_by = $4
            WHERE id = $1 AND tenant_id = $2 AND status = $5
            RETURNING {}
            "#,
            CONTRACT_COLUMNS
        );
        let row: Option<ContractRow> = sqlx::query_as(&sql)
            .bind(id)
            .bind(tenant_id)
            .bind(ContractStatus::Active.as_str())
            .bind(actor)
            .bind(ContractStatus::Pending.as_str())
            .fetch_optional(&self.pool)
            .await
            .map_err(db_error("signing contract"))?;

        match row {
            Some(row) => Ok(row.into()),
            None => {
                let current = self.require(tenant_id, id).await?;
                Err(DomainError::ContractCannotSign(current.status))
            }
        }
    }

    async fn add_item(
        &self,
        tenant_id: TenantId,
        contract_id: RecordId,
        item: &NewContractItem,
        _actor: ActorId,
    ) -> Result<ContractItem, DomainError> {
        let mut tx = self.pool.begin().await.map_err(db_error("starting transaction"))?;

        let status = lock_contract(&mut *tx, tenant_id, contract_id).await?.status;
        if !status.allows_item_changes() {
            return Err(DomainError::ContractNotDraft(status));
        }

        let next_sort: i32 = sqlx::query_scalar(
            "SELECT COALESCE(MAX(sort_order) + 1, 0) FROM contract_items WHERE contract_id = $1 AND tenant_id = $2",
        )
        .bind(contract_id)
        .bind(tenant_id)
        .fetch_one(&mut *tx)
        .await
        .map_err(db_error("reading item sort order"))?;

        let row = insert_item(&mut *tx, tenant_id, contract_id, item, next_sort).await?;
        let total = recompute_total_in(&mut *tx, tenant_id, contract_id).await?;

        tx.commit().await.map_err(db_error("committing contract item"))?;
        info!(contract_id, item_id = row.id, total = %total, "Contract item added");
        Ok(row.into())
    }

    async fn delete_item(
        &self,
        tenant_id: TenantId,
        contract_id: RecordId,
        item_id: RecordId,
        _actor: ActorId,
    ) -> Result<(), DomainError> {
        let mut tx = self.pool.begin().await.map_err(db_error("starting transaction"))?;

        let status = lock_contract(&mut *tx, tenant_id, contract_id).await?.status;
        if !status.allows_item_changes() {
            return Err(DomainError::ContractNotDraft(status));
        }

        let deleted = sqlx::query(
            "DELETE FROM contract_items WHERE id = $1 AND contract_id = $2 AND tenant_id = $3",
        )
        .bind(item_id)
        .bind(contract_id)
        .bind(tenant_id)
        .execute(&mut *tx)
        .await
        .map_err(db_error("deleting contract item"))?
        .rows_affected();

        if deleted == 0 {
            return Err(DomainError::not_found("ContractItem", item_id));
        }

        let total = recompute_total_in(&mut *tx, tenant_id, contract_id).await?;
        tx.commit().await.map_err(db_error("committing item removal"))?;
        info!(contract_id, item_id, total = %total, "Contract item removed");
        Ok(())
    }

    async fn delete(&self, tenant_id: TenantId, id: RecordId, actor: ActorId) -> Result<(), DomainError> {
        self.engine
            .delete(Table::Contracts.as_str(), tenant_id, id, false, actor)
            .await?;
        Ok(())
    }

    async fn recompute_total(&self, tenant_id: TenantId, id: RecordId) -> Result<Decimal, DomainError> {
        self.engine
            .aggregate(Table::Contracts.as_str(), id, tenant_id, Table::ContractItems.as_str())
            .await?;
        Ok(self.require(tenant_id, id).await?.total_value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use records_core::domain::UpdateContractRequest;
    use std::str::FromStr;
    use std::sync::Arc;

    const SCHEMA: &str = include_str!("../../../fixtures/contract_schema.sql");

    // Database-backed tests run only when TEST_DATABASE_URL is set.
    async fn test_pool() -> Option<PgPool> {
        let url = std::env::var("TEST_DATABASE_URL").ok()?;
        let pool = PgPool::connect(&url).await.ok()?;
        sqlx::raw_sql(SCHEMA).execute(&pool).await.expect("apply contract test schema");
        Some(pool)
    }

    fn repo(pool: &PgPool) -> PgContractRepository {
        let engine = CrudEngine::new(Arc::new(PgProcedureExecutor::new(pool.clone())));
        PgContractRepository::new(pool.clone(), engine)
    }

    async fn owned_row(pool: &PgPool, table: &str, tenant_id: TenantId) -> RecordId {
        sqlx::query_scalar(&format!("INSERT INTO {} (tenant_id) VALUES ($1) RETURNING id", table))
            .bind(tenant_id)
            .fetch_one(pool)
            .await
            .unwrap()
    }

    fn d(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    fn item(service_id: RecordId, quantity: &str, unit_price: &str, discount_pct: &str) -> NewContractItem {
        NewContractItem {
            service_id,
            description: None,
            quantity: d(quantity),
            unit_price: d(unit_price),
            discount_pct: d(discount_pct),
            sort_order: None,
        }
    }

    fn new_contract(number: &str, customer_id: RecordId, items: Vec<NewContractItem>) -> NewContract {
        NewContract {
            contract_number: number.to_string(),
            contract_type: ContractType::Service,
            customer_id,
            title: "Support".to_string(),
            notes: None,
            start_date: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
            end_date: None,
            billing_cycle: BillingCycle::Monthly,
            currency: "eur".to_string(),
            items,
        }
    }

    async fn count(pool: &PgPool, sql: &str, tenant_id: TenantId) -> i64 {
        sqlx::query_scalar(sql).bind(tenant_id).fetch_one(pool).await.unwrap()
    }

    #[test]
    fn test_owner_check_distinguishes_missing_from_foreign() {
        let tenant = Uuid::new_v4();
        assert!(check_owner(Table::Customers, 3, tenant, Some(tenant)).is_ok());
        assert!(check_owner(Table::Customers, 3, tenant, None).unwrap_err().is_not_found());
        assert!(matches!(
            check_owner(Table::Services, 4, tenant, Some(Uuid::new_v4())),
            Err(DomainError::Unauthorized { entity: "Service", id: 4 })
        ));
    }

    #[tokio::test]
    async fn test_create_totals_items_and_rolls_back_on_foreign_service() {
        let Some(pool) = test_pool().await else {
            eprintln!("Skipping test: TEST_DATABASE_URL not set");
            return;
        };
        let tenant = Uuid::new_v4();
        let actor = Uuid::new_v4();
        let customer = owned_row(&pool, "customers", tenant).await;
        let service = owned_row(&pool, "services", tenant).await;
        let foreign = owned_row(&pool, "services", Uuid::new_v4()).await;
        let repo = repo(&pool);

        let created = repo
            .create(tenant, &new_contract("CTR-1", customer, vec![item(service, "2", "100", "10"), item(service, "1", "50", "0")]), actor)
            .await
            .unwrap();
        assert_eq!(created.contract.status, ContractStatus::Draft);
        assert_eq!(created.contract.total_value, d("230.00"));
        assert_eq!(created.contract.currency, "EUR");
        assert_eq!(created.items.len(), 2);
        assert_eq!(created.computed_total().unwrap(), created.contract.total_value);

        let err = repo
            .create(tenant, &new_contract("CTR-2", customer, vec![item(service, "1", "10", "0"), item(foreign, "1", "10", "0")]), actor)
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::Unauthorized { entity: "Service", .. }));

        assert_eq!(count(&pool, "SELECT COUNT(*) FROM contracts WHERE tenant_id = $1", tenant).await, 1);
        assert_eq!(count(&pool, "SELECT COUNT(*) FROM contract_items WHERE tenant_id = $1", tenant).await, 2);

        let duplicate = repo
            .create(tenant, &new_contract("CTR-1", customer, vec![]), actor)
            .await
            .unwrap_err();
        assert!(matches!(duplicate, DomainError::ContractNumberExists(_)));
    }

    #[tokio::test]
    async fn test_item_changes_recompute_total_down_to_zero() {
        let Some(pool) = test_pool().await else {
            eprintln!("Skipping test: TEST_DATABASE_URL not set");
            return;
        };
        let tenant = Uuid::new_v4();
        let actor = Uuid::new_v4();
        let customer = owned_row(&pool, "customers", tenant).await;
        let service = owned_row(&pool, "services", tenant).await;
        let repo = repo(&pool);

        let created = repo
            .create(tenant, &new_contract("CTR-1", customer, vec![item(service, "1", "100", "0")]), actor)
            .await
            .unwrap();
        let id = created.contract.id;

        let added = repo.add_item(tenant, id, &item(service, "2", "25", "0"), actor).await.unwrap();
        assert_eq!(added.sort_order, 1);
        assert_eq!(repo.require(tenant, id).await.unwrap().total_value, d("150.00"));

        for existing in repo.list_items(tenant, id).await.unwrap() {
            repo.delete_item(tenant, id, existing.id, actor).await.unwrap();
        }
        assert_eq!(repo.require(tenant, id).await.unwrap().total_value, Decimal::ZERO);

        let err = repo.delete_item(tenant, id, added.id, actor).await.unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn test_lost_status_race_reports_stored_status() {
        let Some(pool) = test_pool().await else {
            eprintln!("Skipping test: TEST_DATABASE_URL not set");
            return;
        };
        let tenant = Uuid::new_v4();
        let actor = Uuid::new_v4();
        let customer = owned_row(&pool, "customers", tenant).await;
        let repo = repo(&pool);
        let id = repo.create(tenant, &new_contract("CTR-1", customer, vec![]), actor).await.unwrap().contract.id;

        let err = repo.sign(tenant, id, actor).await.unwrap_err();
        assert!(matches!(err, DomainError::ContractCannotSign(ContractStatus::Draft)));

        let pending = repo
            .update_status(tenant, id, ContractStatus::Draft, ContractStatus::Pending, actor)
            .await
            .unwrap();
        assert_eq!(pending.status, ContractStatus::Pending);

        // a second writer still believes the contract is DRAFT
        let err = repo
            .update_status(tenant, id, ContractStatus::Draft, ContractStatus::Pending, actor)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            DomainError::InvalidStatusTransition { from: ContractStatus::Pending, to: ContractStatus::Pending }
        ));

        let signed = repo.sign(tenant, id, actor).await.unwrap();
        assert_eq!(signed.status, ContractStatus::Active);
        assert_eq!(signed.signed_by, Some(actor));
        assert!(signed.signed_at.is_some());

        let err = repo.sign(tenant, id, actor).await.unwrap_err();
        assert!(matches!(err, DomainError::ContractCannotSign(ContractStatus::Active)));

        // item edits are gated on the locked status
        let err = repo.delete_item(tenant, id, 1, actor).await.unwrap_err();
        assert!(matches!(err, DomainError::ContractNotDraft(ContractStatus::Active)));
    }

    #[tokio::test]
    async fn test_ensure_owned_against_stored_rows() {
        let Some(pool) = test_pool().await else {
            eprintln!("Skipping test: TEST_DATABASE_URL not set");
            return;
        };
        let tenant = Uuid::new_v4();
        let mine = owned_row(&pool, "customers", tenant).await;
        let theirs = owned_row(&pool, "customers", Uuid::new_v4()).await;
        let mut conn = pool.acquire().await.unwrap();

        assert!(ensure_owned(&mut conn, Table::Customers, mine, tenant).await.is_ok());
        assert!(matches!(
            ensure_owned(&mut conn, Table::Customers, theirs, tenant).await,
            Err(DomainError::Unauthorized { entity: "Customer", .. })
        ));
        assert!(ensure_owned(&mut conn, Table::Customers, -1, tenant).await.unwrap_err().is_not_found());
    }

    #[tokio::test]
    async fn test_update_fields_checks_under_row_lock() {
        let Some(pool) = test_pool().await else {
            eprintln!("Skipping test: TEST_DATABASE_URL not set");
            return;
        };
        let tenant = Uuid::new_v4();
        let actor = Uuid::new_v4();
        let customer = owned_row(&pool, "customers", tenant).await;
        let foreign_customer = owned_row(&pool, "customers", Uuid::new_v4()).await;
        let repo = repo(&pool);
        let id = repo.create(tenant, &new_contract("CTR-1", customer, vec![]), actor).await.unwrap().contract.id;

        let reassigned = UpdateContractRequest { customer_id: Some(foreign_customer), ..Default::default() };
        let err = repo.update_fields(tenant, id, &reassigned.into_changes(), actor).await.unwrap_err();
        assert!(matches!(err, DomainError::Unauthorized { entity: "Customer", .. }));

        // stored start is 2024-01-01
        let backwards = UpdateContractRequest {
            end_date: Some(NaiveDate::from_ymd_opt(2023, 12, 31)),
            ..Default::default()
        };
        let err = repo.update_fields(tenant, id, &backwards.into_changes(), actor).await.unwrap_err();
        assert!(matches!(err, DomainError::ValidationError(_)));

        repo.update_status(tenant, id, ContractStatus::Draft, ContractStatus::Pending, actor).await.unwrap();
        repo.sign(tenant, id, actor).await.unwrap();
        let retitle = UpdateContractRequest { title: Some("Renamed".into()), ..Default::default() };
        let err = repo.update_fields(tenant, id, &retitle.into_changes(), actor).await.unwrap_err();
        assert!(matches!(err, DomainError::ContractCannotUpdate(ContractStatus::Active)));

        let unchanged = repo.require(tenant, id).await.unwrap();
        assert_eq!(unchanged.customer_id, customer);
        assert_eq!(unchanged.end_date, None);
        assert_eq!(unchanged.title, "Support");
    }
}
