// ============================================================================
// Records Infrastructure - PostgreSQL Service Repository
// File: crates/records-infrastructure/src/database/postgres/service_repo_impl.rs
// ============================================================================

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::{FromRow, PgPool};
use tracing::info;
use uuid::Uuid;

use records_core::domain::{NewService, Service, ServiceChanges, ServiceFilter};
use records_core::error::DomainError;
use records_core::repositories::ServiceRepository;
use records_shared::{ActorId, Page, Pagination, RecordId, TenantId};

use crate::database::crud::CrudEngine;
use crate::database::procedures::PgProcedureExecutor;
use crate::database::sql::{column_values, escape_like, Table};
use crate::error::db_error;

pub struct PgServiceRepository {
    pool: PgPool,
    engine: CrudEngine<PgProcedureExecutor>,
}

impl PgServiceRepository {
    pub fn new(pool: PgPool, engine: CrudEngine<PgProcedureExecutor>) -> Self {
        Self { pool, engine }
    }

    async fn require(&self, tenant_id: TenantId, id: RecordId) -> Result<Service, DomainError> {
        self.find_by_id(tenant_id, id)
            .await?
            .ok_or_else(|| DomainError::not_found("Service", id))
    }
}

#[derive(Debug, FromRow)]
struct ServiceRow {
    pub id: i64,
    pub tenant_id: Uuid,
    pub service_code: String,
    pub name: String,
    pub description: Option<String>,
    pub unit_price: Decimal,
    pub currency: String,
    pub price_unit: String,
    pub vat_rate: Option<Decimal>,
    pub withholding_rate: Option<Decimal>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub created_by: Option<Uuid>,
    pub modified_at: Option<DateTime<Utc>>,
    pub modified_by: Option<Uuid>,
}

impl From<ServiceRow> for Service {
    fn from(row: ServiceRow) -> Self {
        Service {
            id: row.id,
            tenant_id: row.tenant_id,
            service_code: row.service_code,
            name: row.name,
            description: row.description,
            unit_price: row.unit_price,
            currency: row.currency,
            price_unit: row.price_unit,
            vat_rate: row.vat_rate,
            withholding_rate: row.withholding_rate,
            is_active: row.is_active,
            created_at: row.created_at,
            created_by: row.created_by,
            modified_at: row.modified_at,
            modified_by: row.modified_by,
        }
    }
}

const SERVICE_COLUMNS: &str = r#"
    id, tenant_id, service_code, name, description,
    unit_price, currency, price_unit, vat_rate, withholding_rate,
    is_active, created_at, created_by, modified_at, modified_by
"#;

#[async_trait]
impl ServiceRepository for PgServiceRepository {
    async fn find_by_id(&self, tenant_id: TenantId, id: RecordId) -> Result<Option<Service>, DomainError> {
        let sql = format!("SELECT {} FROM services WHERE id = $1 AND tenant_id = $2", SERVICE_COLUMNS);
        let row: Option<ServiceRow> = sqlx::query_as(&sql)
            .bind(id)
            .bind(tenant_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(db_error("finding service by id"))?;

        Ok(row.map(|r| r.into()))
    }

    async fn find_by_code(&self, tenant_id: TenantId, code: &str) -> Result<Option<Service>, DomainError> {
        let sql = format!(
            "SELECT {} FROM services WHERE tenant_id = $1 AND LOWER(service_code) = LOWER($2)",
            SERVICE_COLUMNS
        );
        let row: Option<ServiceRow> = sqlx::query_as(&sql)
            .bind(tenant_id)
            .bind(code)
            .fetch_optional(&self.pool)
            .await
            .map_err(db_error("finding service by code"))?;

        Ok(row.map(|r| r.into()))
    }

    async fn list(
        &self,
        tenant_id: TenantId,
        filter: &ServiceFilter,
        page: Pagination,
    ) -> Result<Page<Service>, DomainError> {
        let name = filter
            .name_contains
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(escape_like);

        let total: i64 = sqlx::query_scalar(
            r#"
            SELECT COUNT(*) FROM services
            WHERE tenant_id = $1
              AND ($2 OR is_active)
              AND ($3::text IS NULL OR name ILIKE '%' || $3 || '%')
            "#,
        )
        .bind(tenant_id)
        .bind(filter.include_inactive)
        .bind(name.as_deref())
        .fetch_one(&self.pool)
        .await
        .map_err(db_error("counting services"))?;

        let sql = format!(
            r#"
            SELECT {} FROM services
            WHERE tenant_id = $1
              AND ($2 OR is_active)
              AND ($3::text IS NULL OR name ILIKE '%' || $3 || '%')
            ORDER BY service_code ASC
            OFFSET $4 LIMIT $5
            "#,
            SERVICE_COLUMNS
        );
        let rows: Vec<ServiceRow> = sqlx::query_as(&sql)
            .bind(tenant_id)
            .bind(filter.include_inactive)
            .bind(name.as_deref())
            .bind(page.offset)
            .bind(page.limit)
            .fetch_all(&self.pool)
            .await
            .map_err(db_error("listing services"))?;

        Ok(Page {
            items: rows.into_iter().map(Service::from).collect(),
            total,
            offset: page.offset,
            limit: page.limit,
        })
    }

    async fn create(&self, tenant_id: TenantId, service: &NewService, actor: ActorId) -> Result<Service, DomainError> {
        info!(tenant_id = %tenant_id, code = %service.service_code, "Creating service");
        let columns = column_values(&service.clone().into_changes())?;
        let created = self
            .engine
            .insert(Table::Services.as_str(), tenant_id, &columns, actor)
            .await?;
        self.require(tenant_id, created.generated_id).await
    }

    async fn update(
        &self,
        tenant_id: TenantId,
        id: RecordId,
        changes: &ServiceChanges,
        actor: ActorId,
    ) -> Result<Service, DomainError> {
        let columns = column_values(changes)?;
        self.engine
            .update(Table::Services.as_str(), tenant_id, id, &columns, actor)
            .await?;
        self.require(tenant_id, id).await
    }

    async fn deactivate(&self, tenant_id: TenantId, id: RecordId, actor: ActorId) -> Result<(), DomainError> {
        self.engine
            .delete(Table::Services.as_str(), tenant_id, id, true, actor)
            .await?;
        Ok(())
    }
}
