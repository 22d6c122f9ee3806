// ============================================================================
// Records Infrastructure - PostgreSQL Customer Repository
// File: crates/records-infrastructure/src/database/postgres/customer_repo_impl.rs
// ============================================================================

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use sqlx::{FromRow, PgPool};
use tracing::{error, info};
use uuid::Uuid;

use records_core::domain::{Customer, CustomerChanges, CustomerFilter, CustomerType, NewCustomer};
use records_core::error::DomainError;
use records_core::repositories::CustomerRepository;
use records_shared::{ActorId, Page, Pagination, RecordId, TenantId};

use crate::database::crud::{CrudEngine, QueryOptions};
use crate::database::procedures::PgProcedureExecutor;
use crate::database::sql::{column_values, escape_like, Filter, FilterOperator, SortSpec, Table};
use crate::error::db_error;

pub struct PgCustomerRepository {
    pool: PgPool,
    engine: CrudEngine<PgProcedureExecutor>,
}

impl PgCustomerRepository {
    pub fn new(pool: PgPool, engine: CrudEngine<PgProcedureExecutor>) -> Self {
        Self { pool, engine }
    }

    async fn require(&self, tenant_id: TenantId, id: RecordId) -> Result<Customer, DomainError> {
        self.find_by_id(tenant_id, id)
            .await?
            .ok_or_else(|| DomainError::not_found("Customer", id))
    }
}

// Internal row type; also decoded from `sp_dynamic_query` JSON rows.
#[derive(Debug, FromRow, Deserialize)]
struct CustomerRow {
    pub id: i64,
    pub tenant_id: Uuid,
    pub customer_code: String,
    pub customer_type: String,
    pub name: String,
    pub tax_number: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub city: Option<String>,
    pub postal_code: Option<String>,
    pub country: Option<String>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub created_by: Option<Uuid>,
    pub modified_at: Option<DateTime<Utc>>,
    pub modified_by: Option<Uuid>,
}

impl From<CustomerRow> for Customer {
    fn from(row: CustomerRow) -> Self {
        Customer {
            id: row.id,
            tenant_id: row.tenant_id,
            customer_code: row.customer_code,
            customer_type: CustomerType::from_str(&row.customer_type).unwrap_or_default(),
            name: row.name,
            tax_number: row.tax_number,
            email: row.email,
            phone: row.phone,
            address: row.address,
            city: row.city,
            postal_code: row.postal_code,
            country: row.country,
            is_active: row.is_active,
            created_at: row.created_at,
            created_by: row.created_by,
            modified_at: row.modified_at,
            modified_by: row.modified_by,
        }
    }
}

fn list_filters(filter: &CustomerFilter) -> Result<Vec<Filter>, DomainError> {
    let mut filters = Vec::new();
    if !filter.include_inactive {
        filters.push(Filter::new("is_active", FilterOperator::Eq, true)?);
    }
    if let Some(customer_type) = filter.customer_type {
        filters.push(Filter::new("customer_type", FilterOperator::Eq, customer_type.as_str())?);
    }
    if let Some(name) = filter.name_contains.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
        filters.push(Filter::new("name", FilterOperator::Like, format!("%{}%", escape_like(name)))?);
    }
    Ok(filters)
}

#[async_trait]
impl CustomerRepository for PgCustomerRepository {
    async fn find_by_id(&self, tenant_id: TenantId, id: RecordId) -> Result<Option<Customer>, DomainError> {
        let row: Option<CustomerRow> = sqlx::query_as(
            r#"
            SELECT
                id, tenant_id, customer_code, customer_type, name,
                tax_number, email, phone, address, city, postal_code, country,
                is_active, created_at, created_by, modified_at, modified_by
            FROM customers
            WHERE id = $1 AND tenant_id = $2
            "#,
        )
        .bind(id)
        .bind(tenant_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_error("finding customer by id"))?;

        Ok(row.map(|r| r.into()))
    }

    async fn list(
        &self,
        tenant_id: TenantId,
        filter: &CustomerFilter,
        page: Pagination,
    ) -> Result<Page<Customer>, DomainError> {
        let filters = list_filters(filter)?;
        let total = self.engine.count(Table::Customers.as_str(), tenant_id, &filters).await?;

        let mut options = QueryOptions::new().sort(SortSpec::asc("name")?).window(page.offset, page.limit);
        options.filters = filters;
        let rows = self.engine.query(Table::Customers.as_str(), tenant_id, &options).await?;

        let items = rows
            .into_iter()
            .map(|value| {
                serde_json::from_value::<CustomerRow>(value).map(Customer::from).map_err(|e| {
                    error!("Failed to decode customer row: {}", e);
                    DomainError::DatabaseError(e.to_string())
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Page { items, total, offset: page.offset, limit: page.limit })
    }

    async fn create(&self, tenant_id: TenantId, customer: &NewCustomer, actor: ActorId) -> Result<Customer, DomainError> {
        info!(tenant_id = %tenant_id, code = %customer.customer_code, "Creating customer");
        let columns = column_values(&customer.clone().into_changes())?;
        let created = self
            .engine
            .insert(Table::Customers.as_str(), tenant_id, &columns, actor)
            .await?;
        self.require(tenant_id, created.generated_id).await
    }

    async fn update(
        &self,
        tenant_id: TenantId,
        id: RecordId,
        changes: &CustomerChanges,
        actor: ActorId,
    ) -> Result<Customer, DomainError> {
        let columns = column_values(changes)?;
        self.engine
            .update(Table::Customers.as_str(), tenant_id, id, &columns, actor)
            .await?;
        self.require(tenant_id, id).await
    }

    async fn deactivate(&self, tenant_id: TenantId, id: RecordId, actor: ActorId) -> Result<(), DomainError> {
        self.engine
            .delete(Table::Customers.as_str(), tenant_id, id, true, actor)
            .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_filter_hides_inactive() {
        let filters = list_filters(&CustomerFilter::default()).unwrap();
        assert_eq!(filters.len(), 1);

        let filters = list_filters(&CustomerFilter {
            customer_type: Some(CustomerType::Company),
            include_inactive: true,
            name_contains: Some("  ".into()),
        })
        .unwrap();
        assert_eq!(filters.len(), 1);
    }

    #[test]
    fn test_name_wildcards_match_literally() {
        let filters = list_filters(&CustomerFilter {
            customer_type: None,
            include_inactive: true,
            name_contains: Some(" 100%_Pure ".into()),
        })
        .unwrap();
        let expected = Filter::new("name", FilterOperator::Like, r"%100\%\_Pure%").unwrap();
        assert_eq!(filters, vec![expected]);
    }

    #[test]
    fn test_json_row_decodes() {
        let value = serde_json::json!({
            "id": 3,
            "tenant_id": "00000000-0000-0000-0000-000000000000",
            "customer_code": "C-003",
            "customer_type": "COMPANY",
            "name": "Acme GmbH",
            "tax_number": null,
            "email": "billing@acme.test",
            "phone": null,
            "address": null,
            "city": "Berlin",
            "postal_code": null,
            "country": "DE",
            "is_active": true,
            "created_at": "2024-05-01T10:00:00+00:00",
            "created_by": null,
            "modified_at": null,
            "modified_by": null
        });
        let customer: Customer = serde_json::from_value::<CustomerRow>(value).unwrap().into();
        assert_eq!(customer.customer_type, CustomerType::Company);
        assert_eq!(customer.city.as_deref(), Some("Berlin"));
    }
}
