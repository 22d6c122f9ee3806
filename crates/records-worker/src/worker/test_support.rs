//! Repository mocks and fixtures shared by the worker tests.

use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use mockall::mock;
use records_core::repositories::{ContractRepository, PrintJobRepository};
use records_core::{
    BillingCycle, Contract, ContractChanges, ContractFilter, ContractItem, ContractStatus,
    ContractType, ContractWithItems, DomainError, ItemStatus, NewContract, NewContractItem,
    OutputFormat, PrintJob, PrintJobStatus, PrintOutput,
};
use records_shared::{ActorId, Page, Pagination, RecordId, TenantId};
use rust_decimal::Decimal;

use crate::config::ProcessorSettings;

mock! {
    pub Jobs {}

    #[async_trait]
    impl PrintJobRepository for Jobs {
        async fn create(
            &self,
            tenant_id: TenantId,
            contract_id: RecordId,
            format: OutputFormat,
            requested_by: ActorId,
        ) -> Result<PrintJob, DomainError>;
        async fn find_by_id(&self, tenant_id: TenantId, id: RecordId) -> Result<Option<PrintJob>, DomainError>;
        async fn list_for_contract(&self, tenant_id: TenantId, contract_id: RecordId) -> Result<Vec<PrintJob>, DomainError>;
        async fn fetch_queued(&self, limit: i64) -> Result<Vec<PrintJob>, DomainError>;
        async fn claim(&self, tenant_id: TenantId, id: RecordId) -> Result<bool, DomainError>;
        async fn complete(&self, tenant_id: TenantId, id: RecordId, output: &PrintOutput) -> Result<(), DomainError>;
        async fn fail(&self, tenant_id: TenantId, id: RecordId, error: &str) -> Result<(), DomainError>;
        async fn requeue(&self, tenant_id: TenantId, id: RecordId, error: &str) -> Result<(), DomainError>;
        async fn reap_stale(&self, claimed_before: DateTime<Utc>, max_retries: i32) -> Result<u64, DomainError>;
    }
}

mock! {
    pub Contracts {}

    #[async_trait]
    impl ContractRepository for Contracts {
        async fn find_by_id(&self, tenant_id: TenantId, id: RecordId) -> Result<Option<Contract>, DomainError>;
        async fn find_with_items(&self, tenant_id: TenantId, id: RecordId) -> Result<Option<ContractWithItems>, DomainError>;
        async fn list(&self, tenant_id: TenantId, filter: &ContractFilter, page: Pagination) -> Result<Page<Contract>, DomainError>;
        async fn list_items(&self, tenant_id: TenantId, contract_id: RecordId) -> Result<Vec<ContractItem>, DomainError>;
        async fn create(&self, tenant_id: TenantId, request: &NewContract, actor: ActorId) -> Result<ContractWithItems, DomainError>;
        async fn update_fields(&self, tenant_id: TenantId, id: RecordId, changes: &ContractChanges, actor: ActorId) -> Result<Contract, DomainError>;
        async fn update_status(&self, tenant_id: TenantId, id: RecordId, from: ContractStatus, to: ContractStatus, actor: ActorId) -> Result<Contract, DomainError>;
        async fn sign(&self, tenant_id: TenantId, id: RecordId, actor: ActorId) -> Result<Contract, DomainError>;
        async fn add_item(&self, tenant_id: TenantId, contract_id: RecordId, item: &NewContractItem, actor: ActorId) -> Result<ContractItem, DomainError>;
        async fn delete_item(&self, tenant_id: TenantId, contract_id: RecordId, item_id: RecordId, actor: ActorId) -> Result<(), DomainError>;
        async fn delete(&self, tenant_id: TenantId, id: RecordId, actor: ActorId) -> Result<(), DomainError>;
        async fn recompute_total(&self, tenant_id: TenantId, id: RecordId) -> Result<Decimal, DomainError>;
    }
}

pub fn settings(root: &Path) -> ProcessorSettings {
    ProcessorSettings {
        batch_size: 10,
        max_retries: 3,
        poll_interval: Duration::from_secs(3600),
        stale_after: Duration::from_secs(900),
        output_root: root.to_path_buf(),
    }
}

pub fn queued_job(id: RecordId, tenant_id: TenantId, contract_id: RecordId, format: OutputFormat) -> PrintJob {
    PrintJob {
        id,
        tenant_id,
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

pub fn contract_with_items(tenant_id: TenantId, id: RecordId, number: &str) -> ContractWithItems {
    let contract = Contract {
        id,
        tenant_id,
        contract_number: number.to_string(),
        contract_type: ContractType::Service,
        customer_id: 1,
        title: "Managed hosting".into(),
        notes: Some("Renews yearly".into()),
        start_date: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
        end_date: None,
        billing_cycle: BillingCycle::Monthly,
        status: ContractStatus::Active,
        signed_at: Some(Utc::now()),
        signed_by: None,
        total_value: Decimal::new(23000, 2),
        currency: "EUR".into(),
        created_at: Utc::now(),
        created_by: None,
        modified_at: None,
        modified_by: None,
    };
    let item = |item_id: RecordId, qty: i64, price: i64, total: i64| ContractItem {
        id: item_id,
        tenant_id,
        contract_id: id,
        service_id: 3,
        description: Some(format!("Item {}", item_id)),
        quantity: Decimal::from(qty),
        unit_price: Decimal::new(price, 2),
        discount_pct: Decimal::ZERO,
        line_total: Decimal::new(total, 2),
        status: ItemStatus::Pending,
        sort_order: item_id as i32,
        created_at: Utc::now(),
    };
    ContractWithItems { contract, items: vec![item(1, 2, 10000, 20000), item(2, 1, 3000, 3000)] }
}
