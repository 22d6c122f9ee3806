//! Service graph over a PostgreSQL pool

use std::sync::Arc;

use records_core::domain::RetentionPolicyCell;
use records_core::services::{CatalogService, ContractService, GenerationService, HistoryRecorder, PrintJobService};
use records_shared::config::AppConfig;
use sqlx::PgPool;
use tracing::info;

use crate::database::{
    CrudEngine, PgContractGenerationGateway, PgContractRepository, PgCustomerRepository, PgHistoryRepository,
    PgPrintJobRepository, PgProcedureExecutor, PgServiceRepository,
};

pub type PgHistoryRecorder = HistoryRecorder<PgHistoryRepository>;
pub type PgContractService = ContractService<PgContractRepository, PgHistoryRepository>;
pub type PgPrintJobService = PrintJobService<PgPrintJobRepository, PgContractRepository, PgHistoryRepository>;
pub type PgCatalogService = CatalogService<PgCustomerRepository, PgServiceRepository>;
pub type PgGenerationService = GenerationService<PgContractGenerationGateway>;

/// Every application service, sharing one pool, one CRUD engine and one
/// retention policy taken from the `retention` config section.
#[derive(Clone)]
pub struct AppServices {
    pub history: PgHistoryRecorder,
    pub contracts: Arc<PgContractService>,
    pub print_jobs: Arc<PgPrintJobService>,
    pub catalog: Arc<PgCatalogService>,
    pub generation: Arc<PgGenerationService>,
}

impl AppServices {
    pub fn new(pool: PgPool, config: &AppConfig) -> Self {
        let engine = CrudEngine::new(Arc::new(PgProcedureExecutor::new(pool.clone())));

        let policy = RetentionPolicyCell::from(&config.retention);
        info!(
            client_ip_days = config.retention.client_ip_days,
            user_agent_days = config.retention.user_agent_days,
            collect_client_ip = config.retention.collect_client_ip,
            collect_user_agent = config.retention.collect_user_agent,
            "History retention policy loaded"
        );
        let history = HistoryRecorder::new(Arc::new(PgHistoryRepository::new(pool.clone())), policy);

        let contract_repo = Arc::new(PgContractRepository::new(pool.clone(), engine.clone()));
        let contracts = ContractService::new(Arc::clone(&contract_repo), history.clone());
        let print_jobs = PrintJobService::new(
            Arc::new(PgPrintJobRepository::new(pool.clone())),
            contract_repo,
            history.clone(),
        );
        let catalog = CatalogService::new(
            Arc::new(PgCustomerRepository::new(pool.clone(), engine.clone())),
            Arc::new(PgServiceRepository::new(pool.clone(), engine)),
        );
        let generation = GenerationService::new(Arc::new(PgContractGenerationGateway::new(pool)));

        Self {
            history,
            contracts: Arc::new(contracts),
            print_jobs: Arc::new(print_jobs),
            catalog: Arc::new(catalog),
            generation: Arc::new(generation),
        }
    }
}
