pub mod poller;
pub mod processor;

#[cfg(test)]
pub(crate) mod test_support;

pub use poller::run_poller;
pub use processor::{BatchReport, JobOutcome, PrintJobProcessor};

use std::sync::Arc;

use records_infrastructure::{CrudEngine, PgContractRepository, PgPrintJobRepository, PgProcedureExecutor};
use sqlx::PgPool;
use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::config::ProcessorSettings;

pub type PgPrintJobProcessor = PrintJobProcessor<PgPrintJobRepository, PgContractRepository>;

/// Print worker wired to PostgreSQL. Shares the pool with any other user
/// of the database in the same process.
pub struct Worker {
    processor: PgPrintJobProcessor,
}

impl Worker {
    pub fn new(settings: ProcessorSettings, pool: PgPool) -> Self {
        let engine = CrudEngine::new(Arc::new(PgProcedureExecutor::new(pool.clone())));
        let contracts = Arc::new(PgContractRepository::new(pool.clone(), engine));
        let jobs = Arc::new(PgPrintJobRepository::new(pool));

        Self { processor: PrintJobProcessor::new(jobs, contracts, settings) }
    }

    /// Poll until `cancel` fires.
    pub async fn run(self, cancel: CancellationToken) {
        info!(output_root = %self.processor.settings().output_root.display(), "Worker started");
        let passes = run_poller(&self.processor, cancel).await;
        info!(passes, "Worker stopped");
    }
}
