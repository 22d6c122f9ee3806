//! # Records Infrastructure
//!
//! PostgreSQL adapters: the SQL safety layer, the dynamic statement
//! builder, the generic CRUD engine over the stored-procedure contract and
//! the entity repositories built on top of it.

pub mod database;
pub mod error;
pub mod state;

pub use database::{
    create_pool, CrudEngine, PgContractGenerationGateway, PgContractRepository,
    PgCustomerRepository, PgHistoryRepository, PgPrintJobRepository, PgProcedureExecutor,
    PgServiceRepository,
};
pub use error::CrudError;
pub use state::AppServices;
