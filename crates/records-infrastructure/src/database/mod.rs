//! Database module (PostgreSQL adapters)

pub mod connection;
pub mod sql;
pub mod crud;
pub mod procedures;
pub mod postgres;

pub use connection::create_pool;
pub use crud::{CrudEngine, ProcedureExecutor, QueryOptions};
pub use procedures::PgProcedureExecutor;
pub use postgres::{
    PgContractGenerationGateway, PgContractRepository, PgCustomerRepository, PgHistoryRepository,
    PgPrintJobRepository, PgServiceRepository,
};
