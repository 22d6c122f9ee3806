//! PostgreSQL repository implementations

pub mod contract_repo_impl;
pub mod customer_repo_impl;
pub mod service_repo_impl;
pub mod print_job_repo_impl;
pub mod history_repo_impl;
pub mod generation_gateway_impl;

pub use contract_repo_impl::PgContractRepository;
pub use customer_repo_impl::PgCustomerRepository;
pub use service_repo_impl::PgServiceRepository;
pub use print_job_repo_impl::PgPrintJobRepository;
pub use history_repo_impl::PgHistoryRepository;
pub use generation_gateway_impl::PgContractGenerationGateway;
