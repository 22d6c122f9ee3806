//! Repository traits (ports)

pub mod contract_repository;
pub mod customer_repository;
pub mod service_repository;
pub mod print_job_repository;
pub mod history_repository;
pub mod generation_gateway;

pub use contract_repository::ContractRepository;
pub use customer_repository::CustomerRepository;
pub use service_repository::ServiceRepository;
pub use print_job_repository::PrintJobRepository;
pub use history_repository::HistoryRepository;
pub use generation_gateway::ContractGenerationGateway;

#[cfg(test)]
pub use contract_repository::MockContractRepository;
#[cfg(test)]
pub use print_job_repository::MockPrintJobRepository;
#[cfg(test)]
pub use history_repository::MockHistoryRepository;
