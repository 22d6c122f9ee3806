//! # Records Core - Domain Module
//!
//! Domain entities for the business records service.

pub mod fields;
pub mod money;
pub mod customer;
pub mod service;
pub mod contract;
pub mod contract_item;
pub mod print_job;
pub mod history;
pub mod generated;

// Re-export all entities and enums
pub use fields::{ChangeSet, Column, FieldValue};
pub use customer::{Customer, CustomerChanges, CustomerColumn, CustomerFilter, CustomerType, NewCustomer};
pub use service::{NewService, Service, ServiceChanges, ServiceColumn, ServiceFilter};
pub use contract::{
    ensure_date_range, is_valid_transition, BillingCycle, Contract, ContractChanges, ContractColumn, ContractFilter,
    ContractStatus, ContractType, ContractWithItems, NewContract, UpdateContractRequest,
};
pub use contract_item::{ContractItem, ItemStatus, NewContractItem};
pub use print_job::{OutputFormat, PrintJob, PrintJobStatus, PrintOutput};
pub use history::{
    FieldRetention, HistoryAction, HistoryEntry, NewHistoryEntry, RetentionPolicy,
    RetentionPolicyCell,
};
pub use generated::{ContractTemplate, GeneratedContract, GenerationAction, GenerationStats, IntegrityStatus};
