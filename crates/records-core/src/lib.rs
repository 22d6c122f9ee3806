//! # Records Core
//!
//! Domain entities, services, and repository traits for the business
//! records service: contracts and their line items, customers, catalog
//! services, print jobs and the contract audit trail.

pub mod domain;
pub mod services;
pub mod repositories;
pub mod error;

// Re-export domain entities
pub use domain::*;
pub use error::DomainError;
