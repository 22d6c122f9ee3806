//! # Records Shared
//!
//! Shared configuration, telemetry, constants and id types for the
//! business records workspace.

pub mod constants;
pub mod types;
pub mod telemetry;
pub mod config;
pub mod error;

pub use types::*;
pub use error::AppError;
