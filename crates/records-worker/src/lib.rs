//! # Records Worker
//!
//! Background print-job worker: claims queued contract print jobs, renders
//! them to HTML and records the outcome on the job row.

pub mod config;
pub mod render;
pub mod storage;
pub mod utils;
pub mod worker;

pub use config::ProcessorSettings;
pub use utils::error::WorkerError;
