pub mod output_store;

pub use output_store::{OutputStore, StoredFile};
