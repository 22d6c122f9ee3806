pub mod error;
pub mod filename;

pub use filename::sanitize_filename_component;
