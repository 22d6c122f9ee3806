pub mod settings;

pub use settings::ProcessorSettings;
