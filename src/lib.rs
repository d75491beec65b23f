pub mod browser;
pub mod catalog;
pub mod comparison;
pub mod config;
pub mod extractor;
pub mod models;
pub mod report;
pub mod stores;
pub mod sync;
pub mod updater;
pub mod utils;
pub mod workflow;

// Re-export commonly used types
pub use config::AppConfig;
pub use utils::error::{AppError, Result};
