use thiserror::Error;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("HTTP client error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Browser error: {0}")]
    Browser(String),

    #[error("Navigation failed for {url}: {message}")]
    Navigation { url: String, message: String },

    #[error("Catalog error: {0}")]
    Catalog(String),

    #[error("Missing column '{column}' in {file}")]
    MissingColumn { column: String, file: String },

    #[error("Product {product_id} not found in catalog")]
    ProductNotFound { product_id: String },

    #[error("Duplicate product id {product_id}: {count} catalog rows match")]
    DuplicateProduct { product_id: String, count: usize },

    #[error("Credential error: {0}")]
    Credentials(String),

    #[error("Sync error: {0}")]
    Sync(String),

    #[error("Validation error: {0}")]
    Validation(String),
}

pub type Result<T> = std::result::Result<T, AppError>;
