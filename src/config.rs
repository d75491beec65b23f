use config::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use std::env;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub scraper: ScraperConfig,
    pub workflow: WorkflowConfig,
    pub firestore: FirestoreConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScraperConfig {
    pub headless: bool,
    pub chrome_path: Option<String>,
    pub user_agent: String,
    /// Upper bound for a single page navigation; on expiry the product is
    /// recorded as an error and the scan moves on.
    pub page_timeout_secs: u64,
    /// Settle time after navigation before the DOM is read.
    pub settle_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkflowConfig {
    pub output_dir: String,
    pub reports_dir: String,
    pub consolidated_path: String,
    /// Optional TOML file overriding the built-in store profiles.
    pub store_profiles: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FirestoreConfig {
    pub collection: String,
    /// Service-account JSON key file; falls back to FIREBASE_* environment
    /// variables when absent.
    pub credentials_file: Option<String>,
}

impl Default for ScraperConfig {
    fn default() -> Self {
        Self {
            headless: false,
            chrome_path: None,
            user_agent: "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
                         (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36"
                .to_string(),
            page_timeout_secs: 30,
            settle_secs: 3,
        }
    }
}

impl Default for WorkflowConfig {
    fn default() -> Self {
        Self {
            output_dir: "price_updates".to_string(),
            reports_dir: "reports".to_string(),
            consolidated_path: "consolidated.csv".to_string(),
            store_profiles: None,
        }
    }
}

impl Default for FirestoreConfig {
    fn default() -> Self {
        Self {
            collection: env::var("FIREBASE_COLLECTION_NAME")
                .unwrap_or_else(|_| "test_collection".to_string()),
            credentials_file: None,
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            scraper: ScraperConfig::default(),
            workflow: WorkflowConfig::default(),
            firestore: FirestoreConfig::default(),
        }
    }
}

impl AppConfig {
    /// Layered load: built-in defaults, then `config/default.toml`, then
    /// `config/local.toml`, then `PRICEWARDEN__`-prefixed environment
    /// variables. Every layer is optional.
    pub fn load() -> Result<Self, ConfigError> {
        let defaults = Config::try_from(&AppConfig::default())?;
        let s = Config::builder()
            .add_source(defaults)
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name("config/local").required(false))
            .add_source(Environment::with_prefix("PRICEWARDEN").separator("__"))
            .build()?;

        let mut config: AppConfig = s.try_deserialize()?;

        if config.scraper.chrome_path.is_none() {
            config.scraper.chrome_path = env::var("CHROME_PATH").ok();
        }

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.scraper.page_timeout_secs == 0 {
            return Err(ConfigError::Message(
                "scraper page_timeout_secs must be greater than 0".into(),
            ));
        }
        if self.workflow.output_dir.trim().is_empty() {
            return Err(ConfigError::Message("workflow output_dir must be set".into()));
        }
        if self.firestore.collection.trim().is_empty() {
            return Err(ConfigError::Message(
                "firestore collection must be set".into(),
            ));
        }
        Ok(())
    }
}
