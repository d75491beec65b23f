use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;
use tracing::{error, info};

use pricewarden::config::AppConfig;
use pricewarden::sync::{self, FirestoreClient, ServiceAccountKey};

/// Push the consolidated price changes into the remote catalog.
#[derive(Debug, Parser)]
#[command(name = "pricewarden-sync", version, about)]
struct Cli {
    /// Consolidated CSV of reviewed price changes.
    #[arg(default_value = "consolidated.csv")]
    csv_file: PathBuf,

    /// Target collection; overrides the configured default.
    #[arg(long)]
    collection: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("pricewarden=debug".parse()?),
        )
        .init();

    let cli = Cli::parse();
    if !cli.csv_file.exists() {
        error!("CSV file not found: {}", cli.csv_file.display());
        std::process::exit(1);
    }

    let config = AppConfig::load()?;
    let collection = cli
        .collection
        .unwrap_or_else(|| config.firestore.collection.clone());

    let key = ServiceAccountKey::load(
        config
            .firestore
            .credentials_file
            .as_deref()
            .map(std::path::Path::new),
    )?;
    info!("authenticated against project: {}", key.project_id);
    let client = FirestoreClient::new(key)?;
    client.check_connection(&collection).await?;

    let stats = sync::sync_consolidated(&client, &collection, &cli.csv_file).await?;
    if stats.errors > 0 {
        error!("sync finished with {} errors", stats.errors);
        std::process::exit(1);
    }
    Ok(())
}
