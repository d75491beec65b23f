use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;
use tracing::info;

use pricewarden::config::AppConfig;
use pricewarden::workflow::{MultiStoreWorkflow, Phase};

/// Multi-store price comparison and catalog update workflow.
#[derive(Debug, Parser)]
#[command(name = "pricewarden", version, about)]
struct Cli {
    /// Combined products CSV with rows for every store.
    input_csv: PathBuf,

    /// Run the browser without a visible window.
    #[arg(long)]
    headless: bool,

    /// Stop after generating the comparison CSVs for review.
    #[arg(long, conflicts_with = "step2_only")]
    step1_only: bool,

    /// Apply previously reviewed comparison CSVs without scraping.
    #[arg(long)]
    step2_only: bool,
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
    let mut config = AppConfig::load()?;
    if cli.headless {
        config.scraper.headless = true;
    }

    let phase = if cli.step1_only {
        Phase::CompareOnly
    } else if cli.step2_only {
        Phase::ApplyOnly
    } else {
        Phase::Full
    };

    let mut workflow = MultiStoreWorkflow::new(config, cli.input_csv)?;
    let consolidated = workflow.run(phase)?;

    match consolidated {
        Some(path) => info!("done, consolidated file: {}", path.display()),
        None => info!("done, no consolidated file produced"),
    }
    Ok(())
}
