use std::path::PathBuf;
use std::process::Command;
use std::time::Instant;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{error, info, warn};

/// Chain the price update workflow and the catalog sync as one run.
#[derive(Debug, Parser)]
#[command(name = "pricewarden-pipeline", version, about)]
struct Cli {
    /// Combined products CSV with rows for every store.
    #[arg(default_value = "products.csv")]
    input_csv: PathBuf,

    /// Stop after generating the comparison CSVs for review.
    #[arg(long, conflicts_with = "step2_only")]
    step1_only: bool,

    /// Apply previously reviewed comparison CSVs without scraping.
    #[arg(long)]
    step2_only: bool,
}

fn sibling(name: &str) -> Result<PathBuf> {
    let mut path = std::env::current_exe().context("cannot locate own executable")?;
    path.set_file_name(name);
    Ok(path)
}

fn run_step(label: &str, command: &mut Command) -> Result<bool> {
    info!("step: {label}");
    let status = command
        .status()
        .with_context(|| format!("could not launch {label}"))?;
    if status.success() {
        info!("{label} completed successfully");
    } else {
        error!("{label} failed with status {status}");
    }
    Ok(status.success())
}

fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("pricewarden=debug".parse()?),
        )
        .init();

    let cli = Cli::parse();
    let started = Instant::now();

    let mut update = Command::new(sibling("pricewarden")?);
    update.arg(&cli.input_csv).arg("--headless");
    if cli.step1_only {
        update.arg("--step1-only");
    } else if cli.step2_only {
        update.arg("--step2-only");
    }
    if !run_step("price update workflow", &mut update)? {
        std::process::exit(1);
    }

    if cli.step1_only {
        info!("comparison CSVs are ready for review; rerun with --step2-only to finish");
        return Ok(());
    }

    // The consolidated file only exists when some price actually changed.
    let consolidated = PathBuf::from("consolidated.csv");
    if consolidated.exists() {
        let mut sync = Command::new(sibling("pricewarden-sync")?);
        sync.arg(&consolidated);
        if !run_step("catalog sync", &mut sync)? {
            std::process::exit(1);
        }
    } else {
        warn!("no consolidated.csv produced, skipping catalog sync");
    }

    let elapsed = started.elapsed();
    info!(
        "pipeline finished in {}m {}s",
        elapsed.as_secs() / 60,
        elapsed.as_secs() % 60
    );
    Ok(())
}
