use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

use chrono::Local;
use tracing::{error, info, warn};

use crate::browser::BrowserSession;
use crate::catalog::{Catalog, REQUIRED_COLUMNS};
use crate::comparison::ComparisonGenerator;
use crate::config::AppConfig;
use crate::report::{self, slugify, StoreSummary};
use crate::stores::{load_profiles, StoreProfile};
use crate::updater::{CatalogUpdater, UpdateOutcome};
use crate::utils::error::Result;

/// Which part of the two-phase workflow to run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// Split, compare, apply, merge.
    Full,
    /// Comparison CSVs only; review happens out-of-band.
    CompareOnly,
    /// Apply previously reviewed comparison CSVs, then merge.
    ApplyOnly,
}

#[derive(Debug, Clone)]
struct StorePaths {
    products_csv: PathBuf,
    comparison_csv: PathBuf,
    output_csv: PathBuf,
}

struct StoreState {
    profile: StoreProfile,
    paths: StorePaths,
    products: usize,
    comparison_generated: bool,
    outcome: Option<UpdateOutcome>,
}

/// Fans the combined catalog out to per-store comparison and update runs,
/// then merges only the changed rows back into one consolidated file.
/// A failure in one store's pipeline never blocks the others.
pub struct MultiStoreWorkflow {
    config: AppConfig,
    input_csv: PathBuf,
    output_dir: PathBuf,
    reports_dir: PathBuf,
    date_stamp: String,
    stores: Vec<StoreState>,
}

impl MultiStoreWorkflow {
    pub fn new(config: AppConfig, input_csv: impl Into<PathBuf>) -> Result<Self> {
        let profiles = load_profiles(
            config
                .workflow
                .store_profiles
                .as_deref()
                .map(Path::new),
        )?;

        let output_dir = PathBuf::from(&config.workflow.output_dir);
        let reports_dir = PathBuf::from(&config.workflow.reports_dir);
        fs::create_dir_all(&output_dir)?;
        fs::create_dir_all(&reports_dir)?;

        let date_stamp = Local::now().format("%Y-%m-%d").to_string();
        let stores = profiles
            .into_iter()
            .map(|profile| {
                let slug = slugify(&profile.store_id);
                let paths = StorePaths {
                    products_csv: output_dir.join(format!("{slug}_products.csv")),
                    comparison_csv: output_dir
                        .join(format!("{slug}_price_comparison_{date_stamp}.csv")),
                    output_csv: output_dir.join(format!("{slug}_updated_{date_stamp}.csv")),
                };
                StoreState {
                    profile,
                    paths,
                    products: 0,
                    comparison_generated: false,
                    outcome: None,
                }
            })
            .collect();

        Ok(Self {
            config,
            input_csv: input_csv.into(),
            output_dir,
            reports_dir,
            date_stamp,
            stores,
        })
    }

    pub fn run(&mut self, phase: Phase) -> Result<Option<PathBuf>> {
        info!("starting multi-store price update workflow");

        if phase != Phase::ApplyOnly {
            self.split_input()?;
            self.generate_comparisons();

            if phase == Phase::CompareOnly {
                info!("step 1 completed, comparison CSVs generated");
                for store in self.stores.iter().filter(|s| s.comparison_generated) {
                    info!(
                        "{} comparison CSV: {}",
                        store.profile.store_id,
                        store.paths.comparison_csv.display()
                    );
                }
                info!("review the comparison CSVs, then run again with --step2-only to apply");
                self.organize_reports();
                self.write_summary()?;
                return Ok(None);
            }
        }

        if phase == Phase::ApplyOnly {
            self.detect_existing_comparisons();
        }

        self.apply_updates();
        let consolidated = self.merge_outputs()?;
        if let Some(path) = &consolidated {
            info!("consolidated output saved to: {}", path.display());
        }

        self.organize_reports();
        self.write_summary()?;
        info!("multi-store price update workflow completed");
        Ok(consolidated)
    }

    /// Split the combined input catalog into one CSV per store.
    fn split_input(&mut self) -> Result<()> {
        info!("reading input CSV: {}", self.input_csv.display());
        let catalog = Catalog::read(&self.input_csv)?;
        catalog.require_columns(&REQUIRED_COLUMNS, &self.input_csv.display().to_string())?;

        for store in &mut self.stores {
            let subset = catalog.filter_by("store_id", |s| s == store.profile.store_id);
            store.products = subset.len();
            if subset.is_empty() {
                warn!("no {} products found in the input CSV", store.profile.store_id);
                continue;
            }
            subset.write(&store.paths.products_csv)?;
            info!("found {} {} products", subset.len(), store.profile.store_id);
        }
        Ok(())
    }

    /// Run each store's comparison with its own browser session; the session
    /// is dropped (and the browser torn down) when the store finishes,
    /// successfully or not.
    fn generate_comparisons(&mut self) {
        for store in &mut self.stores {
            if store.products == 0 {
                continue;
            }
            info!("generating {} price comparison...", store.profile.store_id);
            match run_store_comparison(&self.config, store) {
                Ok(()) => {
                    store.comparison_generated = true;
                    info!(
                        "{} comparison CSV generated successfully",
                        store.profile.store_id
                    );
                }
                Err(e) => {
                    error!(
                        "error generating {} comparison: {e}",
                        store.profile.store_id
                    );
                }
            }
        }
    }

    /// Resuming in apply-only mode: a store participates if its decision
    /// file from a previous comparison run is still on disk.
    fn detect_existing_comparisons(&mut self) {
        info!("checking for existing comparison files...");
        for store in &mut self.stores {
            if store.paths.comparison_csv.exists() {
                store.comparison_generated = true;
                info!(
                    "found {} comparison file: {}",
                    store.profile.store_id,
                    store.paths.comparison_csv.display()
                );
            }
        }
    }

    fn apply_updates(&mut self) {
        for store in &mut self.stores {
            if !store.comparison_generated {
                continue;
            }
            info!("applying {} price updates...", store.profile.store_id);
            let result = CatalogUpdater::apply(
                &store.paths.comparison_csv,
                &store.paths.products_csv,
                Some(&store.paths.output_csv),
            );
            match result {
                Ok(outcome) => {
                    if let Err(e) =
                        report::write_update_report(&self.reports_dir, &store.profile.store_id, &outcome)
                    {
                        warn!("could not write update report: {e}");
                    }
                    info!(
                        "{} price updates applied: {} updated, {} errors",
                        store.profile.store_id, outcome.updated, outcome.errors
                    );
                    store.outcome = Some(outcome);
                }
                Err(e) => {
                    error!("error applying {} updates: {e}", store.profile.store_id);
                }
            }
        }
    }

    /// Concatenate the rows that were actually updated across stores. A
    /// `YES` decision the updater refused (duplicate or unknown id) is not
    /// enough; only applied updates reach the consolidated file.
    fn merge_outputs(&self) -> Result<Option<PathBuf>> {
        let mut consolidated: Option<Catalog> = None;
        let mut total = 0;

        for store in &self.stores {
            let Some(outcome) = &store.outcome else {
                continue;
            };
            if !store.paths.output_csv.exists() {
                continue;
            }

            let applied_ids: HashSet<String> = outcome
                .updates
                .iter()
                .map(|u| u.product_id.clone())
                .collect();
            if applied_ids.is_empty() {
                continue;
            }

            let updated = Catalog::read(&store.paths.output_csv)?;
            let filtered = updated.retain_products(&applied_ids);
            if filtered.is_empty() {
                continue;
            }
            total += filtered.len();
            info!(
                "{}: added {} products with price changes to consolidated",
                store.profile.store_id,
                filtered.len()
            );

            match consolidated.as_mut() {
                Some(base) => base.append(&filtered),
                None => consolidated = Some(filtered),
            }
        }

        match consolidated {
            Some(catalog) => {
                let path = PathBuf::from(&self.config.workflow.consolidated_path);
                catalog.write(&path)?;
                info!("total products with price changes: {total}");
                Ok(Some(path))
            }
            None => {
                warn!("no products with price changes found to consolidate");
                Ok(None)
            }
        }
    }

    /// Copy the review and output artifacts into the reports directory.
    fn organize_reports(&self) {
        for store in &self.stores {
            for file in [&store.paths.comparison_csv, &store.paths.output_csv] {
                if !file.exists() {
                    continue;
                }
                let Some(name) = file.file_name() else { continue };
                let dest = self.reports_dir.join(name);
                match fs::copy(file, &dest) {
                    Ok(_) => info!(
                        "copied {} artifact to reports: {}",
                        store.profile.store_id,
                        dest.display()
                    ),
                    Err(e) => warn!("could not copy {} to reports: {e}", file.display()),
                }
            }
        }
    }

    fn write_summary(&self) -> Result<()> {
        let summaries: Vec<StoreSummary> = self
            .stores
            .iter()
            .map(|store| StoreSummary {
                store_id: store.profile.store_id.clone(),
                products: store.products,
                comparison_generated: store.comparison_generated,
                updates_applied: store.outcome.is_some(),
            })
            .collect();
        report::write_summary_report(
            &self.reports_dir,
            &self.date_stamp,
            &self.input_csv,
            &self.output_dir,
            &summaries,
        )?;
        Ok(())
    }
}

fn run_store_comparison(config: &AppConfig, store: &StoreState) -> Result<()> {
    let catalog = Catalog::read(&store.paths.products_csv)?;
    let mut scraper_config = config.scraper.clone();
    scraper_config.page_timeout_secs = store.profile.page_timeout_secs;
    let mut session = BrowserSession::launch(&scraper_config)?;

    let generator = ComparisonGenerator::new(&store.profile);
    generator.run(&mut session, &catalog, &store.paths.comparison_csv)?;
    Ok(())
}
