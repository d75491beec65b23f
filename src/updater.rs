use std::path::{Path, PathBuf};

use chrono::Utc;
use tracing::{error, info, warn};

use crate::catalog::{backup_file, Catalog};
use crate::models::{encode_history, parse_history, push_current, read_decisions, Decision};
use crate::utils::error::{AppError, Result};

/// One successfully applied price change, kept for the update report.
#[derive(Debug, Clone, PartialEq)]
pub struct AppliedUpdate {
    pub product_id: String,
    pub name: String,
    pub old_price: f64,
    pub new_price: f64,
    pub history_entries: usize,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct UpdateOutcome {
    pub updated: usize,
    pub errors: usize,
    pub updates: Vec<AppliedUpdate>,
    /// Where the updated catalog was written, when anything changed.
    pub output_path: Option<PathBuf>,
}

/// Applies human-reviewed `YES` decisions back into the catalog.
///
/// Only decisions marked `YES` are touched; `NO` and `ERROR` rows pass
/// through untouched. With no explicit output path the original file is
/// overwritten in place after a timestamped backup copy. The backup is the
/// sole recovery artifact; there is no atomic rename.
pub struct CatalogUpdater;

impl CatalogUpdater {
    pub fn apply(
        decisions_path: &Path,
        original_path: &Path,
        output_path: Option<&Path>,
    ) -> Result<UpdateOutcome> {
        info!("reading comparison CSV: {}", decisions_path.display());
        let decisions = read_decisions(decisions_path)?;

        info!("reading original products CSV: {}", original_path.display());
        let mut catalog = Catalog::read(original_path)?;

        let yes: Vec<&Decision> = decisions
            .iter()
            .filter(|d| d.price_change_needed.is_yes())
            .collect();
        info!("found {} products that need price updates", yes.len());

        let mut outcome = UpdateOutcome::default();
        if yes.is_empty() {
            warn!("no price changes needed, leaving catalog untouched");
            return Ok(outcome);
        }

        let destination = match output_path {
            Some(path) => path.to_path_buf(),
            None => {
                backup_file(original_path)?;
                original_path.to_path_buf()
            }
        };

        let total = yes.len();
        for (i, decision) in yes.into_iter().enumerate() {
            let progress = format!("[{}/{}]", i + 1, total);
            match Self::apply_one(&mut catalog, decision) {
                Ok(applied) => {
                    info!(
                        "{progress} updated {}: {} -> {}",
                        applied.name, applied.old_price, applied.new_price
                    );
                    outcome.updated += 1;
                    outcome.updates.push(applied);
                }
                Err(e) => {
                    error!("{progress} {e}");
                    outcome.errors += 1;
                }
            }
        }

        catalog.write(&destination)?;
        info!("updated CSV saved to: {}", destination.display());
        outcome.output_path = Some(destination);
        Ok(outcome)
    }

    fn apply_one(catalog: &mut Catalog, decision: &Decision) -> Result<AppliedUpdate> {
        let new_price = decision.new_price.ok_or_else(|| {
            AppError::Validation(format!(
                "decision for {} marked YES but has no new price",
                decision.product_id
            ))
        })?;

        let matches = catalog.find_product(&decision.product_id);
        let row = match matches.len() {
            0 => {
                return Err(AppError::ProductNotFound {
                    product_id: decision.product_id.clone(),
                })
            }
            1 => matches[0],
            // Ambiguous target: refuse to touch any row rather than update
            // all of them. Which behavior the product owner actually wants
            // is still open; see DESIGN.md.
            count => {
                return Err(AppError::DuplicateProduct {
                    product_id: decision.product_id.clone(),
                    count,
                })
            }
        };

        let old_price = catalog.get_f64(row, "price").unwrap_or(0.0);
        catalog.set(row, "price", format_price(new_price))?;

        let mut history_entries = 1;
        if catalog.has_column("price_history") {
            let mut history = parse_history(catalog.get(row, "price_history").unwrap_or(""));
            push_current(&mut history, new_price);
            history_entries = history.len();
            catalog.set(row, "price_history", encode_history(&history)?)?;
        }
        if catalog.has_column("last_updated") {
            catalog.set(row, "last_updated", Utc::now().to_rfc3339())?;
        }

        let name = catalog
            .get(row, "name")
            .filter(|n| !n.is_empty())
            .map(|n| n.to_string())
            .unwrap_or_else(|| format!("Product {}", decision.product_id));

        Ok(AppliedUpdate {
            product_id: decision.product_id.clone(),
            name,
            old_price,
            new_price,
            history_entries,
        })
    }
}

/// Keep whole rupees free of a trailing ".0" so rewritten cells match what
/// the matching process exports.
fn format_price(price: f64) -> String {
    if price.fract() == 0.0 {
        format!("{}", price as i64)
    } else {
        format!("{price}")
    }
}
