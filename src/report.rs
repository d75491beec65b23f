use std::fmt::Write as _;
use std::fs;
use std::path::{Path, PathBuf};

use chrono::Local;
use tracing::info;

use crate::updater::UpdateOutcome;
use crate::utils::error::Result;

/// Per-store run state carried into the summary report.
#[derive(Debug, Clone, Default)]
pub struct StoreSummary {
    pub store_id: String,
    pub products: usize,
    pub comparison_generated: bool,
    pub updates_applied: bool,
}

fn flag(value: bool) -> &'static str {
    if value {
        "OK"
    } else {
        "FAILED"
    }
}

/// Human-readable report for one store's applied updates.
pub fn render_update_report(store_id: &str, outcome: &UpdateOutcome) -> String {
    let mut report = String::new();
    let _ = writeln!(report, "{} PRICE UPDATE REPORT", store_id.to_uppercase());
    let _ = writeln!(report, "=================================");
    let _ = writeln!(report, "Successfully updated: {}", outcome.updated);
    let _ = writeln!(report, "Errors/skipped: {}", outcome.errors);
    let _ = writeln!(report);
    let _ = writeln!(report, "PRICE UPDATES MADE:");
    if outcome.updates.is_empty() {
        let _ = writeln!(report, "(No updates were made)");
    } else {
        for update in &outcome.updates {
            let _ = writeln!(report, "- {}", update.name);
            let _ = writeln!(
                report,
                "  Price: Rs. {} -> Rs. {}",
                update.old_price, update.new_price
            );
            let _ = writeln!(report, "  Product ID: {}", update.product_id);
            let _ = writeln!(report, "  Price history entries: {}", update.history_entries);
        }
    }
    let _ = writeln!(
        report,
        "\nCompleted at: {}",
        Local::now().format("%Y-%m-%d %H:%M:%S")
    );
    report
}

pub fn write_update_report(
    reports_dir: &Path,
    store_id: &str,
    outcome: &UpdateOutcome,
) -> Result<PathBuf> {
    let stamp = Local::now().format("%Y%m%d_%H%M%S");
    let slug = slugify(store_id);
    let path = reports_dir.join(format!("{slug}_update_report_{stamp}.txt"));
    fs::write(&path, render_update_report(store_id, outcome))?;
    info!("report saved to: {}", path.display());
    Ok(path)
}

/// Whole-run summary across all stores.
pub fn render_summary_report(
    date: &str,
    input_csv: &Path,
    output_dir: &Path,
    stores: &[StoreSummary],
) -> String {
    let mut report = String::new();
    let _ = writeln!(report, "MULTI-STORE PRICE UPDATE REPORT");
    let _ = writeln!(report, "=========================================");
    let _ = writeln!(report, "Date: {date}");
    let _ = writeln!(report, "Input file: {}", input_csv.display());
    let _ = writeln!(report, "Output directory: {}", output_dir.display());
    let _ = writeln!(report);

    let _ = writeln!(report, "PROCESS SUMMARY:");
    let _ = writeln!(report, "------------------");
    for store in stores {
        let _ = writeln!(
            report,
            "{} products processed: {}",
            store.store_id, store.products
        );
    }
    let _ = writeln!(report);

    let _ = writeln!(report, "COMPARISON GENERATION:");
    let _ = writeln!(report, "----------------------");
    for store in stores {
        let _ = writeln!(
            report,
            "{} comparison generated: {}",
            store.store_id,
            flag(store.comparison_generated)
        );
    }
    let _ = writeln!(report);

    let _ = writeln!(report, "CSV UPDATES APPLIED:");
    let _ = writeln!(report, "---------------------");
    for store in stores {
        let _ = writeln!(
            report,
            "{} updates applied: {}",
            store.store_id,
            flag(store.updates_applied)
        );
    }
    let _ = writeln!(report);

    let _ = writeln!(report, "CONSOLIDATED FILE NOTE:");
    let _ = writeln!(report, "-------------------------");
    let _ = writeln!(
        report,
        "The consolidated file contains ONLY products where price_change_needed = 'YES'."
    );
    let _ = writeln!(
        report,
        "Products with no price changes are excluded from the consolidated file."
    );
    let _ = writeln!(
        report,
        "\nCompleted at: {}",
        Local::now().format("%Y-%m-%d %H:%M:%S")
    );
    report
}

pub fn write_summary_report(
    reports_dir: &Path,
    date: &str,
    input_csv: &Path,
    output_dir: &Path,
    stores: &[StoreSummary],
) -> Result<PathBuf> {
    let path = reports_dir.join(format!("summary_report_{date}.txt"));
    fs::write(
        &path,
        render_summary_report(date, input_csv, output_dir, stores),
    )?;
    info!("summary report saved to: {}", path.display());
    Ok(path)
}

/// Store id as a filesystem-friendly token: `Jalal Sons` -> `jalal_sons`.
pub fn slugify(store_id: &str) -> String {
    store_id
        .to_lowercase()
        .chars()
        .map(|c| if c.is_alphanumeric() { c } else { '_' })
        .collect()
}
