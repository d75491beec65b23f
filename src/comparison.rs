use std::path::Path;
use std::time::Duration;

use tracing::{info, warn};

use crate::browser::BrowserSession;
use crate::catalog::Catalog;
use crate::extractor::PriceExtractor;
use crate::models::{write_decisions, ChangeStatus, Decision};
use crate::stores::StoreProfile;
use crate::utils::error::Result;

/// Prices closer than this are treated as unchanged.
pub const PRICE_EPSILON: f64 = 0.01;

/// Summary counts for one store's comparison run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunStats {
    pub total: usize,
    pub processed: usize,
    pub price_changes: usize,
    pub unchanged: usize,
    pub errors: usize,
}

/// Walks one store's catalog subset, scrapes each product page, and writes
/// the decision CSV handed off for manual review. Nothing here mutates the
/// catalog; that is the updater's job after a human has looked at the file.
pub struct ComparisonGenerator<'a> {
    profile: &'a StoreProfile,
    extractor: PriceExtractor,
}

impl<'a> ComparisonGenerator<'a> {
    pub fn new(profile: &'a StoreProfile) -> Self {
        Self {
            profile,
            extractor: PriceExtractor::new(),
        }
    }

    pub fn run(
        &self,
        session: &mut BrowserSession,
        catalog: &Catalog,
        output_path: &Path,
    ) -> Result<RunStats> {
        let mut stats = RunStats {
            total: catalog.len(),
            ..Default::default()
        };
        info!(
            "found {} {} products to check",
            stats.total, self.profile.store_id
        );

        session.check_connection(&self.profile.base_url);

        let mut decisions = Vec::with_capacity(catalog.len());
        for row in catalog.row_indices() {
            let progress = format!("[{}/{}]", row + 1, stats.total);
            let name = catalog.get(row, "name").unwrap_or("Unknown Product");
            info!("{progress} checking: {name}");

            let decision = self.check_row(session, catalog, row);
            match &decision.price_change_needed {
                ChangeStatus::Error(reason) => {
                    warn!("{progress} {reason}");
                    stats.errors += 1;
                }
                ChangeStatus::Yes => {
                    info!(
                        "{progress} price change: {:?} -> {:?}",
                        decision.old_price, decision.new_price
                    );
                    stats.price_changes += 1;
                    stats.processed += 1;
                }
                ChangeStatus::No => {
                    info!("{progress} prices match, no update needed");
                    stats.unchanged += 1;
                    stats.processed += 1;
                }
            }
            decisions.push(decision);

            // Politeness pacing, skipped after the last row. A plain sleep:
            // not adaptive, no retry on rate limiting.
            if row + 1 < stats.total && self.profile.request_delay_secs > 0 {
                info!(
                    "waiting {}s before next request",
                    self.profile.request_delay_secs
                );
                std::thread::sleep(Duration::from_secs(self.profile.request_delay_secs));
            }
        }

        write_decisions(output_path, &decisions)?;
        info!(
            "comparison CSV generated: {} ({} checked, {} need updates, {} unchanged, {} errors)",
            output_path.display(),
            stats.processed,
            stats.price_changes,
            stats.unchanged,
            stats.errors
        );

        Ok(stats)
    }

    fn check_row(&self, session: &mut BrowserSession, catalog: &Catalog, row: usize) -> Decision {
        let product_id = catalog.get(row, "product_id").unwrap_or("").to_string();
        let csv_price = catalog.get_f64(row, "price");
        let mut decision = Decision::new(product_id, csv_price);

        let url = catalog
            .get(row, "original_url")
            .map(str::trim)
            .filter(|u| !u.is_empty());
        let Some(url) = url else {
            decision.price_change_needed = ChangeStatus::Error("No URL".to_string());
            return decision;
        };

        let Some(csv_price) = csv_price.filter(|p| *p > 0.0) else {
            decision.price_change_needed = ChangeStatus::Error("Invalid Price".to_string());
            return decision;
        };

        if let Err(e) = session.navigate(url) {
            warn!("{e}");
            decision.price_change_needed =
                ChangeStatus::Error("Page timeout or failed to load".to_string());
            return decision;
        }

        if let Some(picker) = &self.profile.region_picker {
            session.ensure_region(picker);
        }

        let html = match session.content() {
            Ok(html) => html,
            Err(e) => {
                warn!("{e}");
                decision.price_change_needed =
                    ChangeStatus::Error("Page timeout or failed to load".to_string());
                return decision;
            }
        };

        match self.extractor.extract(&html, self.profile) {
            Some(extraction) => {
                decision.new_price = Some(extraction.current_price);
                decision.price_change_needed = classify(csv_price, extraction.current_price);
            }
            None => {
                decision.price_change_needed =
                    ChangeStatus::Error("Price not found on page".to_string());
            }
        }
        decision
    }
}

/// Unchanged when the difference is under a paisa; anything larger goes to
/// review as a change.
pub fn classify(csv_price: f64, website_price: f64) -> ChangeStatus {
    if (website_price - csv_price).abs() < PRICE_EPSILON {
        ChangeStatus::No
    } else {
        ChangeStatus::Yes
    }
}
