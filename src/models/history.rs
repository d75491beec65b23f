use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::warn;

/// One entry of a product's price history, stored JSON-encoded in the
/// `price_history` catalog column. Exactly one entry is current after every
/// update.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PricePoint {
    pub price: f64,
    pub is_current: bool,
    pub timestamp: String,
}

impl PricePoint {
    pub fn current(price: f64) -> Self {
        Self {
            price,
            is_current: true,
            timestamp: Utc::now().to_rfc3339(),
        }
    }
}

/// Parse a price-history cell leniently. Empty cells and anything that does
/// not look like JSON yield an empty history; malformed JSON is logged and
/// treated the same way.
pub fn parse_history(cell: &str) -> Vec<PricePoint> {
    let trimmed = cell.trim();
    if trimmed.is_empty() {
        return Vec::new();
    }
    if !trimmed.starts_with('[') && !trimmed.starts_with('{') {
        return Vec::new();
    }
    match serde_json::from_str(trimmed) {
        Ok(history) => history,
        Err(e) => {
            warn!("could not parse price history cell: {e}");
            Vec::new()
        }
    }
}

/// Demote every existing entry and append a new current one.
pub fn push_current(history: &mut Vec<PricePoint>, price: f64) {
    for entry in history.iter_mut() {
        entry.is_current = false;
    }
    history.push(PricePoint::current(price));
}

/// Serialize a history back into its catalog-cell form.
pub fn encode_history(history: &[PricePoint]) -> serde_json::Result<String> {
    serde_json::to_string(history)
}
