use serde::{Deserialize, Serialize};

/// Which selector produced a price, and what the element actually said.
/// Transient diagnostic data; never persisted.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Provenance {
    pub selector: String,
    pub raw_text: String,
    pub cleaned_text: String,
}

/// Result of running the selector cascade against one product page.
#[derive(Debug, Clone, PartialEq)]
pub struct PriceExtraction {
    pub current_price: f64,
    /// Highest distinct price seen when the fallback scan found more than
    /// one value. The minimum-is-current rule is a heuristic, not a contract.
    pub original_price: Option<f64>,
    pub all_prices: Vec<f64>,
    pub provenance: Provenance,
}

impl PriceExtraction {
    pub fn single(price: f64, provenance: Provenance) -> Self {
        Self {
            current_price: price,
            original_price: None,
            all_prices: vec![price],
            provenance,
        }
    }
}
