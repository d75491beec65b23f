use regex::Regex;
use scraper::{Html, Selector};
use tracing::{debug, info};

use crate::models::{PriceExtraction, Provenance};
use crate::stores::StoreProfile;

/// Walks a store profile's selector cascade over fetched page HTML.
///
/// Pure with respect to the page: navigation, timeouts and the region picker
/// live in [`crate::browser::BrowserSession`]; this type only ever sees the
/// HTML string, which keeps the cascade testable against fixtures.
pub struct PriceExtractor {
    number: Regex,
}

impl PriceExtractor {
    pub fn new() -> Self {
        Self {
            // What must remain of a price once currency tokens are stripped.
            number: Regex::new(r"^\d+(?:\.\d+)?$").expect("static regex"),
        }
    }

    /// First positive parse from the primary cascade wins. If the whole
    /// primary list comes up empty, scan the fallback selectors, collect
    /// every positive parse, and take the minimum as the current price
    /// (the sale price is usually the smaller of two displayed prices).
    pub fn extract(&self, html: &str, profile: &StoreProfile) -> Option<PriceExtraction> {
        let document = Html::parse_document(html);

        for selector_str in &profile.price_selectors {
            let Ok(selector) = Selector::parse(selector_str) else {
                debug!("skipping invalid selector {selector_str:?}");
                continue;
            };
            for element in document.select(&selector) {
                let raw = element.text().collect::<Vec<_>>().join(" ");
                let raw = raw.trim();
                if raw.is_empty() {
                    continue;
                }
                let cleaned = self.clean(raw, profile);
                if let Some(price) = self.parse_price(&cleaned) {
                    info!("found price {price} with selector {selector_str:?}");
                    return Some(PriceExtraction::single(
                        price,
                        Provenance {
                            selector: selector_str.clone(),
                            raw_text: raw.to_string(),
                            cleaned_text: cleaned,
                        },
                    ));
                }
            }
        }

        self.extract_fallback(&document, profile)
    }

    fn extract_fallback(
        &self,
        document: &Html,
        profile: &StoreProfile,
    ) -> Option<PriceExtraction> {
        let mut candidates: Vec<(f64, Provenance)> = Vec::new();

        for selector_str in &profile.fallback_selectors {
            let Ok(selector) = Selector::parse(selector_str) else {
                debug!("skipping invalid fallback selector {selector_str:?}");
                continue;
            };
            for element in document.select(&selector) {
                let raw = element.text().collect::<Vec<_>>().join(" ");
                let raw = raw.trim();
                if raw.is_empty() {
                    continue;
                }
                let cleaned = self.clean(raw, profile);
                if let Some(price) = self.parse_price(&cleaned) {
                    candidates.push((
                        price,
                        Provenance {
                            selector: selector_str.clone(),
                            raw_text: raw.to_string(),
                            cleaned_text: cleaned,
                        },
                    ));
                }
            }
        }

        if candidates.is_empty() {
            return None;
        }

        let all_prices: Vec<f64> = candidates.iter().map(|(p, _)| *p).collect();
        let (current, provenance) = candidates
            .iter()
            .min_by(|(a, _), (b, _)| a.total_cmp(b))
            .map(|(p, prov)| (*p, prov.clone()))?;
        let max = all_prices.iter().copied().fold(f64::MIN, f64::max);
        let original = if all_prices.iter().any(|p| *p != current) {
            Some(max)
        } else {
            None
        };

        info!(
            "found price {current} via fallback selector {:?} ({} candidates)",
            provenance.selector,
            all_prices.len()
        );

        Some(PriceExtraction {
            current_price: current,
            original_price: original,
            all_prices,
            provenance,
        })
    }

    fn clean(&self, text: &str, profile: &StoreProfile) -> String {
        let mut cleaned = text.to_string();
        for token in &profile.strip_tokens {
            cleaned = cleaned.replace(token.as_str(), "");
        }
        cleaned.trim().to_string()
    }

    /// Positive numbers only; anything else is silently discarded and the
    /// cascade moves on.
    fn parse_price(&self, cleaned: &str) -> Option<f64> {
        if !self.number.is_match(cleaned) {
            return None;
        }
        cleaned.parse::<f64>().ok().filter(|p| *p > 0.0)
    }
}

impl Default for PriceExtractor {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stores::StoreProfile;

    fn test_profile() -> StoreProfile {
        StoreProfile {
            store_id: "Test".to_string(),
            base_url: "https://example.com".to_string(),
            price_selectors: vec![".price".to_string(), ".product-price".to_string()],
            fallback_selectors: vec!["span".to_string()],
            strip_tokens: ["Rs.", "Rs", "PKR", "\u{20a8}", ","]
                .iter()
                .map(|s| s.to_string())
                .collect(),
            page_timeout_secs: 30,
            request_delay_secs: 0,
            region_picker: None,
        }
    }

    #[test]
    fn test_primary_selector_wins() {
        let extractor = PriceExtractor::new();
        let html = r#"
            <html><body>
                <div class="price">Rs. 1,250</div>
                <span>Rs. 999</span>
            </body></html>
        "#;
        let result = extractor.extract(html, &test_profile()).unwrap();
        assert_eq!(result.current_price, 1250.0);
        assert_eq!(result.original_price, None);
        assert_eq!(result.provenance.selector, ".price");
        assert_eq!(result.provenance.cleaned_text, "1250");
    }

    #[test]
    fn test_non_numeric_text_moves_to_next_candidate() {
        let extractor = PriceExtractor::new();
        let html = r#"
            <html><body>
                <div class="price">Free</div>
                <div class="price"></div>
                <div class="product-price">Rs. 450</div>
            </body></html>
        "#;
        let result = extractor.extract(html, &test_profile()).unwrap();
        assert_eq!(result.current_price, 450.0);
        assert_eq!(result.provenance.selector, ".product-price");
    }

    #[test]
    fn test_non_positive_values_are_discarded() {
        let extractor = PriceExtractor::new();
        let html = r#"
            <html><body>
                <div class="price">0</div>
                <div class="product-price">Rs. 15.50</div>
            </body></html>
        "#;
        let result = extractor.extract(html, &test_profile()).unwrap();
        assert_eq!(result.current_price, 15.5);
    }

    #[test]
    fn test_fallback_takes_minimum_as_current() {
        let extractor = PriceExtractor::new();
        let html = r#"
            <html><body>
                <span>Rs. 1,500</span>
                <span>Rs. 1,200</span>
                <span>Sold by weight</span>
            </body></html>
        "#;
        let result = extractor.extract(html, &test_profile()).unwrap();
        assert_eq!(result.current_price, 1200.0);
        assert_eq!(result.original_price, Some(1500.0));
        assert_eq!(result.all_prices.len(), 2);
    }

    #[test]
    fn test_fallback_single_value_has_no_original_price() {
        let extractor = PriceExtractor::new();
        let html = "<html><body><span>Rs. 640</span></body></html>";
        let result = extractor.extract(html, &test_profile()).unwrap();
        assert_eq!(result.current_price, 640.0);
        assert_eq!(result.original_price, None);
    }

    #[test]
    fn test_no_price_anywhere_returns_none() {
        let extractor = PriceExtractor::new();
        let html = "<html><body><p>Out of stock</p></body></html>";
        assert!(extractor.extract(html, &test_profile()).is_none());
    }

    #[test]
    fn test_trailing_text_defeats_parse() {
        // "Rs. 1,250 / kg" cleans to "1250 / kg", which is not a number.
        let extractor = PriceExtractor::new();
        let html = r#"<html><body><div class="price">Rs. 1,250 / kg</div></body></html>"#;
        assert!(extractor.extract(html, &test_profile()).is_none());
    }

    #[test]
    fn test_invalid_selector_is_skipped() {
        let extractor = PriceExtractor::new();
        let mut profile = test_profile();
        profile.price_selectors.insert(0, "span:contains('Rs.')".to_string());
        let html = r#"<html><body><div class="price">Rs. 99</div></body></html>"#;
        let result = extractor.extract(html, &profile).unwrap();
        assert_eq!(result.current_price, 99.0);
    }
}
