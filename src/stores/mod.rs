use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::utils::error::{AppError, Result};

mod builtin;

pub use builtin::builtin_profiles;

fn default_page_timeout() -> u64 {
    30
}

fn default_request_delay() -> u64 {
    3
}

/// Everything that differs between the five store sites, kept as data so a
/// markup-drift fix is a selector edit, not a code change.
///
/// Selector lists are ordered cascades: the extractor walks them top to
/// bottom and the first match wins.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StoreProfile {
    pub store_id: String,
    pub base_url: String,
    /// Site-specific selectors tried first, in order.
    pub price_selectors: Vec<String>,
    /// Broad selectors scanned when the primary cascade finds nothing; all
    /// matches are collected and the minimum is taken as the current price.
    pub fallback_selectors: Vec<String>,
    /// Currency markers and separators stripped before the numeric parse.
    pub strip_tokens: Vec<String>,
    #[serde(default = "default_page_timeout")]
    pub page_timeout_secs: u64,
    #[serde(default = "default_request_delay")]
    pub request_delay_secs: u64,
    /// One-shot interactive location-selection step, for the store that
    /// gates prices behind an area picker.
    #[serde(default)]
    pub region_picker: Option<RegionPicker>,
}

/// Cascading description of an autocomplete area-selection widget.
/// Every list is best-effort: failures are logged and scraping continues.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RegionPicker {
    /// Area to select, e.g. a branch-defining suburb.
    pub area_name: String,
    /// CSS cascade for the autocomplete input field.
    pub input_selectors: Vec<String>,
    /// Optional dropdown-arrow button that opens the option list.
    #[serde(default)]
    pub open_button: Option<String>,
    /// XPath cascade for the area option itself.
    pub option_xpaths: Vec<String>,
    /// Selectors for the first suggestion after typing the area name.
    pub typed_option_xpaths: Vec<String>,
    /// Confirm/continue buttons clicked after selection, if present.
    pub confirm_xpaths: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct ProfileFile {
    #[serde(rename = "store")]
    stores: Vec<StoreProfile>,
}

/// Load store profiles from a TOML file with `[[store]]` tables, falling
/// back to the built-in table when no path is given.
pub fn load_profiles(path: Option<&Path>) -> Result<Vec<StoreProfile>> {
    match path {
        Some(path) => {
            let text = std::fs::read_to_string(path)?;
            let file: ProfileFile = toml::from_str(&text)
                .map_err(|e| AppError::Validation(format!("invalid store profile file: {e}")))?;
            if file.stores.is_empty() {
                return Err(AppError::Validation(
                    "store profile file defines no stores".to_string(),
                ));
            }
            Ok(file.stores)
        }
        None => Ok(builtin_profiles()),
    }
}

pub fn profile_for<'a>(profiles: &'a [StoreProfile], store_id: &str) -> Option<&'a StoreProfile> {
    profiles.iter().find(|p| p.store_id == store_id)
}
