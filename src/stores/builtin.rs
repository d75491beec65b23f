//! Built-in store profile table. Selector cascades are tuned to each site's
//! markup as last observed; when a site drifts, fix the list here (or ship a
//! stores.toml override) without touching the extractor.

use super::{RegionPicker, StoreProfile};

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

const RUPEE_TOKENS: [&str; 5] = ["Rs.", "Rs", "PKR", "\u{20a8}", ","];

/// Broad selectors shared by every profile's fallback scan.
const GENERIC_FALLBACKS: [&str; 7] = [
    ".price",
    ".amount",
    "[data-price]",
    ".product-price",
    ".current-price",
    ".selling-price",
    ".final-price",
];

pub fn builtin_profiles() -> Vec<StoreProfile> {
    vec![alfatah(), jalalsons(), rainbow(), metro(), imtiaz()]
}

fn alfatah() -> StoreProfile {
    StoreProfile {
        store_id: "Al-Fatah".to_string(),
        base_url: "https://alfatah.pk".to_string(),
        price_selectors: strings(&[
            ".price__current .money",
            ".price .money",
            ".product__price .money",
            "span.money",
            ".price-item--sale",
            ".price-item--regular",
            "[data-product-price]",
        ]),
        fallback_selectors: strings(&GENERIC_FALLBACKS),
        strip_tokens: strings(&RUPEE_TOKENS),
        page_timeout_secs: 30,
        request_delay_secs: 2,
        region_picker: None,
    }
}

fn jalalsons() -> StoreProfile {
    StoreProfile {
        store_id: "Jalal Sons".to_string(),
        base_url: "https://jalalsons.com.pk".to_string(),
        price_selectors: strings(&[
            ".product-detail .price",
            ".product-price-box .price",
            "span.product-price",
            ".price-box .special-price",
            ".price-box .regular-price",
            "[class*='price']",
        ]),
        fallback_selectors: strings(&GENERIC_FALLBACKS),
        strip_tokens: strings(&RUPEE_TOKENS),
        page_timeout_secs: 30,
        request_delay_secs: 3,
        region_picker: None,
    }
}

fn rainbow() -> StoreProfile {
    StoreProfile {
        store_id: "Rainbow".to_string(),
        base_url: "https://www.rainbowcc.com.pk".to_string(),
        price_selectors: strings(&[
            ".product-info-price .price",
            ".price-final_price .price",
            "span[data-price-type='finalPrice'] .price",
            "span[data-price-type='oldPrice'] .price",
            ".special-price .price",
            "[class*='price']",
        ]),
        fallback_selectors: strings(&GENERIC_FALLBACKS),
        strip_tokens: strings(&RUPEE_TOKENS),
        page_timeout_secs: 30,
        request_delay_secs: 3,
        region_picker: None,
    }
}

fn metro() -> StoreProfile {
    StoreProfile {
        store_id: "Metro".to_string(),
        base_url: "https://www.metro-online.pk".to_string(),
        price_selectors: strings(&[
            "div.CategoryGrid_product_price__Svf8T",
            "[class*='product_price']",
            "[class*='ProductPrice']",
            ".product-detail-price",
            ".price",
            "[class*='price']",
        ]),
        fallback_selectors: strings(&GENERIC_FALLBACKS),
        // Metro renders plain "Rs." prices; no ₨ glyph observed.
        strip_tokens: strings(&["Rs.", "Rs", "PKR", ","]),
        page_timeout_secs: 30,
        request_delay_secs: 3,
        region_picker: None,
    }
}

fn imtiaz() -> StoreProfile {
    StoreProfile {
        store_id: "Imtiaz".to_string(),
        base_url: "https://shop.imtiaz.com.pk".to_string(),
        price_selectors: strings(&[
            // MUI structure on the product detail page
            ".MuiBox-root.blink-style-1igmii2 .MuiBox-root span",
            ".MuiBox-root.blink-style-0 span",
            ".MuiBox-root.blink-style-1jnb8to span",
            ".MuiTypography-root[class*='price']",
            ".price",
            ".product-price",
            ".current-price",
            ".selling-price",
            "[class*='price']",
            ".price-item--sale",
            ".price-item--regular",
        ]),
        fallback_selectors: strings(&[
            ".MuiBox-root span",
            ".MuiButtonBase-root span",
            "button span",
            "div[class*='blink-style'] span",
            ".price",
            ".amount",
            "[data-price]",
            ".product-price",
            ".current-price",
            ".selling-price",
            ".final-price",
        ]),
        strip_tokens: strings(&RUPEE_TOKENS),
        page_timeout_secs: 30,
        request_delay_secs: 3,
        region_picker: Some(RegionPicker {
            area_name: "Askari 1".to_string(),
            input_selectors: strings(&[
                "input[placeholder='Select Area / Sub Region']",
                ".MuiAutocomplete-input",
                ".MuiAutocomplete-inputRoot input",
                "input[role='combobox']",
                ".MuiInputBase-input.MuiOutlinedInput-input",
            ]),
            open_button: Some(".MuiAutocomplete-popupIndicator".to_string()),
            option_xpaths: strings(&[
                "//div[text()='Askari 1']",
                "//li[text()='Askari 1']",
                "//div[contains(text(), 'Askari 1')]",
                "//li[contains(text(), 'Askari 1')]",
                "//div[contains(@class, 'MuiAutocomplete-option') and contains(text(), 'Askari 1')]",
                "//li[contains(@class, 'MuiAutocomplete-option') and contains(text(), 'Askari 1')]",
                "//*[contains(@role, 'option') and contains(text(), 'Askari 1')]",
            ]),
            typed_option_xpaths: strings(&[
                "//li[contains(@class, 'MuiAutocomplete-option')]",
                "//*[contains(@role, 'option')]",
            ]),
            confirm_xpaths: strings(&[
                "//button[contains(text(), 'Select')]",
                "//button[contains(text(), 'Continue')]",
                "//button[contains(text(), 'Confirm')]",
            ]),
        }),
    }
}
