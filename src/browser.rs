use std::ffi::OsStr;
use std::sync::Arc;
use std::time::Duration;

use headless_chrome::{Browser, Element, LaunchOptions, Tab};
use tracing::{debug, info, warn};

use crate::config::ScraperConfig;
use crate::stores::RegionPicker;
use crate::utils::error::{AppError, Result};

/// Owned, scoped handle over one headless Chrome instance.
///
/// One session serves one store run; navigation is strictly serial. The
/// browser process is torn down when the session drops, however the scan
/// loop exits.
pub struct BrowserSession {
    _browser: Browser,
    tab: Arc<Tab>,
    settle: Duration,
    region_selected: bool,
}

impl BrowserSession {
    pub fn launch(config: &ScraperConfig) -> Result<Self> {
        let mut launch_options = LaunchOptions::default_builder()
            .headless(config.headless)
            .sandbox(false) // needed in containerized environments
            .args(vec![
                OsStr::new("--no-sandbox"),
                OsStr::new("--disable-dev-shm-usage"),
                OsStr::new("--disable-gpu"),
                OsStr::new("--disable-extensions"),
                OsStr::new("--window-size=1920,1080"),
                OsStr::new("--disable-blink-features=AutomationControlled"),
            ])
            .build()
            .map_err(|e| AppError::Browser(format!("failed to create launch options: {e}")))?;

        if let Some(chrome_path) = &config.chrome_path {
            launch_options.path = Some(std::path::PathBuf::from(chrome_path));
        }

        let browser = Browser::new(launch_options)
            .map_err(|e| AppError::Browser(format!("failed to launch browser: {e}")))?;
        let tab = browser
            .new_tab()
            .map_err(|e| AppError::Browser(format!("failed to create tab: {e}")))?;

        tab.set_user_agent(&config.user_agent, None, None)
            .map_err(|e| AppError::Browser(format!("failed to set user agent: {e}")))?;
        tab.set_default_timeout(Duration::from_secs(config.page_timeout_secs));

        info!("browser session started");
        Ok(Self {
            _browser: browser,
            tab,
            settle: Duration::from_secs(config.settle_secs),
            region_selected: false,
        })
    }

    /// Navigate and wait for the load to finish, then give client-side
    /// rendering a moment to settle. Timeouts surface as navigation errors.
    pub fn navigate(&self, url: &str) -> Result<()> {
        debug!("visiting {url}");
        self.tab.navigate_to(url).map_err(|e| AppError::Navigation {
            url: url.to_string(),
            message: e.to_string(),
        })?;
        self.tab
            .wait_until_navigated()
            .map_err(|e| AppError::Navigation {
                url: url.to_string(),
                message: e.to_string(),
            })?;
        std::thread::sleep(self.settle);
        Ok(())
    }

    pub fn content(&self) -> Result<String> {
        self.tab
            .get_content()
            .map_err(|e| AppError::Browser(format!("failed to read page content: {e}")))
    }

    /// Best-effort probe of the store's landing page before a scan. A
    /// failure is logged and the scan proceeds anyway.
    pub fn check_connection(&self, base_url: &str) -> bool {
        info!("testing website connection to {base_url}");
        match self.navigate(base_url) {
            Ok(()) => {
                info!("website connection test successful");
                true
            }
            Err(e) => {
                warn!("website connection test failed: {e}; continuing with product scan");
                false
            }
        }
    }

    /// One-shot interactive location selection for stores that gate prices
    /// behind an area picker. Best-effort: every failure path logs and
    /// marks the step done so it never runs twice in a session.
    pub fn ensure_region(&mut self, picker: &RegionPicker) {
        if self.region_selected {
            return;
        }
        self.region_selected = true;

        info!("handling location selection for area {:?}", picker.area_name);

        let input = picker
            .input_selectors
            .iter()
            .find_map(|sel| self.tab.find_element(sel).ok());
        let Some(input) = input else {
            warn!("could not find area dropdown; assuming location is not mandatory");
            return;
        };

        if let Some(value) = input_value(&input) {
            if !value.trim().is_empty() {
                info!("area already selected: {value}");
                return;
            }
        }

        // Open the dropdown, via the arrow button when the widget has one.
        let opened = picker
            .open_button
            .as_deref()
            .and_then(|sel| self.tab.find_element(sel).ok())
            .and_then(|btn| btn.click().map(|_| ()).ok())
            .is_some();
        if !opened {
            if let Err(e) = input.click() {
                warn!("could not open area dropdown: {e}");
            }
        }
        std::thread::sleep(Duration::from_secs(1));

        if self.click_first_xpath(&picker.option_xpaths) {
            info!("selected area {:?}", picker.area_name);
        } else {
            // The option list did not surface the area; type it and take
            // the first suggestion, or submit with Enter as a last resort.
            warn!("area option not listed, typing {:?}", picker.area_name);
            let typed = input.click().and_then(|i| i.type_into(&picker.area_name));
            if let Err(e) = typed {
                warn!("could not type area name: {e}");
                return;
            }
            std::thread::sleep(Duration::from_secs(2));
            if self.click_first_xpath(&picker.typed_option_xpaths) {
                info!("selected first suggestion after typing");
            } else if let Err(e) = self.tab.press_key("Enter") {
                warn!("could not submit typed area: {e}");
            }
        }

        std::thread::sleep(Duration::from_secs(2));
        if self.click_first_xpath(&picker.confirm_xpaths) {
            info!("clicked continue button");
        }
        std::thread::sleep(Duration::from_secs(1));
        info!("location selection completed");
    }

    fn click_first_xpath(&self, xpaths: &[String]) -> bool {
        for xpath in xpaths {
            if let Ok(element) = self.tab.find_element_by_xpath(xpath) {
                match element.click() {
                    Ok(_) => return true,
                    Err(e) => debug!("could not click {xpath:?}: {e}"),
                }
            }
        }
        false
    }
}

fn input_value(element: &Element) -> Option<String> {
    let result = element
        .call_js_fn("function() { return this.value; }", vec![], false)
        .ok()?;
    result.value.and_then(|v| v.as_str().map(|s| s.to_string()))
}
