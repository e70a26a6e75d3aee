//! Presentation strategy selection
//!
//! Picks the ephemeral auth tab when a browser that supports it is installed
//! at a recent enough version, and an ordinary browser tab otherwise. The
//! choice is made once per session.

pub mod ports;

use idswitch_domain::{InstalledBrowser, PresentationChoice, PresentationMode};
use tracing::info;

use self::ports::BrowserProbe;

/// Browsers with a working auth tab implementation
pub const AUTH_TAB_BROWSERS: &[&str] = &["com.android.chrome"];

/// First major version whose auth tab returns results reliably
pub const AUTH_TAB_MIN_VERSION: u32 = 137;

/// Fallback browser preference, most preferred first
pub const PREFERRED_BROWSERS: &[&str] = &[
    "com.android.chrome",
    "org.mozilla.firefox",
    "com.sec.android.app.sbrowser",
    "com.microsoft.emmx",
];

fn auth_tab_capable(browser: &InstalledBrowser) -> bool {
    browser.supports_auth_tab
        && browser.version >= AUTH_TAB_MIN_VERSION
        && AUTH_TAB_BROWSERS.contains(&browser.package.as_str())
}

/// Choose how to present authorization requests on this device.
pub fn select_presentation(probe: &dyn BrowserProbe) -> PresentationChoice {
    let browsers = probe.installed_browsers();

    let choice = if let Some(browser) = browsers.iter().find(|b| auth_tab_capable(b)) {
        PresentationChoice {
            mode: PresentationMode::EphemeralAuthTab,
            browser_package: Some(browser.package.clone()),
        }
    } else {
        let preferred = PREFERRED_BROWSERS
            .iter()
            .find_map(|package| browsers.iter().find(|b| b.package == *package))
            .or_else(|| browsers.first());
        PresentationChoice {
            mode: PresentationMode::GeneralBrowserTab,
            browser_package: preferred.map(|b| b.package.clone()),
        }
    };

    info!(
        mode = ?choice.mode,
        browser = choice.browser_package.as_deref().unwrap_or("system default"),
        installed = browsers.len(),
        "Presentation mode selected"
    );
    choice
}
