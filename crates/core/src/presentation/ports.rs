//! Port interface for inspecting the device's browsers

use idswitch_domain::InstalledBrowser;

/// Lists browsers able to handle the authorization URI
pub trait BrowserProbe: Send + Sync {
    fn installed_browsers(&self) -> Vec<InstalledBrowser>;
}
