//! External agent launchers
//!
//! Both launchers implement [`AuthorizationAgent`] and deliver exactly one
//! outcome per launch. Which one a session uses is decided once, from the
//! browsers installed on the device.

pub mod auth_tab;
pub mod browser_tab;

use std::sync::Arc;

use idswitch_core::flow::ports::AuthorizationAgent;
use idswitch_core::{select_presentation, BrowserProbe};
use idswitch_domain::PresentationMode;

pub use auth_tab::{AuthTabHost, AuthTabLauncher, AuthTabResult};
pub use browser_tab::{BrowserTabHost, BrowserTabLauncher};

/// The launcher picked for this session.
///
/// Keep it around: the host feeds tab results or inbound links to the
/// concrete launcher, while the flow controller drives it via [`agent`].
///
/// [`agent`]: SelectedLauncher::agent
pub enum SelectedLauncher<A, B> {
    AuthTab(Arc<AuthTabLauncher<A>>),
    BrowserTab(Arc<BrowserTabLauncher<B>>),
}

impl<A, B> SelectedLauncher<A, B>
where
    A: AuthTabHost + 'static,
    B: BrowserTabHost + 'static,
{
    pub fn mode(&self) -> PresentationMode {
        match self {
            Self::AuthTab(_) => PresentationMode::EphemeralAuthTab,
            Self::BrowserTab(_) => PresentationMode::GeneralBrowserTab,
        }
    }

    pub fn agent(&self) -> Arc<dyn AuthorizationAgent> {
        match self {
            Self::AuthTab(launcher) => launcher.clone(),
            Self::BrowserTab(launcher) => launcher.clone(),
        }
    }
}

/// Probe the device and build the matching launcher. A browser tab launcher
/// is warmed up right away.
pub fn select_launcher<A, B>(
    probe: &dyn BrowserProbe,
    auth_tab_host: A,
    browser_tab_host: B,
) -> SelectedLauncher<A, B>
where
    A: AuthTabHost + 'static,
    B: BrowserTabHost + 'static,
{
    let choice = select_presentation(probe);
    match choice.mode {
        PresentationMode::EphemeralAuthTab => SelectedLauncher::AuthTab(Arc::new(
            AuthTabLauncher::new(auth_tab_host, choice.browser_package),
        )),
        PresentationMode::GeneralBrowserTab => {
            let launcher = BrowserTabLauncher::new(browser_tab_host, choice.browser_package);
            launcher.warm_up();
            SelectedLauncher::BrowserTab(Arc::new(launcher))
        }
    }
}
