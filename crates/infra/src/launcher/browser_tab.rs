//! General browser tab launcher
//!
//! The request opens in an ordinary browser tab. The redirect comes back as
//! an inbound link the app has claimed, which the host forwards to
//! [`BrowserTabLauncher::on_redirect_intent`]. The browser is warmed up once
//! so the hand-off back to the app needs no extra user interaction.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use async_trait::async_trait;
use idswitch_common::auth::callback::targets_redirect;
use idswitch_core::flow::ports::{AgentLaunch, AuthorizationAgent};
use idswitch_core::OutcomeSink;
use idswitch_domain::{AgentOutcome, FlowError, LaunchFailureReason, PresentationMode, Result};
use parking_lot::Mutex;
use tracing::{debug, info};
use url::Url;

/// Platform side of the browser tab.
pub trait BrowserTabHost: Send + Sync {
    /// Start the browser process ahead of the first tab.
    fn warm_up(&self, browser_package: Option<&str>);

    fn open_tab(&self, browser_package: Option<&str>, uri: &Url) -> std::result::Result<(), String>;
}

struct ActiveLaunch {
    id: u64,
    redirect_uri: Url,
    sink: OutcomeSink,
}

pub struct BrowserTabLauncher<H> {
    host: H,
    browser_package: Option<String>,
    warmed: AtomicBool,
    launches: AtomicU64,
    active: Mutex<Option<ActiveLaunch>>,
}

impl<H: BrowserTabHost> BrowserTabLauncher<H> {
    pub fn new(host: H, browser_package: Option<String>) -> Self {
        Self {
            host,
            browser_package,
            warmed: AtomicBool::new(false),
            launches: AtomicU64::new(0),
            active: Mutex::new(None),
        }
    }

    pub fn browser_package(&self) -> Option<&str> {
        self.browser_package.as_deref()
    }

    /// Warm the browser up. Only the first call reaches the host.
    pub fn warm_up(&self) {
        if !self.warmed.swap(true, Ordering::AcqRel) {
            debug!(browser = ?self.browser_package, "Warming up browser");
            self.host.warm_up(self.browser_package());
        }
    }

    pub fn is_active(&self) -> bool {
        self.active.lock().is_some()
    }

    /// Route an inbound link. Returns `true` when it targets the active
    /// launch's redirect and was handed to the flow; other links are left
    /// to the caller.
    ///
    /// The launch stays active until a redirect actually resolves it, so a
    /// stale or forged redirect does not shut out the real one.
    pub async fn on_redirect_intent(&self, uri: &Url) -> bool {
        let routed = {
            let active = self.active.lock();
            match active.as_ref() {
                Some(launch) if targets_redirect(uri, &launch.redirect_uri) => {
                    Some((launch.id, launch.sink.clone()))
                }
                _ => None,
            }
        };

        let Some((id, sink)) = routed else {
            debug!("Inbound link is not a pending redirect");
            return false;
        };

        if sink.deliver(AgentOutcome::Completed { callback_uri: uri.clone() }).await {
            self.finish(id);
        } else {
            debug!("Redirect did not resolve the request, launch stays active");
        }
        true
    }

    fn finish(&self, id: u64) {
        let mut active = self.active.lock();
        if active.as_ref().is_some_and(|launch| launch.id == id) {
            active.take();
        }
    }

    /// Report that the user left the tab without completing it.
    pub async fn on_cancelled(&self) -> bool {
        let Some(launch) = self.active.lock().take() else {
            return false;
        };
        launch.sink.deliver(AgentOutcome::Failed(LaunchFailureReason::UserCancelled)).await;
        true
    }
}

#[async_trait]
impl<H: BrowserTabHost> AuthorizationAgent for BrowserTabLauncher<H> {
    fn presentation_mode(&self) -> PresentationMode {
        PresentationMode::GeneralBrowserTab
    }

    async fn launch(&self, launch: AgentLaunch) -> Result<()> {
        self.warm_up();

        let id = self.launches.fetch_add(1, Ordering::Relaxed);
        let previous = self.active.lock().replace(ActiveLaunch {
            id,
            redirect_uri: launch.redirect_uri,
            sink: launch.outcomes,
        });
        if previous.is_some() {
            debug!("Replacing a stale browser tab launch");
        }

        if let Err(reason) = self.host.open_tab(self.browser_package(), &launch.uri) {
            self.finish(id);
            return Err(FlowError::LaunchFailure(LaunchFailureReason::Unavailable(reason)));
        }

        info!(kind = %launch.kind, browser = ?self.browser_package, "Browser tab opened");
        Ok(())
    }
}
