//! Ephemeral auth tab launcher
//!
//! The host opens the request in an auth tab that watches for the redirect
//! itself and reports a structured result. [`AuthTabLauncher::on_result`]
//! turns that result into the launch's single terminal outcome.

use async_trait::async_trait;
use idswitch_core::flow::ports::{AgentLaunch, AuthorizationAgent};
use idswitch_core::OutcomeSink;
use idswitch_domain::{AgentOutcome, FlowError, LaunchFailureReason, PresentationMode, Result};
use parking_lot::Mutex;
use tracing::{debug, info, warn};
use url::Url;

/// Result codes reported by an auth tab.
pub mod result_code {
    pub const OK: i32 = -1;
    pub const CANCELED: i32 = 0;
    pub const VERIFICATION_FAILED: i32 = 2;
    pub const VERIFICATION_TIMED_OUT: i32 = 3;
}

/// What the auth tab reported when it closed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthTabResult {
    pub result_code: i32,
    /// The matched redirect, present with [`result_code::OK`]
    pub result_uri: Option<Url>,
}

impl AuthTabResult {
    pub fn ok(uri: Url) -> Self {
        Self { result_code: result_code::OK, result_uri: Some(uri) }
    }

    pub fn canceled() -> Self {
        Self { result_code: result_code::CANCELED, result_uri: None }
    }

    fn into_outcome(self) -> AgentOutcome {
        match (self.result_code, self.result_uri) {
            (result_code::OK, Some(callback_uri)) => AgentOutcome::Completed { callback_uri },
            (result_code::OK, None) => AgentOutcome::Failed(LaunchFailureReason::MalformedResponse),
            (result_code::CANCELED, _) => AgentOutcome::Failed(LaunchFailureReason::UserCancelled),
            (result_code::VERIFICATION_FAILED, _) => {
                AgentOutcome::Failed(LaunchFailureReason::VerificationFailed)
            }
            (result_code::VERIFICATION_TIMED_OUT, _) => {
                AgentOutcome::Failed(LaunchFailureReason::VerificationTimedOut)
            }
            (other, _) => AgentOutcome::Failed(LaunchFailureReason::Other(format!(
                "unknown auth tab result code {other}"
            ))),
        }
    }
}

/// Platform side of the auth tab.
pub trait AuthTabHost: Send + Sync {
    /// Open `uri` in an auth tab of `browser_package` that completes on a
    /// redirect to `redirect_uri`.
    fn open_auth_tab(
        &self,
        browser_package: Option<&str>,
        uri: &Url,
        redirect_uri: &Url,
    ) -> std::result::Result<(), String>;
}

pub struct AuthTabLauncher<H> {
    host: H,
    browser_package: Option<String>,
    active: Mutex<Option<OutcomeSink>>,
}

impl<H: AuthTabHost> AuthTabLauncher<H> {
    pub fn new(host: H, browser_package: Option<String>) -> Self {
        Self { host, browser_package, active: Mutex::new(None) }
    }

    pub fn browser_package(&self) -> Option<&str> {
        self.browser_package.as_deref()
    }

    /// Whether a launch is waiting for its tab result.
    pub fn is_active(&self) -> bool {
        self.active.lock().is_some()
    }

    /// Report the tab's result. Returns `false` when no launch was waiting,
    /// e.g. for a duplicate result.
    pub async fn on_result(&self, result: AuthTabResult) -> bool {
        let Some(sink) = self.active.lock().take() else {
            warn!(result_code = result.result_code, "Auth tab result without an active launch");
            return false;
        };

        debug!(result_code = result.result_code, "Auth tab closed");
        sink.deliver(result.into_outcome()).await;
        true
    }
}

#[async_trait]
impl<H: AuthTabHost> AuthorizationAgent for AuthTabLauncher<H> {
    fn presentation_mode(&self) -> PresentationMode {
        PresentationMode::EphemeralAuthTab
    }

    async fn launch(&self, launch: AgentLaunch) -> Result<()> {
        if self.active.lock().replace(launch.outcomes).is_some() {
            debug!("Replacing a stale auth tab launch");
        }

        if let Err(reason) =
            self.host.open_auth_tab(self.browser_package(), &launch.uri, &launch.redirect_uri)
        {
            self.active.lock().take();
            return Err(FlowError::LaunchFailure(LaunchFailureReason::Unavailable(reason)));
        }

        info!(kind = %launch.kind, browser = ?self.browser_package, "Auth tab opened");
        Ok(())
    }
}
