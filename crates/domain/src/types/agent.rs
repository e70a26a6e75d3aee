//! External agent presentation and outcomes

use serde::{Deserialize, Serialize};
use thiserror::Error;
use url::Url;

/// How the authorization page is presented to the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PresentationMode {
    /// Isolated auth tab that returns its result directly to the caller
    EphemeralAuthTab,
    /// Ordinary browser tab whose result arrives as an inbound redirect
    GeneralBrowserTab,
}

/// Terminal outcome reported by an external agent for one launch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AgentOutcome {
    /// The agent observed a redirect to the registered redirect target
    Completed { callback_uri: Url },
    Failed(LaunchFailureReason),
}

#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "reason", content = "message", rename_all = "snake_case")]
pub enum LaunchFailureReason {
    #[error("user cancelled")]
    UserCancelled,
    #[error("malformed response from agent")]
    MalformedResponse,
    #[error("redirect verification failed")]
    VerificationFailed,
    #[error("redirect verification timed out")]
    VerificationTimedOut,
    #[error("agent unavailable: {0}")]
    Unavailable(String),
    #[error("{0}")]
    Other(String),
}

/// A browser installed on the device, as reported by the host.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstalledBrowser {
    pub package: String,
    /// Major version
    pub version: u32,
    pub supports_auth_tab: bool,
}

/// Presentation strategy chosen once per session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PresentationChoice {
    pub mode: PresentationMode,
    /// Browser to target; `None` lets the host pick its default handler
    pub browser_package: Option<String>,
}
