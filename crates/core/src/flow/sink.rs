//! Outcome delivery from agents back to the controller

use std::fmt;
use std::sync::Weak;

use idswitch_domain::AgentOutcome;

use super::controller::{FlowController, FlowInner};

/// Handle an agent uses to report the terminal outcome of a launch.
///
/// Holds a weak reference: outcomes that arrive after the controller is gone
/// are dropped.
#[derive(Clone)]
pub struct OutcomeSink {
    inner: Weak<FlowInner>,
}

impl OutcomeSink {
    pub(crate) const fn new(inner: Weak<FlowInner>) -> Self {
        Self { inner }
    }

    /// Hand `outcome` to the controller and wait until it has been processed.
    ///
    /// Returns `true` when the outcome resolved the in-flight request.
    /// A discarded callback (unknown state, wrong target) returns `false`
    /// and leaves the request waiting, so the agent should keep the sink.
    pub async fn deliver(&self, outcome: AgentOutcome) -> bool {
        match self.inner.upgrade() {
            Some(inner) => FlowController::from_inner(inner).handle_outcome(outcome).await,
            None => {
                tracing::debug!("Flow controller dropped, discarding agent outcome");
                false
            }
        }
    }

    pub fn is_connected(&self) -> bool {
        self.inner.strong_count() > 0
    }
}

impl fmt::Debug for OutcomeSink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OutcomeSink").field("connected", &self.is_connected()).finish()
    }
}
