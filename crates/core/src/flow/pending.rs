//! Correlation table for in-flight requests
//!
//! Entries are keyed by anti-forgery state. At most one request is in flight:
//! either awaiting its callback or being resolved after a matched callback.

use std::collections::HashMap;

use idswitch_common::auth::callback::targets_redirect;
use idswitch_common::{AuthorizationRequest, EndSessionRequest, RequestDescriptor};
use idswitch_domain::{FlowError, FlowPhase, RequestKind, Result, VerifiedClaims};
use tokio::sync::oneshot;
use url::Url;

pub(crate) type SignInResolver = oneshot::Sender<Result<VerifiedClaims>>;
pub(crate) type SignOutResolver = oneshot::Sender<Result<()>>;

/// A request waiting for its callback, paired with its caller's resolver.
#[derive(Debug)]
pub(crate) enum PendingRequest {
    Authorization { request: AuthorizationRequest, resolver: SignInResolver },
    EndSession { request: EndSessionRequest, resolver: SignOutResolver },
}

impl PendingRequest {
    pub(crate) fn descriptor(&self) -> &RequestDescriptor {
        match self {
            Self::Authorization { request, .. } => &request.descriptor,
            Self::EndSession { request, .. } => &request.descriptor,
        }
    }

    pub(crate) fn kind(&self) -> RequestKind {
        self.descriptor().kind
    }

    /// Resolve the caller with `err`. A caller that stopped waiting is ignored.
    pub(crate) fn fail(self, err: FlowError) {
        match self {
            Self::Authorization { resolver, .. } => {
                let _ = resolver.send(Err(err));
            }
            Self::EndSession { resolver, .. } => {
                let _ = resolver.send(Err(err));
            }
        }
    }
}

/// Result of presenting a callback to the table.
#[derive(Debug)]
pub(crate) enum Claim {
    /// State and target matched; the entry moved to resolving
    Matched(PendingRequest),
    UnknownState,
    WrongTarget,
}

#[derive(Debug, Default)]
pub(crate) struct PendingTable {
    awaiting: HashMap<String, PendingRequest>,
    resolving: Option<(String, RequestKind)>,
}

impl PendingTable {
    pub(crate) fn phase(&self) -> FlowPhase {
        if self.resolving.is_some() {
            FlowPhase::Resolving
        } else if self.awaiting.is_empty() {
            FlowPhase::Idle
        } else {
            FlowPhase::AwaitingCallback
        }
    }

    /// State of the in-flight request, awaiting or resolving.
    pub(crate) fn current_state(&self) -> Option<&str> {
        self.resolving
            .as_ref()
            .map(|(state, _)| state.as_str())
            .or_else(|| self.awaiting.keys().next().map(String::as_str))
    }

    /// Fail with `Busy` unless nothing is in flight.
    pub(crate) fn ensure_idle(&self) -> Result<()> {
        if let Some((_, kind)) = &self.resolving {
            return Err(FlowError::Busy { kind: *kind });
        }
        match self.awaiting.values().next() {
            Some(entry) => Err(FlowError::Busy { kind: entry.kind() }),
            None => Ok(()),
        }
    }

    pub(crate) fn open(&mut self, entry: PendingRequest) -> Result<()> {
        self.ensure_idle()?;
        let state = entry.descriptor().state.clone();
        self.awaiting.insert(state, entry);
        Ok(())
    }

    /// Match a callback by state and redirect target.
    ///
    /// On a match the entry leaves the table and the table stays busy until
    /// [`settle`](Self::settle) is called for the same state. Mismatches leave
    /// the table untouched.
    pub(crate) fn claim(&mut self, state: &str, callback_uri: &Url) -> Claim {
        let Some(entry) = self.awaiting.get(state) else {
            return Claim::UnknownState;
        };
        if !targets_redirect(callback_uri, &entry.descriptor().redirect_target) {
            return Claim::WrongTarget;
        }
        match self.awaiting.remove(state) {
            Some(entry) => {
                self.resolving = Some((state.to_string(), entry.kind()));
                Claim::Matched(entry)
            }
            None => Claim::UnknownState,
        }
    }

    /// Leave the resolving phase for `state`.
    pub(crate) fn settle(&mut self, state: &str) {
        if self.resolving.as_ref().is_some_and(|(current, _)| current == state) {
            self.resolving = None;
        }
    }

    /// Remove the awaiting entry, whatever its state. Used for agent
    /// failures, which carry no state of their own.
    pub(crate) fn take_awaiting(&mut self) -> Option<PendingRequest> {
        let state = self.awaiting.keys().next()?.clone();
        self.awaiting.remove(&state)
    }

    /// Remove the entry for `state` if it is still awaiting its callback.
    pub(crate) fn expire(&mut self, state: &str) -> Option<PendingRequest> {
        self.awaiting.remove(state)
    }

    pub(crate) fn drain(&mut self) -> Vec<PendingRequest> {
        self.awaiting.drain().map(|(_, entry)| entry).collect()
    }
}
