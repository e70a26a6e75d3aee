//! Flow controller - core orchestration logic
//!
//! Owns the loaded provider metadata and keys, the correlation table, and
//! the hand-off to the external agent. Public operations resolve with the
//! outcome of the callback that matches their request.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use idswitch_common::{
    AuthorizationRequest, CallbackParams, RequestBuilder, RequestDescriptor, TokenVerifier,
};
use idswitch_domain::{
    AgentOutcome, FlowConfig, FlowError, FlowPhase, IdentityScheme, IssuerOrigin, KeySet,
    LaunchFailureReason, PresentationMode, ProviderMetadata, Result, VerifiedClaims,
};
use tokio::sync::{oneshot, Mutex};
use tracing::{debug, error, info, warn};
use url::Url;

use super::pending::{Claim, PendingRequest, PendingTable};
use super::ports::{
    AgentLaunch, AuthorizationAgent, CodeExchange, KeySetSource, MetadataSource, TokenExchanger,
};
use super::sink::OutcomeSink;
use crate::resume::AppSwitchResume;

/// Adapters the controller drives.
#[derive(Clone)]
pub struct FlowPorts {
    pub metadata: Arc<dyn MetadataSource>,
    pub keys: Arc<dyn KeySetSource>,
    pub tokens: Arc<dyn TokenExchanger>,
    pub agent: Arc<dyn AuthorizationAgent>,
}

/// What [`FlowController::initialize`] managed to load.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Readiness {
    pub metadata_loaded: bool,
    pub keys_loaded: bool,
}

impl Readiness {
    pub const fn is_ready(&self) -> bool {
        self.metadata_loaded && self.keys_loaded
    }
}

#[derive(Default)]
struct Session {
    metadata: Option<ProviderMetadata>,
    keys: Option<Arc<KeySet>>,
    pending: PendingTable,
    disposed: bool,
}

impl Session {
    const fn readiness(&self) -> Readiness {
        Readiness { metadata_loaded: self.metadata.is_some(), keys_loaded: self.keys.is_some() }
    }

    fn ensure_open(&self) -> Result<()> {
        if self.disposed {
            Err(FlowError::Disposed)
        } else {
            Ok(())
        }
    }

    fn metadata(&self) -> Result<&ProviderMetadata> {
        self.metadata
            .as_ref()
            .ok_or_else(|| FlowError::NotReady("provider metadata not loaded".to_string()))
    }

    fn keys(&self) -> Result<Arc<KeySet>> {
        self.keys
            .clone()
            .ok_or_else(|| FlowError::NotReady("signing keys not loaded".to_string()))
    }
}

pub(crate) struct FlowInner {
    issuer: IssuerOrigin,
    client_id: String,
    requests: RequestBuilder,
    verifier: TokenVerifier,
    pending_timeout: Option<Duration>,
    ports: FlowPorts,
    presentation: PresentationMode,
    resume: Option<AppSwitchResume>,
    session: Mutex<Session>,
    /// Serializes outcome handling so callbacks are processed one at a time
    dispatch: Mutex<()>,
}

/// Drives sign-in and sign-out through an external agent.
///
/// Cheap to clone; clones share the same session.
#[derive(Clone)]
pub struct FlowController {
    inner: Arc<FlowInner>,
}

impl FlowController {
    /// Create a controller for `config`. Nothing is fetched until
    /// [`initialize`](Self::initialize).
    ///
    /// # Errors
    /// `FlowError::Config` when the configuration does not validate
    pub fn new(config: &FlowConfig, ports: FlowPorts) -> Result<Self> {
        config.validate()?;

        let issuer = config.issuer_origin()?;
        let resume_url = config.resume_url()?;
        let requests = RequestBuilder::new(
            config.client_id.clone(),
            config.redirect_url()?,
            config.post_logout_redirect_url()?,
            resume_url.clone(),
        );
        let presentation = ports.agent.presentation_mode();

        info!(
            issuer = %issuer,
            presentation = ?presentation,
            app_switch = resume_url.is_some(),
            "Flow controller created"
        );

        Ok(Self {
            inner: Arc::new(FlowInner {
                verifier: TokenVerifier::new(issuer.as_str()),
                issuer,
                client_id: config.client_id.clone(),
                requests,
                pending_timeout: config.pending_timeout(),
                ports,
                presentation,
                resume: resume_url.map(AppSwitchResume::new),
                session: Mutex::new(Session::default()),
                dispatch: Mutex::new(()),
            }),
        })
    }

    pub(crate) const fn from_inner(inner: Arc<FlowInner>) -> Self {
        Self { inner }
    }

    /// Load provider metadata, then signing keys.
    ///
    /// Failures are logged and reflected in the returned [`Readiness`];
    /// whatever was loaded replaces the previous value.
    pub async fn initialize(&self) -> Readiness {
        if self.inner.session.lock().await.disposed {
            warn!("initialize called on a disposed flow controller");
            return Readiness::default();
        }

        let issuer = &self.inner.issuer;
        let metadata = match self.inner.ports.metadata.resolve(issuer).await {
            Ok(metadata) => Some(metadata),
            Err(err) => {
                error!(issuer = %issuer, error = %err, "Failed to load provider metadata");
                None
            }
        };

        let jwks_uri = metadata.as_ref().and_then(|m| m.jwks_uri.as_ref());
        let keys = match self.inner.ports.keys.fetch_all(issuer, jwks_uri).await {
            Ok(keys) => Some(Arc::new(keys)),
            Err(err) => {
                error!(issuer = %issuer, error = %err, "Failed to load signing keys");
                None
            }
        };

        let mut session = self.inner.session.lock().await;
        if session.disposed {
            return Readiness::default();
        }
        session.metadata = metadata;
        session.keys = keys;

        let readiness = session.readiness();
        info!(
            metadata_loaded = readiness.metadata_loaded,
            keys_loaded = readiness.keys_loaded,
            key_count = session.keys.as_ref().map_or(0, |keys| keys.len()),
            "Flow controller initialized"
        );
        readiness
    }

    /// True when both metadata and keys are loaded.
    pub async fn is_ready(&self) -> bool {
        self.readiness().await.is_ready()
    }

    pub async fn readiness(&self) -> Readiness {
        self.inner.session.lock().await.readiness()
    }

    /// Sign in with `scheme`.
    pub async fn login(&self, scheme: IdentityScheme) -> Result<VerifiedClaims> {
        self.login_with_hints(scheme, &[]).await
    }

    /// Sign in with `scheme`, passing extra `login_hint` values.
    ///
    /// Resolves once the agent's callback has been matched, the code
    /// redeemed and the ID token verified.
    ///
    /// # Errors
    /// - `NotReady` before metadata and keys are loaded; no agent is launched
    /// - `Busy` while another request is in flight
    /// - `LaunchFailure`, `AuthorizationDenied`, `TokenExchange`,
    ///   `UnknownKey`, `TokenVerification` from the callback's resolution
    pub async fn login_with_hints(
        &self,
        scheme: IdentityScheme,
        extra_hints: &[String],
    ) -> Result<VerifiedClaims> {
        let (descriptor, rx) = {
            let mut session = self.inner.session.lock().await;
            session.ensure_open()?;
            let authorization_endpoint = session.metadata()?.authorization_endpoint.clone();
            session.keys()?;
            session.pending.ensure_idle()?;

            let request =
                self.inner.requests.authorization(&authorization_endpoint, &scheme, extra_hints)?;
            let descriptor = request.descriptor.clone();
            let (resolver, rx) = oneshot::channel();
            session.pending.open(PendingRequest::Authorization { request, resolver })?;
            (descriptor, rx)
        };

        info!(scheme = %scheme, "Starting login");
        self.launch_and_wait(descriptor, rx).await
    }

    /// Sign out at the provider, passing the ID token as hint when known.
    ///
    /// # Errors
    /// - `NotReady` before metadata is loaded or when the provider has no
    ///   end-session endpoint
    /// - `Busy` while another request is in flight
    /// - `LaunchFailure` or `AuthorizationDenied` from the callback
    pub async fn logout(&self, id_token_hint: Option<&str>) -> Result<()> {
        let (descriptor, rx) = {
            let mut session = self.inner.session.lock().await;
            session.ensure_open()?;
            let end_session_endpoint =
                session.metadata()?.end_session_endpoint.clone().ok_or_else(|| {
                    FlowError::NotReady("provider has no end_session_endpoint".to_string())
                })?;
            session.pending.ensure_idle()?;

            let request = self.inner.requests.end_session(&end_session_endpoint, id_token_hint)?;
            let descriptor = request.descriptor.clone();
            let (resolver, rx) = oneshot::channel();
            session.pending.open(PendingRequest::EndSession { request, resolver })?;
            (descriptor, rx)
        };

        info!(with_hint = id_token_hint.is_some(), "Starting logout");
        self.launch_and_wait(descriptor, rx).await
    }

    /// Sink for agents and hosts to report outcomes through.
    pub fn outcome_sink(&self) -> OutcomeSink {
        OutcomeSink::new(Arc::downgrade(&self.inner))
    }

    /// Process one agent outcome. Equivalent to delivering through
    /// [`outcome_sink`](Self::outcome_sink).
    ///
    /// Returns `true` when the outcome resolved the in-flight request.
    pub async fn deliver(&self, outcome: AgentOutcome) -> bool {
        self.handle_outcome(outcome).await
    }

    pub async fn phase(&self) -> FlowPhase {
        self.inner.session.lock().await.pending.phase()
    }

    /// Anti-forgery state of the in-flight request, if any.
    pub async fn pending_state(&self) -> Option<String> {
        self.inner.session.lock().await.pending.current_state().map(str::to_string)
    }

    pub fn presentation_mode(&self) -> PresentationMode {
        self.inner.presentation
    }

    pub fn issuer(&self) -> &IssuerOrigin {
        &self.inner.issuer
    }

    /// Resume-link handling, when a resume link is configured.
    pub fn app_switch(&self) -> Option<&AppSwitchResume> {
        self.inner.resume.as_ref()
    }

    /// Drop loaded state and resolve any waiting caller with `Disposed`.
    ///
    /// A request already past its callback still resolves with its own
    /// outcome. Later operations fail with `Disposed`.
    pub async fn dispose(&self) {
        let drained = {
            let mut session = self.inner.session.lock().await;
            session.disposed = true;
            session.metadata = None;
            session.keys = None;
            session.pending.drain()
        };

        let abandoned = drained.len();
        for entry in drained {
            entry.fail(FlowError::Disposed);
        }
        info!(abandoned, "Flow controller disposed");
    }

    pub(crate) async fn handle_outcome(&self, outcome: AgentOutcome) -> bool {
        let _turn = self.inner.dispatch.lock().await;
        match outcome {
            AgentOutcome::Failed(reason) => self.fail_awaiting(reason).await,
            AgentOutcome::Completed { callback_uri } => self.handle_callback(&callback_uri).await,
        }
    }

    async fn launch_and_wait<T>(
        &self,
        descriptor: RequestDescriptor,
        rx: oneshot::Receiver<Result<T>>,
    ) -> Result<T> {
        let mut abandon = AbandonGuard::new(Arc::clone(&self.inner), descriptor.state.clone());
        let launch = AgentLaunch {
            kind: descriptor.kind,
            uri: descriptor.launch_uri.clone(),
            redirect_uri: descriptor.redirect_target.clone(),
            outcomes: self.outcome_sink(),
        };

        if let Err(err) = self.inner.ports.agent.launch(launch).await {
            warn!(kind = %descriptor.kind, error = %err, "Agent could not present request");
            self.inner.session.lock().await.pending.expire(&descriptor.state);
            abandon.disarm();
            return Err(err);
        }

        debug!(kind = %descriptor.kind, "Request handed to agent, awaiting callback");
        let result = self.await_resolution(&descriptor.state, rx).await;
        abandon.disarm();
        result
    }

    async fn await_resolution<T>(
        &self,
        state: &str,
        mut rx: oneshot::Receiver<Result<T>>,
    ) -> Result<T> {
        let received = match self.inner.pending_timeout {
            None => rx.await,
            Some(limit) => match tokio::time::timeout(limit, &mut rx).await {
                Ok(received) => received,
                Err(_) => {
                    let expired = self.inner.session.lock().await.pending.expire(state);
                    if let Some(entry) = expired {
                        warn!(kind = %entry.kind(), timeout = ?limit, "No callback received in time");
                        return Err(FlowError::TimedOut(limit));
                    }
                    // Already matched or failed; the resolution is on its way
                    rx.await
                }
            },
        };
        received.unwrap_or(Err(FlowError::Disposed))
    }

    async fn fail_awaiting(&self, reason: LaunchFailureReason) -> bool {
        let entry = self.inner.session.lock().await.pending.take_awaiting();
        match entry {
            Some(entry) => {
                warn!(kind = %entry.kind(), reason = %reason, "Agent reported failure");
                entry.fail(FlowError::LaunchFailure(reason));
                true
            }
            None => {
                debug!(reason = %reason, "Agent failure with no pending request, ignoring");
                false
            }
        }
    }

    async fn handle_callback(&self, callback_uri: &Url) -> bool {
        let params = CallbackParams::parse(callback_uri);
        let Some(state) = params.state.clone() else {
            warn!("Callback without state, discarding");
            return false;
        };

        let claim = self.inner.session.lock().await.pending.claim(&state, callback_uri);
        let entry = match claim {
            Claim::Matched(entry) => entry,
            Claim::UnknownState => {
                warn!("Callback state matches no pending request, discarding");
                return false;
            }
            Claim::WrongTarget => {
                warn!(
                    callback = %redact_query(callback_uri),
                    "Callback does not target the registered redirect, discarding"
                );
                return false;
            }
        };

        match entry {
            PendingRequest::Authorization { request, resolver } => {
                let result = self.redeem(&params, &request).await;
                self.settle(&state).await;
                match &result {
                    Ok(claims) => info!(
                        identity_scheme = claims.identity_scheme.as_deref().unwrap_or("unknown"),
                        "Login completed"
                    ),
                    Err(err) => warn!(error = %err, kind = err.label(), "Login failed"),
                }
                let _ = resolver.send(result);
            }
            PendingRequest::EndSession { resolver, .. } => {
                let result = params
                    .oauth_error()
                    .map_or(Ok(()), |error| Err(FlowError::AuthorizationDenied(error)));
                self.settle(&state).await;
                match &result {
                    Ok(()) => info!("Logout completed"),
                    Err(err) => warn!(error = %err, "Logout failed"),
                }
                let _ = resolver.send(result);
            }
        }
        true
    }

    async fn settle(&self, state: &str) {
        self.inner.session.lock().await.pending.settle(state);
    }

    async fn redeem(
        &self,
        params: &CallbackParams,
        request: &AuthorizationRequest,
    ) -> Result<VerifiedClaims> {
        if let Some(error) = params.oauth_error() {
            return Err(FlowError::AuthorizationDenied(error));
        }
        let code = params
            .code
            .as_deref()
            .ok_or(FlowError::LaunchFailure(LaunchFailureReason::MalformedResponse))?;

        let (token_endpoint, keys) = {
            let session = self.inner.session.lock().await;
            session.ensure_open()?;
            (session.metadata()?.token_endpoint.clone(), session.keys()?)
        };

        let response = self
            .inner
            .ports
            .tokens
            .exchange_code(CodeExchange {
                token_endpoint: &token_endpoint,
                client_id: &self.inner.client_id,
                code,
                redirect_uri: &request.descriptor.redirect_target,
                code_verifier: &request.pkce.code_verifier,
            })
            .await?;

        let id_token = response
            .id_token
            .ok_or_else(|| FlowError::TokenExchange("token response has no id_token".to_string()))?;
        self.inner.verifier.verify(&id_token, &keys)
    }
}

/// Clears a request's awaiting entry when its caller stops waiting.
///
/// Dropping a `login`/`logout` future before it resolves would otherwise
/// leave the entry in the table with nobody to resolve, keeping the
/// controller busy. A request already past its callback is left alone.
struct AbandonGuard {
    inner: Arc<FlowInner>,
    state: Option<String>,
}

impl AbandonGuard {
    const fn new(inner: Arc<FlowInner>, state: String) -> Self {
        Self { inner, state: Some(state) }
    }

    fn disarm(&mut self) {
        self.state = None;
    }
}

impl Drop for AbandonGuard {
    fn drop(&mut self) {
        let Some(state) = self.state.take() else {
            return;
        };

        if let Ok(mut session) = self.inner.session.try_lock() {
            if let Some(entry) = session.pending.expire(&state) {
                info!(kind = %entry.kind(), "Caller stopped waiting, request abandoned");
            }
            return;
        }

        // Session is held elsewhere; finish the cleanup on the runtime
        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                let inner = Arc::clone(&self.inner);
                handle.spawn(async move {
                    if let Some(entry) = inner.session.lock().await.pending.expire(&state) {
                        info!(kind = %entry.kind(), "Caller stopped waiting, request abandoned");
                    }
                });
            }
            Err(_) => warn!("Request abandoned outside a runtime, entry left in place"),
        }
    }
}

/// Callback URI without its query, for logs.
fn redact_query(uri: &Url) -> String {
    let mut redacted = uri.clone();
    redacted.set_query(None);
    redacted.set_fragment(None);
    redacted.to_string()
}

impl fmt::Debug for FlowController {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FlowController")
            .field("issuer", &self.inner.issuer.as_str())
            .field("client_id", &self.inner.client_id)
            .field("presentation", &self.inner.presentation)
            .field("pending_timeout", &self.inner.pending_timeout)
            .finish_non_exhaustive()
    }
}
