//! Authorization and end-session request construction
//!
//! Every request gets a fresh anti-forgery state. Authorization requests also
//! get a fresh PKCE pair. Parameters are percent-encoded and appended in a
//! fixed order so the launch URI is stable for a given input.

use idswitch_domain::constants::{
    APP_SWITCH_PLATFORM_HINT, APP_SWITCH_RESUME_HINT_PREFIX, CONTINUE_BUTTON_HINT, OPENID_SCOPE,
    PROMPT_LOGIN, RESPONSE_TYPE_CODE,
};
use idswitch_domain::{FlowError, IdentityScheme, RequestKind, Result};
use url::Url;

use super::pkce::{generate_state, PkceChallenge};

/// What is sent to the external agent and what the callback must match.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestDescriptor {
    pub kind: RequestKind,
    pub state: String,
    /// Where the provider sends the user back
    pub redirect_target: Url,
    /// Fully encoded URI to open in the agent
    pub launch_uri: Url,
}

/// A prepared authorization request and the verifier needed to redeem it.
#[derive(Debug, Clone)]
pub struct AuthorizationRequest {
    pub descriptor: RequestDescriptor,
    pub pkce: PkceChallenge,
    pub scheme: IdentityScheme,
}

/// A prepared end-session request.
#[derive(Debug, Clone)]
pub struct EndSessionRequest {
    pub descriptor: RequestDescriptor,
}

/// Builds requests for one client registration.
#[derive(Debug, Clone)]
pub struct RequestBuilder {
    client_id: String,
    redirect_uri: Url,
    post_logout_redirect_uri: Url,
    resume_uri: Option<Url>,
}

impl RequestBuilder {
    pub fn new(
        client_id: impl Into<String>,
        redirect_uri: Url,
        post_logout_redirect_uri: Url,
        resume_uri: Option<Url>,
    ) -> Self {
        Self { client_id: client_id.into(), redirect_uri, post_logout_redirect_uri, resume_uri }
    }

    pub fn redirect_uri(&self) -> &Url {
        &self.redirect_uri
    }

    pub fn post_logout_redirect_uri(&self) -> &Url {
        &self.post_logout_redirect_uri
    }

    /// Build an authorization code request for `scheme`.
    ///
    /// `extra_hints` are appended after any app-switch hints. `login_hint`
    /// is left out entirely when no hint applies.
    pub fn authorization(
        &self,
        authorization_endpoint: &Url,
        scheme: &IdentityScheme,
        extra_hints: &[String],
    ) -> Result<AuthorizationRequest> {
        let pkce = PkceChallenge::generate();
        let state = generate_state();
        let login_hint = self.login_hint(scheme, extra_hints);

        let mut params: Vec<(&str, &str)> = vec![
            ("response_type", RESPONSE_TYPE_CODE),
            ("client_id", self.client_id.as_str()),
            ("redirect_uri", self.redirect_uri.as_str()),
            ("scope", OPENID_SCOPE),
            ("prompt", PROMPT_LOGIN),
            ("state", state.as_str()),
            ("code_challenge", pkce.code_challenge.as_str()),
            ("code_challenge_method", pkce.challenge_method()),
            ("acr_values", scheme.acr_value()),
        ];
        if let Some(hint) = login_hint.as_deref() {
            params.push(("login_hint", hint));
        }

        let launch_uri = append_query(authorization_endpoint, &params)?;
        Ok(AuthorizationRequest {
            descriptor: RequestDescriptor {
                kind: RequestKind::Authorization,
                state,
                redirect_target: self.redirect_uri.clone(),
                launch_uri,
            },
            pkce,
            scheme: scheme.clone(),
        })
    }

    /// Build an end-session request, with the ID token as hint when known.
    pub fn end_session(
        &self,
        end_session_endpoint: &Url,
        id_token_hint: Option<&str>,
    ) -> Result<EndSessionRequest> {
        let state = generate_state();

        let mut params: Vec<(&str, &str)> =
            vec![("post_logout_redirect_uri", self.post_logout_redirect_uri.as_str())];
        if let Some(hint) = id_token_hint {
            params.push(("id_token_hint", hint));
        }
        params.push(("state", state.as_str()));

        let launch_uri = append_query(end_session_endpoint, &params)?;
        Ok(EndSessionRequest {
            descriptor: RequestDescriptor {
                kind: RequestKind::EndSession,
                state,
                redirect_target: self.post_logout_redirect_uri.clone(),
                launch_uri,
            },
        })
    }

    fn login_hint(&self, scheme: &IdentityScheme, extra_hints: &[String]) -> Option<String> {
        let mut hints: Vec<String> = Vec::with_capacity(3 + extra_hints.len());

        if scheme.supports_app_switch() {
            match &self.resume_uri {
                Some(resume) => {
                    hints.push(APP_SWITCH_PLATFORM_HINT.to_string());
                    hints.push(format!("{APP_SWITCH_RESUME_HINT_PREFIX}{resume}"));
                    hints.push(CONTINUE_BUTTON_HINT.to_string());
                }
                None => tracing::debug!(
                    scheme = %scheme,
                    "No app-switch resume link configured, omitting app-switch hints"
                ),
            }
        }
        hints.extend(extra_hints.iter().filter(|hint| !hint.is_empty()).cloned());

        if hints.is_empty() {
            None
        } else {
            Some(hints.join(" "))
        }
    }
}

fn append_query(endpoint: &Url, params: &[(&str, &str)]) -> Result<Url> {
    let query = params
        .iter()
        .map(|(k, v)| format!("{k}={}", urlencoding::encode(v)))
        .collect::<Vec<_>>()
        .join("&");

    let base = endpoint.as_str();
    let separator = if endpoint.query().is_some() { '&' } else { '?' };
    let raw = format!("{base}{separator}{query}");

    Url::parse(&raw).map_err(|e| FlowError::Config(format!("invalid request uri: {e}")))
}
