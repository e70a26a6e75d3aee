//! Issuer origin and discovered provider metadata

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use url::Url;

use crate::constants::{WELL_KNOWN_JWKS_PATH, WELL_KNOWN_METADATA_PATH};
use crate::errors::{FlowError, Result};

/// Identity of the provider: an https origin, optionally with a path prefix.
///
/// The string form has no trailing slash and is what the `iss` claim must
/// equal. Bare host names are accepted and promoted to https. Plain http is
/// only accepted for loopback hosts.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct IssuerOrigin {
    url: Url,
    issuer: String,
}

impl IssuerOrigin {
    pub fn parse(raw: &str) -> Result<Self> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(FlowError::Config("issuer must not be empty".to_string()));
        }

        let candidate =
            if trimmed.contains("://") { trimmed.to_string() } else { format!("https://{trimmed}") };
        let url = Url::parse(&candidate)
            .map_err(|e| FlowError::Config(format!("invalid issuer '{trimmed}': {e}")))?;

        match url.scheme() {
            "https" => {}
            "http" if is_loopback(&url) => {}
            other => {
                return Err(FlowError::Config(format!(
                    "issuer must use https (got '{other}' for '{trimmed}')"
                )))
            }
        }
        if url.host_str().is_none() {
            return Err(FlowError::Config(format!("issuer '{trimmed}' has no host")));
        }
        if url.query().is_some() || url.fragment().is_some() {
            return Err(FlowError::Config(format!(
                "issuer '{trimmed}' must not carry a query or fragment"
            )));
        }

        let issuer = url.as_str().trim_end_matches('/').to_string();
        Ok(Self { url, issuer })
    }

    /// Exact value expected in the `iss` claim.
    pub fn as_str(&self) -> &str {
        &self.issuer
    }

    pub fn url(&self) -> &Url {
        &self.url
    }

    /// Appends an absolute path below the issuer.
    pub fn join(&self, path: &str) -> Result<Url> {
        let joined = format!("{}{}", self.issuer, path);
        Url::parse(&joined).map_err(|e| FlowError::Config(format!("invalid url '{joined}': {e}")))
    }

    pub fn metadata_url(&self) -> Result<Url> {
        self.join(WELL_KNOWN_METADATA_PATH)
    }

    pub fn default_jwks_url(&self) -> Result<Url> {
        self.join(WELL_KNOWN_JWKS_PATH)
    }
}

impl FromStr for IssuerOrigin {
    type Err = FlowError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl fmt::Display for IssuerOrigin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.issuer)
    }
}

fn is_loopback(url: &Url) -> bool {
    match url.host() {
        Some(url::Host::Domain(domain)) => domain.eq_ignore_ascii_case("localhost"),
        Some(url::Host::Ipv4(ip)) => ip.is_loopback(),
        Some(url::Host::Ipv6(ip)) => ip.is_loopback(),
        None => false,
    }
}

/// The subset of the OpenID discovery document the flow relies on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderMetadata {
    #[serde(default)]
    pub issuer: Option<String>,
    pub authorization_endpoint: Url,
    pub token_endpoint: Url,
    #[serde(default)]
    pub end_session_endpoint: Option<Url>,
    #[serde(default)]
    pub jwks_uri: Option<Url>,
}
