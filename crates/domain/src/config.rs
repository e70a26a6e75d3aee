//! Flow configuration

use std::time::Duration;

use serde::{Deserialize, Serialize};
use url::Url;

use crate::constants::{DEFAULT_HTTP_TIMEOUT_SECS, DEFAULT_LOG_FILTER};
use crate::errors::{FlowError, Result};
use crate::types::IssuerOrigin;

/// Settings for one flow controller.
///
/// Values are kept as strings so the struct deserializes from env vars and
/// config files as-is; the typed accessors validate on read.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlowConfig {
    /// Provider issuer, e.g. `https://example.idp.test` or a bare domain
    pub issuer: String,
    pub client_id: String,
    /// Registered callback target for authorization responses
    pub redirect_uri: String,
    /// Target after end-session; defaults to `redirect_uri`
    #[serde(default)]
    pub post_logout_redirect_uri: Option<String>,
    /// Parameter-free link the identity app opens to hand control back
    #[serde(default)]
    pub app_switch_resume_uri: Option<String>,
    /// Give up on a pending request after this many seconds. Off when unset.
    #[serde(default)]
    pub pending_timeout_seconds: Option<u64>,
    #[serde(default = "default_http_timeout")]
    pub http_timeout_seconds: u64,
    #[serde(default = "default_log_filter")]
    pub log_filter: String,
}

const fn default_http_timeout() -> u64 {
    DEFAULT_HTTP_TIMEOUT_SECS
}

fn default_log_filter() -> String {
    DEFAULT_LOG_FILTER.to_string()
}

impl FlowConfig {
    /// Minimal config with defaults for every optional field.
    pub fn new(
        issuer: impl Into<String>,
        client_id: impl Into<String>,
        redirect_uri: impl Into<String>,
    ) -> Self {
        Self {
            issuer: issuer.into(),
            client_id: client_id.into(),
            redirect_uri: redirect_uri.into(),
            post_logout_redirect_uri: None,
            app_switch_resume_uri: None,
            pending_timeout_seconds: None,
            http_timeout_seconds: DEFAULT_HTTP_TIMEOUT_SECS,
            log_filter: default_log_filter(),
        }
    }

    /// Checks every field, reporting the first invalid one.
    pub fn validate(&self) -> Result<()> {
        if self.client_id.trim().is_empty() {
            return Err(FlowError::Config("client_id must not be empty".to_string()));
        }
        self.issuer_origin()?;
        self.redirect_url()?;
        self.post_logout_redirect_url()?;
        self.resume_url()?;
        if self.pending_timeout_seconds == Some(0) {
            return Err(FlowError::Config(
                "pending_timeout_seconds must be positive when set".to_string(),
            ));
        }
        if self.http_timeout_seconds == 0 {
            return Err(FlowError::Config("http_timeout_seconds must be positive".to_string()));
        }
        Ok(())
    }

    pub fn issuer_origin(&self) -> Result<IssuerOrigin> {
        IssuerOrigin::parse(&self.issuer)
    }

    pub fn redirect_url(&self) -> Result<Url> {
        parse_absolute("redirect_uri", &self.redirect_uri)
    }

    pub fn post_logout_redirect_url(&self) -> Result<Url> {
        match &self.post_logout_redirect_uri {
            Some(raw) => parse_absolute("post_logout_redirect_uri", raw),
            None => self.redirect_url(),
        }
    }

    pub fn resume_url(&self) -> Result<Option<Url>> {
        let Some(raw) = &self.app_switch_resume_uri else {
            return Ok(None);
        };
        let url = parse_absolute("app_switch_resume_uri", raw)?;
        if url.query().is_some() || url.fragment().is_some() {
            return Err(FlowError::Config(format!(
                "app_switch_resume_uri must be parameter-free: {raw}"
            )));
        }
        Ok(Some(url))
    }

    pub fn pending_timeout(&self) -> Option<Duration> {
        self.pending_timeout_seconds.filter(|secs| *secs > 0).map(Duration::from_secs)
    }

    pub const fn http_timeout(&self) -> Duration {
        Duration::from_secs(self.http_timeout_seconds)
    }
}

fn parse_absolute(field: &str, raw: &str) -> Result<Url> {
    Url::parse(raw.trim()).map_err(|e| FlowError::Config(format!("invalid {field} '{raw}': {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> FlowConfig {
        FlowConfig::new("https://idp.test", "urn:my:client", "com.example.app://callback")
    }

    #[test]
    fn minimal_config_is_valid() {
        let config = config();
        config.validate().unwrap();
        assert_eq!(config.post_logout_redirect_url().unwrap(), config.redirect_url().unwrap());
        assert!(config.resume_url().unwrap().is_none());
        assert!(config.pending_timeout().is_none());
        assert_eq!(config.http_timeout(), Duration::from_secs(30));
    }

    #[test]
    fn empty_client_id_is_rejected() {
        let mut config = config();
        config.client_id = "  ".into();
        assert!(matches!(config.validate(), Err(FlowError::Config(_))));
    }

    #[test]
    fn resume_link_with_query_is_rejected() {
        let mut config = config();
        config.app_switch_resume_uri = Some("https://app.example/resume?x=1".into());
        assert!(config.validate().is_err());

        config.app_switch_resume_uri = Some("https://app.example/resume".into());
        assert_eq!(config.resume_url().unwrap().unwrap().path(), "/resume");
    }

    #[test]
    fn zero_timeouts_are_rejected() {
        let mut config = config();
        config.pending_timeout_seconds = Some(0);
        assert!(config.validate().is_err());

        config.pending_timeout_seconds = Some(120);
        config.validate().unwrap();
        assert_eq!(config.pending_timeout(), Some(Duration::from_secs(120)));
    }

    #[test]
    fn deserializes_with_defaults() {
        let json = r#"{
            "issuer": "idp.test",
            "client_id": "client",
            "redirect_uri": "https://app.example/callback"
        }"#;
        let config: FlowConfig = serde_json::from_str(json).unwrap();
        assert_eq!(config.http_timeout_seconds, 30);
        assert_eq!(config.log_filter, "info");
        assert_eq!(config.issuer_origin().unwrap().as_str(), "https://idp.test");
    }
}
