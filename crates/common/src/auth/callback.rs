//! Callback query parsing and redirect-target matching

use idswitch_domain::OAuthError;
use url::Url;

/// Parameters the provider appends to a redirect.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CallbackParams {
    pub state: Option<String>,
    pub code: Option<String>,
    pub error: Option<String>,
    pub error_description: Option<String>,
}

impl CallbackParams {
    /// Read the first occurrence of each known parameter. Empty values count
    /// as absent.
    pub fn parse(uri: &Url) -> Self {
        let mut params = Self::default();
        for (key, value) in uri.query_pairs() {
            if value.is_empty() {
                continue;
            }
            let slot = match key.as_ref() {
                "state" => &mut params.state,
                "code" => &mut params.code,
                "error" => &mut params.error,
                "error_description" => &mut params.error_description,
                _ => continue,
            };
            if slot.is_none() {
                *slot = Some(value.into_owned());
            }
        }
        params
    }

    /// OAuth error carried by the redirect, if any.
    pub fn oauth_error(&self) -> Option<OAuthError> {
        self.error
            .as_ref()
            .map(|error| OAuthError::new(error.clone(), self.error_description.clone()))
    }
}

/// Whether `uri` lands on `target`, ignoring query and fragment.
pub fn targets_redirect(uri: &Url, target: &Url) -> bool {
    uri.scheme() == target.scheme()
        && uri.host_str() == target.host_str()
        && uri.port_or_known_default() == target.port_or_known_default()
        && uri.path().trim_end_matches('/') == target.path().trim_end_matches('/')
}
