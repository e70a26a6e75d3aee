//! Protocol constants
//!
//! Centralized location for the well-known paths, parameter values and login
//! hints used while talking to the identity provider.

// Discovery
pub const WELL_KNOWN_METADATA_PATH: &str = "/.well-known/openid-configuration";
pub const WELL_KNOWN_JWKS_PATH: &str = "/.well-known/jwks";

// Authorization request parameters
pub const RESPONSE_TYPE_CODE: &str = "code";
pub const OPENID_SCOPE: &str = "openid";
pub const PROMPT_LOGIN: &str = "login";
pub const PKCE_METHOD_S256: &str = "S256";

// App-switch login hints, in the order they are emitted
pub const APP_SWITCH_PLATFORM_HINT: &str = "appswitch:android";
pub const APP_SWITCH_RESUME_HINT_PREFIX: &str = "appswitch:resumeUrl:";
pub const CONTINUE_BUTTON_HINT: &str = "mobile:continue_button:never";

// Token verification
pub const NOT_BEFORE_LEEWAY_SECONDS: u64 = 5;

/// Claim carrying the scheme the user authenticated with
pub const IDENTITY_SCHEME_CLAIM: &str = "identityscheme";

// HTTP
pub const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 30;

// Configuration
pub const ENV_PREFIX: &str = "IDSWITCH_";
pub const DEFAULT_LOG_FILTER: &str = "info";
