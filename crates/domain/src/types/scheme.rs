//! Identity scheme catalogue
//!
//! Each scheme maps to the `acr_values` string the provider uses to pick an
//! authentication method. Unknown strings are kept verbatim so new provider
//! schemes can be used without a release.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum IdentityScheme {
    /// Test scheme that completes without a real identity
    Mock,
    DkMitIdLow,
    DkMitIdSubstantial,
    DkMitIdHigh,
    DkMitIdBusiness,
    SeBankIdSameDevice,
    SeBankIdAnotherDevice,
    NoBankId,
    NoVipps,
    FiAll,
    /// Any other `acr_values` string
    Custom(String),
}

impl IdentityScheme {
    const KNOWN: [Self; 10] = [
        Self::Mock,
        Self::DkMitIdLow,
        Self::DkMitIdSubstantial,
        Self::DkMitIdHigh,
        Self::DkMitIdBusiness,
        Self::SeBankIdSameDevice,
        Self::SeBankIdAnotherDevice,
        Self::NoBankId,
        Self::NoVipps,
        Self::FiAll,
    ];

    pub fn acr_value(&self) -> &str {
        match self {
            Self::Mock => "urn:grn:authn:mock",
            Self::DkMitIdLow => "urn:grn:authn:dk:mitid:low",
            Self::DkMitIdSubstantial => "urn:grn:authn:dk:mitid:substantial",
            Self::DkMitIdHigh => "urn:grn:authn:dk:mitid:high",
            Self::DkMitIdBusiness => "urn:grn:authn:dk:mitid:business",
            Self::SeBankIdSameDevice => "urn:grn:authn:se:bankid:same-device",
            Self::SeBankIdAnotherDevice => "urn:grn:authn:se:bankid:another-device:qr",
            Self::NoBankId => "urn:grn:authn:no:bankid:substantial",
            Self::NoVipps => "urn:grn:authn:no:vipps",
            Self::FiAll => "urn:grn:authn:fi:all",
            Self::Custom(acr) => acr,
        }
    }

    /// Schemes whose native app can hand control back through a resume link.
    pub const fn supports_app_switch(&self) -> bool {
        matches!(
            self,
            Self::DkMitIdLow
                | Self::DkMitIdSubstantial
                | Self::DkMitIdHigh
                | Self::DkMitIdBusiness
                | Self::SeBankIdSameDevice
        )
    }
}

impl FromStr for IdentityScheme {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self::KNOWN
            .into_iter()
            .find(|scheme| scheme.acr_value() == s)
            .unwrap_or_else(|| Self::Custom(s.to_string())))
    }
}

impl fmt::Display for IdentityScheme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.acr_value())
    }
}

impl Serialize for IdentityScheme {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.acr_value())
    }
}

impl<'de> Deserialize<'de> for IdentityScheme {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        match raw.parse::<Self>() {
            Ok(scheme) => Ok(scheme),
            Err(never) => match never {},
        }
    }
}
