//! ID-token verification
//!
//! A token is accepted only when its header names a key id present in the
//! loaded key set, the signature verifies under that key with an algorithm
//! the key permits, `iss` equals the configured issuer exactly, and the
//! time claims that are present hold (`nbf` and `exp` with a small leeway).

use std::collections::HashSet;
use std::str::FromStr;

use idswitch_domain::constants::NOT_BEFORE_LEEWAY_SECONDS;
use idswitch_domain::{
    FlowError, KeyRecord, KeySet, PublicKeyMaterial, Result, VerificationFailure, VerifiedClaims,
};
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{decode, decode_header, Algorithm, DecodingKey, Validation};
use serde_json::{Map, Value};

const RSA_ALGORITHMS: &[Algorithm] = &[
    Algorithm::RS256,
    Algorithm::RS384,
    Algorithm::RS512,
    Algorithm::PS256,
    Algorithm::PS384,
    Algorithm::PS512,
];

/// Verifies tokens for one issuer.
#[derive(Debug, Clone)]
pub struct TokenVerifier {
    issuer: String,
    leeway_seconds: u64,
}

impl TokenVerifier {
    pub fn new(issuer: impl Into<String>) -> Self {
        Self { issuer: issuer.into(), leeway_seconds: NOT_BEFORE_LEEWAY_SECONDS }
    }

    pub fn issuer(&self) -> &str {
        &self.issuer
    }

    /// Verify `raw_token` against `keys`.
    ///
    /// # Errors
    /// - [`FlowError::UnknownKey`] when the header's key id is not in `keys`
    /// - [`FlowError::TokenVerification`] for every other rejection
    pub fn verify(&self, raw_token: &str, keys: &KeySet) -> Result<VerifiedClaims> {
        let header = decode_header(raw_token)
            .map_err(|e| FlowError::verification(VerificationFailure::Malformed, e.to_string()))?;

        let kid = header.kid.as_deref().ok_or_else(|| {
            FlowError::verification(VerificationFailure::MissingKeyId, "token header has no kid")
        })?;
        let key = keys.find(kid).ok_or_else(|| FlowError::UnknownKey(kid.to_string()))?;

        let algorithm = permitted_algorithm(key, header.alg)?;
        let decoding_key = decoding_key(key)?;

        let mut validation = Validation::new(algorithm);
        validation.set_issuer(&[self.issuer.as_str()]);
        validation.leeway = self.leeway_seconds;
        validation.validate_nbf = true;
        validation.validate_exp = true;
        validation.validate_aud = false;
        validation.required_spec_claims = HashSet::from(["iss".to_string()]);

        let data = decode::<Map<String, Value>>(raw_token, &decoding_key, &validation)
            .map_err(|e| map_jwt_error(&e))?;

        tracing::debug!(kid = %kid, alg = ?algorithm, "ID token verified");

        VerifiedClaims::from_payload(raw_token, data.claims).ok_or_else(|| {
            FlowError::verification(VerificationFailure::MissingClaim, "sub")
        })
    }
}

/// Verify `raw_token` for `issuer` against `keys`.
pub fn verify(raw_token: &str, issuer: &str, keys: &KeySet) -> Result<VerifiedClaims> {
    TokenVerifier::new(issuer).verify(raw_token, keys)
}

/// The header algorithm, provided the key allows it.
fn permitted_algorithm(key: &KeyRecord, header_alg: Algorithm) -> Result<Algorithm> {
    let unsupported = |detail: String| {
        FlowError::verification(VerificationFailure::UnsupportedAlgorithm, detail)
    };

    if let Some(declared) = key.algorithm.as_deref() {
        let declared = Algorithm::from_str(declared)
            .map_err(|_| unsupported(format!("key {} declares unknown alg {declared}", key.key_id)))?;
        if declared != header_alg {
            return Err(unsupported(format!(
                "token alg {header_alg:?} does not match key alg {declared:?}"
            )));
        }
    }

    let family: &[Algorithm] = match &key.material {
        PublicKeyMaterial::Rsa { .. } => RSA_ALGORITHMS,
        PublicKeyMaterial::Ec { crv, .. } => match crv.as_str() {
            "P-256" => &[Algorithm::ES256],
            "P-384" => &[Algorithm::ES384],
            other => return Err(unsupported(format!("unsupported curve {other}"))),
        },
    };

    if family.contains(&header_alg) {
        Ok(header_alg)
    } else {
        Err(unsupported(format!("alg {header_alg:?} not usable with key {}", key.key_id)))
    }
}

fn decoding_key(key: &KeyRecord) -> Result<DecodingKey> {
    let built = match &key.material {
        PublicKeyMaterial::Rsa { n, e } => DecodingKey::from_rsa_components(n, e),
        PublicKeyMaterial::Ec { x, y, .. } => DecodingKey::from_ec_components(x, y),
    };
    built.map_err(|e| {
        FlowError::verification(VerificationFailure::InvalidKey, format!("key {}: {e}", key.key_id))
    })
}

fn map_jwt_error(err: &jsonwebtoken::errors::Error) -> FlowError {
    let reason = match err.kind() {
        ErrorKind::InvalidSignature | ErrorKind::Crypto(_) => VerificationFailure::InvalidSignature,
        ErrorKind::InvalidIssuer => VerificationFailure::IssuerMismatch,
        ErrorKind::ImmatureSignature => VerificationFailure::NotYetValid,
        ErrorKind::ExpiredSignature => VerificationFailure::Expired,
        ErrorKind::MissingRequiredClaim(_) => VerificationFailure::MissingClaim,
        ErrorKind::InvalidAudience | ErrorKind::InvalidSubject => VerificationFailure::InvalidClaims,
        ErrorKind::InvalidAlgorithm | ErrorKind::InvalidAlgorithmName | ErrorKind::MissingAlgorithm => {
            VerificationFailure::UnsupportedAlgorithm
        }
        ErrorKind::InvalidEcdsaKey | ErrorKind::InvalidRsaKey(_) | ErrorKind::InvalidKeyFormat => {
            VerificationFailure::InvalidKey
        }
        _ => VerificationFailure::Malformed,
    };
    FlowError::verification(reason, err.to_string())
}
