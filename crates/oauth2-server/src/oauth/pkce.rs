//! PKCE (Proof Key for Code Exchange) verification.
//!
//! Implements RFC 7636 `plain` and `S256`. Verifiers are pluggable: a
//! [`CompositePkce`] maps method names to implementations, so further methods
//! can be registered without touching the built-ins.
//!
//! # Example
//!
//! ```
//! use oauth2_server::oauth::pkce::{Pkce, default_pkce, generate_verifier, s256_challenge};
//!
//! // Client generates a verifier and derives the challenge
//! let verifier = generate_verifier();
//! let challenge = s256_challenge(&verifier);
//!
//! // Server later checks the verifier presented at the token endpoint
//! let pkce = default_pkce(Vec::new());
//! assert!(pkce.verify_code_challenge("S256", &challenge, &verifier).unwrap());
//! ```

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use base64::{Engine, engine::general_purpose::URL_SAFE_NO_PAD};
use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;

use crate::OAuthResult;
use crate::error::{ErrorReason, OAuthError};
use crate::oauth::authorize::AuthorizationRequest;
use crate::params::PARAM_CODE_CHALLENGE;

pub const CODE_CHALLENGE_METHOD_PLAIN: &str = "plain";
pub const CODE_CHALLENGE_METHOD_S256: &str = "S256";

// =============================================================================
// Error Types
// =============================================================================

/// Errors that can occur during PKCE verification.
///
/// A verifier that simply does not match is not an error; it is `Ok(false)`.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PkceError {
    /// No verifier is registered for the challenge method.
    #[error("unsupported code challenge method: {0}")]
    UnsupportedMethod(String),
}

impl PkceError {
    /// Create an `UnsupportedMethod` error.
    #[must_use]
    pub fn unsupported_method(method: impl Into<String>) -> Self {
        Self::UnsupportedMethod(method.into())
    }
}

// =============================================================================
// Verifier Trait
// =============================================================================

/// Verifies a PKCE code verifier against a stored challenge.
pub trait Pkce: fmt::Debug + Send + Sync {
    /// Challenge methods this verifier handles.
    fn challenge_methods(&self) -> Vec<String>;

    /// Checks `verifier` against `challenge` under `method`.
    ///
    /// # Errors
    ///
    /// Returns `PkceError::UnsupportedMethod` if `method` is not handled.
    fn verify_code_challenge(
        &self,
        method: &str,
        challenge: &str,
        verifier: &str,
    ) -> Result<bool, PkceError>;
}

/// The `plain` method: the verifier is the challenge.
#[derive(Debug, Clone, Copy, Default)]
pub struct PlainPkce;

impl Pkce for PlainPkce {
    fn challenge_methods(&self) -> Vec<String> {
        vec![CODE_CHALLENGE_METHOD_PLAIN.to_string()]
    }

    fn verify_code_challenge(
        &self,
        method: &str,
        challenge: &str,
        verifier: &str,
    ) -> Result<bool, PkceError> {
        if method != CODE_CHALLENGE_METHOD_PLAIN {
            return Err(PkceError::unsupported_method(method));
        }
        Ok(constant_time_eq(challenge, verifier))
    }
}

/// The `S256` method: `BASE64URL(SHA256(verifier)) == challenge`.
#[derive(Debug, Clone, Copy, Default)]
pub struct S256Pkce;

impl Pkce for S256Pkce {
    fn challenge_methods(&self) -> Vec<String> {
        vec![CODE_CHALLENGE_METHOD_S256.to_string()]
    }

    fn verify_code_challenge(
        &self,
        method: &str,
        challenge: &str,
        verifier: &str,
    ) -> Result<bool, PkceError> {
        if method != CODE_CHALLENGE_METHOD_S256 {
            return Err(PkceError::unsupported_method(method));
        }
        Ok(constant_time_eq(challenge, &s256_challenge(verifier)))
    }
}

// =============================================================================
// Composite Verifier
// =============================================================================

/// Dispatches to a verifier by challenge method.
///
/// When two registered verifiers claim the same method, the one registered
/// last handles it.
#[derive(Debug, Clone, Default)]
pub struct CompositePkce {
    verifiers: HashMap<String, Arc<dyn Pkce>>,
}

impl CompositePkce {
    /// Creates a composite with no methods.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `verifier` for every method it reports.
    #[must_use]
    pub fn with(mut self, verifier: Arc<dyn Pkce>) -> Self {
        self.register(verifier);
        self
    }

    /// Registers `verifier` for every method it reports.
    pub fn register(&mut self, verifier: Arc<dyn Pkce>) {
        for method in verifier.challenge_methods() {
            self.verifiers.insert(method, Arc::clone(&verifier));
        }
    }

    /// Drops every method not listed in `methods`.
    #[must_use]
    pub fn retain_methods<S: AsRef<str>>(mut self, methods: &[S]) -> Self {
        self.verifiers
            .retain(|method, _| methods.iter().any(|m| m.as_ref() == method));
        self
    }

    /// Returns `true` if `method` has a registered verifier.
    #[must_use]
    pub fn supports(&self, method: &str) -> bool {
        self.verifiers.contains_key(method)
    }
}

impl Pkce for CompositePkce {
    fn challenge_methods(&self) -> Vec<String> {
        let mut methods: Vec<String> = self.verifiers.keys().cloned().collect();
        methods.sort();
        methods
    }

    fn verify_code_challenge(
        &self,
        method: &str,
        challenge: &str,
        verifier: &str,
    ) -> Result<bool, PkceError> {
        self.verifiers
            .get(method)
            .ok_or_else(|| PkceError::unsupported_method(method))?
            .verify_code_challenge(method, challenge, verifier)
    }
}

/// Builds the standard `plain` + `S256` composite, then registers `extra`.
///
/// Extras registered for `plain` or `S256` replace the built-ins.
#[must_use]
pub fn default_pkce(extra: Vec<Arc<dyn Pkce>>) -> CompositePkce {
    extra.into_iter().fold(
        CompositePkce::new()
            .with(Arc::new(PlainPkce))
            .with(Arc::new(S256Pkce)),
        CompositePkce::with,
    )
}

// =============================================================================
// Helpers
// =============================================================================

/// Computes the `S256` challenge for `verifier`.
#[must_use]
pub fn s256_challenge(verifier: &str) -> String {
    URL_SAFE_NO_PAD.encode(Sha256::digest(verifier.as_bytes()))
}

/// Generates a random code verifier.
///
/// 32 random bytes encoded as base64url, 43 characters.
#[must_use]
pub fn generate_verifier() -> String {
    use rand::Rng;
    let mut rng = rand::thread_rng();
    let bytes: [u8; 32] = rng.r#gen();
    URL_SAFE_NO_PAD.encode(bytes)
}

/// Checks the PKCE parameters of an authorization request.
///
/// Intended for `code` response type handlers. A request without a challenge
/// passes unless `required` is set. A challenge whose method `pkce` does not
/// handle is rejected, so the failure surfaces at authorization time rather
/// than at redemption.
///
/// # Errors
///
/// Returns `invalid_request` for a missing (when required) challenge or an
/// unsupported challenge method.
pub fn validate_challenge_request(
    pkce: &dyn Pkce,
    request: &AuthorizationRequest,
    required: bool,
) -> OAuthResult<()> {
    let Some(method) = request
        .code_challenge
        .as_ref()
        .and(request.code_challenge_method.as_deref())
    else {
        if required {
            return Err(OAuthError::missing_parameter(PARAM_CODE_CHALLENGE));
        }
        return Ok(());
    };

    if pkce.challenge_methods().iter().any(|m| m == method) {
        Ok(())
    } else {
        Err(OAuthError::invalid_request(format!(
            "code challenge method {method} is not supported"
        ))
        .caused_by(ErrorReason::UnsupportedCodeChallengeMethod))
    }
}

fn constant_time_eq(a: &str, b: &str) -> bool {
    a.as_bytes().ct_eq(b.as_bytes()).into()
}
