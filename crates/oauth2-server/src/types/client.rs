//! OAuth 2.0 client contract.
//!
//! A [`Client`] exposes only identity, secret, confidentiality and its
//! registered redirect URIs. Optional behaviour is expressed as capability
//! traits that a client opts into by returning `Some(self)` from the matching
//! probe method; the default for every probe is `None`.
//!
//! ```ignore
//! impl Client for TenantClient {
//!     // ...
//!     fn response_type_policy(&self) -> Option<&dyn AllowsResponseType> {
//!         Some(self)
//!     }
//! }
//! ```

use std::fmt;

/// A registered OAuth 2.0 client application.
pub trait Client: fmt::Debug + Send + Sync {
    /// The client identifier.
    fn id(&self) -> &str;

    /// The client secret. Empty for public clients.
    fn secret(&self) -> &str;

    /// Whether the client can keep its secret confidential (server-side apps)
    /// as opposed to public clients such as native or single-page apps.
    fn is_confidential(&self) -> bool;

    /// Registered redirect URIs, in registration order.
    fn redirect_uris(&self) -> &[String];

    /// Probe for custom redirect URI validation.
    fn redirect_uri_validator(&self) -> Option<&dyn ValidatesRedirectUri> {
        None
    }

    /// Probe for custom secret validation.
    fn secret_validator(&self) -> Option<&dyn ValidatesSecret> {
        None
    }

    /// Probe for a grant type allow-list.
    fn grant_type_policy(&self) -> Option<&dyn AllowsGrantType> {
        None
    }

    /// Probe for a response type allow-list.
    fn response_type_policy(&self) -> Option<&dyn AllowsResponseType> {
        None
    }
}

// =============================================================================
// Capabilities
// =============================================================================

/// Lets a client take over redirect URI validation entirely.
pub trait ValidatesRedirectUri: Send + Sync {
    /// Validates the requested redirect URI, which may be empty.
    ///
    /// Returns `None` to reject it, or `Some(final_uri)` to accept it. The
    /// final URI may differ from the request (e.g. canonicalized); an empty
    /// string accepts the requested URI as-is.
    fn valid_redirect_uri(&self, requested: &str) -> Option<String>;
}

/// Lets a client verify presented secrets itself (e.g. against a hash).
pub trait ValidatesSecret: Send + Sync {
    /// Returns `true` if `secret` authenticates this client.
    fn valid_secret(&self, secret: &str) -> bool;
}

/// Restricts which grant types a client may use at the token endpoint.
pub trait AllowsGrantType: Send + Sync {
    /// Returns `true` if the client may use `grant_type`.
    fn allows_grant_type(&self, grant_type: &str) -> bool;
}

/// Restricts which response types a client may request.
pub trait AllowsResponseType: Send + Sync {
    /// Returns `true` if the client may request the full set of `response_types`.
    fn allows_response_type(&self, response_types: &[String]) -> bool;
}

// =============================================================================
// Simple Client
// =============================================================================

/// Plain-data [`Client`] with no capabilities.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SimpleClient {
    id: String,
    secret: String,
    redirect_uris: Vec<String>,
    confidential: bool,
}

impl SimpleClient {
    /// Creates a confidential client.
    #[must_use]
    pub fn confidential(
        id: impl Into<String>,
        secret: impl Into<String>,
        redirect_uris: Vec<String>,
    ) -> Self {
        Self {
            id: id.into(),
            secret: secret.into(),
            redirect_uris,
            confidential: true,
        }
    }

    /// Creates a public client (no secret).
    #[must_use]
    pub fn public(id: impl Into<String>, redirect_uris: Vec<String>) -> Self {
        Self {
            id: id.into(),
            secret: String::new(),
            redirect_uris,
            confidential: false,
        }
    }

    /// Registers another redirect URI.
    #[must_use]
    pub fn with_redirect_uri(mut self, uri: impl Into<String>) -> Self {
        self.redirect_uris.push(uri.into());
        self
    }
}

impl Client for SimpleClient {
    fn id(&self) -> &str {
        &self.id
    }

    fn secret(&self) -> &str {
        &self.secret
    }

    fn is_confidential(&self) -> bool {
        self.confidential
    }

    fn redirect_uris(&self) -> &[String] {
        &self.redirect_uris
    }
}
