//! Authorization server configuration.
//!
//! Declarative settings that seed the scope policy and the enabled PKCE
//! methods. Anything more dynamic (per-client scopes, custom verifiers) is
//! wired in code through [`AuthorizationServerBuilder`](crate::oauth::AuthorizationServerBuilder).

use serde::{Deserialize, Serialize};

use crate::oauth::pkce::{CODE_CHALLENGE_METHOD_PLAIN, CODE_CHALLENGE_METHOD_S256};

/// OAuth 2.0 server configuration.
///
/// # Example (TOML)
///
/// ```toml
/// allowed_scopes = ["openid", "profile", "email"]
/// pkce_methods = ["S256"]
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct OAuthConfig {
    /// Scopes clients may request.
    /// Empty allows every scope.
    pub allowed_scopes: Vec<String>,

    /// Enabled PKCE challenge methods.
    /// Default: `["plain", "S256"]`.
    pub pkce_methods: Vec<String>,
}

impl Default for OAuthConfig {
    fn default() -> Self {
        Self {
            allowed_scopes: Vec::new(),
            pkce_methods: vec![
                CODE_CHALLENGE_METHOD_PLAIN.to_string(),
                CODE_CHALLENGE_METHOD_S256.to_string(),
            ],
        }
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// An invalid configuration value was provided.
    #[error("Invalid configuration value: {0}")]
    InvalidValue(String),

    /// A required configuration value is missing.
    #[error("Missing required configuration: {0}")]
    Missing(String),

    /// The configuration could not be parsed.
    #[error("Invalid configuration syntax: {0}")]
    Parse(#[from] toml::de::Error),
}

impl OAuthConfig {
    /// Parses and validates a TOML document.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Parse` for malformed TOML and any error from
    /// [`validate`](Self::validate).
    pub fn from_toml_str(raw: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(raw)?;
        config.validate()?;
        Ok(config)
    }

    /// Validates the configuration.
    ///
    /// # Errors
    ///
    /// - `ConfigError::Missing` if no PKCE method is enabled
    /// - `ConfigError::InvalidValue` for an unknown PKCE method or a blank
    ///   or space-containing scope
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.pkce_methods.is_empty() {
            return Err(ConfigError::Missing("pkce_methods".to_string()));
        }

        for method in &self.pkce_methods {
            match method.as_str() {
                CODE_CHALLENGE_METHOD_PLAIN | CODE_CHALLENGE_METHOD_S256 => {}
                other => {
                    return Err(ConfigError::InvalidValue(format!(
                        "Invalid PKCE method: '{other}'. Must be plain or S256"
                    )));
                }
            }
        }

        for scope in &self.allowed_scopes {
            if scope.is_empty() || scope.contains(' ') {
                return Err(ConfigError::InvalidValue(format!(
                    "Invalid scope: '{scope}'. Scopes must be non-empty and contain no spaces"
                )));
            }
        }

        Ok(())
    }
}
