//! Scope policies.

use std::collections::HashSet;

use crate::error::{BoxError, OAuthError};

/// Decides which requested scopes are acceptable.
///
/// Returning an [`OAuthError`] (boxed) keeps its code; any other error is
/// reported to the caller as `server_error`.
pub trait ScopeValidator: Send + Sync {
    /// Validates the requested scopes, in request order.
    ///
    /// # Errors
    ///
    /// Returns an error if any scope is not acceptable.
    fn validate_scopes(&self, scopes: &[String]) -> Result<(), BoxError>;
}

/// Accepts every scope.
#[derive(Debug, Clone, Copy, Default)]
pub struct AllowAllScopes;

impl ScopeValidator for AllowAllScopes {
    fn validate_scopes(&self, _scopes: &[String]) -> Result<(), BoxError> {
        Ok(())
    }
}

/// Accepts only scopes from a fixed set.
#[derive(Debug, Clone, Default)]
pub struct AllowScopes {
    allowed: HashSet<String>,
}

impl AllowScopes {
    /// Creates a policy accepting exactly `scopes`.
    pub fn new<I, S>(scopes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            allowed: scopes.into_iter().map(Into::into).collect(),
        }
    }

    /// Returns `true` if `scope` is accepted.
    #[must_use]
    pub fn allows(&self, scope: &str) -> bool {
        self.allowed.contains(scope)
    }
}

impl ScopeValidator for AllowScopes {
    fn validate_scopes(&self, scopes: &[String]) -> Result<(), BoxError> {
        let invalid: Vec<&str> = scopes
            .iter()
            .map(String::as_str)
            .filter(|scope| !self.allows(scope))
            .collect();

        if invalid.is_empty() {
            Ok(())
        } else {
            Err(Box::new(OAuthError::invalid_scope(&invalid)))
        }
    }
}
