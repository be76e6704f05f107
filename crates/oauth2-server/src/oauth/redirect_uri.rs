//! Redirect URI resolution.
//!
//! Decides the single destination that responses and errors for an
//! authorization request may be delivered to. Resolution fails closed: any
//! error here must be shown to the resource owner directly, never redirected.

use crate::OAuthResult;
use crate::error::{ErrorReason, OAuthError};
use crate::params::PARAM_REDIRECT_URI;
use crate::types::Client;

/// Resolves the final redirect URI for `client`.
///
/// `requested` is the `redirect_uri` parameter as sent, empty if absent. A
/// client exposing [`ValidatesRedirectUri`](crate::types::ValidatesRedirectUri)
/// decides alone; otherwise [`default_redirect_uri_validation`] applies.
///
/// # Errors
///
/// - `invalid_client` if the client rejects the URI, has no registered URIs,
///   or the URI does not exactly match a registered one
/// - `invalid_request` if no URI was requested and several are registered
pub fn resolve_redirect_uri(client: &dyn Client, requested: &str) -> OAuthResult<String> {
    let Some(validator) = client.redirect_uri_validator() else {
        return default_redirect_uri_validation(client, requested);
    };

    match validator.valid_redirect_uri(requested) {
        Some(final_uri) if final_uri.is_empty() => Ok(requested.to_string()),
        Some(final_uri) => Ok(final_uri),
        None => Err(invalid_redirect_uri(requested)),
    }
}

/// Default policy: exact match against the registered redirect URIs.
///
/// # Errors
///
/// See [`resolve_redirect_uri`].
pub fn default_redirect_uri_validation(
    client: &dyn Client,
    requested: &str,
) -> OAuthResult<String> {
    let registered = client.redirect_uris();

    if registered.is_empty() {
        return Err(OAuthError::invalid_client(format!(
            "client {} does not have any registered redirect URIs",
            client.id()
        ))
        .caused_by(ErrorReason::ClientHasNoRedirectUris));
    }

    if requested.is_empty() {
        return match registered {
            [only] => Ok(only.clone()),
            _ => Err(OAuthError::missing_parameter(PARAM_REDIRECT_URI)
                .caused_by(ErrorReason::ClientRequiresRedirectUri)),
        };
    }

    if registered.iter().any(|uri| uri == requested) {
        Ok(requested.to_string())
    } else {
        Err(invalid_redirect_uri(requested))
    }
}

fn invalid_redirect_uri(requested: &str) -> OAuthError {
    OAuthError::invalid_client(format!("{requested} is not a valid redirect_uri"))
        .caused_by(ErrorReason::ClientInvalidRedirectUri)
}
