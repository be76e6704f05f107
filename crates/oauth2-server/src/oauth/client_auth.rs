//! Client authentication for the token endpoint.
//!
//! # Authentication Methods
//!
//! - `client_secret_basic` - HTTP Basic Auth with client_id:client_secret
//! - `client_secret_post` - client_id and client_secret in request body
//! - `none` - public clients (client_id only)
//!
//! The token request parser has already decided the source: a well-formed
//! Basic header wins and the body credentials are ignored.

use std::fmt;
use std::sync::Arc;

use axum::http::{HeaderMap, header::AUTHORIZATION};
use base64::{Engine, engine::general_purpose::STANDARD};
use serde::{Deserialize, Serialize};
use subtle::ConstantTimeEq;

use crate::OAuthResult;
use crate::error::{ErrorReason, OAuthError};
use crate::oauth::token::AccessTokenRequest;
use crate::storage::{ClientRepository, get_client};
use crate::types::Client;

/// Result of successful client authentication.
#[derive(Debug, Clone)]
pub struct AuthenticatedClient {
    /// The authenticated client.
    pub client: Arc<dyn Client>,

    /// The authentication method used.
    pub auth_method: TokenEndpointAuthMethod,
}

/// Token endpoint authentication methods.
///
/// Defined in OpenID Connect Core Section 9.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TokenEndpointAuthMethod {
    /// No client authentication (public clients).
    None,

    /// Client secret via HTTP Basic Auth.
    ClientSecretBasic,

    /// Client secret in request body.
    ClientSecretPost,
}

impl TokenEndpointAuthMethod {
    /// Returns the string representation of the auth method.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::None => "none",
            Self::ClientSecretBasic => "client_secret_basic",
            Self::ClientSecretPost => "client_secret_post",
        }
    }
}

impl fmt::Display for TokenEndpointAuthMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Errors reading an `Authorization: Basic` header.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BasicAuthError {
    #[error("missing Authorization header")]
    Missing,

    #[error("Authorization header must use the Basic scheme")]
    NotBasic,

    #[error("invalid base64 encoding in Authorization header")]
    InvalidBase64,

    #[error("invalid UTF-8 in decoded credentials")]
    InvalidUtf8,

    #[error("credentials must be in format 'id:secret'")]
    MissingColon,
}

/// Extracts client credentials from an `Authorization: Basic` header.
///
/// The scheme name is matched case-insensitively. Credentials are split on
/// the first `:` so secrets may contain colons.
///
/// # Errors
///
/// Returns `BasicAuthError` if the header is absent or malformed.
pub fn parse_basic_auth(headers: &HeaderMap) -> Result<(String, String), BasicAuthError> {
    let header = headers
        .get(AUTHORIZATION)
        .ok_or(BasicAuthError::Missing)?
        .to_str()
        .map_err(|_| BasicAuthError::NotBasic)?;

    let (scheme, credentials) = header.split_once(' ').ok_or(BasicAuthError::NotBasic)?;
    if !scheme.eq_ignore_ascii_case("Basic") {
        return Err(BasicAuthError::NotBasic);
    }

    let decoded = STANDARD
        .decode(credentials.trim())
        .map_err(|_| BasicAuthError::InvalidBase64)?;

    let credentials = String::from_utf8(decoded).map_err(|_| BasicAuthError::InvalidUtf8)?;

    let (client_id, secret) = credentials
        .split_once(':')
        .ok_or(BasicAuthError::MissingColon)?;

    Ok((client_id.to_string(), secret.to_string()))
}

/// Authenticates the client of a token request.
///
/// Resolves the client named by the request, checks the secret of
/// confidential clients (through the client's own secret validation if it has
/// one, else by constant-time comparison) and applies the client's grant type
/// allow-list, if any. Grants call this from [`Grant::token`](crate::oauth::Grant::token).
///
/// # Errors
///
/// - `invalid_client` if the client id is missing, unknown, or the secret
///   does not authenticate it
/// - `unauthorized_client` if the client may not use the grant type
/// - `server_error` if the repository fails
pub async fn authenticate_client(
    repository: &dyn ClientRepository,
    request: &AccessTokenRequest,
) -> OAuthResult<AuthenticatedClient> {
    let client_id = request.client_id_or_error()?;
    let client = get_client(repository, client_id).await?;

    let auth_method = if client.is_confidential() {
        let secret = request.client_secret_or_error()?;
        if !secret_matches(&*client, secret) {
            tracing::warn!(client_id, "Client secret did not match");
            return Err(OAuthError::invalid_client("client authentication failed")
                .caused_by(ErrorReason::InvalidClientSecret));
        }
        if request.used_basic_auth {
            TokenEndpointAuthMethod::ClientSecretBasic
        } else {
            TokenEndpointAuthMethod::ClientSecretPost
        }
    } else {
        TokenEndpointAuthMethod::None
    };

    if let Some(policy) = client.grant_type_policy()
        && !policy.allows_grant_type(&request.grant_type)
    {
        tracing::warn!(
            client_id,
            grant_type = %request.grant_type,
            "Grant type not allowed for client"
        );
        return Err(OAuthError::unauthorized_client(format!(
            "client {client_id} may not use the {} grant type",
            request.grant_type
        ))
        .caused_by(ErrorReason::GrantTypeNotAllowed));
    }

    tracing::debug!(client_id, auth_method = %auth_method, "Client authenticated");

    Ok(AuthenticatedClient {
        client,
        auth_method,
    })
}

fn secret_matches(client: &dyn Client, presented: &str) -> bool {
    match client.secret_validator() {
        Some(validator) => validator.valid_secret(presented),
        None => bool::from(client.secret().as_bytes().ct_eq(presented.as_bytes())),
    }
}
