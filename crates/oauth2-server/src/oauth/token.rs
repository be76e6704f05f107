//! Token endpoint request handling.
//!
//! Parses `POST /token` requests and defines the [`Grant`] extension point
//! the dispatcher routes them to.

use std::sync::Arc;

use async_trait::async_trait;
use axum::http::{HeaderMap, Method, header::CONTENT_TYPE};
use serde::{Deserialize, Serialize};

use crate::OAuthResult;
use crate::error::{BoxError, ErrorReason, OAuthError};
use crate::oauth::authorize::AuthorizationHandler;
use crate::oauth::client_auth::parse_basic_auth;
use crate::oauth::pkce::Pkce;
use crate::params::{PARAM_CLIENT_ID, PARAM_CLIENT_SECRET, PARAM_GRANT_TYPE, Params};

const FORM_URLENCODED: &str = "application/x-www-form-urlencoded";

// =============================================================================
// Token Request
// =============================================================================

/// A parsed access token request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccessTokenRequest {
    /// The requested grant type.
    pub grant_type: String,

    /// Client id, from Basic auth if present, else from the body.
    pub client_id: Option<String>,

    /// Client secret, from the same source as `client_id`.
    pub client_secret: Option<String>,

    /// Whether the credentials came from an `Authorization: Basic` header.
    pub used_basic_auth: bool,

    /// Decoded form body.
    pub params: Params,
}

impl AccessTokenRequest {
    /// Returns a body parameter, treating empty values as absent.
    #[must_use]
    pub fn param(&self, name: &str) -> Option<&str> {
        self.params.get_non_empty(name)
    }

    /// Returns a body parameter or an `invalid_request` naming it.
    ///
    /// # Errors
    ///
    /// Returns `invalid_request` if the parameter is missing or empty.
    pub fn param_or_error(&self, name: &str) -> OAuthResult<&str> {
        self.param(name)
            .ok_or_else(|| OAuthError::missing_parameter(name))
    }

    /// Returns the client id.
    ///
    /// # Errors
    ///
    /// Returns `invalid_client` if no client id was sent.
    pub fn client_id_or_error(&self) -> OAuthResult<&str> {
        self.client_id
            .as_deref()
            .filter(|id| !id.is_empty())
            .ok_or_else(|| missing_credential(ErrorReason::MissingClientId))
    }

    /// Returns the client secret.
    ///
    /// # Errors
    ///
    /// Returns `invalid_client` if no client secret was sent.
    pub fn client_secret_or_error(&self) -> OAuthResult<&str> {
        self.client_secret
            .as_deref()
            .filter(|secret| !secret.is_empty())
            .ok_or_else(|| missing_credential(ErrorReason::MissingClientSecret))
    }
}

fn missing_credential(reason: ErrorReason) -> OAuthError {
    OAuthError::invalid_client(reason.to_string()).caused_by(reason)
}

/// Parses an access token request.
///
/// The body is only decoded when the content type is
/// `application/x-www-form-urlencoded`; a request without one is treated as
/// `application/octet-stream`. Bytes that are not valid UTF-8 are decoded
/// lossily rather than rejected. A well-formed `Authorization: Basic`
/// header supplies both client credentials and the body's `client_id` and
/// `client_secret` are ignored; otherwise they are taken from the body.
///
/// # Errors
///
/// Returns `invalid_request` if the method is not `POST`, the body cannot be
/// decoded, or `grant_type` is missing.
pub fn parse_access_token_request(
    method: &Method,
    headers: &HeaderMap,
    body: &[u8],
) -> OAuthResult<AccessTokenRequest> {
    if method != Method::POST {
        return Err(OAuthError::invalid_request(format!(
            "token requests must be {} requests",
            Method::POST
        ))
        .caused_by(ErrorReason::InvalidRequestMethod));
    }

    let params = if is_form_body(headers) {
        decode_body(body)?
    } else {
        Params::default()
    };

    let grant_type = params
        .get_non_empty(PARAM_GRANT_TYPE)
        .ok_or_else(|| {
            OAuthError::missing_parameter(PARAM_GRANT_TYPE)
                .caused_by(ErrorReason::MissingGrantType)
        })?
        .to_string();

    let (client_id, client_secret, used_basic_auth) = match parse_basic_auth(headers) {
        Ok((id, secret)) => (Some(id), Some(secret), true),
        Err(_) => (
            params.get(PARAM_CLIENT_ID).map(str::to_string),
            params.get(PARAM_CLIENT_SECRET).map(str::to_string),
            false,
        ),
    };

    Ok(AccessTokenRequest {
        grant_type,
        client_id,
        client_secret,
        used_basic_auth,
        params,
    })
}

fn is_form_body(headers: &HeaderMap) -> bool {
    headers
        .get(CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.split(';').next())
        .is_some_and(|media_type| media_type.trim().eq_ignore_ascii_case(FORM_URLENCODED))
}

fn decode_body(body: &[u8]) -> OAuthResult<Params> {
    Params::parse(&String::from_utf8_lossy(body)).map_err(|err| {
        OAuthError::invalid_request(ErrorReason::CouldNotParseRequestBody.to_string())
            .caused_by(ErrorReason::CouldNotParseRequestBody.with_source(err))
    })
}

// =============================================================================
// Token Response
// =============================================================================

/// A successful token response (RFC 6749 section 5.1).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessTokenResponse {
    /// The issued access token.
    pub access_token: String,

    /// Token type, usually `Bearer`.
    pub token_type: String,

    /// Lifetime of the access token in seconds.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expires_in: Option<u64>,

    /// Refresh token, if one was issued.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,

    /// OpenID Connect ID token, if one was issued.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id_token: Option<String>,
}

impl AccessTokenResponse {
    /// Creates a response with the given token and type.
    #[must_use]
    pub fn new(access_token: impl Into<String>, token_type: impl Into<String>) -> Self {
        Self {
            access_token: access_token.into(),
            token_type: token_type.into(),
            expires_in: None,
            refresh_token: None,
            id_token: None,
        }
    }

    /// Creates a `Bearer` token response.
    #[must_use]
    pub fn bearer(access_token: impl Into<String>) -> Self {
        Self::new(access_token, "Bearer")
    }

    #[must_use]
    pub fn with_expires_in(mut self, seconds: u64) -> Self {
        self.expires_in = Some(seconds);
        self
    }

    #[must_use]
    pub fn with_refresh_token(mut self, refresh_token: impl Into<String>) -> Self {
        self.refresh_token = Some(refresh_token.into());
        self
    }

    #[must_use]
    pub fn with_id_token(mut self, id_token: impl Into<String>) -> Self {
        self.id_token = Some(id_token.into());
        self
    }
}

// =============================================================================
// Grant Trait
// =============================================================================

/// A token endpoint grant, selected by `grant_type`.
#[async_trait]
pub trait Grant: Send + Sync {
    /// The grant type this grant handles.
    fn grant_type(&self) -> &str;

    /// Responds to a token request.
    ///
    /// `pkce` is the server's configured verifier, for redeeming codes issued
    /// with a challenge.
    ///
    /// Returning a boxed [`OAuthError`] keeps its code; any other error
    /// becomes a `server_error` without a description.
    ///
    /// # Errors
    ///
    /// Returns an error if no token can be issued.
    async fn token(
        &self,
        request: &AccessTokenRequest,
        pkce: &dyn Pkce,
    ) -> Result<AccessTokenResponse, BoxError>;

    /// Returns this grant as a response type handler, if it also serves the
    /// authorization endpoint (e.g. the authorization code grant handling
    /// `code`).
    fn authorization_handler(self: Arc<Self>) -> Option<Arc<dyn AuthorizationHandler>> {
        None
    }
}
