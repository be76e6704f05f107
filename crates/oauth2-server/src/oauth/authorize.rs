//! Authorization endpoint request handling.
//!
//! Parses `GET /authorize` requests and defines the per response type
//! extension point. Validation order and error routing live in
//! [`AuthorizationServer`](crate::oauth::AuthorizationServer).

use async_trait::async_trait;
use axum::http::{Method, Uri};
use serde::Serialize;
use url::Url;

use crate::OAuthResult;
use crate::error::{BoxError, ErrorReason, OAuthError};
use crate::oauth::pkce::{CODE_CHALLENGE_METHOD_PLAIN, Pkce};
use crate::params::{
    PARAM_CLIENT_ID, PARAM_CODE_CHALLENGE, PARAM_CODE_CHALLENGE_METHOD, PARAM_REDIRECT_URI,
    PARAM_RESPONSE_TYPE, PARAM_SCOPE, PARAM_STATE, Params, parse_space_separated,
};
use crate::types::Client;

/// The authorization code response type (RFC 6749 section 4.1.1).
pub const RESPONSE_TYPE_CODE: &str = "code";

// =============================================================================
// Authorization Request
// =============================================================================

/// A parsed authorization request.
///
/// Every field except `final_redirect_uri` comes straight from the query
/// string. `final_redirect_uri` is only set once redirect URI resolution has
/// succeeded, and it is the only URI responses may be delivered to.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct AuthorizationRequest {
    /// The client initiating the request.
    pub client_id: String,

    /// The `redirect_uri` parameter as sent.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub redirect_uri: Option<String>,

    /// The validated destination for the final redirect.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub final_redirect_uri: Option<String>,

    /// Opaque client state, echoed back on redirect.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub state: Option<String>,

    /// PKCE code challenge.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code_challenge: Option<String>,

    /// PKCE challenge method. `plain` when a challenge was sent without one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code_challenge_method: Option<String>,

    /// Requested scopes, in request order.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub scope: Vec<String>,

    /// Requested response types, in request order.
    pub response_type: Vec<String>,

    /// All query parameters, for response type handlers.
    #[serde(skip)]
    pub query: Params,
}

impl AuthorizationRequest {
    /// The requested redirect URI, empty if none was sent.
    #[must_use]
    pub fn requested_redirect_uri(&self) -> &str {
        self.redirect_uri.as_deref().unwrap_or_default()
    }

    /// Returns a raw query parameter.
    #[must_use]
    pub fn param(&self, name: &str) -> Option<&str> {
        self.query.get(name)
    }

    /// Returns `true` if `response_type` was requested.
    #[must_use]
    pub fn has_response_type(&self, response_type: &str) -> bool {
        self.response_type.iter().any(|t| t == response_type)
    }
}

/// Parses an authorization request from its method and URI.
///
/// # Errors
///
/// Returns `invalid_request` if the method is not `GET`, the query string is
/// malformed, or `response_type` / `client_id` is missing.
pub fn parse_authorization_request(
    method: &Method,
    uri: &Uri,
) -> OAuthResult<AuthorizationRequest> {
    if method != Method::GET {
        return Err(OAuthError::invalid_request(format!(
            "authorization requests should be {} requests",
            Method::GET
        ))
        .caused_by(ErrorReason::InvalidRequestMethod));
    }

    let query = Params::parse(uri.query().unwrap_or_default()).map_err(|err| {
        OAuthError::invalid_request(ErrorReason::CouldNotParseQueryString.to_string())
            .caused_by(ErrorReason::CouldNotParseQueryString.with_source(err))
    })?;

    let response_type = parse_space_separated(query.get(PARAM_RESPONSE_TYPE).unwrap_or_default());
    if response_type.is_empty() {
        return Err(OAuthError::missing_parameter(PARAM_RESPONSE_TYPE)
            .caused_by(ErrorReason::MissingResponseType));
    }

    let client_id = query.get_non_empty(PARAM_CLIENT_ID).ok_or_else(|| {
        OAuthError::missing_parameter(PARAM_CLIENT_ID).caused_by(ErrorReason::MissingClientId)
    })?;

    let code_challenge = query.get_non_empty(PARAM_CODE_CHALLENGE).map(str::to_string);
    // RFC 7636 section 4.3: the method defaults to plain.
    let code_challenge_method = query
        .get_non_empty(PARAM_CODE_CHALLENGE_METHOD)
        .map(str::to_string)
        .or_else(|| {
            code_challenge
                .as_ref()
                .map(|_| CODE_CHALLENGE_METHOD_PLAIN.to_string())
        });

    Ok(AuthorizationRequest {
        client_id: client_id.to_string(),
        redirect_uri: query.get_non_empty(PARAM_REDIRECT_URI).map(str::to_string),
        final_redirect_uri: None,
        state: query.get_non_empty(PARAM_STATE).map(str::to_string),
        code_challenge,
        code_challenge_method,
        scope: parse_space_separated(query.get(PARAM_SCOPE).unwrap_or_default()),
        response_type,
        query,
    })
}

// =============================================================================
// Response Type Handlers
// =============================================================================

/// Handles one response type (`code`, `id_token`, ...) at the authorization
/// endpoint.
///
/// Grants that also serve the authorization endpoint return themselves from
/// [`Grant::authorization_handler`](crate::oauth::Grant::authorization_handler).
#[async_trait]
pub trait AuthorizationHandler: Send + Sync {
    /// The response type this handler serves.
    fn response_type(&self) -> &str;

    /// Validates a request whose redirect URI has already been resolved.
    ///
    /// `pkce` is the server's configured verifier. By the time a `code`
    /// handler runs, any challenge method has already been checked against
    /// it; handlers that insist on PKCE pass it to
    /// [`validate_challenge_request`](crate::oauth::pkce::validate_challenge_request).
    ///
    /// Returning a boxed [`OAuthError`] keeps its code; any other error is
    /// reported as `server_error`.
    ///
    /// # Errors
    ///
    /// Returns an error if the request is not acceptable for this handler.
    async fn validate_authorization_request(
        &self,
        client: &dyn Client,
        request: &AuthorizationRequest,
        pkce: &dyn Pkce,
    ) -> Result<(), BoxError>;
}

// =============================================================================
// Failures
// =============================================================================

/// Why an authorization request failed, and where the error may be sent.
#[derive(Debug, thiserror::Error)]
pub enum AuthorizationFailure {
    /// Failed before the redirect URI was trusted. Render it to the resource
    /// owner; never redirect.
    #[error(transparent)]
    Direct(OAuthError),

    /// Failed after redirect URI resolution. May be delivered to
    /// `request.final_redirect_uri`.
    #[error("{error}")]
    Redirect {
        request: Box<AuthorizationRequest>,
        error: OAuthError,
    },
}

/// Errors building an error redirect.
#[derive(Debug, thiserror::Error)]
pub enum RedirectError {
    #[error("authorization failure is not redirectable")]
    NotRedirectable,

    #[error("invalid redirect URI: {0}")]
    InvalidUri(#[from] url::ParseError),
}

impl AuthorizationFailure {
    /// The underlying OAuth error.
    #[must_use]
    pub fn error(&self) -> &OAuthError {
        match self {
            Self::Direct(error) | Self::Redirect { error, .. } => error,
        }
    }

    /// Consumes the failure, returning the OAuth error.
    #[must_use]
    pub fn into_error(self) -> OAuthError {
        match self {
            Self::Direct(error) | Self::Redirect { error, .. } => error,
        }
    }

    /// The partially validated request, for redirectable failures.
    #[must_use]
    pub fn request(&self) -> Option<&AuthorizationRequest> {
        match self {
            Self::Direct(_) => None,
            Self::Redirect { request, .. } => Some(&**request),
        }
    }

    /// Returns `true` if the error may be delivered by redirect.
    #[must_use]
    pub fn is_redirectable(&self) -> bool {
        matches!(self, Self::Redirect { .. })
    }

    /// Builds the error redirect: the final redirect URI with `error`,
    /// `error_description`, `error_uri` and `state` appended to its query.
    ///
    /// # Errors
    ///
    /// Returns `RedirectError::NotRedirectable` for direct failures and
    /// `RedirectError::InvalidUri` if the final redirect URI does not parse.
    pub fn redirect_url(&self) -> Result<Url, RedirectError> {
        let Self::Redirect { request, error } = self else {
            return Err(RedirectError::NotRedirectable);
        };
        let final_uri = request
            .final_redirect_uri
            .as_deref()
            .ok_or(RedirectError::NotRedirectable)?;

        let mut url = Url::parse(final_uri)?;
        {
            let mut query = url.query_pairs_mut();
            query.append_pair("error", error.code.as_str());
            if let Some(description) = error.description() {
                query.append_pair("error_description", description);
            }
            if let Some(uri) = &error.uri {
                query.append_pair("error_uri", uri);
            }
            if let Some(state) = &request.state {
                query.append_pair(PARAM_STATE, state);
            }
        }
        Ok(url)
    }
}
