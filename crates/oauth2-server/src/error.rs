//! OAuth 2.0 error types.
//!
//! Every failure surfaced by this crate is an [`OAuthError`]: an RFC 6749
//! error code with an optional description, error URI, HTTP status hint and
//! underlying cause. Causes are kept for diagnostics only; they never appear
//! in the serialized error object.

use std::error::Error as StdError;
use std::fmt;

use serde::Serialize;

/// Boxed error type used at collaborator seams (repositories, grants, handlers).
pub type BoxError = Box<dyn StdError + Send + Sync + 'static>;

// =============================================================================
// Error Codes
// =============================================================================

/// OAuth 2.0 error codes (RFC 6749 sections 4.1.2.1 and 5.2).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCode {
    /// Missing or malformed parameter, or wrong HTTP method.
    InvalidRequest,
    /// Client unknown, failed authentication, or bad redirect URI.
    InvalidClient,
    /// Authorization grant or refresh token is invalid.
    InvalidGrant,
    /// Client is not entitled to the requested response or grant type.
    UnauthorizedClient,
    /// The resource owner or the server denied the request.
    AccessDenied,
    /// No handler is registered for a requested response type.
    UnsupportedResponseType,
    /// No grant is registered for the requested grant type.
    UnsupportedGrantType,
    /// One or more requested scopes are not acceptable.
    InvalidScope,
    /// Catch-all for unexpected failures.
    ServerError,
    /// The server is overloaded or under maintenance.
    TemporarilyUnavailable,
}

impl ErrorCode {
    /// Returns the wire representation of the error code.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::InvalidRequest => "invalid_request",
            Self::InvalidClient => "invalid_client",
            Self::InvalidGrant => "invalid_grant",
            Self::UnauthorizedClient => "unauthorized_client",
            Self::AccessDenied => "access_denied",
            Self::UnsupportedResponseType => "unsupported_response_type",
            Self::UnsupportedGrantType => "unsupported_grant_type",
            Self::InvalidScope => "invalid_scope",
            Self::ServerError => "server_error",
            Self::TemporarilyUnavailable => "temporarily_unavailable",
        }
    }

    /// HTTP status used when an error carries no explicit status hint.
    #[must_use]
    pub fn default_status(&self) -> u16 {
        match self {
            Self::InvalidClient => 401,
            Self::ServerError => 500,
            Self::TemporarilyUnavailable => 503,
            _ => 400,
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// =============================================================================
// Error Reasons
// =============================================================================

/// Well-known underlying causes attached to [`OAuthError`]s.
///
/// Callers match on these with [`OAuthError::has_reason`] instead of parsing
/// descriptions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, thiserror::Error)]
pub enum ErrorReason {
    #[error("invalid request method")]
    InvalidRequestMethod,

    #[error("could not parse request body")]
    CouldNotParseRequestBody,

    #[error("could not parse query string")]
    CouldNotParseQueryString,

    #[error("missing grant_type in request body")]
    MissingGrantType,

    #[error("client_id was not included in the request")]
    MissingClientId,

    #[error("client_secret was not included in the request")]
    MissingClientSecret,

    #[error("response_type was not included in the request")]
    MissingResponseType,

    #[error("client not found")]
    ClientNotFound,

    #[error("client does not have any redirect URIs")]
    ClientHasNoRedirectUris,

    #[error("the client has more than one redirect URI and redirect_uri must be included in the request")]
    ClientRequiresRedirectUri,

    #[error("redirect_uri in request was not valid for the client")]
    ClientInvalidRedirectUri,

    #[error("client secret did not match")]
    InvalidClientSecret,

    #[error("grant type is not allowed for the client")]
    GrantTypeNotAllowed,

    #[error("code challenge method not supported")]
    UnsupportedCodeChallengeMethod,
}

impl ErrorReason {
    /// Pairs this reason with the lower-level error that triggered it.
    #[must_use]
    pub fn with_source(self, source: impl Into<BoxError>) -> ReasonError {
        ReasonError {
            reason: self,
            source: source.into(),
        }
    }
}

/// An [`ErrorReason`] together with the error that produced it.
#[derive(Debug, thiserror::Error)]
#[error("{reason}: {source}")]
pub struct ReasonError {
    /// The well-known reason.
    pub reason: ErrorReason,
    /// The lower-level failure.
    pub source: BoxError,
}

// =============================================================================
// OAuth Error
// =============================================================================

/// An OAuth 2.0 error as defined by RFC 6749.
///
/// Serializes to the RFC error object `{error, error_description?, error_uri?}`.
/// The status hint and the cause are never serialized.
#[derive(Debug, Serialize)]
pub struct OAuthError {
    /// RFC 6749 error code.
    #[serde(rename = "error")]
    pub code: ErrorCode,

    /// Human-readable description shown to the caller.
    #[serde(rename = "error_description", skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// URI of a page with more information about the error.
    #[serde(rename = "error_uri", skip_serializing_if = "Option::is_none")]
    pub uri: Option<String>,

    /// Explicit HTTP status, overriding [`ErrorCode::default_status`].
    #[serde(skip)]
    pub status_code: Option<u16>,

    #[serde(skip)]
    cause: Option<BoxError>,
}

impl OAuthError {
    /// Creates an error with only a code.
    #[must_use]
    pub fn new(code: ErrorCode) -> Self {
        Self {
            code,
            description: None,
            uri: None,
            status_code: None,
            cause: None,
        }
    }

    /// Creates an error with a code and description.
    #[must_use]
    pub fn with_description(code: ErrorCode, description: impl Into<String>) -> Self {
        Self {
            description: Some(description.into()),
            ..Self::new(code)
        }
    }

    /// Attaches an underlying cause.
    #[must_use]
    pub fn caused_by(mut self, cause: impl Into<BoxError>) -> Self {
        self.cause = Some(cause.into());
        self
    }

    /// Attaches an error URI.
    #[must_use]
    pub fn with_uri(mut self, uri: impl Into<String>) -> Self {
        self.uri = Some(uri.into());
        self
    }

    /// Attaches an explicit HTTP status hint.
    #[must_use]
    pub fn with_status(mut self, status: u16) -> Self {
        self.status_code = Some(status);
        self
    }

    // -------------------------------------------------------------------------
    // Constructor Methods
    // -------------------------------------------------------------------------

    /// Creates an `invalid_request` error.
    #[must_use]
    pub fn invalid_request(description: impl Into<String>) -> Self {
        Self::with_description(ErrorCode::InvalidRequest, description)
    }

    /// Creates an `invalid_request` error naming a missing parameter.
    #[must_use]
    pub fn missing_parameter(name: &str) -> Self {
        Self::invalid_request(format!("request is missing the {name} parameter"))
    }

    /// Creates an `invalid_client` error.
    #[must_use]
    pub fn invalid_client(description: impl Into<String>) -> Self {
        Self::with_description(ErrorCode::InvalidClient, description)
    }

    /// Creates an `unauthorized_client` error.
    #[must_use]
    pub fn unauthorized_client(reason: impl Into<String>) -> Self {
        Self::with_description(ErrorCode::UnauthorizedClient, reason)
    }

    /// Creates an `access_denied` error.
    #[must_use]
    pub fn access_denied(reason: impl Into<String>) -> Self {
        Self::with_description(ErrorCode::AccessDenied, reason)
    }

    /// Creates an `invalid_scope` error listing every rejected scope.
    #[must_use]
    pub fn invalid_scope<S: AsRef<str>>(invalid_scopes: &[S]) -> Self {
        Self::with_description(
            ErrorCode::InvalidScope,
            format!("invalid scopes: {}", join(invalid_scopes)),
        )
    }

    /// Creates an `unsupported_response_type` error listing every unsupported type.
    #[must_use]
    pub fn unsupported_response_type<S: AsRef<str>>(invalid_types: &[S]) -> Self {
        Self::with_description(
            ErrorCode::UnsupportedResponseType,
            format!("unsupported response types: {}", join(invalid_types)),
        )
    }

    /// Creates an `unsupported_grant_type` error.
    #[must_use]
    pub fn unsupported_grant_type(grant_type: &str) -> Self {
        Self::with_description(
            ErrorCode::UnsupportedGrantType,
            format!("the {grant_type} grant type is not supported"),
        )
    }

    /// Creates a `server_error` wrapping an unexpected failure.
    ///
    /// The cause is kept for diagnostics; no description is set so nothing
    /// about it reaches the caller.
    #[must_use]
    pub fn server_error(cause: impl Into<BoxError>) -> Self {
        Self::new(ErrorCode::ServerError).caused_by(cause)
    }

    // -------------------------------------------------------------------------
    // Accessors
    // -------------------------------------------------------------------------

    /// Returns the description, if any.
    #[must_use]
    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    /// Returns the directly attached cause, if any.
    #[must_use]
    pub fn cause(&self) -> Option<&(dyn StdError + Send + Sync + 'static)> {
        self.cause.as_deref()
    }

    /// HTTP status for this error: the explicit hint or the code's default.
    #[must_use]
    pub fn status(&self) -> u16 {
        self.status_code.unwrap_or_else(|| self.code.default_status())
    }

    /// Returns `true` if this is a `server_error`.
    #[must_use]
    pub fn is_server_error(&self) -> bool {
        self.code == ErrorCode::ServerError
    }

    /// Returns `true` if `reason` appears anywhere in the cause chain.
    #[must_use]
    pub fn has_reason(&self, reason: ErrorReason) -> bool {
        self.chain().any(|err| {
            err.downcast_ref::<ErrorReason>() == Some(&reason)
                || err
                    .downcast_ref::<ReasonError>()
                    .is_some_and(|e| e.reason == reason)
        })
    }

    /// Finds the first error of type `T` in the cause chain.
    #[must_use]
    pub fn find_cause<T: StdError + 'static>(&self) -> Option<&T> {
        self.chain().find_map(|err| err.downcast_ref::<T>())
    }

    fn chain(&self) -> impl Iterator<Item = &(dyn StdError + 'static)> {
        std::iter::successors(self.source(), |&err| err.source())
    }
}

impl fmt::Display for OAuthError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.description {
            Some(description) => write!(f, "{}: {}", self.code, description)?,
            None => write!(f, "{}", self.code)?,
        }
        if let Some(cause) = &self.cause {
            write!(f, " caused by {cause}")?;
        }
        Ok(())
    }
}

impl StdError for OAuthError {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        self.cause
            .as_ref()
            .map(|cause| cause.as_ref() as &(dyn StdError + 'static))
    }
}

// =============================================================================
// Normalization
// =============================================================================

/// Normalizes a collaborator failure into an [`OAuthError`].
///
/// An error that already is an `OAuthError` is returned unchanged; anything
/// else becomes a `server_error` that keeps the original as its cause.
#[must_use]
pub fn into_oauth_error(err: BoxError) -> OAuthError {
    match err.downcast::<OAuthError>() {
        Ok(oauth) => *oauth,
        Err(other) => OAuthError::server_error(other),
    }
}

/// Optional variant of [`into_oauth_error`]: `None` stays `None`.
#[must_use]
pub fn maybe_wrap_error(err: Option<BoxError>) -> Option<OAuthError> {
    err.map(into_oauth_error)
}

fn join<S: AsRef<str>>(values: &[S]) -> String {
    values
        .iter()
        .map(AsRef::as_ref)
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, thiserror::Error)]
    #[error("disk on fire")]
    struct DiskOnFire;

    #[test]
    fn test_error_display() {
        assert_eq!(
            OAuthError::new(ErrorCode::ServerError).to_string(),
            "server_error"
        );
        assert_eq!(
            OAuthError::invalid_request("bad things").to_string(),
            "invalid_request: bad things"
        );
        assert_eq!(
            OAuthError::invalid_client("nope")
                .caused_by(ErrorReason::ClientNotFound)
                .to_string(),
            "invalid_client: nope caused by client not found"
        );
    }

    #[test]
    fn test_missing_parameter_names_parameter() {
        let err = OAuthError::missing_parameter("redirect_uri");
        assert_eq!(err.code, ErrorCode::InvalidRequest);
        assert_eq!(
            err.description(),
            Some("request is missing the redirect_uri parameter")
        );
    }

    #[test]
    fn test_list_descriptions_keep_order() {
        let err = OAuthError::invalid_scope(&["b", "a"]);
        assert_eq!(err.description(), Some("invalid scopes: b a"));

        let err = OAuthError::unsupported_response_type(&["id_token", "token"]);
        assert_eq!(
            err.description(),
            Some("unsupported response types: id_token token")
        );
    }

    #[test]
    fn test_maybe_wrap_none() {
        assert!(maybe_wrap_error(None).is_none());
    }

    #[test]
    fn test_maybe_wrap_typed_error_is_unchanged() {
        let original = OAuthError::invalid_client("custom").caused_by(DiskOnFire);
        let cause_ptr = original.cause().map(|c| c as *const _ as *const ());

        let wrapped = maybe_wrap_error(Some(Box::new(original))).unwrap();

        assert_eq!(wrapped.code, ErrorCode::InvalidClient);
        assert_eq!(wrapped.description(), Some("custom"));
        assert_eq!(
            wrapped.cause().map(|c| c as *const _ as *const ()),
            cause_ptr
        );
    }

    #[test]
    fn test_maybe_wrap_generic_error_becomes_server_error() {
        let wrapped = maybe_wrap_error(Some(Box::new(DiskOnFire))).unwrap();

        assert!(wrapped.is_server_error());
        assert!(wrapped.description().is_none());
        assert!(wrapped.find_cause::<DiskOnFire>().is_some());
    }

    #[test]
    fn test_has_reason_walks_chain() {
        let err = OAuthError::invalid_request("could not parse query string").caused_by(
            ErrorReason::CouldNotParseQueryString.with_source(DiskOnFire),
        );

        assert!(err.has_reason(ErrorReason::CouldNotParseQueryString));
        assert!(!err.has_reason(ErrorReason::CouldNotParseRequestBody));
        assert!(err.find_cause::<DiskOnFire>().is_some());
    }

    #[test]
    fn test_has_reason_through_nested_oauth_error() {
        let inner = OAuthError::invalid_client("x").caused_by(ErrorReason::ClientNotFound);
        let outer = OAuthError::server_error(inner);

        assert!(outer.has_reason(ErrorReason::ClientNotFound));
        assert!(outer.find_cause::<OAuthError>().is_some());
    }

    #[test]
    fn test_cause_chain_reaches_innermost_error() {
        let inner = OAuthError::invalid_client("x")
            .caused_by(ErrorReason::ClientNotFound.with_source(DiskOnFire));
        let outer = OAuthError::server_error(inner);

        assert!(outer.has_reason(ErrorReason::ClientNotFound));
        assert!(outer.find_cause::<ReasonError>().is_some());
        assert!(outer.find_cause::<DiskOnFire>().is_some());
        assert!(!outer.has_reason(ErrorReason::ClientHasNoRedirectUris));
    }

    #[test]
    fn test_status_hint_and_defaults() {
        assert_eq!(OAuthError::invalid_request("x").status(), 400);
        assert_eq!(OAuthError::invalid_client("x").status(), 401);
        assert_eq!(OAuthError::server_error(DiskOnFire).status(), 500);
        assert_eq!(
            OAuthError::invalid_request("x").with_status(405).status(),
            405
        );
    }

    #[test]
    fn test_serialize_hides_cause_and_status() {
        let err = OAuthError::invalid_scope(&["admin"])
            .with_uri("https://docs.example.com/scopes")
            .with_status(403)
            .caused_by(DiskOnFire);

        let json = serde_json::to_value(&err).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "error": "invalid_scope",
                "error_description": "invalid scopes: admin",
                "error_uri": "https://docs.example.com/scopes",
            })
        );
    }

    #[test]
    fn test_server_error_serializes_without_description() {
        let json = serde_json::to_value(OAuthError::server_error(DiskOnFire)).unwrap();
        assert_eq!(json, serde_json::json!({ "error": "server_error" }));
    }
}
