//! Authorization server.
//!
//! Coordinates authorization request validation and dispatches token
//! requests to grants. The server is immutable once built and can be shared
//! across tasks behind an `Arc`.
//!
//! # Usage
//!
//! ```ignore
//! use oauth2_server::oauth::AuthorizationServer;
//!
//! let server = AuthorizationServer::builder(clients)
//!     .with_grant(AuthorizationCodeGrant::new(codes))
//!     .with_scope_validator(AllowScopes::new(["openid", "profile"]))
//!     .build();
//!
//! match server.validate_authorization_request(&method, &uri).await {
//!     Ok(request) => show_consent(request),
//!     Err(failure) => failure.into_response(),
//! }
//! ```

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use axum::http::{HeaderMap, Method, Uri};

use crate::OAuthResult;
use crate::config::{ConfigError, OAuthConfig};
use crate::error::{BoxError, OAuthError, into_oauth_error};
use crate::oauth::authorize::{
    AuthorizationFailure, AuthorizationHandler, AuthorizationRequest, RESPONSE_TYPE_CODE,
    parse_authorization_request,
};
use crate::oauth::pkce::{Pkce, PkceError, default_pkce, validate_challenge_request};
use crate::oauth::redirect_uri::resolve_redirect_uri;
use crate::oauth::scope::{AllowAllScopes, AllowScopes, ScopeValidator};
use crate::oauth::token::{AccessTokenResponse, Grant, parse_access_token_request};
use crate::storage::{ClientRepository, get_client};
use crate::types::Client;

// =============================================================================
// Builder
// =============================================================================

/// Builds an [`AuthorizationServer`].
///
/// Grants and handlers are keyed by grant type and response type; registering
/// a second one under the same key replaces the first.
pub struct AuthorizationServerBuilder {
    clients: Arc<dyn ClientRepository>,
    scope_validator: Arc<dyn ScopeValidator>,
    pkce: Arc<dyn Pkce>,
    grants: HashMap<String, Arc<dyn Grant>>,
    authorization_handlers: HashMap<String, Arc<dyn AuthorizationHandler>>,
}

impl AuthorizationServerBuilder {
    fn new(clients: Arc<dyn ClientRepository>) -> Self {
        Self {
            clients,
            scope_validator: Arc::new(AllowAllScopes),
            pkce: Arc::new(default_pkce(Vec::new())),
            grants: HashMap::new(),
            authorization_handlers: HashMap::new(),
        }
    }

    /// Registers a grant.
    ///
    /// A grant that is also a response type handler (see
    /// [`Grant::authorization_handler`]) is registered as one too.
    #[must_use]
    pub fn with_grant<G: Grant + 'static>(self, grant: G) -> Self {
        self.with_shared_grant(Arc::new(grant))
    }

    /// Registers an already shared grant.
    #[must_use]
    pub fn with_shared_grant<G: Grant + 'static>(mut self, grant: Arc<G>) -> Self {
        if let Some(handler) = Arc::clone(&grant).authorization_handler() {
            self.authorization_handlers
                .insert(handler.response_type().to_string(), handler);
        }
        self.grants.insert(grant.grant_type().to_string(), grant);
        self
    }

    /// Registers a response type handler.
    #[must_use]
    pub fn with_authorization_handler<H: AuthorizationHandler + 'static>(
        mut self,
        handler: H,
    ) -> Self {
        self.authorization_handlers
            .insert(handler.response_type().to_string(), Arc::new(handler));
        self
    }

    /// Replaces the scope policy. Default: [`AllowAllScopes`].
    #[must_use]
    pub fn with_scope_validator<S: ScopeValidator + 'static>(mut self, validator: S) -> Self {
        self.scope_validator = Arc::new(validator);
        self
    }

    /// Replaces the PKCE verifier. Default: [`default_pkce`] with no extras.
    #[must_use]
    pub fn with_pkce<P: Pkce + 'static>(mut self, pkce: P) -> Self {
        self.pkce = Arc::new(pkce);
        self
    }

    /// Applies declarative configuration.
    ///
    /// A non-empty `allowed_scopes` installs an [`AllowScopes`] policy and
    /// `pkce_methods` restricts the built-in verifiers.
    ///
    /// # Errors
    ///
    /// Returns any error from [`OAuthConfig::validate`].
    pub fn with_config(mut self, config: &OAuthConfig) -> Result<Self, ConfigError> {
        config.validate()?;

        if !config.allowed_scopes.is_empty() {
            self.scope_validator =
                Arc::new(AllowScopes::new(config.allowed_scopes.iter().cloned()));
        }
        self.pkce = Arc::new(default_pkce(Vec::new()).retain_methods(&config.pkce_methods));

        Ok(self)
    }

    /// Finishes the server.
    #[must_use]
    pub fn build(self) -> AuthorizationServer {
        AuthorizationServer {
            clients: self.clients,
            scope_validator: self.scope_validator,
            pkce: self.pkce,
            grants: self.grants,
            authorization_handlers: self.authorization_handlers,
        }
    }
}

// =============================================================================
// Authorization Server
// =============================================================================

/// The OAuth 2.0 authorization server core.
pub struct AuthorizationServer {
    clients: Arc<dyn ClientRepository>,
    scope_validator: Arc<dyn ScopeValidator>,
    pkce: Arc<dyn Pkce>,
    grants: HashMap<String, Arc<dyn Grant>>,
    authorization_handlers: HashMap<String, Arc<dyn AuthorizationHandler>>,
}

impl fmt::Debug for AuthorizationServer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut grants: Vec<_> = self.grants.keys().collect();
        grants.sort();
        let mut response_types: Vec<_> = self.authorization_handlers.keys().collect();
        response_types.sort();

        f.debug_struct("AuthorizationServer")
            .field("grants", &grants)
            .field("response_types", &response_types)
            .field("pkce", &self.pkce)
            .finish_non_exhaustive()
    }
}

impl AuthorizationServer {
    /// Starts building a server over `clients`.
    #[must_use]
    pub fn builder(clients: Arc<dyn ClientRepository>) -> AuthorizationServerBuilder {
        AuthorizationServerBuilder::new(clients)
    }

    /// The configured PKCE verifier, for grants redeeming codes.
    #[must_use]
    pub fn pkce(&self) -> &dyn Pkce {
        self.pkce.as_ref()
    }

    /// Registered grant types, sorted.
    #[must_use]
    pub fn grant_types(&self) -> Vec<&str> {
        let mut types: Vec<&str> = self.grants.keys().map(String::as_str).collect();
        types.sort_unstable();
        types
    }

    /// Registered response types, sorted.
    #[must_use]
    pub fn response_types(&self) -> Vec<&str> {
        let mut types: Vec<&str> = self
            .authorization_handlers
            .keys()
            .map(String::as_str)
            .collect();
        types.sort_unstable();
        types
    }

    // -------------------------------------------------------------------------
    // Authorization Endpoint
    // -------------------------------------------------------------------------

    /// Parses and validates an authorization request.
    ///
    /// Checks run in a fixed order: parsing, client lookup and redirect URI
    /// resolution fail with [`AuthorizationFailure::Direct`]. Only after the
    /// redirect URI is resolved do the response type, scope, code challenge
    /// method and handler checks run, and those fail with
    /// [`AuthorizationFailure::Redirect`]. Code challenge methods are checked
    /// against the configured PKCE verifier whenever `code` is requested.
    ///
    /// On success the returned request carries its `final_redirect_uri` and is
    /// ready for the consent step.
    ///
    /// # Errors
    ///
    /// Returns the first failing check as described above.
    pub async fn validate_authorization_request(
        &self,
        method: &Method,
        uri: &Uri,
    ) -> Result<AuthorizationRequest, AuthorizationFailure> {
        let mut request = parse_authorization_request(method, uri).map_err(|error| {
            tracing::warn!(
                error_code = %error.code,
                error = %error,
                "Malformed authorization request"
            );
            AuthorizationFailure::Direct(error)
        })?;

        let client_id = request.client_id.clone();
        let direct = |error: OAuthError| {
            tracing::warn!(
                client_id = %client_id,
                error_code = %error.code,
                error = %error,
                "Authorization request rejected before redirect URI resolution"
            );
            AuthorizationFailure::Direct(error)
        };

        let client = get_client(self.clients.as_ref(), &request.client_id)
            .await
            .map_err(direct)?;

        let final_redirect_uri =
            resolve_redirect_uri(client.as_ref(), request.requested_redirect_uri())
                .map_err(direct)?;
        request.final_redirect_uri = Some(final_redirect_uri);

        // The redirect URI is trusted from here on; failures may be redirected.
        if let Err(error) = self.check_resolved_request(client.as_ref(), &request).await {
            tracing::warn!(
                client_id = %request.client_id,
                error_code = %error.code,
                error = %error,
                "Authorization request rejected"
            );
            return Err(AuthorizationFailure::Redirect {
                request: Box::new(request),
                error,
            });
        }

        tracing::debug!(
            client_id = %request.client_id,
            response_type = %request.response_type.join(" "),
            "Authorization request validated"
        );
        Ok(request)
    }

    async fn check_resolved_request(
        &self,
        client: &dyn Client,
        request: &AuthorizationRequest,
    ) -> OAuthResult<()> {
        self.check_response_types(client, &request.response_type)?;

        self.scope_validator
            .validate_scopes(&request.scope)
            .map_err(normalize)?;

        // Codes are only issued for challenge methods this server can redeem.
        if request.has_response_type(RESPONSE_TYPE_CODE) {
            validate_challenge_request(self.pkce.as_ref(), request, false)?;
        }

        for response_type in &request.response_type {
            if let Some(handler) = self.authorization_handlers.get(response_type) {
                handler
                    .validate_authorization_request(client, request, self.pkce.as_ref())
                    .await
                    .map_err(normalize)?;
            }
        }

        Ok(())
    }

    fn check_response_types(&self, client: &dyn Client, requested: &[String]) -> OAuthResult<()> {
        let unsupported: Vec<&str> = requested
            .iter()
            .map(String::as_str)
            .filter(|t| !self.authorization_handlers.contains_key(*t))
            .collect();

        if !unsupported.is_empty() {
            return Err(OAuthError::unsupported_response_type(&unsupported));
        }

        if let Some(policy) = client.response_type_policy()
            && !policy.allows_response_type(requested)
        {
            return Err(OAuthError::unauthorized_client(format!(
                "client {} does not support response type: {}",
                client.id(),
                requested.join(" ")
            )));
        }

        Ok(())
    }

    /// Denies a validated authorization request with `access_denied`.
    ///
    /// Used when the resource owner refuses consent or the server declines
    /// to serve the request. The result is redirectable when the request's
    /// redirect URI was resolved.
    #[must_use]
    pub fn deny_authorization_request(
        &self,
        request: AuthorizationRequest,
        reason: impl Into<String>,
    ) -> AuthorizationFailure {
        let error = OAuthError::access_denied(reason);
        tracing::debug!(client_id = %request.client_id, "Authorization request denied");

        if request.final_redirect_uri.is_some() {
            AuthorizationFailure::Redirect {
                request: Box::new(request),
                error,
            }
        } else {
            AuthorizationFailure::Direct(error)
        }
    }

    // -------------------------------------------------------------------------
    // Token Endpoint
    // -------------------------------------------------------------------------

    /// Handles a token request by dispatching it to the grant registered for
    /// its `grant_type`.
    ///
    /// # Errors
    ///
    /// - `invalid_request` if the request does not parse
    /// - `unsupported_grant_type` if no grant is registered for the type
    /// - whatever the grant returns; untyped grant errors become
    ///   `server_error` without a description
    pub async fn token(
        &self,
        method: &Method,
        headers: &HeaderMap,
        body: &[u8],
    ) -> OAuthResult<AccessTokenResponse> {
        let request = parse_access_token_request(method, headers, body).inspect_err(|error| {
            tracing::warn!(error_code = %error.code, error = %error, "Malformed token request");
        })?;

        let Some(grant) = self.grants.get(&request.grant_type) else {
            tracing::warn!(grant_type = %request.grant_type, "Unsupported grant type");
            return Err(OAuthError::unsupported_grant_type(&request.grant_type));
        };

        match grant.token(&request, self.pkce.as_ref()).await {
            Ok(response) => {
                tracing::debug!(grant_type = %request.grant_type, "Token issued");
                Ok(response)
            }
            Err(err) => {
                let error = normalize(err);
                tracing::warn!(
                    grant_type = %request.grant_type,
                    error_code = %error.code,
                    "Token request rejected"
                );
                Err(error)
            }
        }
    }

    /// Verifies a PKCE code verifier with the configured verifier.
    ///
    /// # Errors
    ///
    /// Returns `PkceError::UnsupportedMethod` if `method` is not enabled.
    pub fn verify_code_challenge(
        &self,
        method: &str,
        challenge: &str,
        verifier: &str,
    ) -> Result<bool, PkceError> {
        self.pkce.verify_code_challenge(method, challenge, verifier)
    }
}

/// Normalizes a collaborator error, logging the cause of anything that turns
/// into `server_error`.
fn normalize(err: BoxError) -> OAuthError {
    let error = into_oauth_error(err);
    if error.is_server_error()
        && let Some(cause) = error.cause()
    {
        tracing::error!(error = %cause, "Collaborator failed");
    }
    error
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use async_trait::async_trait;

    use super::*;
    use crate::error::{ErrorCode, ErrorReason};
    use crate::oauth::token::AccessTokenRequest;
    use crate::params::PARAM_CODE_VERIFIER;
    use crate::storage::InMemoryClientRepository;
    use crate::types::{AllowsResponseType, SimpleClient};

    #[derive(Debug, thiserror::Error)]
    #[error("database unavailable")]
    struct DatabaseUnavailable;

    /// Records every request it validates.
    #[derive(Default)]
    struct SpyHandler {
        response_type: &'static str,
        fail_with: Option<fn() -> BoxError>,
        seen: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl AuthorizationHandler for SpyHandler {
        fn response_type(&self) -> &str {
            self.response_type
        }

        async fn validate_authorization_request(
            &self,
            _client: &dyn Client,
            request: &AuthorizationRequest,
            _pkce: &dyn Pkce,
        ) -> Result<(), BoxError> {
            self.seen.lock().unwrap().push(request.client_id.clone());
            match self.fail_with {
                Some(make) => Err(make()),
                None => Ok(()),
            }
        }
    }

    fn handler(response_type: &'static str) -> SpyHandler {
        SpyHandler {
            response_type,
            ..SpyHandler::default()
        }
    }

    struct StaticGrant {
        grant_type: &'static str,
        result: fn() -> Result<AccessTokenResponse, BoxError>,
    }

    #[async_trait]
    impl Grant for StaticGrant {
        fn grant_type(&self) -> &str {
            self.grant_type
        }

        async fn token(
            &self,
            _request: &AccessTokenRequest,
            _pkce: &dyn Pkce,
        ) -> Result<AccessTokenResponse, BoxError> {
            (self.result)()
        }
    }

    /// A grant that doubles as the `code` response type handler. Redeems
    /// `code=<challenge>` requests against the server's PKCE verifier.
    struct CodeGrant;

    #[async_trait]
    impl Grant for CodeGrant {
        fn grant_type(&self) -> &str {
            "authorization_code"
        }

        async fn token(
            &self,
            request: &AccessTokenRequest,
            pkce: &dyn Pkce,
        ) -> Result<AccessTokenResponse, BoxError> {
            if let Some(challenge) = request.param("code") {
                let method = request.param_or_error("code_challenge_method")?;
                let verifier = request.param_or_error(PARAM_CODE_VERIFIER)?;
                if !pkce
                    .verify_code_challenge(method, challenge, verifier)
                    .unwrap_or(false)
                {
                    return Err(Box::new(OAuthError::new(ErrorCode::InvalidGrant)));
                }
            }
            Ok(AccessTokenResponse::bearer("from-code"))
        }

        fn authorization_handler(self: Arc<Self>) -> Option<Arc<dyn AuthorizationHandler>> {
            Some(self)
        }
    }

    #[async_trait]
    impl AuthorizationHandler for CodeGrant {
        fn response_type(&self) -> &str {
            "code"
        }

        async fn validate_authorization_request(
            &self,
            _client: &dyn Client,
            _request: &AuthorizationRequest,
            _pkce: &dyn Pkce,
        ) -> Result<(), BoxError> {
            Ok(())
        }
    }

    #[derive(Debug)]
    struct CodeOnlyClient(SimpleClient);

    impl AllowsResponseType for CodeOnlyClient {
        fn allows_response_type(&self, response_types: &[String]) -> bool {
            response_types.iter().all(|t| t == "code")
        }
    }

    impl Client for CodeOnlyClient {
        fn id(&self) -> &str {
            self.0.id()
        }
        fn secret(&self) -> &str {
            self.0.secret()
        }
        fn is_confidential(&self) -> bool {
            self.0.is_confidential()
        }
        fn redirect_uris(&self) -> &[String] {
            self.0.redirect_uris()
        }
        fn response_type_policy(&self) -> Option<&dyn AllowsResponseType> {
            Some(self)
        }
    }

    fn repository() -> Arc<InMemoryClientRepository> {
        let repo = InMemoryClientRepository::new();
        repo.add(SimpleClient::public(
            "app",
            vec!["https://app.example.com/cb".to_string()],
        ));
        repo.add(CodeOnlyClient(SimpleClient::public(
            "code-only",
            vec!["https://code.example.com/cb".to_string()],
        )));
        Arc::new(repo)
    }

    fn uri(query: &str) -> Uri {
        format!("/authorize?{query}").parse().unwrap()
    }

    async fn validate(
        server: &AuthorizationServer,
        query: &str,
    ) -> Result<AuthorizationRequest, AuthorizationFailure> {
        server
            .validate_authorization_request(&Method::GET, &uri(query))
            .await
    }

    #[tokio::test]
    async fn test_valid_request_resolves_redirect_uri() {
        let server = AuthorizationServer::builder(repository())
            .with_authorization_handler(handler("code"))
            .build();

        let request = validate(&server, "client_id=app&response_type=code&state=s")
            .await
            .unwrap();

        assert_eq!(
            request.final_redirect_uri.as_deref(),
            Some("https://app.example.com/cb")
        );
        assert_eq!(request.state.as_deref(), Some("s"));
    }

    #[tokio::test]
    async fn test_unknown_client_is_direct() {
        let server = AuthorizationServer::builder(repository())
            .with_authorization_handler(handler("code"))
            .build();

        let failure = validate(&server, "client_id=ghost&response_type=code")
            .await
            .unwrap_err();

        assert!(!failure.is_redirectable());
        assert_eq!(failure.error().code, ErrorCode::InvalidClient);
    }

    #[tokio::test]
    async fn test_repository_error_is_direct_server_error() {
        let repo = repository();
        repo.set_error("app", DatabaseUnavailable);
        let server = AuthorizationServer::builder(repo).build();

        let failure = validate(&server, "client_id=app&response_type=code")
            .await
            .unwrap_err();

        assert!(!failure.is_redirectable());
        assert!(failure.error().is_server_error());
        assert!(failure.error().find_cause::<DatabaseUnavailable>().is_some());
    }

    #[tokio::test]
    async fn test_bad_redirect_uri_is_never_redirected() {
        let server = AuthorizationServer::builder(repository()).build();

        // No handler for `token` either; the redirect URI check must win.
        let failure = validate(
            &server,
            "client_id=app&response_type=token&redirect_uri=https%3A%2F%2Fevil.example.com%2Fcb",
        )
        .await
        .unwrap_err();

        assert!(!failure.is_redirectable());
        assert!(failure.error().has_reason(ErrorReason::ClientInvalidRedirectUri));
    }

    #[tokio::test]
    async fn test_unsupported_response_types_are_all_listed() {
        let server = AuthorizationServer::builder(repository())
            .with_authorization_handler(handler("code"))
            .build();

        let failure = validate(&server, "client_id=app&response_type=token+code+id_token")
            .await
            .unwrap_err();

        assert!(failure.is_redirectable());
        assert_eq!(failure.error().code, ErrorCode::UnsupportedResponseType);
        assert_eq!(
            failure.error().description(),
            Some("unsupported response types: token id_token")
        );
        assert_eq!(
            failure.request().and_then(|r| r.final_redirect_uri.as_deref()),
            Some("https://app.example.com/cb")
        );
    }

    #[tokio::test]
    async fn test_client_response_type_allow_list() {
        let server = AuthorizationServer::builder(repository())
            .with_authorization_handler(handler("code"))
            .with_authorization_handler(handler("id_token"))
            .build();

        assert!(
            validate(&server, "client_id=code-only&response_type=code")
                .await
                .is_ok()
        );

        let failure = validate(&server, "client_id=code-only&response_type=code+id_token")
            .await
            .unwrap_err();
        assert!(failure.is_redirectable());
        assert_eq!(failure.error().code, ErrorCode::UnauthorizedClient);
        assert_eq!(
            failure.error().description(),
            Some("client code-only does not support response type: code id_token")
        );
    }

    #[tokio::test]
    async fn test_scope_failure_is_redirectable_and_skips_handlers() {
        let spy = Arc::new(handler("code"));
        let server = AuthorizationServer::builder(repository())
            .with_authorization_handler(SharedHandler(Arc::clone(&spy)))
            .with_scope_validator(AllowScopes::new(["openid"]))
            .build();

        let failure = validate(&server, "client_id=app&response_type=code&scope=openid+admin")
            .await
            .unwrap_err();

        assert!(failure.is_redirectable());
        assert_eq!(failure.error().code, ErrorCode::InvalidScope);
        assert_eq!(failure.error().description(), Some("invalid scopes: admin"));
        assert!(spy.seen.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_handler_errors_are_normalized() {
        let server = AuthorizationServer::builder(repository())
            .with_authorization_handler(SpyHandler {
                fail_with: Some(|| Box::new(DatabaseUnavailable) as BoxError),
                ..handler("code")
            })
            .build();

        let failure = validate(&server, "client_id=app&response_type=code")
            .await
            .unwrap_err();
        assert!(failure.is_redirectable());
        assert!(failure.error().is_server_error());
        assert!(failure.error().description().is_none());

        let server = AuthorizationServer::builder(repository())
            .with_authorization_handler(SpyHandler {
                fail_with: Some(|| {
                    Box::new(OAuthError::invalid_request("code_challenge required")) as BoxError
                }),
                ..handler("code")
            })
            .build();

        let failure = validate(&server, "client_id=app&response_type=code")
            .await
            .unwrap_err();
        assert_eq!(failure.error().code, ErrorCode::InvalidRequest);
        assert_eq!(failure.error().description(), Some("code_challenge required"));
    }

    #[tokio::test]
    async fn test_deny_authorization_request() {
        let server = AuthorizationServer::builder(repository())
            .with_authorization_handler(handler("code"))
            .build();
        let request = validate(&server, "client_id=app&response_type=code&state=abc")
            .await
            .unwrap();

        let failure = server.deny_authorization_request(request, "user said no");

        assert!(failure.is_redirectable());
        assert_eq!(failure.error().code, ErrorCode::AccessDenied);
        assert_eq!(failure.error().description(), Some("user said no"));

        let unresolved = server.deny_authorization_request(AuthorizationRequest::default(), "no");
        assert!(!unresolved.is_redirectable());
    }

    struct SharedHandler(Arc<SpyHandler>);

    #[async_trait]
    impl AuthorizationHandler for SharedHandler {
        fn response_type(&self) -> &str {
            self.0.response_type()
        }

        async fn validate_authorization_request(
            &self,
            client: &dyn Client,
            request: &AuthorizationRequest,
            pkce: &dyn Pkce,
        ) -> Result<(), BoxError> {
            self.0
                .validate_authorization_request(client, request, pkce)
                .await
        }
    }

    fn token_body(
        server: &AuthorizationServer,
        body: &'static str,
    ) -> OAuthResult<AccessTokenResponse> {
        let mut headers = HeaderMap::new();
        headers.insert(
            axum::http::header::CONTENT_TYPE,
            axum::http::HeaderValue::from_static("application/x-www-form-urlencoded"),
        );
        tokio_test::block_on(server.token(&Method::POST, &headers, body.as_bytes()))
    }

    #[test]
    fn test_token_dispatch() {
        let server = AuthorizationServer::builder(repository())
            .with_grant(StaticGrant {
                grant_type: "client_credentials",
                result: || Ok(AccessTokenResponse::bearer("cc")),
            })
            .build();

        let response = token_body(&server, "grant_type=client_credentials").unwrap();
        assert_eq!(response.access_token, "cc");

        let err = token_body(&server, "grant_type=password").unwrap_err();
        assert_eq!(err.code, ErrorCode::UnsupportedGrantType);
        assert_eq!(
            err.description(),
            Some("the password grant type is not supported")
        );
    }

    #[test]
    fn test_token_grant_errors() {
        let server = AuthorizationServer::builder(repository())
            .with_grant(StaticGrant {
                grant_type: "broken",
                result: || Err(Box::new(DatabaseUnavailable) as BoxError),
            })
            .with_grant(StaticGrant {
                grant_type: "picky",
                result: || Err(Box::new(OAuthError::new(ErrorCode::InvalidGrant)) as BoxError),
            })
            .build();

        let err = token_body(&server, "grant_type=broken").unwrap_err();
        assert!(err.is_server_error());
        assert!(err.description().is_none());
        assert!(err.find_cause::<DatabaseUnavailable>().is_some());

        let err = token_body(&server, "grant_type=picky").unwrap_err();
        assert_eq!(err.code, ErrorCode::InvalidGrant);
    }

    #[test]
    fn test_last_grant_registration_wins() {
        let server = AuthorizationServer::builder(repository())
            .with_grant(StaticGrant {
                grant_type: "client_credentials",
                result: || Ok(AccessTokenResponse::bearer("first")),
            })
            .with_grant(StaticGrant {
                grant_type: "client_credentials",
                result: || Ok(AccessTokenResponse::bearer("second")),
            })
            .build();

        let response = token_body(&server, "grant_type=client_credentials").unwrap();
        assert_eq!(response.access_token, "second");
    }

    #[tokio::test]
    async fn test_grant_auto_registers_as_handler() {
        let server = AuthorizationServer::builder(repository())
            .with_grant(CodeGrant)
            .build();

        assert_eq!(server.grant_types(), vec!["authorization_code"]);
        assert_eq!(server.response_types(), vec!["code"]);
        assert!(
            validate(&server, "client_id=app&response_type=code")
                .await
                .is_ok()
        );
    }

    #[test]
    fn test_with_config_restricts_pkce_and_scopes() {
        let config = OAuthConfig {
            allowed_scopes: vec!["openid".to_string()],
            pkce_methods: vec!["S256".to_string()],
        };
        let server = AuthorizationServer::builder(repository())
            .with_config(&config)
            .unwrap()
            .build();

        assert!(server.verify_code_challenge("plain", "a", "a").is_err());
        assert!(
            server
                .verify_code_challenge(
                    "S256",
                    "n4bQgYhMfWWaL-qgxVrQFaO_TxsrC4Is0V1sFbDwCgg",
                    "test"
                )
                .unwrap()
        );
        assert!(server.scope_validator.validate_scopes(&["email".to_string()]).is_err());
    }

    #[tokio::test]
    async fn test_configured_pkce_methods_apply_at_authorization() {
        let config = OAuthConfig {
            pkce_methods: vec!["S256".to_string()],
            ..OAuthConfig::default()
        };
        let server = AuthorizationServer::builder(repository())
            .with_grant(CodeGrant)
            .with_config(&config)
            .unwrap()
            .build();

        let failure = validate(
            &server,
            "client_id=app&response_type=code&code_challenge=abc&code_challenge_method=plain",
        )
        .await
        .unwrap_err();
        assert!(failure.is_redirectable());
        assert_eq!(failure.error().code, ErrorCode::InvalidRequest);
        assert!(failure.error().has_reason(ErrorReason::UnsupportedCodeChallengeMethod));

        // A challenge without a method is plain, so it is rejected too.
        let failure = validate(&server, "client_id=app&response_type=code&code_challenge=abc")
            .await
            .unwrap_err();
        assert!(failure.error().has_reason(ErrorReason::UnsupportedCodeChallengeMethod));

        assert!(
            validate(
                &server,
                "client_id=app&response_type=code&code_challenge=abc&code_challenge_method=S256",
            )
            .await
            .is_ok()
        );

        let default_server = AuthorizationServer::builder(repository())
            .with_grant(CodeGrant)
            .build();
        assert!(
            validate(
                &default_server,
                "client_id=app&response_type=code&code_challenge=abc&code_challenge_method=plain",
            )
            .await
            .is_ok()
        );
    }

    #[test]
    fn test_configured_pkce_methods_reach_grants() {
        let config = OAuthConfig {
            pkce_methods: vec!["S256".to_string()],
            ..OAuthConfig::default()
        };
        let server = AuthorizationServer::builder(repository())
            .with_grant(CodeGrant)
            .with_config(&config)
            .unwrap()
            .build();

        let err = token_body(
            &server,
            "grant_type=authorization_code&code=abc&code_challenge_method=plain&code_verifier=abc",
        )
        .unwrap_err();
        assert_eq!(err.code, ErrorCode::InvalidGrant);

        let response = token_body(
            &server,
            "grant_type=authorization_code&code=n4bQgYhMfWWaL-qgxVrQFaO_TxsrC4Is0V1sFbDwCgg\
             &code_challenge_method=S256&code_verifier=test",
        )
        .unwrap();
        assert_eq!(response.access_token, "from-code");
    }

    #[test]
    fn test_with_config_rejects_invalid_config() {
        let config = OAuthConfig {
            pkce_methods: vec!["S512".to_string()],
            ..OAuthConfig::default()
        };
        assert!(
            AuthorizationServer::builder(repository())
                .with_config(&config)
                .is_err()
        );
    }

    #[test]
    fn test_server_is_send_and_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<AuthorizationServer>();
    }
}
