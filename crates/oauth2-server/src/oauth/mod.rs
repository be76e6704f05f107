//! OAuth 2.0 authorization and token endpoint core.
//!
//! - [`authorize`] parses authorization requests and defines response type handlers
//! - [`token`] parses token requests and defines grants
//! - [`server`] coordinates validation and dispatch
//! - [`redirect_uri`], [`scope`] and [`pkce`] hold the individual policies
//! - [`client_auth`] authenticates clients at the token endpoint

pub mod authorize;
pub mod client_auth;
pub mod pkce;
pub mod redirect_uri;
pub mod scope;
pub mod server;
pub mod token;

pub use authorize::{
    AuthorizationFailure, AuthorizationHandler, AuthorizationRequest, RESPONSE_TYPE_CODE,
    RedirectError, parse_authorization_request,
};
pub use client_auth::{
    AuthenticatedClient, BasicAuthError, TokenEndpointAuthMethod, authenticate_client,
    parse_basic_auth,
};
pub use pkce::{
    CODE_CHALLENGE_METHOD_PLAIN, CODE_CHALLENGE_METHOD_S256, CompositePkce, Pkce, PkceError,
    PlainPkce, S256Pkce, default_pkce, generate_verifier, s256_challenge,
    validate_challenge_request,
};
pub use redirect_uri::{default_redirect_uri_validation, resolve_redirect_uri};
pub use scope::{AllowAllScopes, AllowScopes, ScopeValidator};
pub use server::{AuthorizationServer, AuthorizationServerBuilder};
pub use token::{AccessTokenRequest, AccessTokenResponse, Grant, parse_access_token_request};
