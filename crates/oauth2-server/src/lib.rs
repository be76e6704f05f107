//! # oauth2-server
//!
//! Validation and dispatch core for an OAuth 2.0 authorization server.
//!
//! This crate provides:
//! - Authorization request parsing and validation
//! - Redirect URI resolution that fails closed
//! - PKCE (`plain`, `S256`) verification with pluggable methods
//! - Scope policies
//! - Grant dispatch for the token endpoint
//!
//! ## Overview
//!
//! Token issuance, signing and storage are left to the embedding
//! application. It plugs in a [`storage::ClientRepository`], one
//! [`oauth::Grant`] per grant type and one [`oauth::AuthorizationHandler`] per
//! response type, then drives an [`oauth::AuthorizationServer`] from its own
//! routes.
//!
//! Errors found before the redirect URI is resolved are never redirected:
//! [`oauth::AuthorizationFailure`] tells the caller which kind it has.
//!
//! ## Modules
//!
//! - [`config`] - Declarative server configuration
//! - [`error`] - OAuth 2.0 error model
//! - [`http`] - axum response rendering
//! - [`oauth`] - Authorization and token endpoint core
//! - [`params`] - Request parameter decoding
//! - [`storage`] - Client repository
//! - [`types`] - Client contract and capabilities

pub mod config;
pub mod error;
pub mod http;
pub mod oauth;
pub mod params;
pub mod storage;
pub mod types;

pub use config::{ConfigError, OAuthConfig};
pub use error::{
    BoxError, ErrorCode, ErrorReason, OAuthError, ReasonError, into_oauth_error, maybe_wrap_error,
};
pub use oauth::{
    AccessTokenRequest, AccessTokenResponse, AuthorizationFailure, AuthorizationHandler,
    AuthorizationRequest, AuthorizationServer, AuthorizationServerBuilder, Grant, Pkce,
    ScopeValidator,
};
pub use storage::{ClientRepository, InMemoryClientRepository, get_client};
pub use types::{
    AllowsGrantType, AllowsResponseType, Client, SimpleClient, ValidatesRedirectUri,
    ValidatesSecret,
};

/// Type alias for OAuth results.
pub type OAuthResult<T> = Result<T, OAuthError>;

/// Prelude module for convenient imports.
///
/// ```ignore
/// use oauth2_server::prelude::*;
/// ```
pub mod prelude {
    pub use crate::OAuthResult;
    pub use crate::config::{ConfigError, OAuthConfig};
    pub use crate::error::{BoxError, ErrorCode, ErrorReason, OAuthError};
    pub use crate::oauth::{
        AccessTokenRequest, AccessTokenResponse, AllowAllScopes, AllowScopes,
        AuthorizationFailure, AuthorizationHandler, AuthorizationRequest, AuthorizationServer,
        Grant, Pkce, ScopeValidator, authenticate_client, validate_challenge_request,
    };
    pub use crate::storage::{ClientRepository, InMemoryClientRepository, get_client};
    pub use crate::types::{
        AllowsGrantType, AllowsResponseType, Client, SimpleClient, ValidatesRedirectUri,
        ValidatesSecret,
    };
}
