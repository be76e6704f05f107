//! Response rendering for the authorization and token endpoints.
//!
//! Token endpoint results render as JSON with `Cache-Control: no-store` and
//! `Pragma: no-cache` (RFC 6749 section 5.1). Authorization failures render
//! as a 302 to the resolved redirect URI when they are redirectable, and as a
//! JSON error otherwise.

use axum::{
    Json,
    http::{HeaderValue, StatusCode, header},
    response::{IntoResponse, Response},
};

use crate::error::OAuthError;
use crate::oauth::{AccessTokenResponse, AuthorizationFailure};

const NO_CACHE_HEADERS: [(header::HeaderName, &str); 2] = [
    (header::CACHE_CONTROL, "no-store"),
    (header::PRAGMA, "no-cache"),
];

// =============================================================================
// IntoResponse Implementations
// =============================================================================

impl IntoResponse for OAuthError {
    fn into_response(self) -> Response {
        let status = StatusCode::from_u16(self.status()).unwrap_or(StatusCode::BAD_REQUEST);

        let mut response = (status, NO_CACHE_HEADERS, Json(&self)).into_response();

        // RFC 6749 section 5.2
        if status == StatusCode::UNAUTHORIZED {
            response.headers_mut().insert(
                header::WWW_AUTHENTICATE,
                HeaderValue::from_static("Basic realm=\"oauth2\""),
            );
        }

        response
    }
}

impl IntoResponse for AccessTokenResponse {
    fn into_response(self) -> Response {
        (StatusCode::OK, NO_CACHE_HEADERS, Json(self)).into_response()
    }
}

impl IntoResponse for AuthorizationFailure {
    fn into_response(self) -> Response {
        if !self.is_redirectable() {
            return self.into_error().into_response();
        }

        match self.redirect_url() {
            Ok(url) => (StatusCode::FOUND, [(header::LOCATION, url.as_str())]).into_response(),
            Err(err) => {
                tracing::error!(error = %err, "Could not build error redirect");
                self.into_error().into_response()
            }
        }
    }
}
