//! Request parameter names and decoding.
//!
//! Authorization requests carry their parameters in the query string and token
//! requests in an `application/x-www-form-urlencoded` body. Both are decoded
//! into [`Params`], an ordered multi-map that keeps every value.

use url::form_urlencoded;

pub const PARAM_CLIENT_ID: &str = "client_id";
pub const PARAM_CLIENT_SECRET: &str = "client_secret";
pub const PARAM_GRANT_TYPE: &str = "grant_type";
pub const PARAM_REDIRECT_URI: &str = "redirect_uri";
pub const PARAM_STATE: &str = "state";
pub const PARAM_SCOPE: &str = "scope";
pub const PARAM_CODE_CHALLENGE: &str = "code_challenge";
pub const PARAM_CODE_CHALLENGE_METHOD: &str = "code_challenge_method";
pub const PARAM_CODE_VERIFIER: &str = "code_verifier";
pub const PARAM_RESPONSE_TYPE: &str = "response_type";

/// Splits a space-separated parameter value (`scope`, `response_type`).
///
/// Empty tokens are dropped, order and duplicates are kept. Blank input
/// yields an empty vector rather than a single empty token.
#[must_use]
pub fn parse_space_separated(raw: &str) -> Vec<String> {
    raw.trim()
        .split(' ')
        .filter(|part| !part.is_empty())
        .map(str::to_string)
        .collect()
}

/// Errors produced while decoding a query string or form body.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum QueryParseError {
    /// `;` is not accepted as a pair separator.
    #[error("invalid semicolon separator in query")]
    Semicolon,

    /// A `%` not followed by two hex digits.
    #[error("invalid URL escape {0:?}")]
    InvalidEscape(String),
}

/// Decoded `application/x-www-form-urlencoded` parameters.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Params(Vec<(String, String)>);

impl Params {
    /// Decodes a raw query string or form body.
    ///
    /// # Errors
    ///
    /// Returns `QueryParseError` if a pair is separated by `;` or contains a
    /// malformed percent escape.
    pub fn parse(raw: &str) -> Result<Self, QueryParseError> {
        for pair in raw.split('&') {
            if pair.contains(';') {
                return Err(QueryParseError::Semicolon);
            }
            check_escapes(pair)?;
        }

        Ok(Self(
            form_urlencoded::parse(raw.as_bytes())
                .into_owned()
                .collect(),
        ))
    }

    /// Returns the first value for `name`.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&str> {
        self.0
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }

    /// Returns the first non-empty value for `name`.
    #[must_use]
    pub fn get_non_empty(&self, name: &str) -> Option<&str> {
        self.get(name).filter(|value| !value.is_empty())
    }

    /// Returns every value for `name`, in request order.
    pub fn get_all<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a str> + 'a {
        self.0
            .iter()
            .filter(move |(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }

    /// Returns `true` if no parameters were decoded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

fn check_escapes(pair: &str) -> Result<(), QueryParseError> {
    let bytes = pair.as_bytes();
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'%' {
            let valid = bytes.len() > i + 2
                && bytes[i + 1].is_ascii_hexdigit()
                && bytes[i + 2].is_ascii_hexdigit();
            if !valid {
                let end = (i + 3).min(bytes.len());
                return Err(QueryParseError::InvalidEscape(
                    String::from_utf8_lossy(&bytes[i..end]).into_owned(),
                ));
            }
            i += 3;
        } else {
            i += 1;
        }
    }
    Ok(())
}
