use std::borrow::Cow;

use axum::http::{header::AUTHORIZATION, HeaderMap};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use serde::Deserialize;

use super::error::AuthError;

pub type ExtractedToken<'a> = Cow<'a, str>;

/// Pulls the identity token out of an inbound request.
pub trait TokenExtractor: Send + Sync + std::fmt::Debug {
    fn extract<'a>(&self, headers: &'a HeaderMap, body: &'a [u8]) -> Result<ExtractedToken<'a>, AuthError>;
}

fn authorization_header(headers: &HeaderMap) -> Result<&str, AuthError> {
    headers
        .get(AUTHORIZATION)
        .ok_or(AuthError::MissingAuthorizationHeader)?
        .to_str()
        .map_err(|err| AuthError::InvalidAuthorizationHeader(err.to_string()))
}

#[derive(Debug, Clone, Default)]
pub struct AuthHeaderTokenExtractor;

impl TokenExtractor for AuthHeaderTokenExtractor {
    fn extract<'a>(&self, headers: &'a HeaderMap, _body: &'a [u8]) -> Result<ExtractedToken<'a>, AuthError> {
        authorization_header(headers)?
            .strip_prefix("Bearer ")
            .map(str::trim)
            .filter(|token| !token.is_empty())
            .ok_or(AuthError::MissingBearerToken)
            .map(Cow::Borrowed)
    }
}

/// Request authenticated with a shared basic credential, carrying the token as `{"access_token": "..."}` in its
/// JSON body.
#[derive(Clone)]
pub struct BasicBodyTokenExtractor {
    username: String,
    password: String,
}

impl BasicBodyTokenExtractor {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self { username: username.into(), password: password.into() }
    }

    fn check_credentials(&self, headers: &HeaderMap) -> Result<(), AuthError> {
        let encoded = authorization_header(headers)?
            .strip_prefix("Basic ")
            .ok_or_else(|| AuthError::InvalidAuthorizationHeader("expected 'Basic' credentials".to_owned()))?;
        let decoded = STANDARD
            .decode(encoded.trim())
            .map_err(|err| AuthError::InvalidAuthorizationHeader(err.to_string()))?;
        let decoded =
            String::from_utf8(decoded).map_err(|err| AuthError::InvalidAuthorizationHeader(err.to_string()))?;

        match decoded.split_once(':') {
            Some((username, password)) if username == self.username && password == self.password => Ok(()),
            _ => Err(AuthError::InvalidBasicCredentials),
        }
    }
}

impl std::fmt::Debug for BasicBodyTokenExtractor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BasicBodyTokenExtractor").field("username", &self.username).finish_non_exhaustive()
    }
}

#[derive(Deserialize)]
struct AccessTokenBody {
    access_token: Option<String>,
}

impl TokenExtractor for BasicBodyTokenExtractor {
    fn extract<'a>(&self, headers: &'a HeaderMap, body: &'a [u8]) -> Result<ExtractedToken<'a>, AuthError> {
        self.check_credentials(headers)?;

        serde_json::from_slice::<AccessTokenBody>(body)
            .ok()
            .and_then(|body| body.access_token)
            .filter(|token| !token.trim().is_empty())
            .map(Cow::Owned)
            .ok_or(AuthError::MissingToken)
    }
}
