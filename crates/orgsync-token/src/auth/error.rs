use thiserror::Error;

use crate::error::JWTError;

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Could not retrieve the JWK from the JWK set")]
    NoJwk,

    #[error("Could not fetch the JWK set. Reason: {0}")]
    JwkSetFetchError(#[from] reqwest::Error),

    #[error("The 'Authorization' header was not present on a request")]
    MissingAuthorizationHeader,

    #[error("The 'Authorization' header was present on a request but its value could not be parsed. Reason: {0}")]
    InvalidAuthorizationHeader(String),

    #[error("The 'Authorization' header did not contain the expected 'Bearer ...token' format")]
    MissingBearerToken,

    #[error("JWT could not be extracted from the request")]
    MissingToken,

    #[error("The basic credentials sent with the request are not valid")]
    InvalidBasicCredentials,

    #[error("The token could not be decoded. Reason: {0}")]
    DecodeJwt(#[source] JWTError),

    #[error("The token could not be verified. Reason: {0}")]
    VerifyJwt(#[source] JWTError),

    #[error("The token has expired")]
    ExpiredJwt,

    #[error("The token is not valid yet")]
    ImmatureJwt,

    #[error("The token was not issued for audience '{expected}'")]
    InvalidAudience { expected: String },

    #[error("The token was not issued by '{expected}'")]
    InvalidIssuer { expected: String },

    #[error("The token claims could not be parsed. Reason: {0}")]
    ParseClaim(#[source] JWTError),
}

impl AuthError {
    /// Whether the request simply did not carry a credential, as opposed to carrying a bad one.
    pub fn is_missing_credential(&self) -> bool {
        matches!(self, Self::MissingAuthorizationHeader | Self::MissingBearerToken | Self::MissingToken)
    }
}
