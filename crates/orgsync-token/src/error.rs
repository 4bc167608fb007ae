use base64::DecodeError;
use josekit::JoseError;
use thiserror::Error;

/// Failures while decoding, signing or verifying an identity provider token, or reading its claims.
#[derive(Debug, Error)]
pub enum JWTError {
    #[error("token segment is not valid base64url")]
    DecodeBase64(#[from] DecodeError),

    #[error("token is not a compact JWS: '{0}'")]
    InvalidJwtFormat(String),

    #[error("token header or payload is not a JSON object")]
    SerdeError(#[from] serde_json::Error),

    #[error("unable to build token: {0}")]
    JoseCreationError(#[from] JoseError),

    #[error("no verifier for the published key: {0}")]
    VerifierCreationError(JoseError),

    #[error("signature does not match the published key")]
    InvalidSignature(JoseError),

    #[error("missing claim '{0}'")]
    MissingClaim(&'static str),

    #[error("claim '{claim}' has an unexpected shape: {reason}")]
    InvalidClaim { claim: String, reason: &'static str },
}
