use std::{sync::Arc, time::Duration};

use bon::Builder;
use tracing::debug;

use super::{error::AuthError, jwks_discovery::JwksDiscovery};
use crate::{
    claim::{ClaimMapping, IdentityClaim},
    jwt::Jwt,
};

/// Verifies identity provider tokens against its published JWKS and turns them into [`IdentityClaim`]s.
#[derive(Builder, Clone)]
pub struct TokenValidator {
    jwks_discovery: Arc<dyn JwksDiscovery + Send + Sync>,

    #[builder(into)]
    audience: String,

    #[builder(into)]
    issuer: Option<String>,

    #[builder(default)]
    claim_mapping: ClaimMapping,

    #[builder(default = Duration::ZERO)]
    leeway: Duration,
}

impl TokenValidator {
    pub async fn validate_token(&self, token: &str) -> Result<Jwt, AuthError> {
        let jwt = Jwt::decode_without_verification(token).map_err(AuthError::DecodeJwt)?;

        let jwks = self.jwks_discovery.jwks().await?;
        let jwks = match jwks.resolve(jwt.kid()) {
            Some(_) => jwks,
            None => {
                debug!(kid = ?jwt.kid(), "unknown key id, refreshing jwks");
                self.jwks_discovery.refresh().await?
            }
        };
        let jwk = jwks.resolve(jwt.kid()).ok_or(AuthError::NoJwk)?;
        jwt.verify(jwk).map_err(AuthError::VerifyJwt)?;

        if jwt.is_expired(self.leeway) {
            return Err(AuthError::ExpiredJwt);
        }
        if jwt.is_not_yet_valid(self.leeway) {
            return Err(AuthError::ImmatureJwt);
        }

        let audience_matches = jwt.payload().audience().is_some_and(|aud| aud.contains(&self.audience.as_str()));
        if !audience_matches {
            return Err(AuthError::InvalidAudience { expected: self.audience.clone() });
        }

        if let Some(issuer) = &self.issuer {
            if jwt.payload().issuer() != Some(issuer.as_str()) {
                return Err(AuthError::InvalidIssuer { expected: issuer.clone() });
            }
        }

        Ok(jwt)
    }

    /// Full verification followed by claim extraction.
    pub async fn verify(&self, token: &str) -> Result<IdentityClaim, AuthError> {
        let jwt = self.validate_token(token).await?;
        IdentityClaim::from_payload(jwt.payload(), &self.claim_mapping).map_err(AuthError::ParseClaim)
    }
}
