use std::{
    sync::Arc,
    time::{Duration, SystemTime},
};

use josekit::{jwk::Jwk, jws::ES256};
use orgsync_token::{
    auth::{jwks_discovery::StaticJwksDiscovery, validator::TokenValidator},
    claim::ClaimMapping,
    jwk::jwk_set::JwkSet,
    jwt::Jwt,
    JwsHeader, JwtPayload, Value,
};
use serde_json::json;

pub(crate) const AUDIENCE: &str = "grafana-client";
pub(crate) const ISSUER: &str = "https://aac.example.org";

/// Signing key of a fake identity provider together with the key set it publishes.
pub(crate) struct IdentityProvider {
    private_key: Jwk,
    jwks: JwkSet,
}

impl IdentityProvider {
    pub fn new() -> Self {
        let key_pair = ES256.generate_key_pair().expect("generating key pair should be successful");
        let mut private_key = key_pair.to_jwk_private_key();
        private_key.set_algorithm("ES256");
        private_key.set_key_id("idp");
        let mut public_key = key_pair.to_jwk_public_key();
        public_key.set_algorithm("ES256");
        public_key.set_key_id("idp");

        Self { private_key, jwks: JwkSet::new([public_key]) }
    }

    /// Signs a token for `alice@example.org` with the given extra claims merged over the defaults.
    pub fn token(&self, extra_claims: Value) -> String {
        let mut payload = JwtPayload::new();
        payload.set_subject("42");
        payload.set_audience(vec![AUDIENCE]);
        payload.set_issuer(ISSUER);
        payload.set_expires_at(&(SystemTime::now() + Duration::from_secs(300)));
        payload.set_claim("username", Some(json!("Alice"))).expect("claim should be set");
        payload.set_claim("email", Some(json!("alice@example.org"))).expect("claim should be set");
        if let Value::Object(extra_claims) = extra_claims {
            for (key, value) in extra_claims {
                payload.set_claim(&key, Some(value)).expect("claim should be set");
            }
        }

        let mut header = JwsHeader::new();
        header.set_token_type("JWT");
        header.set_algorithm("ES256");
        header.set_key_id("idp");
        Jwt::new(header, payload, &self.private_key).expect("signing should be successful").serialized_repr
    }

    pub fn validator(&self, claim_mapping: ClaimMapping) -> Arc<TokenValidator> {
        Arc::new(
            TokenValidator::builder()
                .jwks_discovery(Arc::new(StaticJwksDiscovery::new(self.jwks.clone())))
                .audience(AUDIENCE)
                .issuer(ISSUER)
                .claim_mapping(claim_mapping)
                .build(),
        )
    }
}
