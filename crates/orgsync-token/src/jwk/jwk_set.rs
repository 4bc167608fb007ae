use std::collections::HashMap;

use josekit::jwk::Jwk;
use serde::{de::Error as _, Deserialize, Deserializer};
use serde_json::{Map, Value};

pub const JWK_SET_DEFAULT_KEY_ID: &str = "default";

/// Public keys published by the identity provider, indexed by `kid`.
///
/// Keys without a `kid` are stored under [`JWK_SET_DEFAULT_KEY_ID`].
#[derive(Debug, Clone, Default)]
pub struct JwkSet {
    keys: HashMap<String, Jwk>,
}

impl JwkSet {
    pub fn new(keys: impl IntoIterator<Item = Jwk>) -> Self {
        let keys = keys
            .into_iter()
            .map(|jwk| (jwk.key_id().unwrap_or(JWK_SET_DEFAULT_KEY_ID).to_owned(), jwk))
            .collect();
        Self { keys }
    }

    pub fn get(&self, kid: &str) -> Option<&Jwk> {
        self.keys.get(kid)
    }

    /// Selects the key a token should be verified with. A token without `kid` can only be matched against
    /// the default key or against a set holding a single key.
    pub fn resolve(&self, kid: Option<&str>) -> Option<&Jwk> {
        match kid {
            Some(kid) => self.get(kid),
            None => self.get(JWK_SET_DEFAULT_KEY_ID).or_else(|| match self.keys.len() {
                1 => self.keys.values().next(),
                _ => None,
            }),
        }
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }
}

impl<'de> Deserialize<'de> for JwkSet {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        #[derive(Deserialize)]
        struct RawJwkSet {
            keys: Vec<Map<String, Value>>,
        }

        let raw = RawJwkSet::deserialize(deserializer)?;
        let keys = raw.keys.into_iter().map(Jwk::from_map).collect::<Result<Vec<_>, _>>().map_err(D::Error::custom)?;

        Ok(JwkSet::new(keys))
    }
}

#[cfg(test)]
mod test {
    use josekit::jws::ES256;
    use serde_json::json;

    use super::{JwkSet, JWK_SET_DEFAULT_KEY_ID};

    #[test]
    fn when_jwks_document_is_deserialized_then_keys_are_indexed_by_kid() {
        let document = json!({
            "keys": [
                { "kty": "RSA", "kid": "rsa1", "alg": "RS256", "n": "sXch", "e": "AQAB" },
                { "kty": "RSA", "alg": "RS256", "n": "sXch", "e": "AQAB" }
            ]
        });

        let jwks: JwkSet = serde_json::from_value(document).expect("jwks should be deserialized");

        assert_eq!(jwks.len(), 2);
        assert!(jwks.get("rsa1").is_some());
        assert!(jwks.get(JWK_SET_DEFAULT_KEY_ID).is_some());
    }

    #[test]
    fn when_token_has_no_kid_and_set_has_single_key_then_that_key_is_resolved() {
        let mut jwk = ES256.generate_key_pair().expect("generating key pair should be successful").to_jwk_public_key();
        jwk.set_key_id("only");
        let jwks = JwkSet::new([jwk]);

        assert!(jwks.resolve(None).is_some());
        assert!(jwks.resolve(Some("other")).is_none());
    }

    #[test]
    fn when_key_has_no_kty_then_deserialization_fails() {
        let document = json!({ "keys": [ { "kid": "broken" } ] });

        assert!(serde_json::from_value::<JwkSet>(document).is_err());
    }
}
