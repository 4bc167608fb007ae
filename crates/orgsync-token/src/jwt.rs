use std::time::{Duration, SystemTime};

use base64::engine::general_purpose::URL_SAFE_NO_PAD as base64_engine;
use base64::Engine;
use josekit::jwk::Jwk;
use josekit::jws::JwsHeader;
use josekit::jwt;
use josekit::jwt::JwtPayload;
use serde_json::{Map, Value};

use super::error::JWTError;
use super::jwk::jwk_ext::JwkExt;

#[derive(Debug, Clone)]
pub struct Jwt {
    header: JwsHeader,
    payload: JwtPayload,
    pub serialized_repr: String,
}

impl Jwt {
    pub fn new(header: JwsHeader, payload: JwtPayload, key: &Jwk) -> Result<Self, JWTError> {
        let signer = key.get_signer()?;
        let result = jwt::encode_with_signer(&payload, &header, &*signer).map_err(JWTError::JoseCreationError)?;
        Ok(Jwt { header, payload, serialized_repr: result })
    }

    pub fn verify(&self, key: &Jwk) -> Result<(), JWTError> {
        let verifier = key.get_verifier(self.alg()).map_err(JWTError::VerifierCreationError)?;
        let (header_and_payload, signature) = self
            .serialized_repr
            .rsplit_once('.')
            .ok_or_else(|| JWTError::InvalidJwtFormat(self.serialized_repr.clone()))?;

        let decoded_signature = base64_engine.decode(signature)?;
        verifier.verify(header_and_payload.as_bytes(), &decoded_signature).map_err(JWTError::InvalidSignature)
    }

    pub fn decode(input: impl AsRef<str>, key: &Jwk) -> Result<Self, JWTError> {
        let jwt = Jwt::decode_without_verification(input)?;
        jwt.verify(key)?;
        Ok(jwt)
    }

    pub fn decode_without_verification(input: impl AsRef<str>) -> Result<Self, JWTError> {
        let str_jwt = input.as_ref().trim();
        let parts: Vec<&str> = str_jwt.split('.').collect();

        if parts.len() != 3 {
            return Err(JWTError::InvalidJwtFormat(str_jwt.to_owned()));
        }

        let header_b64 = base64_engine.decode(parts[0])?;
        let header: Map<String, Value> = serde_json::from_slice(&header_b64)?;
        let header = JwsHeader::from_map(header)?;

        let payload_b64 = base64_engine.decode(parts[1])?;
        let payload: Map<String, Value> = serde_json::from_slice(&payload_b64)?;
        let payload = JwtPayload::from_map(payload)?;

        Ok(Jwt { header, payload, serialized_repr: str_jwt.to_owned() })
    }

    /// A token without `exp` is treated as expired.
    pub fn is_expired(&self, leeway: Duration) -> bool {
        self.payload.expires_at().map_or(true, |exp| exp + leeway < SystemTime::now())
    }

    pub fn is_not_yet_valid(&self, leeway: Duration) -> bool {
        self.payload.not_before().is_some_and(|nbf| nbf > SystemTime::now() + leeway)
    }

    pub fn kid(&self) -> Option<&str> {
        self.header.key_id()
    }

    pub fn alg(&self) -> Option<&str> {
        self.header.algorithm()
    }

    pub fn payload(&self) -> &JwtPayload {
        &self.payload
    }
}
