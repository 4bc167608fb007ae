use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use rand::{rngs::OsRng, RngCore as _};

const PASSWORD_BYTES: usize = 24;

/// Initial password for accounts created on behalf of the identity provider. Nobody is told this password, users log
/// in through the identity provider.
pub(crate) fn random_password() -> String {
    random(PASSWORD_BYTES)
}

pub(crate) fn random(size: usize) -> String {
    let mut bytes = vec![0u8; size];
    OsRng.fill_bytes(&mut bytes);
    URL_SAFE_NO_PAD.encode(&bytes)
}
