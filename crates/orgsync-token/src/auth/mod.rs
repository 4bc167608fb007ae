pub mod error;
pub mod extractor;
pub mod jwks_discovery;
pub mod validator;
