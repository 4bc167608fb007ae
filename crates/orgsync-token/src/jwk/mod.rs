pub mod jwk_ext;
pub mod jwk_set;
