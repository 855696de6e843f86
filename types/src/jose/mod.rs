pub mod error;
pub mod jwk_ext;
pub mod jws;
pub mod jwt;
