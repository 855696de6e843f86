use std::fmt::Debug;
use std::str::Utf8Error;

use base64::DecodeError;
use josekit::JoseError;
use thiserror::Error;

use crate::jose::jws::ParseAlgError;

#[derive(Debug, Error)]
pub enum JWTError {
    #[error("Error decoding b64 jwt part")]
    B64DecodeError(#[from] DecodeError),
    #[error("JWT has an invalid format")]
    InvalidJwtFormat(String),
    #[error("Unable to parse jwt to json")]
    SerDeParseError(#[from] serde_json::Error),
    #[error("Unable to parse jwt header from json")]
    HeaderParseError(#[source] JoseError),
    #[error("Invalid JWT payload")]
    PayloadError(#[from] JoseError),
    #[error("Missing algorithm in JWT")]
    JWKAlgorithmNotFound,
    #[error("Error parsing JWK to verifier")]
    VerifierCreationError(JoseError),
    #[error("Error parsing JWK to decrypter")]
    DecrypterCreationError(JoseError),
    #[error("Error decrypting JWE")]
    DecryptError(JoseError),
    #[error("Invalid JWS Signature")]
    InvalidSignature(JoseError),
    #[error("Invalid JWS algorithm")]
    ParseAlg(#[from] ParseAlgError),
    #[error("Invalid encoding of payload")]
    NoUTF8(#[from] Utf8Error),
    #[error("Could not find JWK Key to perform {}", .0)]
    KeyNotFound(String),
}
