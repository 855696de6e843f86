use std::fmt::Formatter;
use std::str::FromStr;

use base64::engine::general_purpose::URL_SAFE_NO_PAD as base64_engine;
use base64::Engine;
use josekit::jwk::Jwk;
use josekit::jws::JwsHeader;
use josekit::jwt::JwtPayload;
use serde::de::{Error, Visitor};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Map, Value};

use crate::jose::error::JWTError;
use crate::jose::jwk_ext::JwkExt;
use crate::jose::jws::SigningAlgorithm;

/// Common surface of the token shapes this library consumes. Access to the
/// payload is deliberately unguarded here; callers that care about signature
/// or encryption state must go through a decoder before trusting it.
pub trait JWT {
    type Header;
    fn header(&self) -> &Self::Header;
    fn payload(&self) -> &JwtPayload;
    fn serialized(&self) -> &str;
    fn serialized_owned(self) -> String;
}

/// A compact-serialised JWS, parsed but not necessarily verified.
#[derive(Debug, Clone)]
pub struct SignedJWT {
    header: JwsHeader,
    payload: JwtPayload,
    serialized_repr: String,
}

impl SignedJWT {
    pub fn alg(&self) -> Option<SigningAlgorithm> {
        self.header()
            .algorithm()
            .and_then(|it| SigningAlgorithm::from_str(it).ok())
    }

    pub fn kid(&self) -> Option<&str> {
        self.header().key_id()
    }

    /// Checks the signature against the given key. Unsecured tokens have no
    /// signature to check and must be filtered out by the caller.
    pub fn verify(&self, key: &Jwk) -> Result<(), JWTError> {
        let verifier = key
            .get_verifier()
            .map_err(JWTError::VerifierCreationError)?;
        let jwt_bytes = self.serialized_repr.as_bytes();
        let indexes: Vec<usize> = jwt_bytes
            .iter()
            .enumerate()
            .filter(|(_, b)| **b == b'.')
            .map(|(pos, _)| pos)
            .collect();

        let header_and_payload = &jwt_bytes[..indexes[1]];
        let signature = &jwt_bytes[(indexes[1] + 1)..];
        let decoded_signature = base64_engine.decode(signature)?;
        verifier
            .verify(header_and_payload, &decoded_signature)
            .map_err(JWTError::InvalidSignature)
    }

    pub fn decode_no_verify(input: impl AsRef<str>) -> Result<Self, JWTError> {
        let str_jwt = input.as_ref();
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

        Ok(SignedJWT {
            header,
            payload,
            serialized_repr: str_jwt.to_owned(),
        })
    }
}

impl PartialEq for SignedJWT {
    fn eq(&self, other: &Self) -> bool {
        self.serialized_repr == other.serialized_repr
    }
}

impl Eq for SignedJWT {}

impl JWT for SignedJWT {
    type Header = JwsHeader;

    fn header(&self) -> &Self::Header {
        &self.header
    }

    fn payload(&self) -> &JwtPayload {
        &self.payload
    }

    fn serialized(&self) -> &str {
        &self.serialized_repr
    }

    fn serialized_owned(self) -> String {
        self.serialized_repr
    }
}

impl Serialize for SignedJWT {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(self.serialized())
    }
}

impl<'de> Deserialize<'de> for SignedJWT {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        struct JWSVisitor;
        impl<'de> Visitor<'de> for JWSVisitor {
            type Value = SignedJWT;

            fn expecting(&self, formatter: &mut Formatter) -> std::fmt::Result {
                formatter.write_str("a signed jws string")
            }

            fn visit_str<E>(self, v: &str) -> Result<Self::Value, E>
            where
                E: Error,
            {
                SignedJWT::decode_no_verify(v).map_err(|err| E::custom(err))
            }
        }
        deserializer.deserialize_str(JWSVisitor)
    }
}

#[cfg(test)]
mod tests {
    use josekit::jws::JwsHeader;
    use josekit::jwt;
    use josekit::jwt::JwtPayload;

    use crate::jose::jwt::{SignedJWT, JWT};

    fn unsecured_jwt(issuer: &str) -> String {
        let mut header = JwsHeader::new();
        header.set_token_type("JWT");
        let mut payload = JwtPayload::new();
        payload.set_issuer(issuer);
        jwt::encode_unsecured(&payload, &header).unwrap()
    }

    #[test]
    fn test_can_decode_compact_jws() {
        let encoded = unsecured_jwt("myself");

        let decoded = SignedJWT::decode_no_verify(&encoded).unwrap();

        assert_eq!("myself", decoded.payload().issuer().unwrap());
        assert_eq!(encoded, decoded.serialized());
    }

    #[test]
    fn test_rejects_non_compact_input() {
        assert!(SignedJWT::decode_no_verify("a.b").is_err());
        assert!(SignedJWT::decode_no_verify("not a jwt at all").is_err());
    }

    #[test]
    fn test_serializes_to_compact_form() {
        let encoded = unsecured_jwt("myself");
        let decoded = SignedJWT::decode_no_verify(&encoded).unwrap();

        let serialized = serde_json::to_string(&decoded).unwrap();
        assert_eq!(format!("\"{}\"", encoded), serialized);
    }
}
