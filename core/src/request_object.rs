use std::str;
use std::time::Duration;

use async_trait::async_trait;
use josekit::jwe::{JweContext, JweHeader};
use josekit::jwk::Jwk;
use josekit::jwt::JwtPayload;
use serde_json::{Map, Value};
use tracing::debug;
use url::Url;

use oidc_request_types::jose::error::JWTError;
use oidc_request_types::jose::jwk_ext::JwkExt;
use oidc_request_types::jose::jws::SigningAlgorithm;
use oidc_request_types::jose::jwt::{SignedJWT, JWT};

/// Server-side policy for the `request`/`request_uri` parameters.
#[derive(Debug, Clone)]
pub struct RequestObjectConfiguration {
    pub request: bool,
    pub request_uri: bool,
    pub require_signed_request_object: bool,
}

impl Default for RequestObjectConfiguration {
    fn default() -> Self {
        Self {
            request: true,
            request_uri: true,
            require_signed_request_object: false,
        }
    }
}

/// A request object token as received, before any verification or
/// decryption. The payload of an encrypted object is not readable here; only
/// a decoder can produce it.
#[derive(Debug, Clone)]
pub enum RequestObjectJwt {
    Signed(SignedJWT),
    Encrypted {
        header: JweHeader,
        serialized: String,
    },
}

impl RequestObjectJwt {
    pub fn parse(jwt: &str) -> Result<Self, JWTError> {
        let parts = jwt.split('.').collect::<Vec<_>>();
        match parts.len() {
            3 => Ok(RequestObjectJwt::Signed(SignedJWT::decode_no_verify(jwt)?)),
            5 => {
                let header = JweHeader::from_bytes(parts[0].as_bytes())
                    .map_err(JWTError::HeaderParseError)?;
                Ok(RequestObjectJwt::Encrypted {
                    header,
                    serialized: jwt.to_owned(),
                })
            }
            _ => Err(JWTError::InvalidJwtFormat(
                "Expected signed or encrypted JWT".to_owned(),
            )),
        }
    }

    /// The signing algorithm, when the outer layer is a JWS.
    pub fn alg(&self) -> Option<SigningAlgorithm> {
        match self {
            RequestObjectJwt::Signed(inner) => inner.alg(),
            RequestObjectJwt::Encrypted { .. } => None,
        }
    }

    pub fn serialized(&self) -> &str {
        match self {
            RequestObjectJwt::Signed(inner) => inner.serialized(),
            RequestObjectJwt::Encrypted { serialized, .. } => serialized,
        }
    }
}

impl PartialEq for RequestObjectJwt {
    fn eq(&self, other: &Self) -> bool {
        self.serialized() == other.serialized()
    }
}

impl Eq for RequestObjectJwt {}

/// Performs signature validation and/or decryption, releasing the payload
/// only when the token checks out.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait RequestObjectDecoder {
    async fn decode(&self, jwt: &RequestObjectJwt) -> Result<JwtPayload, JWTError>;
}

/// Fetches a request object referenced by `request_uri`. A single attempt,
/// no retry and no caching; both are caller concerns.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait RequestObjectRetriever {
    async fn fetch(&self, uri: &Url) -> Result<RequestObjectJwt, RetrieveError>;
}

#[derive(Debug, thiserror::Error)]
pub enum RetrieveError {
    #[error("Error fetching request object from {}", .uri)]
    Io {
        uri: Url,
        #[source]
        source: reqwest::Error,
    },
    #[error("Fetched content is not a request object")]
    Parse(#[from] JWTError),
}

/// Decoder backed by a fixed set of keys, e.g. the keys registered for a
/// client plus the server's own decryption keys.
#[derive(Debug, Default)]
pub struct JwkSetDecoder {
    keys: Vec<Jwk>,
}

impl JwkSetDecoder {
    pub fn new(keys: Vec<Jwk>) -> Self {
        Self { keys }
    }

    fn select_key(&self, alg: &str, kid: Option<&str>) -> Option<&Jwk> {
        self.keys
            .iter()
            .filter(|key| key.algorithm() == Some(alg))
            .find(|key| match kid {
                Some(kid) => key.key_id() == Some(kid),
                None => true,
            })
    }

    fn verify_signed(&self, jwt: &SignedJWT) -> Result<JwtPayload, JWTError> {
        let alg = jwt.alg().ok_or(JWTError::JWKAlgorithmNotFound)?;
        if alg.is_unsecured() {
            // Nothing to verify; the resolver decides whether unsigned
            // objects are acceptable at all.
            return Ok(jwt.payload().clone());
        }
        let key = self
            .select_key(alg.name(), jwt.kid())
            .ok_or_else(|| JWTError::KeyNotFound("request object verification".to_owned()))?;
        jwt.verify(key)?;
        Ok(jwt.payload().clone())
    }

    fn decrypt(&self, header: &JweHeader, serialized: &str) -> Result<JwtPayload, JWTError> {
        let alg = header.algorithm().ok_or(JWTError::JWKAlgorithmNotFound)?;
        let key = self
            .select_key(alg, header.key_id())
            .ok_or_else(|| JWTError::KeyNotFound("request object decryption".to_owned()))?;
        let decrypter = key.get_decrypter().map_err(JWTError::DecrypterCreationError)?;
        let jwe = JweContext::new();
        let (content, header) = jwe
            .deserialize_compact(serialized, &*decrypter)
            .map_err(JWTError::DecryptError)?;

        match header.content_type() {
            Some(cty) if cty == "JWT" => {
                let nested = str::from_utf8(&content)?;
                let nested = SignedJWT::decode_no_verify(nested)?;
                self.verify_signed(&nested)
            }
            Some(_) | None => {
                let map: Map<String, Value> = serde_json::from_slice(&content)?;
                Ok(JwtPayload::from_map(map)?)
            }
        }
    }
}

#[async_trait]
impl RequestObjectDecoder for JwkSetDecoder {
    async fn decode(&self, jwt: &RequestObjectJwt) -> Result<JwtPayload, JWTError> {
        match jwt {
            RequestObjectJwt::Signed(inner) => self.verify_signed(inner),
            RequestObjectJwt::Encrypted { header, serialized } => {
                self.decrypt(header, serialized)
            }
        }
    }
}

/// Retriever over plain HTTP(S). Timeouts bound the worst case of an
/// unresponsive remote host; cancellation must come from the surrounding I/O.
#[derive(Debug, Clone)]
pub struct HttpRetriever {
    client: reqwest::Client,
}

impl HttpRetriever {
    pub fn new(connect_timeout: Duration, read_timeout: Duration) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder()
            .connect_timeout(connect_timeout)
            .timeout(read_timeout)
            .build()?;
        Ok(Self { client })
    }
}

#[async_trait]
impl RequestObjectRetriever for HttpRetriever {
    async fn fetch(&self, uri: &Url) -> Result<RequestObjectJwt, RetrieveError> {
        debug!("Fetching request object from {}", uri);
        let content = self
            .client
            .get(uri.as_str())
            .send()
            .await
            .and_then(|response| response.error_for_status())
            .map_err(|source| RetrieveError::Io {
                uri: uri.clone(),
                source,
            })?
            .text()
            .await
            .map_err(|source| RetrieveError::Io {
                uri: uri.clone(),
                source,
            })?;
        Ok(RequestObjectJwt::parse(content.trim())?)
    }
}
