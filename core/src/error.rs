use std::fmt::{Display, Formatter};

use indexmap::IndexMap;
use serde::Serialize;
use thiserror::Error;
use url::Url;

use oidc_request_types::claims::InvalidClaimError;
use oidc_request_types::client_id::ClientId;
use oidc_request_types::jose::error::JWTError;
use oidc_request_types::state::State;
use oidc_request_types::url_encodable::UrlEncodable;

use crate::request_object::RetrieveError;

/// Machine readable OAuth2/OIDC error codes, in the wire form expected by an
/// authorisation error response.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum OpenIdErrorType {
    InvalidRequest,
    InvalidRequestObject,
    InvalidRequestUri,
    InvalidScope,
    UnauthorizedClient,
    UnsupportedResponseType,
    ServerError,
}

impl Display for OpenIdErrorType {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            OpenIdErrorType::InvalidRequest => write!(f, "invalid_request"),
            OpenIdErrorType::InvalidRequestObject => write!(f, "invalid_request_object"),
            OpenIdErrorType::InvalidRequestUri => write!(f, "invalid_request_uri"),
            OpenIdErrorType::InvalidScope => write!(f, "invalid_scope"),
            OpenIdErrorType::UnauthorizedClient => write!(f, "unauthorized_client"),
            OpenIdErrorType::UnsupportedResponseType => write!(f, "unsupported_response_type"),
            OpenIdErrorType::ServerError => write!(f, "server_error"),
        }
    }
}

/// The request context gathered before a parse failure, so a caller can still
/// address a protocol-level error response.
#[derive(Debug, Clone, Default, Eq, PartialEq)]
pub struct RequestContext {
    pub client_id: Option<ClientId>,
    pub redirect_uri: Option<Url>,
    pub state: Option<State>,
}

/// Syntax-level failure while parsing an authentication request parameter.
#[derive(Error, Debug)]
#[error("Error parsing parameter '{}': {}", .parameter, .description)]
pub struct ParseError {
    parameter: String,
    error_type: OpenIdErrorType,
    description: String,
    context: RequestContext,
}

impl ParseError {
    pub(crate) fn new<D: Into<String>>(
        parameter: &str,
        error_type: OpenIdErrorType,
        description: D,
    ) -> Self {
        Self {
            parameter: parameter.to_owned(),
            error_type,
            description: description.into(),
            context: RequestContext::default(),
        }
    }

    pub(crate) fn invalid_request<D: Into<String>>(parameter: &str, description: D) -> Self {
        Self::new(parameter, OpenIdErrorType::InvalidRequest, description)
    }

    pub(crate) fn with_context(mut self, context: &RequestContext) -> Self {
        self.context = context.clone();
        self
    }

    pub fn parameter(&self) -> &str {
        &self.parameter
    }

    pub fn error_type(&self) -> OpenIdErrorType {
        self.error_type
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn context(&self) -> &RequestContext {
        &self.context
    }
}

impl UrlEncodable for ParseError {
    fn params(self) -> IndexMap<String, String> {
        let mut parameters = IndexMap::new();
        parameters.insert("error".to_owned(), self.error_type.to_string());
        parameters.insert("error_description".to_owned(), self.description);
        if let Some(state) = self.context.state {
            parameters.extend(state.params());
        }
        parameters
    }
}

/// Failure during request-object resolution. Every variant maps to the OIDC
/// error code a server should put in its authorisation error response.
#[derive(Error, Debug)]
pub enum ResolveError {
    #[error("Unable to retrieve request object")]
    Retrieval(#[source] RetrieveError),
    #[error("Invalid request object")]
    Decode(#[source] JWTError),
    #[error("Request object must be signed")]
    UnsignedRequestObject,
    #[error("Request and request_uri are both present")]
    RequestAndUri,
    #[error("Parameter '{}' in the request object conflicts with the top-level value", .parameter)]
    Mismatch { parameter: &'static str },
    #[error("Invalid parameter '{}' in the request object", .parameter)]
    InvalidParameter {
        parameter: &'static str,
        #[source]
        source: anyhow::Error,
    },
    #[error("Invalid claims in the request object")]
    InvalidClaims(#[from] InvalidClaimError),
}

impl ResolveError {
    pub fn error_code(&self) -> OpenIdErrorType {
        match self {
            ResolveError::Retrieval(_) => OpenIdErrorType::InvalidRequestUri,
            ResolveError::Decode(_) | ResolveError::UnsignedRequestObject => {
                OpenIdErrorType::InvalidRequestObject
            }
            ResolveError::RequestAndUri
            | ResolveError::Mismatch { .. }
            | ResolveError::InvalidParameter { .. }
            | ResolveError::InvalidClaims(_) => OpenIdErrorType::InvalidRequest,
        }
    }
}

impl UrlEncodable for ResolveError {
    fn params(self) -> IndexMap<String, String> {
        let mut parameters = IndexMap::new();
        parameters.insert("error".to_owned(), self.error_code().to_string());
        parameters.insert("error_description".to_owned(), self.to_string());
        parameters
    }
}

/// Failure while producing wire output.
#[derive(Error, Debug)]
pub enum SerializeError {
    #[error("Unable to serialize the claims parameter")]
    Claims(#[from] serde_json::Error),
}

#[cfg(test)]
mod tests {
    use oidc_request_types::claims::InvalidClaimError;
    use oidc_request_types::jose::error::JWTError;

    use crate::error::{OpenIdErrorType, ResolveError};
    use crate::request_object::RetrieveError;

    #[test]
    fn test_resolve_errors_map_to_oidc_error_codes() {
        let bad_token = JWTError::InvalidJwtFormat("abc".to_owned());
        let retrieval = ResolveError::Retrieval(RetrieveError::Parse(bad_token));
        assert_eq!(OpenIdErrorType::InvalidRequestUri, retrieval.error_code());

        let mismatch = ResolveError::Mismatch { parameter: "scope" };
        assert_eq!(OpenIdErrorType::InvalidRequest, mismatch.error_code());

        let claims =
            ResolveError::InvalidClaims(InvalidClaimError::ValuesNotStrings("acr".to_owned()));
        assert_eq!(OpenIdErrorType::InvalidRequest, claims.error_code());
    }

    #[test]
    fn test_error_codes_use_wire_form() {
        assert_eq!(
            "invalid_request_object",
            OpenIdErrorType::InvalidRequestObject.to_string()
        );
        assert_eq!(
            "unsupported_response_type",
            OpenIdErrorType::UnsupportedResponseType.to_string()
        );
    }
}
