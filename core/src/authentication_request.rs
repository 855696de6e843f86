use std::str::FromStr;

use derive_builder::Builder;
use indexmap::{IndexMap, IndexSet};
use itertools::Itertools;
use tracing::error;
use url::Url;

use oidc_request_types::acr::Acr;
use oidc_request_types::claims::Claims;
use oidc_request_types::client_id::ClientId;
use oidc_request_types::display::Display;
use oidc_request_types::jose::jwt::{SignedJWT, JWT};
use oidc_request_types::langtag::{parse_lang_tags, LangTag};
use oidc_request_types::nonce::Nonce;
use oidc_request_types::prompt::Prompt;
use oidc_request_types::response_type::{ResponseType, TOKEN_FLOW};
use oidc_request_types::scopes::Scopes;
use oidc_request_types::state::State;

use crate::error::{OpenIdErrorType, ParseError, RequestContext, SerializeError};
use crate::request_object::RequestObjectJwt;

/// The raw, wire-typed authentication request, before any validation. Every
/// field is optional here; `validate` decides what is acceptable.
#[derive(Debug, Clone, Default)]
pub struct AuthenticationRequest {
    pub response_type: Option<String>,
    pub client_id: Option<String>,
    pub redirect_uri: Option<String>,
    pub scope: Option<String>,
    pub state: Option<String>,
    pub nonce: Option<String>,
    pub display: Option<String>,
    pub prompt: Option<String>,
    pub max_age: Option<String>,
    pub ui_locales: Option<String>,
    pub claims_locales: Option<String>,
    pub id_token_hint: Option<String>,
    pub login_hint: Option<String>,
    pub acr_values: Option<String>,
    pub claims: Option<String>,
    pub request: Option<String>,
    pub request_uri: Option<String>,
}

impl AuthenticationRequest {
    pub fn from_params(params: &IndexMap<String, String>) -> Self {
        let get = |name: &str| params.get(name).cloned();
        AuthenticationRequest {
            response_type: get("response_type"),
            client_id: get("client_id"),
            redirect_uri: get("redirect_uri"),
            scope: get("scope"),
            state: get("state"),
            nonce: get("nonce"),
            display: get("display"),
            prompt: get("prompt"),
            max_age: get("max_age"),
            ui_locales: get("ui_locales"),
            claims_locales: get("claims_locales"),
            id_token_hint: get("id_token_hint"),
            login_hint: get("login_hint"),
            acr_values: get("acr_values"),
            claims: get("claims"),
            request: get("request"),
            request_uri: get("request_uri"),
        }
    }

    pub fn parse_query(query: &str) -> Result<ValidatedAuthenticationRequest, ParseError> {
        let params: IndexMap<String, String> = form_urlencoded::parse(query.as_bytes())
            .into_owned()
            .collect();
        Self::from_params(&params).validate()
    }

    pub fn parse_uri(uri: &Url) -> Result<ValidatedAuthenticationRequest, ParseError> {
        Self::parse_query(uri.query().unwrap_or(""))
    }

    /// Checks every field and the request-level invariants, producing a
    /// typed request or a parse error naming the offending parameter. The
    /// context (client id, redirect URI, state) is attached to every error
    /// so a caller can still address a protocol error response.
    pub fn validate(self) -> Result<ValidatedAuthenticationRequest, ParseError> {
        let mut context = RequestContext {
            client_id: self.client_id.as_deref().map(ClientId::new),
            redirect_uri: None,
            state: self.state.as_deref().map(State::new),
        };

        let redirect_uri = match self.redirect_uri {
            Some(ref raw) => {
                let uri = Url::parse(raw).map_err(|err| {
                    error!("Err parsing redirect_uri {}", err);
                    ParseError::invalid_request("redirect_uri", format!("Invalid redirect_uri: {}", err))
                        .with_context(&context)
                })?;
                context.redirect_uri = Some(uri.clone());
                uri
            }
            None => {
                return Err(
                    ParseError::invalid_request("redirect_uri", "Missing redirect_uri")
                        .with_context(&context),
                )
            }
        };
        let client_id = match context.client_id {
            Some(ref client_id) => client_id.clone(),
            None => {
                return Err(ParseError::invalid_request("client_id", "Missing client_id")
                    .with_context(&context))
            }
        };

        let response_type = match self.response_type {
            Some(ref raw) => ResponseType::from_str(raw).map_err(|err| {
                ParseError::new(
                    "response_type",
                    OpenIdErrorType::UnsupportedResponseType,
                    err.to_string(),
                )
                .with_context(&context)
            })?,
            None => {
                return Err(
                    ParseError::invalid_request("response_type", "Missing response type")
                        .with_context(&context),
                )
            }
        };
        if response_type == *TOKEN_FLOW {
            return Err(ParseError::new(
                "response_type",
                OpenIdErrorType::UnsupportedResponseType,
                "The 'token' response type must not be used alone",
            )
            .with_context(&context));
        }

        let scope = match self.scope {
            Some(ref raw) => Scopes::new(raw.split(' ').collect::<Vec<_>>()),
            None => {
                return Err(ParseError::invalid_request("scope", "Missing scope")
                    .with_context(&context))
            }
        };
        if !scope.has_openid() {
            return Err(ParseError::new(
                "scope",
                OpenIdErrorType::InvalidScope,
                "Scope must contain the 'openid' value",
            )
            .with_context(&context));
        }

        let nonce = self.nonce.as_deref().map(Nonce::new);
        if response_type.implies_implicit_flow() && nonce.is_none() {
            return Err(ParseError::invalid_request(
                "nonce",
                "Nonce is required when the implicit flow is implied",
            )
            .with_context(&context));
        }

        let display = match self.display {
            Some(ref raw) => Some(Display::try_from(raw.as_str()).map_err(|err| {
                ParseError::invalid_request("display", err.to_string()).with_context(&context)
            })?),
            None => None,
        };

        let prompt = match self.prompt {
            Some(ref raw) => Some(parse_prompt_set(raw).map_err(|description| {
                ParseError::invalid_request("prompt", description).with_context(&context)
            })?),
            None => None,
        };

        let max_age = match self.max_age {
            Some(ref raw) => Some(raw.parse::<u64>().map_err(|err| {
                ParseError::invalid_request("max_age", format!("Invalid max_age: {}", err))
                    .with_context(&context)
            })?),
            None => None,
        };

        let ui_locales = parse_locales(self.ui_locales.as_deref(), "ui_locales", &context)?;
        let claims_locales =
            parse_locales(self.claims_locales.as_deref(), "claims_locales", &context)?;

        let id_token_hint = match self.id_token_hint {
            Some(ref raw) => Some(SignedJWT::decode_no_verify(raw).map_err(|err| {
                error!("Err parsing id_token_hint {}", err);
                ParseError::invalid_request("id_token_hint", "Invalid id_token_hint")
                    .with_context(&context)
            })?),
            None => None,
        };

        let acr_values = self.acr_values.map(Acr::from);

        let claims = match self.claims {
            Some(ref raw) => Some(serde_json::from_str::<Claims>(raw).map_err(|err| {
                error!("Error parsing claims request {:?}", err);
                ParseError::invalid_request("claims", "Invalid claims parameter")
                    .with_context(&context)
            })?),
            None => None,
        };

        if self.request.is_some() && self.request_uri.is_some() {
            return Err(ParseError::invalid_request(
                "request",
                "Request and request_uri must not both be present",
            )
            .with_context(&context));
        }
        let request = match self.request {
            Some(ref raw) => Some(RequestObjectJwt::parse(raw).map_err(|err| {
                error!("Err parsing request object {}", err);
                ParseError::new(
                    "request",
                    OpenIdErrorType::InvalidRequestObject,
                    "Unable to parse request object",
                )
                .with_context(&context)
            })?),
            None => None,
        };
        let request_uri = match self.request_uri {
            Some(ref raw) => Some(Url::parse(raw).map_err(|err| {
                ParseError::new(
                    "request_uri",
                    OpenIdErrorType::InvalidRequestUri,
                    format!("Invalid request_uri: {}", err),
                )
                .with_context(&context)
            })?),
            None => None,
        };

        Ok(ValidatedAuthenticationRequest {
            response_type,
            client_id,
            redirect_uri,
            scope,
            state: context.state,
            nonce,
            display,
            prompt,
            max_age,
            ui_locales,
            claims_locales,
            id_token_hint,
            login_hint: self.login_hint,
            acr_values,
            claims,
            request,
            request_uri,
        })
    }
}

pub(crate) fn parse_prompt_set(value: &str) -> Result<IndexSet<Prompt>, String> {
    let prompt: IndexSet<Prompt> = value
        .split(' ')
        .map(Prompt::try_from)
        .collect::<Result<Vec<_>, _>>()
        .map_err(|err| err.to_string())?
        .into_iter()
        .sorted()
        .collect();
    if prompt.contains(&Prompt::None) && prompt.len() > 1 {
        return Err("Prompt 'none' cannot be combined with other prompt values".to_owned());
    }
    Ok(prompt)
}

fn parse_locales(
    raw: Option<&str>,
    parameter: &str,
    context: &RequestContext,
) -> Result<Option<Vec<LangTag>>, ParseError> {
    match raw {
        Some(raw) => parse_lang_tags(raw)
            .map(Some)
            .map_err(|err| ParseError::invalid_request(parameter, err.to_string()).with_context(context)),
        None => Ok(None),
    }
}

/// A fully typed authentication request whose invariants hold. Buildable
/// directly by client code, or obtained by parsing the wire form.
#[derive(Debug, Clone, PartialEq, Eq, Builder)]
#[builder(build_fn(validate = "Self::check_invariants"))]
pub struct ValidatedAuthenticationRequest {
    pub response_type: ResponseType,
    pub client_id: ClientId,
    pub redirect_uri: Url,
    pub scope: Scopes,
    #[builder(default, setter(strip_option))]
    pub state: Option<State>,
    #[builder(default, setter(strip_option))]
    pub nonce: Option<Nonce>,
    #[builder(default, setter(strip_option))]
    pub display: Option<Display>,
    #[builder(default, setter(strip_option))]
    pub prompt: Option<IndexSet<Prompt>>,
    #[builder(default, setter(strip_option))]
    pub max_age: Option<u64>,
    #[builder(default, setter(strip_option))]
    pub ui_locales: Option<Vec<LangTag>>,
    #[builder(default, setter(strip_option))]
    pub claims_locales: Option<Vec<LangTag>>,
    #[builder(default, setter(strip_option))]
    pub id_token_hint: Option<SignedJWT>,
    #[builder(default, setter(strip_option))]
    pub login_hint: Option<String>,
    #[builder(default, setter(strip_option))]
    pub acr_values: Option<Acr>,
    #[builder(default, setter(strip_option))]
    pub claims: Option<Claims>,
    #[builder(default, setter(strip_option))]
    pub request: Option<RequestObjectJwt>,
    #[builder(default, setter(strip_option))]
    pub request_uri: Option<Url>,
}

impl ValidatedAuthenticationRequestBuilder {
    fn check_invariants(&self) -> Result<(), String> {
        if let Some(ref response_type) = self.response_type {
            if response_type.is_empty() {
                return Err("response_type must not be empty".to_owned());
            }
            if *response_type == *TOKEN_FLOW {
                return Err("the 'token' response type must not be used alone".to_owned());
            }
            if response_type.implies_implicit_flow() && !matches!(self.nonce, Some(Some(_))) {
                return Err("nonce is required when the implicit flow is implied".to_owned());
            }
        }
        if let Some(ref scope) = self.scope {
            if !scope.has_openid() {
                return Err("scope must contain the 'openid' value".to_owned());
            }
        }
        if matches!(self.request, Some(Some(_))) && matches!(self.request_uri, Some(Some(_))) {
            return Err("request and request_uri are mutually exclusive".to_owned());
        }
        if let Some(Some(ref prompt)) = self.prompt {
            if prompt.contains(&Prompt::None) && prompt.len() > 1 {
                return Err("prompt 'none' cannot be combined with other prompt values".to_owned());
            }
        }
        Ok(())
    }
}

impl ValidatedAuthenticationRequest {
    pub fn builder() -> ValidatedAuthenticationRequestBuilder {
        ValidatedAuthenticationRequestBuilder::default()
    }

    /// Serialises every present field back to its canonical wire form.
    pub fn to_parameters(&self) -> Result<IndexMap<String, String>, SerializeError> {
        let mut params = IndexMap::new();
        params.insert("response_type".to_owned(), self.response_type.to_string());
        params.insert("client_id".to_owned(), self.client_id.to_string());
        params.insert("redirect_uri".to_owned(), self.redirect_uri.to_string());
        params.insert("scope".to_owned(), self.scope.to_string());
        if let Some(ref state) = self.state {
            params.insert("state".to_owned(), state.to_string());
        }
        if let Some(ref nonce) = self.nonce {
            params.insert("nonce".to_owned(), nonce.to_string());
        }
        if let Some(display) = self.display {
            params.insert("display".to_owned(), display.to_string());
        }
        if let Some(ref prompt) = self.prompt {
            params.insert("prompt".to_owned(), prompt.iter().join(" "));
        }
        if let Some(max_age) = self.max_age {
            params.insert("max_age".to_owned(), max_age.to_string());
        }
        if let Some(ref ui_locales) = self.ui_locales {
            params.insert("ui_locales".to_owned(), ui_locales.iter().join(" "));
        }
        if let Some(ref claims_locales) = self.claims_locales {
            params.insert("claims_locales".to_owned(), claims_locales.iter().join(" "));
        }
        if let Some(ref id_token_hint) = self.id_token_hint {
            params.insert("id_token_hint".to_owned(), id_token_hint.serialized().to_owned());
        }
        if let Some(ref login_hint) = self.login_hint {
            params.insert("login_hint".to_owned(), login_hint.clone());
        }
        if let Some(ref acr_values) = self.acr_values {
            params.insert("acr_values".to_owned(), acr_values.to_string());
        }
        if let Some(ref claims) = self.claims {
            params.insert("claims".to_owned(), serde_json::to_string(claims)?);
        }
        if let Some(ref request) = self.request {
            params.insert("request".to_owned(), request.serialized().to_owned());
        }
        if let Some(ref request_uri) = self.request_uri {
            params.insert("request_uri".to_owned(), request_uri.to_string());
        }
        Ok(params)
    }

    /// Appends the encoded request to the given authorisation endpoint.
    pub fn to_uri(&self, endpoint: &Url) -> Result<Url, SerializeError> {
        let params = self.to_parameters()?;
        let mut uri = endpoint.clone();
        {
            let mut query = uri.query_pairs_mut();
            query.extend_pairs(params.iter());
        }
        Ok(uri)
    }
}

#[cfg(test)]
mod tests {
    use indexmap::IndexMap;
    use url::Url;

    use oidc_request_types::claims::ClaimEntry;
    use oidc_request_types::nonce::Nonce;
    use oidc_request_types::prompt::Prompt;
    use oidc_request_types::response_type::{CODE_FLOW, CODE_ID_TOKEN_FLOW};
    use oidc_request_types::scopes::Scopes;

    use crate::authentication_request::{AuthenticationRequest, ValidatedAuthenticationRequest};
    use crate::error::OpenIdErrorType;

    fn base_params() -> IndexMap<String, String> {
        let mut params = IndexMap::new();
        params.insert("response_type".to_owned(), "code".to_owned());
        params.insert("client_id".to_owned(), "s6BhdRkqt3".to_owned());
        params.insert(
            "redirect_uri".to_owned(),
            "https://client.example.org/cb".to_owned(),
        );
        params.insert("scope".to_owned(), "openid profile".to_owned());
        params.insert("state".to_owned(), "af0ifjsldkj".to_owned());
        params
    }

    fn parse(params: &IndexMap<String, String>) -> ValidatedAuthenticationRequest {
        AuthenticationRequest::from_params(params)
            .validate()
            .expect("request should be valid")
    }

    #[test]
    fn test_can_parse_a_minimal_code_request() {
        let request = parse(&base_params());

        assert_eq!(*CODE_FLOW, request.response_type);
        assert_eq!("s6BhdRkqt3", request.client_id.as_str());
        assert_eq!("openid profile", request.scope.to_string());
        assert_eq!("af0ifjsldkj", request.state.as_ref().unwrap().to_string());
        assert!(request.nonce.is_none());
    }

    #[test]
    fn test_can_parse_extended_parameters() {
        let mut params = base_params();
        params.insert("response_type".to_owned(), "code id_token".to_owned());
        params.insert("nonce".to_owned(), "n-0S6_WzA2Mj".to_owned());
        params.insert("display".to_owned(), "popup".to_owned());
        params.insert("prompt".to_owned(), "login consent".to_owned());
        params.insert("max_age".to_owned(), "3600".to_owned());
        params.insert("ui_locales".to_owned(), "fr-CA fr en".to_owned());
        params.insert("acr_values".to_owned(), "urn:mace:gold".to_owned());
        params.insert(
            "claims".to_owned(),
            r#"{"userinfo":{"email":{"essential":true}}}"#.to_owned(),
        );

        let request = parse(&params);

        assert_eq!(*CODE_ID_TOKEN_FLOW, request.response_type);
        assert_eq!(3600, request.max_age.unwrap());
        assert_eq!(3, request.ui_locales.as_ref().unwrap().len());
        let prompt = request.prompt.as_ref().unwrap();
        assert!(prompt.contains(&Prompt::Login) && prompt.contains(&Prompt::Consent));
        let claims = request.claims.as_ref().unwrap();
        assert!(claims.userinfo.get("email").unwrap().is_essential());
    }

    #[test]
    fn test_missing_openid_scope_is_rejected() {
        let mut params = base_params();
        params.insert("scope".to_owned(), "profile email".to_owned());

        let err = AuthenticationRequest::from_params(&params)
            .validate()
            .unwrap_err();

        assert_eq!("scope", err.parameter());
        assert_eq!(OpenIdErrorType::InvalidScope, err.error_type());
    }

    #[test]
    fn test_token_alone_is_rejected() {
        let mut params = base_params();
        params.insert("response_type".to_owned(), "token".to_owned());
        params.insert("nonce".to_owned(), "n-0S6_WzA2Mj".to_owned());

        let err = AuthenticationRequest::from_params(&params)
            .validate()
            .unwrap_err();

        assert_eq!("response_type", err.parameter());
        assert_eq!(OpenIdErrorType::UnsupportedResponseType, err.error_type());
    }

    #[test]
    fn test_implicit_flow_requires_nonce() {
        let mut params = base_params();
        params.insert("response_type".to_owned(), "id_token".to_owned());

        let err = AuthenticationRequest::from_params(&params)
            .validate()
            .unwrap_err();

        assert_eq!("nonce", err.parameter());
    }

    #[test]
    fn test_request_and_request_uri_are_mutually_exclusive() {
        let mut params = base_params();
        params.insert("request".to_owned(), "eyJh.eyJi.c2ln".to_owned());
        params.insert(
            "request_uri".to_owned(),
            "https://client.example.org/request.jwt".to_owned(),
        );

        let err = AuthenticationRequest::from_params(&params)
            .validate()
            .unwrap_err();

        assert_eq!("request", err.parameter());
    }

    #[test]
    fn test_parse_errors_carry_the_request_context() {
        let mut params = base_params();
        params.insert("max_age".to_owned(), "not-a-number".to_owned());

        let err = AuthenticationRequest::from_params(&params)
            .validate()
            .unwrap_err();

        assert_eq!("max_age", err.parameter());
        let context = err.context();
        assert_eq!("s6BhdRkqt3", context.client_id.as_ref().unwrap().as_str());
        assert!(context.redirect_uri.is_some());
        assert!(context.state.is_some());
    }

    #[test]
    fn test_bad_language_tag_is_rejected() {
        let mut params = base_params();
        params.insert("claims_locales".to_owned(), "en pt_BR".to_owned());

        let err = AuthenticationRequest::from_params(&params)
            .validate()
            .unwrap_err();

        assert_eq!("claims_locales", err.parameter());
    }

    #[test]
    fn test_round_trip_through_parameters() {
        let mut params = base_params();
        params.insert("response_type".to_owned(), "code id_token".to_owned());
        params.insert("nonce".to_owned(), "n-0S6_WzA2Mj".to_owned());
        params.insert("prompt".to_owned(), "consent".to_owned());
        params.insert("max_age".to_owned(), "86400".to_owned());
        params.insert("ui_locales".to_owned(), "en-GB en".to_owned());
        params.insert(
            "claims".to_owned(),
            r#"{"userinfo":{"email":null},"id_token":{}}"#.to_owned(),
        );
        let request = parse(&params);

        let wire = request.to_parameters().unwrap();
        let reparsed = AuthenticationRequest::from_params(&wire).validate().unwrap();

        assert_eq!(request, reparsed);
    }

    #[test]
    fn test_round_trip_through_uri() {
        let request = parse(&base_params());
        let endpoint = Url::parse("https://server.example.com/authorize").unwrap();

        let uri = request.to_uri(&endpoint).unwrap();
        let reparsed = AuthenticationRequest::parse_uri(&uri).unwrap();

        assert_eq!(request, reparsed);
    }

    #[test]
    fn test_builder_enforces_the_same_invariants() {
        let result = ValidatedAuthenticationRequest::builder()
            .response_type(CODE_ID_TOKEN_FLOW.clone())
            .client_id(oidc_request_types::client_id::ClientId::new("s6BhdRkqt3"))
            .redirect_uri(Url::parse("https://client.example.org/cb").unwrap())
            .scope(Scopes::new(vec!["openid"]))
            .build();
        assert!(result.is_err(), "implicit flow without nonce should fail");

        let request = ValidatedAuthenticationRequest::builder()
            .response_type(CODE_ID_TOKEN_FLOW.clone())
            .client_id(oidc_request_types::client_id::ClientId::new("s6BhdRkqt3"))
            .redirect_uri(Url::parse("https://client.example.org/cb").unwrap())
            .scope(Scopes::new(vec!["openid"]))
            .nonce(Nonce::new("n-0S6_WzA2Mj"))
            .build()
            .unwrap();
        assert!(request.response_type.implies_implicit_flow());
    }

    #[test]
    fn test_claims_parameter_survives_serialization() {
        let mut params = base_params();
        params.insert(
            "claims".to_owned(),
            r#"{"userinfo":{"nickname":null,"email":{"essential":true}}}"#.to_owned(),
        );
        let request = parse(&params);

        let wire = request.to_parameters().unwrap();
        let reparsed = AuthenticationRequest::from_params(&wire).validate().unwrap();

        let claims = reparsed.claims.unwrap();
        assert_eq!(Some(&ClaimEntry::Voluntary), claims.userinfo.get("nickname"));
        assert!(claims.userinfo.get("email").unwrap().is_essential());
    }
}
