use std::str::FromStr;

use anyhow::anyhow;
use indexmap::{IndexMap, IndexSet};
use josekit::jwt::JwtPayload;
use serde::Deserialize;
use serde_json::Value;
use tracing::debug;
use url::Url;

use oidc_request_types::acr::Acr;
use oidc_request_types::claims::{AcrRequest, ClaimEntry, ClaimsRequest};
use oidc_request_types::client_id::ClientId;
use oidc_request_types::display::Display;
use oidc_request_types::jose::jwt::SignedJWT;
use oidc_request_types::langtag::{parse_lang_tags, LangTag};
use oidc_request_types::nonce::Nonce;
use oidc_request_types::prompt::Prompt;
use oidc_request_types::response_type::{ResponseType, TOKEN_FLOW};
use oidc_request_types::scopes::Scopes;
use oidc_request_types::state::State;

use crate::authentication_request::{parse_prompt_set, ValidatedAuthenticationRequest};
use crate::claims_resolver::{
    default_userinfo_claims, merge_claims, required_id_token_claims, required_userinfo_claims,
};
use crate::error::ResolveError;
use crate::request_object::{
    RequestObjectConfiguration, RequestObjectDecoder, RequestObjectJwt, RequestObjectRetriever,
};

/// Resolves an authentication request against its request object, when one
/// is present. One resolution is one call; the resolver itself holds only
/// collaborators and policy, never per-request state.
pub struct RequestObjectResolver<D, R> {
    decoder: D,
    retriever: R,
    config: RequestObjectConfiguration,
}

/// The outcome of resolution: every top-level parameter with the request
/// object folded in, plus the claims each downstream token must carry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedAuthenticationRequest {
    pub response_type: ResponseType,
    pub client_id: ClientId,
    pub redirect_uri: Url,
    pub scope: Scopes,
    pub state: Option<State>,
    pub nonce: Option<Nonce>,
    pub display: Option<Display>,
    pub prompt: Option<IndexSet<Prompt>>,
    pub max_age: Option<u64>,
    pub ui_locales: Option<Vec<LangTag>>,
    pub claims_locales: Option<Vec<LangTag>>,
    pub id_token_hint: Option<SignedJWT>,
    pub login_hint: Option<String>,
    pub acr_values: Option<Acr>,
    pub id_token_claims: ClaimsRequest,
    pub userinfo_claims: ClaimsRequest,
    pub preferred_locales: Option<Vec<LangTag>>,
}

impl ResolvedAuthenticationRequest {
    /// The requested authentication context, if the client asked for one.
    /// The `acr` entry structure was already checked during resolution.
    pub fn requested_acrs(&self) -> Option<AcrRequest> {
        self.id_token_claims.requested_acrs().ok().flatten()
    }
}

/// The `id_token` member of a request object payload.
#[derive(Debug, Default, Deserialize)]
struct IdTokenSection {
    #[serde(default)]
    claims: IndexMap<String, ClaimEntry>,
    #[serde(default)]
    max_age: Option<u64>,
}

/// The `userinfo` member of a request object payload.
#[derive(Debug, Default, Deserialize)]
struct UserInfoSection {
    #[serde(default)]
    claims: IndexMap<String, ClaimEntry>,
    #[serde(default)]
    preferred_locales: Option<String>,
}

impl<D, R> RequestObjectResolver<D, R>
where
    D: RequestObjectDecoder,
    R: RequestObjectRetriever,
{
    pub fn new(decoder: D, retriever: R, config: RequestObjectConfiguration) -> Self {
        Self {
            decoder,
            retriever,
            config,
        }
    }

    pub async fn resolve(
        &self,
        request: ValidatedAuthenticationRequest,
    ) -> Result<ResolvedAuthenticationRequest, ResolveError> {
        let payload = self.request_object_payload(&request).await?;

        let ValidatedAuthenticationRequest {
            mut response_type,
            mut client_id,
            mut redirect_uri,
            mut scope,
            mut state,
            mut nonce,
            mut display,
            mut prompt,
            mut max_age,
            ui_locales,
            claims_locales,
            mut id_token_hint,
            login_hint,
            acr_values,
            claims,
            ..
        } = request;

        let (top_userinfo, top_id_token) = match claims {
            Some(claims) => (claims.userinfo, claims.id_token),
            None => (IndexMap::new(), IndexMap::new()),
        };

        let mut id_token_section = IdTokenSection::default();
        let mut userinfo_section = UserInfoSection::default();

        if let Some(payload) = payload {
            response_type = resolve_covered_param(
                "response_type",
                response_type,
                payload.claim("response_type"),
                |raw| ResponseType::from_str(raw).map_err(anyhow::Error::new),
                |top, other| top.contains_all(other),
            )?;
            scope = resolve_covered_param(
                "scope",
                scope,
                payload.claim("scope"),
                |raw| Ok(Scopes::new(raw.split(' ').collect::<Vec<_>>())),
                |top, other| top.contains_all(other),
            )?;
            client_id = resolve_covered_param(
                "client_id",
                client_id,
                payload.claim("client_id"),
                |raw| Ok(ClientId::new(raw)),
                |top, other| top == other,
            )?;
            redirect_uri = resolve_covered_param(
                "redirect_uri",
                redirect_uri,
                payload.claim("redirect_uri"),
                |raw| Url::parse(raw).map_err(anyhow::Error::new),
                |top, other| top == other,
            )?;
            state = resolve_param("state", state, payload.claim("state"), |raw| {
                Ok(State::new(raw))
            })?;
            nonce = resolve_param("nonce", nonce, payload.claim("nonce"), |raw| {
                Ok(Nonce::new(raw))
            })?;
            display = resolve_param("display", display, payload.claim("display"), |raw| {
                Display::try_from(raw).map_err(anyhow::Error::new)
            })?;
            prompt = resolve_param("prompt", prompt, payload.claim("prompt"), |raw| {
                parse_prompt_set(raw).map_err(|msg| anyhow!(msg))
            })?;
            id_token_hint = resolve_param(
                "id_token_hint",
                id_token_hint,
                payload.claim("id_token_hint"),
                |raw| SignedJWT::decode_no_verify(raw).map_err(anyhow::Error::new),
            )?;

            id_token_section = parse_section("id_token", payload.claim("id_token"))?;
            userinfo_section = parse_section("userinfo", payload.claim("userinfo"))?;

            // A payload copy may be narrower than the top-level value, but
            // the message invariants still hold for the resolved request.
            if !scope.has_openid() {
                return Err(ResolveError::InvalidParameter {
                    parameter: "scope",
                    source: anyhow!("scope must contain the 'openid' value"),
                });
            }
            if response_type == *TOKEN_FLOW {
                return Err(ResolveError::InvalidParameter {
                    parameter: "response_type",
                    source: anyhow!("the 'token' response type must not be used alone"),
                });
            }
        }

        if let Some(payload_max_age) = id_token_section.max_age {
            max_age = Some(payload_max_age);
        }
        let preferred_locales = match userinfo_section.preferred_locales {
            Some(ref raw) => Some(parse_lang_tags(raw).map_err(|source| {
                ResolveError::InvalidParameter {
                    parameter: "preferred_locales",
                    source: anyhow::Error::new(source),
                }
            })?),
            None => None,
        };

        let id_token_claims = ClaimsRequest::new(
            required_id_token_claims(&response_type),
            merge_claims(top_id_token, id_token_section.claims),
        );
        // Surface a structurally invalid acr entry now rather than when the
        // authentication context is eventually consulted.
        id_token_claims.requested_acrs()?;

        let userinfo_claims = ClaimsRequest::new(
            required_userinfo_claims(),
            merge_claims(
                merge_claims(default_userinfo_claims(&scope), top_userinfo),
                userinfo_section.claims,
            ),
        );

        Ok(ResolvedAuthenticationRequest {
            response_type,
            client_id,
            redirect_uri,
            scope,
            state,
            nonce,
            display,
            prompt,
            max_age,
            ui_locales,
            claims_locales,
            id_token_hint,
            login_hint,
            acr_values,
            id_token_claims,
            userinfo_claims,
            preferred_locales,
        })
    }

    async fn request_object_payload(
        &self,
        request: &ValidatedAuthenticationRequest,
    ) -> Result<Option<JwtPayload>, ResolveError> {
        let config = &self.config;
        let jwt: RequestObjectJwt = match (
            config.request,
            config.request_uri,
            &request.request,
            &request.request_uri,
        ) {
            (_, _, Some(_), Some(_)) => return Err(ResolveError::RequestAndUri),
            (true, _, Some(jwt), None) => jwt.clone(),
            (_, true, None, Some(uri)) => {
                debug!("Retrieving request object from {}", uri);
                self.retriever
                    .fetch(uri)
                    .await
                    .map_err(ResolveError::Retrieval)?
            }
            _ => return Ok(None),
        };
        if config.require_signed_request_object {
            if let Some(alg) = jwt.alg() {
                if alg.is_unsecured() {
                    return Err(ResolveError::UnsignedRequestObject);
                }
            }
        }
        let payload = self
            .decoder
            .decode(&jwt)
            .await
            .map_err(ResolveError::Decode)?;
        Ok(Some(payload))
    }
}

/// Cross-validates one optional parameter against the payload. The payload
/// value, once parsed, must equal the top-level value when both are present;
/// either side alone stands as the resolved value.
fn resolve_param<T, F>(
    parameter: &'static str,
    top: Option<T>,
    value: Option<&Value>,
    parse: F,
) -> Result<Option<T>, ResolveError>
where
    T: PartialEq,
    F: FnOnce(&str) -> Result<T, anyhow::Error>,
{
    let value = match value {
        Some(value) => value,
        None => return Ok(top),
    };
    let parsed = parse_string_param(parameter, value, parse)?;
    match top {
        Some(top) if top != parsed => Err(ResolveError::Mismatch { parameter }),
        _ => Ok(Some(parsed)),
    }
}

/// Cross-validates a mandatory parameter. `covers` decides acceptance:
/// plain equality for scalar parameters, top-level-contains-payload for the
/// set-valued ones. The payload copy becomes the resolved value.
fn resolve_covered_param<T, F, C>(
    parameter: &'static str,
    top: T,
    value: Option<&Value>,
    parse: F,
    covers: C,
) -> Result<T, ResolveError>
where
    F: FnOnce(&str) -> Result<T, anyhow::Error>,
    C: FnOnce(&T, &T) -> bool,
{
    let value = match value {
        Some(value) => value,
        None => return Ok(top),
    };
    let parsed = parse_string_param(parameter, value, parse)?;
    if !covers(&top, &parsed) {
        return Err(ResolveError::Mismatch { parameter });
    }
    Ok(parsed)
}

fn parse_string_param<T, F>(
    parameter: &'static str,
    value: &Value,
    parse: F,
) -> Result<T, ResolveError>
where
    F: FnOnce(&str) -> Result<T, anyhow::Error>,
{
    let raw = value
        .as_str()
        .ok_or_else(|| ResolveError::InvalidParameter {
            parameter,
            source: anyhow!("expected a string value"),
        })?;
    parse(raw).map_err(|source| ResolveError::InvalidParameter { parameter, source })
}

fn parse_section<T>(parameter: &'static str, value: Option<&Value>) -> Result<T, ResolveError>
where
    T: serde::de::DeserializeOwned + Default,
{
    match value {
        Some(value) => {
            serde_json::from_value(value.clone()).map_err(|source| ResolveError::InvalidParameter {
                parameter,
                source: anyhow::Error::new(source),
            })
        }
        None => Ok(T::default()),
    }
}
