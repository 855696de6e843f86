use indexmap::{IndexMap, IndexSet};

use oidc_request_types::claims::ClaimEntry;
use oidc_request_types::response_type::{ResponseType, ResponseTypeValue};
use oidc_request_types::scopes::{claims_for, scope_claims, Scopes, OPENID};

const ID_TOKEN_BASE_CLAIMS: [&str; 5] = ["iss", "sub", "aud", "exp", "iat"];

/// The ID Token claims an authorisation server must always return for the
/// given response type. The hash claims bind the token to artefacts issued
/// alongside it, so each is required only when its artefact is.
pub fn required_id_token_claims(response_type: &ResponseType) -> IndexSet<String> {
    let mut required: IndexSet<String> = ID_TOKEN_BASE_CLAIMS
        .iter()
        .map(|claim| (*claim).to_owned())
        .collect();
    if response_type.implies_implicit_flow() {
        required.insert("nonce".to_owned());
        if response_type.contains(ResponseTypeValue::Token) {
            required.insert("at_hash".to_owned());
        }
        if response_type.contains(ResponseTypeValue::Code) {
            required.insert("c_hash".to_owned());
        }
    }
    required
}

/// The UserInfo claims the provider must always return: the claims bound to
/// the `openid` scope itself.
pub fn required_userinfo_claims() -> IndexSet<String> {
    let (_, claims) = scope_claims(OPENID).expect("openid is a standard scope");
    claims.iter().map(|claim| (*claim).to_owned()).collect()
}

/// The requested-claims map implied by the scope alone, before any explicit
/// claims request is merged in.
pub fn default_userinfo_claims(scopes: &Scopes) -> IndexMap<String, ClaimEntry> {
    claims_for(scopes)
}

/// Merges an explicit claims request over a base map. The overlay wins per
/// claim, so an explicit essential/voluntary marking overrides the
/// scope-derived default.
pub fn merge_claims(
    mut base: IndexMap<String, ClaimEntry>,
    overlay: IndexMap<String, ClaimEntry>,
) -> IndexMap<String, ClaimEntry> {
    base.extend(overlay);
    base
}
