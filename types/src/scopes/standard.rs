use indexmap::IndexMap;
use lazy_static::lazy_static;

use crate::claims::ClaimEntry;
use crate::scopes::types::OPENID;
use crate::scopes::Scopes;

/// Whether a standard scope value must be honoured by the provider or may be
/// dropped.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum ScopeRequirement {
    Required,
    Optional,
}

struct StandardScope {
    name: &'static str,
    requirement: ScopeRequirement,
    claims: &'static [&'static str],
}

lazy_static! {
    static ref STANDARD_SCOPES: Vec<StandardScope> = vec![
        StandardScope {
            name: OPENID,
            requirement: ScopeRequirement::Required,
            claims: &["sub"],
        },
        StandardScope {
            name: "profile",
            requirement: ScopeRequirement::Optional,
            claims: &[
                "name",
                "family_name",
                "given_name",
                "middle_name",
                "nickname",
                "profile",
                "picture",
                "website",
                "gender",
                "birthdate",
                "zoneinfo",
                "locale",
                "updated_at",
            ],
        },
        StandardScope {
            name: "email",
            requirement: ScopeRequirement::Optional,
            claims: &["email", "email_verified"],
        },
        StandardScope {
            name: "address",
            requirement: ScopeRequirement::Optional,
            claims: &["address"],
        },
        StandardScope {
            name: "phone",
            requirement: ScopeRequirement::Optional,
            claims: &["phone_number", "phone_number_verified"],
        },
    ];
}

/// Looks up the requirement and associated claims of a standard scope value.
pub fn scope_claims(name: &str) -> Option<(ScopeRequirement, &'static [&'static str])> {
    STANDARD_SCOPES
        .iter()
        .find(|scope| scope.name == name)
        .map(|scope| (scope.requirement, scope.claims))
}

/// Derives the default requested-claims map from a scope set. `openid` is
/// skipped since its claims become required rather than requested; unknown
/// scope tokens are ignored.
pub fn claims_for(scopes: &Scopes) -> IndexMap<String, ClaimEntry> {
    let mut claims = IndexMap::new();
    for scope in scopes.iter() {
        if scope.name() == OPENID {
            continue;
        }
        if let Some((requirement, names)) = scope_claims(scope.name()) {
            let entry = match requirement {
                ScopeRequirement::Required => ClaimEntry::essential(),
                ScopeRequirement::Optional => ClaimEntry::Voluntary,
            };
            for name in names {
                claims.insert((*name).to_owned(), entry.clone());
            }
        }
    }
    claims
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use crate::scopes::standard::{claims_for, scope_claims, ScopeRequirement};
    use crate::scopes::Scopes;

    #[test]
    fn test_openid_is_required_and_maps_to_sub() {
        let (requirement, claims) = scope_claims("openid").unwrap();
        assert_eq!(ScopeRequirement::Required, requirement);
        assert_eq!(&["sub"], claims);
    }

    #[test]
    fn test_profile_scope_yields_voluntary_claims() {
        let claims = claims_for(&Scopes::from_str("openid profile").unwrap());

        assert_eq!(13, claims.len());
        assert!(claims.contains_key("name"));
        assert!(claims.contains_key("updated_at"));
        assert!(!claims.contains_key("sub"));
        assert!(claims.values().all(|entry| !entry.is_essential()));
    }

    #[test]
    fn test_unknown_scopes_are_ignored() {
        let claims = claims_for(&Scopes::from_str("openid custom:42 email").unwrap());

        assert_eq!(2, claims.len());
        assert!(claims.contains_key("email"));
        assert!(claims.contains_key("email_verified"));
    }
}
