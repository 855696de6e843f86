use std::fmt;
use std::fmt::Formatter;

use indexmap::{IndexMap, IndexSet};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;
use thiserror::Error;

use crate::acr::Acr;

#[derive(Debug, Error)]
pub enum InvalidClaimError {
    #[error("'{0}.values' must be an array of strings")]
    ValuesNotStrings(String),
    #[error("'{0}.value' must be a string")]
    ValueNotString(String),
}

/// Marks how strongly a claim is wanted by the relying party.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum ClaimRequirement {
    Essential,
    Voluntary,
}

#[derive(Debug, Clone, Default, Eq, PartialEq, Serialize)]
pub struct ClaimOptions {
    essential: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    value: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    values: Option<Vec<Value>>,
}

impl ClaimOptions {
    pub fn essential(&self) -> bool {
        self.essential
    }

    pub fn value(&self) -> Option<&Value> {
        self.value.as_ref()
    }

    pub fn values(&self) -> Option<&Vec<Value>> {
        self.values.as_ref()
    }
}

/// A single entry of a claims request. `Voluntary` is the `null` wire form,
/// `Constrained` the `{"essential": ..., "value(s)": ...}` object form.
#[derive(Debug, Clone, Eq, PartialEq)]
pub enum ClaimEntry {
    Voluntary,
    Constrained(ClaimOptions),
}

impl ClaimEntry {
    pub fn essential() -> Self {
        ClaimEntry::Constrained(ClaimOptions {
            essential: true,
            value: None,
            values: None,
        })
    }

    pub fn is_essential(&self) -> bool {
        match self {
            ClaimEntry::Voluntary => false,
            ClaimEntry::Constrained(opts) => opts.essential,
        }
    }

    /// Lenient conversion from the raw JSON found on the wire. Anything that
    /// is not an object with a boolean `essential` counts as voluntary,
    /// never as an error.
    pub fn from_value(value: &Value) -> Self {
        match value {
            Value::Object(map) => {
                let essential = matches!(map.get("essential"), Some(Value::Bool(true)));
                let value = map.get("value").cloned();
                let values = match map.get("values") {
                    Some(Value::Array(values)) => Some(values.clone()),
                    _ => None,
                };
                ClaimEntry::Constrained(ClaimOptions {
                    essential,
                    value,
                    values,
                })
            }
            _ => ClaimEntry::Voluntary,
        }
    }
}

impl Serialize for ClaimEntry {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match self {
            ClaimEntry::Voluntary => serializer.serialize_unit(),
            ClaimEntry::Constrained(opts) => opts.serialize(serializer),
        }
    }
}

impl<'de> Deserialize<'de> for ClaimEntry {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = Value::deserialize(deserializer)?;
        Ok(ClaimEntry::from_value(&value))
    }
}

/// The `claims` request parameter: per-endpoint maps of requested claims.
#[derive(Debug, Clone, Default, Eq, PartialEq, Serialize, Deserialize)]
pub struct Claims {
    #[serde(default)]
    pub userinfo: IndexMap<String, ClaimEntry>,
    #[serde(default)]
    pub id_token: IndexMap<String, ClaimEntry>,
}

/// A resolved claims request for a single endpoint. `required` holds the
/// claims the protocol obliges the provider to return, `requested` the ones
/// the client asked for. Immutable once built.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct ClaimsRequest {
    required: IndexSet<String>,
    requested: IndexMap<String, ClaimEntry>,
}

impl ClaimsRequest {
    pub fn new(required: IndexSet<String>, requested: IndexMap<String, ClaimEntry>) -> Self {
        Self {
            required,
            requested,
        }
    }

    pub fn required_claims(&self) -> &IndexSet<String> {
        &self.required
    }

    pub fn requested_essential_claims(&self) -> impl Iterator<Item = &str> {
        self.requested
            .iter()
            .filter(|(_, entry)| entry.is_essential())
            .map(|(name, _)| name.as_str())
    }

    pub fn requested_voluntary_claims(&self) -> impl Iterator<Item = &str> {
        self.requested
            .iter()
            .filter(|(_, entry)| !entry.is_essential())
            .map(|(name, _)| name.as_str())
    }

    pub fn claim_names(&self) -> impl Iterator<Item = &str> {
        self.requested.keys().map(String::as_str)
    }

    pub fn entry(&self, claim: &str) -> Option<&ClaimEntry> {
        self.requested.get(claim)
    }

    /// Narrow view over the `acr` entry, if the client requested one.
    pub fn requested_acrs(&self) -> Result<Option<AcrRequest>, InvalidClaimError> {
        let entry = match self.requested.get("acr") {
            Some(entry) => entry,
            None => return Ok(None),
        };
        let request = match entry {
            ClaimEntry::Voluntary => AcrRequest {
                requirement: ClaimRequirement::Voluntary,
                values: Acr::new(vec![]),
            },
            ClaimEntry::Constrained(opts) => {
                let requirement = if opts.essential {
                    ClaimRequirement::Essential
                } else {
                    ClaimRequirement::Voluntary
                };
                let values = acr_values(opts)?;
                AcrRequest {
                    requirement,
                    values: Acr::new(values),
                }
            }
        };
        Ok(Some(request))
    }
}

fn acr_values(opts: &ClaimOptions) -> Result<Vec<String>, InvalidClaimError> {
    if let Some(values) = opts.values() {
        values
            .iter()
            .map(|v| match v {
                Value::String(s) => Ok(s.clone()),
                _ => Err(InvalidClaimError::ValuesNotStrings("acr".to_owned())),
            })
            .collect()
    } else if let Some(value) = opts.value() {
        match value {
            Value::String(s) => Ok(vec![s.clone()]),
            _ => Err(InvalidClaimError::ValueNotString("acr".to_owned())),
        }
    } else {
        Ok(vec![])
    }
}

impl Serialize for ClaimsRequest {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let mut map = serializer.serialize_map(Some(self.requested.len()))?;
        for (name, entry) in &self.requested {
            map.serialize_entry(name, entry)?;
        }
        map.end()
    }
}

impl fmt::Display for ClaimsRequest {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let names = self.claim_names().collect::<Vec<_>>().join(" ");
        write!(f, "{}", names)
    }
}

/// The requested authentication context, derived from the `acr` entry of an
/// ID Token claims request.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct AcrRequest {
    pub requirement: ClaimRequirement,
    pub values: Acr,
}

#[cfg(test)]
mod tests {
    use indexmap::{IndexMap, IndexSet};
    use serde_json::json;

    use crate::claims::{ClaimEntry, ClaimRequirement, Claims, ClaimsRequest};

    fn entry(value: serde_json::Value) -> ClaimEntry {
        ClaimEntry::from_value(&value)
    }

    #[test]
    fn test_null_entry_is_voluntary() {
        assert_eq!(ClaimEntry::Voluntary, entry(json!(null)));
        assert!(!entry(json!(null)).is_essential());
    }

    #[test]
    fn test_essential_flag_is_read_from_object() {
        assert!(entry(json!({"essential": true})).is_essential());
        assert!(!entry(json!({"essential": false})).is_essential());
    }

    #[test]
    fn test_malformed_essential_is_voluntary() {
        assert!(!entry(json!({"essential": "yes"})).is_essential());
        assert!(!entry(json!({"essential": 1})).is_essential());
        assert!(!entry(json!("email")).is_essential());
    }

    #[test]
    fn test_can_deserialize_claims_parameter() {
        let claims: Claims = serde_json::from_str(
            r#"{"userinfo":{"email":null,"name":{"essential":true}},"id_token":{"acr":{"essential":true,"values":["2"]}}}"#,
        )
        .unwrap();

        assert_eq!(Some(&ClaimEntry::Voluntary), claims.userinfo.get("email"));
        assert!(claims.userinfo.get("name").unwrap().is_essential());
        assert!(claims.id_token.get("acr").unwrap().is_essential());
    }

    #[test]
    fn test_voluntary_entries_serialize_to_null() {
        let mut requested = IndexMap::new();
        requested.insert("email".to_owned(), ClaimEntry::Voluntary);
        requested.insert("name".to_owned(), ClaimEntry::essential());
        let request = ClaimsRequest::new(IndexSet::new(), requested);

        assert_eq!(
            r#"{"email":null,"name":{"essential":true}}"#,
            serde_json::to_string(&request).unwrap()
        );
    }

    #[test]
    fn test_essential_and_voluntary_queries() {
        let mut requested = IndexMap::new();
        requested.insert("email".to_owned(), entry(json!({"essential": true})));
        requested.insert("nickname".to_owned(), entry(json!(null)));
        requested.insert("website".to_owned(), entry(json!({"essential": false})));
        let request = ClaimsRequest::new(IndexSet::new(), requested);

        let essential: Vec<_> = request.requested_essential_claims().collect();
        let voluntary: Vec<_> = request.requested_voluntary_claims().collect();
        assert_eq!(vec!["email"], essential);
        assert_eq!(vec!["nickname", "website"], voluntary);
        assert_eq!(3, request.claim_names().count());
    }

    #[test]
    fn test_essential_acr_request() {
        let mut requested = IndexMap::new();
        requested.insert(
            "acr".to_owned(),
            entry(json!({"essential": true, "values": ["2", "3"]})),
        );
        let request = ClaimsRequest::new(IndexSet::new(), requested);

        let acrs = request.requested_acrs().unwrap().unwrap();
        assert_eq!(ClaimRequirement::Essential, acrs.requirement);
        assert_eq!(vec!["2", "3"], acrs.values.iter().collect::<Vec<_>>());
    }

    #[test]
    fn test_single_acr_value_is_accepted() {
        let mut requested = IndexMap::new();
        requested.insert("acr".to_owned(), entry(json!({"value": "urn:mace:silver"})));
        let request = ClaimsRequest::new(IndexSet::new(), requested);

        let acrs = request.requested_acrs().unwrap().unwrap();
        assert_eq!(ClaimRequirement::Voluntary, acrs.requirement);
        assert_eq!(
            vec!["urn:mace:silver"],
            acrs.values.iter().collect::<Vec<_>>()
        );
    }

    #[test]
    fn test_non_string_acr_values_are_rejected() {
        let mut requested = IndexMap::new();
        requested.insert("acr".to_owned(), entry(json!({"values": ["2", 3]})));
        let request = ClaimsRequest::new(IndexSet::new(), requested);

        assert!(request.requested_acrs().is_err());
    }

    #[test]
    fn test_no_acr_entry_yields_none() {
        let request = ClaimsRequest::new(IndexSet::new(), IndexMap::new());
        assert!(request.requested_acrs().unwrap().is_none());
    }
}
