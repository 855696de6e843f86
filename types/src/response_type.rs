use std::fmt;
use std::fmt::{Display, Formatter};
use std::hash::{Hash, Hasher};
use std::str::FromStr;

use indexmap::IndexSet;
use lazy_static::lazy_static;
use serde::de::{Unexpected, Visitor};
use serde::{de, Deserialize, Serializer};
use serde::{Deserializer, Serialize};
use thiserror::Error;

use crate::serialize_to_str;

#[macro_export]
macro_rules! response_type {
    ($($rt:expr),*) =>{
        {
            let mut temp_vec = vec![];
            $(
                temp_vec.push($rt);
            )*
            $crate::response_type::ResponseType::new(temp_vec)
        }
    }
}

/// The three response type values recognised by OpenID Connect.
#[derive(Serialize, Deserialize, Debug, PartialEq, Eq, Hash, Copy, Clone, Ord, PartialOrd)]
#[serde(rename_all = "snake_case")]
pub enum ResponseTypeValue {
    Code,
    IdToken,
    Token,
}

impl Display for ResponseTypeValue {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let value = match self {
            ResponseTypeValue::Code => "code",
            ResponseTypeValue::IdToken => "id_token",
            ResponseTypeValue::Token => "token",
        };
        write!(f, "{}", value)
    }
}

#[derive(Error, Debug)]
#[error("Error parsing response type value {}.", .0)]
pub struct ParseError(pub(crate) String);

impl FromStr for ResponseTypeValue {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "code" => Ok(ResponseTypeValue::Code),
            "id_token" => Ok(ResponseTypeValue::IdToken),
            "token" => Ok(ResponseTypeValue::Token),
            _ => Err(ParseError(s.to_owned())),
        }
    }
}

lazy_static! {
    static ref IMPLICIT_VALUES: Vec<ResponseTypeValue> =
        vec![ResponseTypeValue::IdToken, ResponseTypeValue::Token];
    pub static ref CODE_FLOW: ResponseType = response_type![ResponseTypeValue::Code];
    pub static ref ID_TOKEN_FLOW: ResponseType = response_type![ResponseTypeValue::IdToken];
    pub static ref TOKEN_FLOW: ResponseType = response_type![ResponseTypeValue::Token];
    pub static ref CODE_ID_TOKEN_FLOW: ResponseType =
        response_type![ResponseTypeValue::Code, ResponseTypeValue::IdToken];
    pub static ref CODE_TOKEN_FLOW: ResponseType =
        response_type![ResponseTypeValue::Code, ResponseTypeValue::Token];
    pub static ref ID_TOKEN_TOKEN_FLOW: ResponseType =
        response_type![ResponseTypeValue::IdToken, ResponseTypeValue::Token];
    pub static ref CODE_ID_TOKEN_TOKEN_FLOW: ResponseType = response_type![
        ResponseTypeValue::Code,
        ResponseTypeValue::IdToken,
        ResponseTypeValue::Token
    ];
}

/// A non-empty set of response type values, ordered canonically.
#[derive(Debug, Eq, Clone)]
pub struct ResponseType(IndexSet<ResponseTypeValue>);

impl ResponseType {
    pub fn new(mut values: Vec<ResponseTypeValue>) -> Self {
        values.sort();
        let values_set: IndexSet<_> = values.into_iter().collect();
        ResponseType(values_set)
    }

    pub fn iter(&self) -> impl Iterator<Item = &ResponseTypeValue> {
        self.0.iter()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn contains(&self, value: ResponseTypeValue) -> bool {
        self.0.contains(&value)
    }

    pub fn contains_all(&self, other: &ResponseType) -> bool {
        other.iter().all(|value| self.0.contains(value))
    }

    /// True when tokens are returned straight from the authorisation
    /// endpoint, which is the case for the implicit and hybrid flows.
    pub fn implies_implicit_flow(&self) -> bool {
        self.0.iter().any(|rt| IMPLICIT_VALUES.contains(rt))
    }
}

impl Hash for ResponseType {
    fn hash<H: Hasher>(&self, state: &mut H) {
        for v in &self.0 {
            v.hash(state)
        }
    }
}

impl PartialEq for ResponseType {
    fn eq(&self, other: &Self) -> bool {
        self.0.eq(&other.0)
    }
}

impl Display for ResponseType {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let joined = self
            .0
            .iter()
            .map(|rt| rt.to_string())
            .collect::<Vec<String>>()
            .join(" ");
        write!(f, "{}", joined)
    }
}

serialize_to_str!(ResponseType);

impl FromStr for ResponseType {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let values: Result<Vec<ResponseTypeValue>, ParseError> =
            s.split(' ').map(ResponseTypeValue::from_str).collect();
        Ok(ResponseType::new(values?))
    }
}

impl<'de> Deserialize<'de> for ResponseType {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        struct ResponseTypeVisitor;

        impl<'de> Visitor<'de> for ResponseTypeVisitor {
            type Value = ResponseType;

            fn expecting(&self, formatter: &mut Formatter) -> fmt::Result {
                formatter.write_str("'code id_token'")
            }

            fn visit_str<E>(self, v: &str) -> Result<Self::Value, E>
            where
                E: de::Error,
            {
                ResponseType::from_str(v).map_err(|err| {
                    de::Error::invalid_value(Unexpected::Str(&err.0), &ResponseTypeVisitor)
                })
            }
        }
        deserializer.deserialize_str(ResponseTypeVisitor)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::hash_map::DefaultHasher;
    use std::hash::{Hash, Hasher};
    use std::str::FromStr;

    use serde::{Deserialize, Serialize};

    use crate::response_type::{ResponseType, ResponseTypeValue};

    #[test]
    fn test_can_join_response_type() {
        let rt = ResponseType::new(vec![ResponseTypeValue::Code, ResponseTypeValue::IdToken]);

        assert_eq!("code id_token", rt.to_string())
    }

    #[test]
    fn test_can_serialize_response_types() {
        #[derive(Serialize)]
        struct Test {
            rt: ResponseType,
        }

        let rt = ResponseType::new(vec![ResponseTypeValue::Code, ResponseTypeValue::IdToken]);

        assert_eq!(
            r#"{"rt":"code id_token"}"#,
            serde_json::to_string(&Test { rt }).unwrap()
        )
    }

    #[test]
    fn test_can_deserialize_response_types() {
        #[derive(Deserialize)]
        struct Test {
            rt: ResponseType,
        }

        let rt = ResponseType::new(vec![ResponseTypeValue::Code, ResponseTypeValue::IdToken]);
        let expected = Test { rt };
        let actual: Test = serde_json::from_str(r#"{"rt":"code id_token"}"#).unwrap();

        assert_eq!(expected.rt, actual.rt)
    }

    #[test]
    fn test_rejects_unknown_value() {
        assert!(ResponseType::from_str("code magic").is_err())
    }

    #[test]
    fn test_implicit_flow_detection() {
        assert!(!ResponseType::from_str("code").unwrap().implies_implicit_flow());
        assert!(ResponseType::from_str("code id_token")
            .unwrap()
            .implies_implicit_flow());
        assert!(ResponseType::from_str("id_token token")
            .unwrap()
            .implies_implicit_flow());
    }

    #[test]
    fn test_contains_all_is_a_superset_check() {
        let top = ResponseType::from_str("code id_token").unwrap();
        let narrower = ResponseType::from_str("code").unwrap();
        assert!(top.contains_all(&narrower));
        assert!(!narrower.contains_all(&top));
    }

    #[test]
    fn test_response_type_hash_are_sort_independent() {
        let mut hasher = DefaultHasher::new();
        let rt1 = response_type!(ResponseTypeValue::Code, ResponseTypeValue::IdToken);
        rt1.hash(&mut hasher);
        let rt1_hash = hasher.finish();

        hasher = DefaultHasher::new();
        let rt2 = response_type!(ResponseTypeValue::IdToken, ResponseTypeValue::Code);
        rt2.hash(&mut hasher);
        let rt2_hash = hasher.finish();
        assert_eq!(rt1_hash, rt2_hash)
    }
}
