use std::fmt;
use std::fmt::{Display, Formatter};

use serde::{Deserialize, Serializer};

use crate::serialize_to_str;

/// An ordered list of authentication context class references, most
/// preferred first. Wire form is a single space-delimited value.
#[derive(Debug, Clone, Eq, PartialEq, Deserialize)]
pub struct Acr(
    #[serde(deserialize_with = "crate::utils::space_delimited_deserializer")] Vec<String>,
);

impl Acr {
    pub fn new(values: Vec<String>) -> Self {
        Acr(values)
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(|it| it.as_str())
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<String> for Acr {
    fn from(s: String) -> Self {
        Acr(s.split(' ').map(|s| s.to_owned()).collect())
    }
}

impl Display for Acr {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.join(" "))
    }
}

serialize_to_str!(Acr);
