use std::fmt;
use std::fmt::{Display, Formatter};
use std::str::FromStr;

use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serializer};
use thiserror::Error;

use crate::serialize_to_str;

lazy_static! {
    static ref LANG_TAG_PATTERN: Regex = Regex::new("^[A-Za-z]{1,8}(-[A-Za-z0-9]{1,8})*$")
        .expect("Could not create language tag pattern");
}

#[derive(Debug, Error)]
#[error("Error parsing language tag {}", .0)]
pub struct ParseError(String);

/// A BCP 47 language tag, e.g. `en-US` or `pt-BR`.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct LangTag(String);

impl LangTag {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl FromStr for LangTag {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if LANG_TAG_PATTERN.is_match(s) {
            Ok(LangTag(s.to_owned()))
        } else {
            Err(ParseError(s.to_owned()))
        }
    }
}

impl Display for LangTag {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

serialize_to_str!(LangTag);

impl<'de> Deserialize<'de> for LangTag {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let value = String::deserialize(deserializer)?;
        LangTag::from_str(&value).map_err(serde::de::Error::custom)
    }
}

/// Parses a space-delimited list of language tags, ordered by preference.
pub fn parse_lang_tags(value: &str) -> Result<Vec<LangTag>, ParseError> {
    value.split(' ').map(LangTag::from_str).collect()
}
