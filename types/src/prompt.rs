use std::fmt;
use std::fmt::Formatter;

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
#[error("Error parsing prompt parameter {}", .0)]
pub struct ParseError(String);

#[derive(Serialize, Deserialize, Debug, Copy, Clone, Eq, PartialEq, Hash, Ord, PartialOrd)]
#[serde(rename_all = "snake_case")]
pub enum Prompt {
    None,
    Login,
    Consent,
    SelectAccount,
}

impl TryFrom<&str> for Prompt {
    type Error = ParseError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        let prompt = match value {
            "none" => Prompt::None,
            "login" => Prompt::Login,
            "consent" => Prompt::Consent,
            "select_account" => Prompt::SelectAccount,
            &_ => return Err(ParseError(value.to_owned())),
        };
        Ok(prompt)
    }
}

impl fmt::Display for Prompt {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let value = match self {
            Prompt::None => "none",
            Prompt::Login => "login",
            Prompt::Consent => "consent",
            Prompt::SelectAccount => "select_account",
        };
        write!(f, "{}", value)
    }
}

#[cfg(test)]
mod tests {
    use crate::prompt::Prompt;

    #[test]
    fn test_prompt_round_trips_through_wire_form() {
        for value in ["none", "login", "consent", "select_account"] {
            let prompt = Prompt::try_from(value).unwrap();
            assert_eq!(value, prompt.to_string());
        }
    }

    #[test]
    fn test_unknown_prompt_is_rejected() {
        assert!(Prompt::try_from("signup").is_err());
    }
}
