use std::fmt;
use std::fmt::Formatter;

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
#[error("Error parsing display parameter {}", .0)]
pub struct ParseError(String);

/// How the provider should present the authentication UI to the end user.
#[derive(Serialize, Deserialize, Debug, Copy, Clone, Eq, PartialEq, Default)]
#[serde(rename_all = "snake_case")]
pub enum Display {
    #[default]
    Page,
    Popup,
    Touch,
    Wap,
}

impl TryFrom<&str> for Display {
    type Error = ParseError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        let display = match value {
            "page" => Display::Page,
            "popup" => Display::Popup,
            "touch" => Display::Touch,
            "wap" => Display::Wap,
            &_ => return Err(ParseError(value.to_owned())),
        };
        Ok(display)
    }
}

impl fmt::Display for Display {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let value = match self {
            Display::Page => "page",
            Display::Popup => "popup",
            Display::Touch => "touch",
            Display::Wap => "wap",
        };
        write!(f, "{}", value)
    }
}
