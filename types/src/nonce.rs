use std::fmt::{Display, Formatter};

use serde::Deserialize;
use serde::Serialize;

#[derive(Debug, Clone, Serialize, Deserialize, Eq, PartialEq)]
pub struct Nonce(String);

impl Nonce {
    pub fn new<T: Into<String>>(value: T) -> Self {
        Self(value.into())
    }
}

impl From<Nonce> for String {
    fn from(nonce: Nonce) -> Self {
        nonce.0
    }
}

impl Display for Nonce {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}
