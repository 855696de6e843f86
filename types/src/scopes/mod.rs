mod macros;
mod standard;
mod types;

pub use standard::{claims_for, scope_claims, ScopeRequirement};
pub use types::{Scope, Scopes, OPENID};
