pub mod acr;
pub mod claims;
pub mod client_id;
pub mod display;
pub mod jose;
pub mod langtag;
pub mod nonce;
pub mod prompt;
pub mod response_type;
pub mod scopes;
pub mod state;
pub mod url_encodable;
pub(crate) mod utils;
