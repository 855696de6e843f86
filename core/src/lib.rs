pub mod authentication_request;
pub mod claims_resolver;
pub mod error;
pub mod request_object;
pub mod resolver;
