pub mod auth;
pub mod logging;

pub use auth::{BasicCredentials, UNAUTHENTICATED_PATH, auth_middleware};
pub use logging::{REQUEST_ID_HEADER, log_request};
