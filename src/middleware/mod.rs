pub mod auth;
pub mod security_headers;

pub use auth::{require_auth, AuthenticatedUser};
pub use security_headers::security_headers;
