use std::env;
use std::path::PathBuf;

#[derive(Debug, Clone)]
pub struct AuthConfig {
    /// PEM file holding the RS256 signing key. When missing, a temporary
    /// in-memory key pair is generated at startup (dev convenience).
    pub jwt_private_key_path: PathBuf,
    pub jwt_public_key_path: PathBuf,
    pub token_issuer: String,
}

impl AuthConfig {
    pub fn from_env() -> Self {
        Self {
            jwt_private_key_path: env::var("GELAENDER_JWT_PRIVATE_KEY_PATH")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from("data/jwt_private.pem")),
            jwt_public_key_path: env::var("GELAENDER_JWT_PUBLIC_KEY_PATH")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from("data/jwt_public.pem")),
            token_issuer: env::var("GELAENDER_TOKEN_ISSUER")
                .unwrap_or_else(|_| "gelaender".to_string()),
        }
    }
}
