use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use once_cell::sync::Lazy;
use parking_lot::RwLock;
use rsa::{
    pkcs8::{EncodePrivateKey, EncodePublicKey, LineEnding},
    RsaPrivateKey, RsaPublicKey,
};
use serde::{Deserialize, Serialize};
use std::fs;

use crate::config::CONFIG;
use crate::error::{AppError, Result};

// JWT token expiration times (in seconds)
const ACCESS_TOKEN_EXPIRE: i64 = 3600; // 1 hour
const REFRESH_TOKEN_EXPIRE: i64 = 604800; // 7 days

// In-memory key cache
static PRIVATE_KEY: Lazy<RwLock<Option<String>>> = Lazy::new(|| RwLock::new(None));
static PUBLIC_KEY: Lazy<RwLock<Option<String>>> = Lazy::new(|| RwLock::new(None));

/// JWT token claims
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String, // Subject (user identifier)
    pub iss: String, // Issuer
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>, // User email
    pub exp: i64,    // Expiration time
    pub iat: i64,    // Issued at
    #[serde(skip_serializing_if = "Option::is_none")]
    pub jti: Option<String>, // JWT ID for uniqueness
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token_type: Option<String>, // "refresh" for refresh tokens
}

/// Get the JWT private key (PEM format)
pub fn get_private_key() -> Result<String> {
    // Fast path: check cache with read lock
    {
        let cache = PRIVATE_KEY.read();
        if let Some(key) = cache.as_ref() {
            return Ok(key.clone());
        }
    }

    // Slow path: acquire write lock with double-checked locking
    let mut priv_cache = PRIVATE_KEY.write();

    if let Some(key) = priv_cache.as_ref() {
        return Ok(key.clone());
    }

    // Try to load from file
    if CONFIG.auth.jwt_private_key_path.exists() {
        let content = fs::read_to_string(&CONFIG.auth.jwt_private_key_path)
            .map_err(|e| AppError::Internal(format!("Failed to read private key: {}", e)))?;

        if !content.trim().is_empty() {
            *priv_cache = Some(content.clone());
            return Ok(content);
        }
    }

    // Generate in-memory key for development
    tracing::warn!("JWT private key not found, generating temporary key");
    let (private_pem, public_pem) = generate_rsa_key_pair()?;

    *priv_cache = Some(private_pem.clone());
    drop(priv_cache); // Release private key lock before acquiring public key lock

    {
        let mut pub_cache = PUBLIC_KEY.write();
        if pub_cache.is_none() {
            *pub_cache = Some(public_pem);
        }
    }

    Ok(private_pem)
}

/// Get the JWT public key (PEM format)
pub fn get_public_key() -> Result<String> {
    // Fast path: check cache with read lock
    {
        let cache = PUBLIC_KEY.read();
        if let Some(key) = cache.as_ref() {
            return Ok(key.clone());
        }
    }

    // Slow path: acquire write lock with double-checked locking
    let mut pub_cache = PUBLIC_KEY.write();

    if let Some(key) = pub_cache.as_ref() {
        return Ok(key.clone());
    }

    // Try to load from file
    if CONFIG.auth.jwt_public_key_path.exists() {
        let content = fs::read_to_string(&CONFIG.auth.jwt_public_key_path)
            .map_err(|e| AppError::Internal(format!("Failed to read public key: {}", e)))?;

        if !content.trim().is_empty() {
            *pub_cache = Some(content.clone());
            return Ok(content);
        }
    }

    // Release lock before calling get_private_key to avoid deadlock
    drop(pub_cache);

    // Trigger private key generation which also generates the public key
    get_private_key()?;

    let cache = PUBLIC_KEY.read();
    cache
        .clone()
        .ok_or_else(|| AppError::Internal("Public key not available".to_string()))
}

/// Generate an RSA key pair for JWT signing
pub fn generate_rsa_key_pair() -> Result<(String, String)> {
    let mut rng = rand::thread_rng();

    let private_key = RsaPrivateKey::new(&mut rng, 2048)
        .map_err(|e| AppError::Internal(format!("Failed to generate RSA key: {}", e)))?;

    let public_key = RsaPublicKey::from(&private_key);

    let private_pem = private_key
        .to_pkcs8_pem(LineEnding::LF)
        .map_err(|e| AppError::Internal(format!("Failed to serialize private key: {}", e)))?
        .to_string();

    let public_pem = public_key
        .to_public_key_pem(LineEnding::LF)
        .map_err(|e| AppError::Internal(format!("Failed to serialize public key: {}", e)))?;

    Ok((private_pem, public_pem))
}

/// Hash a password using bcrypt
pub fn hash_password(password: &str) -> Result<String> {
    bcrypt::hash(password, bcrypt::DEFAULT_COST)
        .map_err(|e| AppError::Internal(format!("Failed to hash password: {}", e)))
}

/// Verify a password against its hash
pub fn verify_password(password: &str, hash: &str) -> bool {
    bcrypt::verify(password, hash).unwrap_or(false)
}

/// Create a JWT access token
pub fn create_access_token(
    subject: &str,
    email: Option<&str>,
    expires_in: Option<i64>,
) -> Result<String> {
    let now = Utc::now();
    let exp = now + Duration::seconds(expires_in.unwrap_or(ACCESS_TOKEN_EXPIRE));

    let claims = Claims {
        sub: subject.to_string(),
        iss: CONFIG.auth.token_issuer.clone(),
        email: email.map(String::from),
        exp: exp.timestamp(),
        iat: now.timestamp(),
        jti: Some(uuid::Uuid::new_v4().to_string()),
        token_type: None,
    };

    sign_claims(&claims)
}

/// Create a JWT refresh token (only usable to obtain a fresh access token)
pub fn create_refresh_token(subject: &str, email: Option<&str>) -> Result<String> {
    let now = Utc::now();
    let exp = now + Duration::seconds(REFRESH_TOKEN_EXPIRE);

    let claims = Claims {
        sub: subject.to_string(),
        iss: CONFIG.auth.token_issuer.clone(),
        email: email.map(String::from),
        exp: exp.timestamp(),
        iat: now.timestamp(),
        jti: Some(uuid::Uuid::new_v4().to_string()),
        token_type: Some("refresh".to_string()),
    };

    sign_claims(&claims)
}

fn sign_claims(claims: &Claims) -> Result<String> {
    let private_key = get_private_key()?;
    let encoding_key = EncodingKey::from_rsa_pem(private_key.as_bytes())
        .map_err(|e| AppError::Internal(format!("Invalid private key: {}", e)))?;

    let header = Header::new(jsonwebtoken::Algorithm::RS256);
    encode(&header, claims, &encoding_key).map_err(|e| e.into())
}

/// Decode and validate a JWT token
pub fn decode_token(token: &str) -> Result<Claims> {
    let public_key = get_public_key()?;
    let decoding_key = DecodingKey::from_rsa_pem(public_key.as_bytes())
        .map_err(|e| AppError::Internal(format!("Invalid public key: {}", e)))?;

    let mut validation = Validation::new(jsonwebtoken::Algorithm::RS256);
    validation.validate_exp = true;
    // Disable audience validation - audience is application-specific
    validation.validate_aud = false;
    // No clock skew tolerance for expiration check
    validation.leeway = 0;

    let token_data = decode::<Claims>(token, &decoding_key, &validation)?;
    Ok(token_data.claims)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_password_hash_roundtrip() {
        let hash = hash_password("hunter22").unwrap();
        assert_ne!(hash, "hunter22");
        assert!(verify_password("hunter22", &hash));
        assert!(!verify_password("hunter23", &hash));
    }

    #[test]
    fn test_verify_password_with_garbage_hash() {
        assert!(!verify_password("anything", "not-a-bcrypt-hash"));
    }

    #[test]
    fn test_access_token_roundtrip() {
        let token = create_access_token("42", Some("mira@example.com"), None).unwrap();
        let claims = decode_token(&token).unwrap();

        assert_eq!(claims.sub, "42");
        assert_eq!(claims.email.as_deref(), Some("mira@example.com"));
        assert!(claims.token_type.is_none());
        assert!(claims.exp > claims.iat);
    }

    #[test]
    fn test_refresh_token_is_marked() {
        let token = create_refresh_token("42", None).unwrap();
        let claims = decode_token(&token).unwrap();

        assert_eq!(claims.token_type.as_deref(), Some("refresh"));
    }

    #[test]
    fn test_expired_token_rejected() {
        let token = create_access_token("42", None, Some(-60)).unwrap();
        assert!(decode_token(&token).is_err());
    }

    #[test]
    fn test_garbage_token_rejected() {
        assert!(decode_token("not.a.token").is_err());
    }
}
