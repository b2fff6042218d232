use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, errors::ErrorKind, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use super::errors::AuthError;
use crate::content::normalize_address;

pub const SESSION_COOKIE: &str = "chainsocial_session";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionClaims {
    pub sub: String,
    pub iat: i64,
    pub exp: i64,
}

/// Issues and verifies HS256 session tokens whose subject is the actor address.
#[derive(Clone)]
pub struct SessionSigner {
    encoding: EncodingKey,
    decoding: DecodingKey,
    ttl: Duration,
}

impl SessionSigner {
    pub fn new(secret: &str, ttl: Duration) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            ttl,
        }
    }

    pub fn from_config(cfg: &configs::AuthConfig) -> Self {
        Self::new(&cfg.session_secret, Duration::hours(cfg.session_ttl_hours))
    }

    pub fn ttl(&self) -> Duration { self.ttl }

    /// Sign a session for `address`; the address is normalized first.
    #[instrument(skip(self))]
    pub fn issue(&self, address: &str) -> Result<String, AuthError> {
        let sub = normalize_address(address).map_err(|e| AuthError::InvalidSession(e.to_string()))?;
        let now = Utc::now();
        let claims = SessionClaims { sub, iat: now.timestamp(), exp: (now + self.ttl).timestamp() };
        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)
            .map_err(|e| AuthError::TokenError(e.to_string()))
    }

    /// Return the actor address carried by a valid token.
    pub fn verify(&self, token: &str) -> Result<String, AuthError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = true;
        validation.leeway = 0;

        let data = decode::<SessionClaims>(token, &self.decoding, &validation).map_err(|e| match e.kind() {
            ErrorKind::ExpiredSignature => AuthError::Expired,
            _ => AuthError::InvalidSession(e.to_string()),
        })?;
        let address = normalize_address(&data.claims.sub)
            .map_err(|_| AuthError::InvalidSession("subject is not an address".into()))?;
        debug!(%address, "session verified");
        Ok(address)
    }
}
