use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

use super::ServiceError;
use crate::settings;

#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub email: String,
    pub exp: usize,
}

#[derive(Clone)]
pub struct TokenKeys {
    encoding: EncodingKey,
    decoding: DecodingKey,
    ttl: Duration,
}

impl TokenKeys {
    pub fn new(settings: &settings::Auth) -> Self {
        let secret = settings.jwt_secret.as_bytes();

        Self {
            encoding: EncodingKey::from_secret(secret),
            decoding: DecodingKey::from_secret(secret),
            ttl: Duration::hours(settings.token_ttl_hours),
        }
    }

    pub fn issue(&self, user_id: &str, email: &str) -> Result<String, ServiceError> {
        let claims = Claims {
            sub: user_id.to_string(),
            email: email.to_string(),
            exp: (Utc::now() + self.ttl).timestamp().max(0) as usize,
        };

        encode(&Header::default(), &claims, &self.encoding)
            .map_err(|e| ServiceError::Internal(format!("Could not sign token: {}", e)))
    }

    pub fn verify(&self, token: &str) -> Result<Claims, ServiceError> {
        decode::<Claims>(token, &self.decoding, &Validation::default())
            .map(|data| data.claims)
            .map_err(|e| {
                log::debug!("Rejected token: {}", e);
                ServiceError::Unauthorized("Not authorized, token failed".to_string())
            })
    }
}

/// Argon2 hashing is CPU bound, so both directions run on the blocking pool.
pub async fn hash_password(password: String) -> Result<String, ServiceError> {
    tokio::task::spawn_blocking(move || {
        let salt = SaltString::generate(&mut OsRng);
        Argon2::default()
            .hash_password(password.as_bytes(), &salt)
            .map(|hash| hash.to_string())
            .map_err(|e| ServiceError::Internal(format!("Could not hash password: {}", e)))
    })
    .await
    .map_err(|e| ServiceError::Internal(e.to_string()))?
}

pub async fn verify_password(password: String, hash: String) -> Result<bool, ServiceError> {
    tokio::task::spawn_blocking(move || {
        let parsed = PasswordHash::new(&hash)
            .map_err(|e| ServiceError::Internal(format!("Stored hash is invalid: {}", e)))?;

        Ok(Argon2::default()
            .verify_password(password.as_bytes(), &parsed)
            .is_ok())
    })
    .await
    .map_err(|e| ServiceError::Internal(e.to_string()))?
}

#[cfg(test)]
mod tests {
    use super::*;

    fn keys(ttl_hours: i64) -> TokenKeys {
        TokenKeys::new(&settings::Auth {
            jwt_secret: "test-secret".to_string(),
            token_ttl_hours: ttl_hours,
            admin_emails: Vec::new(),
        })
    }

    #[test]
    fn issued_token_verifies() {
        let keys = keys(1);
        let token = keys.issue("user-1", "a@example.com").unwrap();
        let claims = keys.verify(&token).unwrap();

        assert_eq!(claims.sub, "user-1");
        assert_eq!(claims.email, "a@example.com");
    }

    #[test]
    fn expired_and_foreign_tokens_are_rejected() {
        let expired = keys(-2).issue("user-1", "a@example.com").unwrap();
        assert!(matches!(keys(1).verify(&expired), Err(ServiceError::Unauthorized(_))));

        let foreign = TokenKeys::new(&settings::Auth {
            jwt_secret: "other-secret".to_string(),
            token_ttl_hours: 1,
            admin_emails: Vec::new(),
        })
        .issue("user-1", "a@example.com")
        .unwrap();
        assert!(keys(1).verify(&foreign).is_err());
    }

    #[tokio::test]
    async fn password_hash_round_trip() {
        let hash = hash_password("hunter22".to_string()).await.unwrap();
        assert!(verify_password("hunter22".to_string(), hash.clone()).await.unwrap());
        assert!(!verify_password("wrong".to_string(), hash).await.unwrap());
    }
}
