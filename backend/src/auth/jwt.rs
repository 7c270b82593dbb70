use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};

use super::models::Claims;
use crate::db::models::UserRow;

#[derive(Debug, thiserror::Error)]
pub enum JwtError {
    #[error("token encoding error: {0}")]
    Encoding(#[from] jsonwebtoken::errors::Error),
    #[error("token decoding error: {0}")]
    Decoding(String),
    #[error("invalid token")]
    InvalidToken,
    #[error("token expired")]
    TokenExpired,
}

#[derive(Clone)]
pub struct JwtService {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    algorithm: Algorithm,
    expire_minutes: i64,
}

impl JwtService {
    pub fn new(secret: &str, algorithm: Algorithm, expire_minutes: i64) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(secret.as_ref()),
            decoding_key: DecodingKey::from_secret(secret.as_ref()),
            algorithm,
            expire_minutes,
        }
    }

    pub fn generate_token(&self, user: &UserRow) -> Result<String, JwtError> {
        let now = Utc::now();
        let expiration = now + Duration::minutes(self.expire_minutes);

        let claims = Claims {
            sub: user.id.to_string(),
            email: user.email.clone(),
            role: user.role.clone(),
            exp: expiration.timestamp() as usize,
            iat: now.timestamp() as usize,
        };

        let header = Header::new(self.algorithm);
        encode(&header, &claims, &self.encoding_key).map_err(JwtError::Encoding)
    }

    pub fn verify_token(&self, token: &str) -> Result<Claims, JwtError> {
        if token.is_empty() {
            return Err(JwtError::InvalidToken);
        }
        if token.split('.').count() != 3 {
            return Err(JwtError::InvalidToken);
        }

        let validation = Validation::new(self.algorithm);
        match decode::<Claims>(token, &self.decoding_key, &validation) {
            Ok(token_data) => {
                let now = Utc::now().timestamp() as usize;
                if token_data.claims.exp < now {
                    log::warn!(
                        "Expired token presented for {} (exp {}, now {})",
                        token_data.claims.email,
                        token_data.claims.exp,
                        now
                    );
                    return Err(JwtError::TokenExpired);
                }
                Ok(token_data.claims)
            }
            Err(err) => match err.kind() {
                jsonwebtoken::errors::ErrorKind::ExpiredSignature => Err(JwtError::TokenExpired),
                jsonwebtoken::errors::ErrorKind::InvalidToken
                | jsonwebtoken::errors::ErrorKind::InvalidSignature => Err(JwtError::InvalidToken),
                _ => Err(JwtError::Decoding(err.to_string())),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user(id: i64) -> UserRow {
        UserRow {
            id,
            name: "Ana".into(),
            email: "ana@mineria.cl".into(),
            password_hash: String::new(),
            password_salt: String::new(),
            role: "analyst".into(),
            created_at: Utc::now(),
        }
    }

    #[test]
    fn token_round_trips_claims() {
        let service = JwtService::new("secreto", Algorithm::HS256, 60);
        let token = service.generate_token(&user(7)).unwrap();
        let claims = service.verify_token(&token).unwrap();
        assert_eq!(claims.sub, "7");
        assert_eq!(claims.email, "ana@mineria.cl");
        assert_eq!(claims.role, "analyst");
        assert!(claims.exp > claims.iat);
    }

    #[test]
    fn wrong_secret_is_rejected() {
        let issuer = JwtService::new("secreto", Algorithm::HS256, 60);
        let verifier = JwtService::new("otro", Algorithm::HS256, 60);
        let token = issuer.generate_token(&user(1)).unwrap();
        assert!(verifier.verify_token(&token).is_err());
    }

    #[test]
    fn malformed_tokens_are_invalid() {
        let service = JwtService::new("secreto", Algorithm::HS256, 60);
        assert!(matches!(
            service.verify_token(""),
            Err(JwtError::InvalidToken)
        ));
        assert!(matches!(
            service.verify_token("solo-una-parte"),
            Err(JwtError::InvalidToken)
        ));
    }

    #[test]
    fn expired_token_is_reported_as_expired() {
        // Negative expiry puts exp far enough in the past to clear the
        // validator's default leeway.
        let service = JwtService::new("secreto", Algorithm::HS256, -120);
        let token = service.generate_token(&user(1)).unwrap();
        assert!(matches!(
            service.verify_token(&token),
            Err(JwtError::TokenExpired)
        ));
    }
}
