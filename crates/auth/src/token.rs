//! HS256 bearer tokens.

use chrono::{Duration, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

use kycflow_core::UserId;

use crate::{AuthError, Role};

const TOKEN_TTL_HOURS: i64 = 24;

/// Claims embedded in every issued token.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthClaims {
    pub sub: UserId,
    pub username: String,
    pub role: Role,
    pub iat: i64,
    pub exp: i64,
}

/// Issues and validates HS256 tokens with a shared secret.
#[derive(Clone)]
pub struct Hs256Tokens {
    encoding: EncodingKey,
    decoding: DecodingKey,
}

impl Hs256Tokens {
    pub fn new(secret: &[u8]) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret),
            decoding: DecodingKey::from_secret(secret),
        }
    }

    pub fn issue(&self, user_id: UserId, username: &str, role: Role) -> Result<String, AuthError> {
        let now = Utc::now();
        let claims = AuthClaims {
            sub: user_id,
            username: username.to_string(),
            role,
            iat: now.timestamp(),
            exp: (now + Duration::hours(TOKEN_TTL_HOURS)).timestamp(),
        };
        jsonwebtoken::encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)
            .map_err(|err| AuthError::TokenIssue(err.to_string()))
    }

    pub fn validate(&self, token: &str) -> Result<AuthClaims, AuthError> {
        let validation = Validation::new(Algorithm::HS256);
        jsonwebtoken::decode::<AuthClaims>(token, &self.decoding, &validation)
            .map(|data| data.claims)
            .map_err(|_| AuthError::InvalidToken)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn issued_token_validates_with_same_secret() {
        let tokens = Hs256Tokens::new(b"test-secret");
        let user_id = UserId::new();
        let token = tokens.issue(user_id, "jane", Role::Admin).unwrap();

        let claims = tokens.validate(&token).unwrap();
        assert_eq!(claims.sub, user_id);
        assert_eq!(claims.username, "jane");
        assert_eq!(claims.role, Role::Admin);
        assert!(claims.exp > claims.iat);
    }

    #[test]
    fn token_from_other_secret_is_rejected() {
        let issuer = Hs256Tokens::new(b"secret-a");
        let verifier = Hs256Tokens::new(b"secret-b");
        let token = issuer.issue(UserId::new(), "jane", Role::User).unwrap();
        assert!(verifier.validate(&token).is_err());
    }

    #[test]
    fn mangled_token_is_rejected() {
        let tokens = Hs256Tokens::new(b"test-secret");
        assert!(tokens.validate("not.a.token").is_err());
    }
}
