//! Access-token verification.
//!
//! Tokens are HS256-signed JWTs issued by the account service in front of
//! this API. The engine shares its secret and only verifies them.

use jsonwebtoken::errors::{Error, ErrorKind};
use jsonwebtoken::{decode, DecodingKey, Validation};
use pixora_core::roles::{ROLE_ADMIN, ROLE_USER};
use pixora_core::types::DbId;
use serde::{Deserialize, Serialize};

/// Claims carried by an access token.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Claims {
    /// The user's internal database id.
    pub sub: DbId,
    /// `"admin"` or `"user"`.
    pub role: String,
    /// Expiration time (UTC Unix timestamp).
    pub exp: i64,
    #[serde(default)]
    pub iat: i64,
}

/// Shared-secret settings for token verification.
#[derive(Debug, Clone)]
pub struct JwtConfig {
    pub secret: String,
}

impl JwtConfig {
    /// Load from `JWT_SECRET`.
    ///
    /// # Panics
    ///
    /// Panics if `JWT_SECRET` is not set or is empty.
    pub fn from_env() -> Self {
        let secret =
            std::env::var("JWT_SECRET").expect("JWT_SECRET must be set in the environment");
        assert!(!secret.is_empty(), "JWT_SECRET must not be empty");
        Self { secret }
    }
}

/// Verify signature and expiry, returning the embedded [`Claims`].
///
/// Tokens naming a role this API does not know are rejected.
pub fn validate_token(token: &str, config: &JwtConfig) -> Result<Claims, Error> {
    let claims = decode::<Claims>(
        token,
        &DecodingKey::from_secret(config.secret.as_bytes()),
        &Validation::default(), // HS256, validates exp
    )?
    .claims;

    if claims.role != ROLE_ADMIN && claims.role != ROLE_USER {
        return Err(ErrorKind::InvalidToken.into());
    }
    Ok(claims)
}

#[cfg(test)]
mod tests {
    use jsonwebtoken::{encode, EncodingKey, Header};

    use super::*;

    const SECRET: &str = "test-secret-that-is-long-enough-for-hmac";

    fn config() -> JwtConfig {
        JwtConfig {
            secret: SECRET.to_string(),
        }
    }

    fn sign(secret: &str, sub: DbId, role: &str, ttl_secs: i64) -> String {
        let now = chrono::Utc::now().timestamp();
        let claims = Claims {
            sub,
            role: role.to_string(),
            exp: now + ttl_secs,
            iat: now,
        };
        encode(&Header::default(), &claims, &EncodingKey::from_secret(secret.as_bytes())).unwrap()
    }

    #[test]
    fn signed_token_validates() {
        let claims = validate_token(&sign(SECRET, 42, ROLE_ADMIN, 900), &config()).unwrap();
        assert_eq!(claims.sub, 42);
        assert_eq!(claims.role, ROLE_ADMIN);
    }

    #[test]
    fn expired_token_is_rejected() {
        // Well past the default 60-second leeway.
        let token = sign(SECRET, 1, ROLE_USER, -300);
        assert!(validate_token(&token, &config()).is_err());
    }

    #[test]
    fn token_signed_with_other_secret_is_rejected() {
        let token = sign("a-completely-different-signing-secret", 7, ROLE_USER, 900);
        assert!(validate_token(&token, &config()).is_err());
    }

    #[test]
    fn unknown_role_is_rejected() {
        let token = sign(SECRET, 7, "superuser", 900);
        assert_matches::assert_matches!(
            validate_token(&token, &config()).map_err(|e| e.into_kind()),
            Err(ErrorKind::InvalidToken)
        );
    }
}
