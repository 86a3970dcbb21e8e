/// Access Token Issuance
///
/// Builds and signs short-lived HS512 bearer tokens.

use chrono::{DateTime, TimeZone, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};

use crate::auth::claims::Claims;
use crate::configuration::JwtSettings;
use crate::error::{AppError, AuthError, CryptoError};

/// A signed access token together with the claims it carries
#[derive(Debug, Clone)]
pub struct AccessToken {
    pub token: String,
    pub claims: Claims,
}

impl AccessToken {
    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        Utc.timestamp_opt(self.claims.exp, 0).single()
    }
}

/// Signs access tokens with the process-wide secret.
///
/// Holds only immutable state, so a single instance is shared across workers.
pub struct AccessTokenIssuer {
    secret: Vec<u8>,
    expiry_seconds: i64,
}

impl AccessTokenIssuer {
    pub fn new(config: &JwtSettings) -> Self {
        Self {
            secret: config.secret.as_bytes().to_vec(),
            expiry_seconds: config.access_token_expiry,
        }
    }

    /// Lifetime of issued tokens in seconds
    pub fn expiry_seconds(&self) -> i64 {
        self.expiry_seconds
    }

    /// Issue a token for `user_id` bound to `client_ip`
    ///
    /// # Errors
    /// Returns `CryptoError::Signing` if the secret is empty or encoding fails
    pub fn issue(&self, user_id: &str, client_ip: &str) -> Result<AccessToken, AppError> {
        if self.secret.is_empty() {
            return Err(CryptoError::Signing("signing secret is not configured".to_string()).into());
        }

        let claims = Claims::new(user_id, client_ip, self.expiry_seconds);
        let token = encode(
            &Header::new(Algorithm::HS512),
            &claims,
            &EncodingKey::from_secret(&self.secret),
        )
        .map_err(|e| CryptoError::Signing(e.to_string()))?;

        Ok(AccessToken { token, claims })
    }

    /// Validate a token signed by this issuer and return its claims
    ///
    /// # Errors
    /// Returns `AuthError::InvalidToken` if the token is malformed, expired,
    /// signed with another key or with another algorithm
    pub fn decode(&self, token: &str) -> Result<Claims, AppError> {
        let validation = Validation::new(Algorithm::HS512);

        decode::<Claims>(token, &DecodingKey::from_secret(&self.secret), &validation)
            .map(|data| data.claims)
            .map_err(|e| {
                tracing::warn!("Access token validation error: {}", e);
                AppError::Auth(AuthError::InvalidToken)
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn get_test_config() -> JwtSettings {
        JwtSettings {
            secret: "test-secret-key-at-least-32-characters-long".to_string(),
            access_token_expiry: 900,
        }
    }

    #[test]
    fn test_issue_and_decode_token() {
        let issuer = AccessTokenIssuer::new(&get_test_config());
        let before = Utc::now().timestamp();

        let token = issuer.issue("user-1", "127.0.0.1").expect("Failed to issue token");
        let claims = issuer.decode(&token.token).expect("Failed to decode token");

        assert_eq!(claims.user_id, "user-1");
        assert_eq!(claims.client_ip, "127.0.0.1");
        assert!(claims.exp >= before + 900);
        assert!(claims.exp <= Utc::now().timestamp() + 900);
        assert_eq!(claims, token.claims);
    }

    #[test]
    fn test_token_header_uses_hs512() {
        let issuer = AccessTokenIssuer::new(&get_test_config());
        let token = issuer.issue("user-1", "127.0.0.1").expect("Failed to issue token");

        let header = jsonwebtoken::decode_header(&token.token).expect("Failed to read header");
        assert_eq!(header.alg, Algorithm::HS512);
    }

    #[test]
    fn test_empty_secret_is_signing_error() {
        let mut config = get_test_config();
        config.secret = String::new();
        let issuer = AccessTokenIssuer::new(&config);

        let result = issuer.issue("user-1", "127.0.0.1");
        assert!(matches!(result, Err(AppError::Crypto(CryptoError::Signing(_)))));
    }

    #[test]
    fn test_tampered_token() {
        let issuer = AccessTokenIssuer::new(&get_test_config());
        let token = issuer.issue("user-1", "127.0.0.1").expect("Failed to issue token");

        let tampered = format!("{}X", token.token);
        assert!(issuer.decode(&tampered).is_err());
    }

    #[test]
    fn test_wrong_secret() {
        let issuer = AccessTokenIssuer::new(&get_test_config());
        let token = issuer.issue("user-1", "127.0.0.1").expect("Failed to issue token");

        let mut other = get_test_config();
        other.secret = "another-secret-key-at-least-32-characters".to_string();
        let other_issuer = AccessTokenIssuer::new(&other);

        assert!(other_issuer.decode(&token.token).is_err());
    }

    #[test]
    fn test_expired_token_rejected() {
        let mut config = get_test_config();
        // Past the default 60 second leeway
        config.access_token_expiry = -120;
        let issuer = AccessTokenIssuer::new(&config);

        let token = issuer.issue("user-1", "127.0.0.1").expect("Failed to issue token");
        assert!(issuer.decode(&token.token).is_err());
    }

    #[test]
    fn test_expires_at() {
        let issuer = AccessTokenIssuer::new(&get_test_config());
        let token = issuer.issue("user-1", "127.0.0.1").expect("Failed to issue token");

        let expires_at = token.expires_at().expect("exp out of range");
        assert_eq!(expires_at.timestamp(), token.claims.exp);
    }
}
