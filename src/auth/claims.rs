/// Access token claims
///
/// The payload binds a token to the user it was issued for and to the
/// network address the request came from.

use serde::{Deserialize, Serialize};

/// JWT claims for access tokens
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct Claims {
    /// Subject (opaque user identifier)
    pub user_id: String,
    /// Client network address at issuance time
    pub client_ip: String,
    /// Expiration time (Unix timestamp)
    pub exp: i64,
    /// Issued at (Unix timestamp)
    pub iat: i64,
}

impl Claims {
    /// Create claims expiring `expiry_seconds` from now
    pub fn new(user_id: &str, client_ip: &str, expiry_seconds: i64) -> Self {
        let now = chrono::Utc::now().timestamp();
        Self {
            user_id: user_id.to_string(),
            client_ip: client_ip.to_string(),
            exp: now + expiry_seconds,
            iat: now,
        }
    }

    /// Check if token has expired
    pub fn is_expired(&self) -> bool {
        let now = chrono::Utc::now().timestamp();
        self.exp < now
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_claims_creation() {
        let claims = Claims::new("user-1", "10.0.0.1", 900);

        assert_eq!(claims.user_id, "user-1");
        assert_eq!(claims.client_ip, "10.0.0.1");
        assert_eq!(claims.exp - claims.iat, 900);
        assert!(!claims.is_expired());
    }

    #[test]
    fn test_expired_claims() {
        let claims = Claims::new("user-1", "10.0.0.1", -10);
        assert!(claims.is_expired());
    }

    #[test]
    fn test_wire_field_names() {
        let claims = Claims::new("user-1", "10.0.0.1", 900);
        let json = serde_json::to_value(&claims).expect("Failed to serialize claims");

        assert_eq!(json["user_id"], "user-1");
        assert_eq!(json["client_ip"], "10.0.0.1");
        assert!(json["exp"].is_i64());
    }
}
