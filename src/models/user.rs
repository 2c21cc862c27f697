//! Authenticated user claims

use serde::{Deserialize, Serialize};

use crate::error::AppError;

/// Portal role carried in the token
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    #[default]
    Operator,
    Admin,
}

/// JWT claims issued by the portal's identity provider
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserClaims {
    pub sub: String,
    /// Employee identifier, used to look up certifications
    pub user_id: String,
    #[serde(default)]
    pub name: Option<String>,
    /// Tokens without a role are treated as operators
    #[serde(default)]
    pub role: Role,
    pub exp: i64,
    pub iat: i64,
}

impl UserClaims {
    pub fn new(user_id: &str, name: Option<&str>, ttl_hours: i64) -> Self {
        let now = chrono::Utc::now().timestamp();
        Self {
            sub: user_id.to_string(),
            user_id: user_id.to_string(),
            name: name.map(str::to_string),
            role: Role::default(),
            exp: now + ttl_hours * 3600,
            iat: now,
        }
    }

    pub fn with_role(mut self, role: Role) -> Self {
        self.role = role;
        self
    }

    /// Create a new JWT token
    pub fn create_token(&self, secret: &str) -> Result<String, jsonwebtoken::errors::Error> {
        use jsonwebtoken::{encode, EncodingKey, Header};
        encode(
            &Header::default(),
            self,
            &EncodingKey::from_secret(secret.as_bytes()),
        )
    }

    /// Parse JWT token
    pub fn from_token(token: &str, secret: &str) -> Result<Self, jsonwebtoken::errors::Error> {
        use jsonwebtoken::{decode, DecodingKey, Validation};
        let token_data = decode::<Self>(
            token,
            &DecodingKey::from_secret(secret.as_bytes()),
            &Validation::default(),
        )?;
        Ok(token_data.claims)
    }

    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }

    /// Require the administrator role (portal settings)
    pub fn require_admin(&self) -> Result<(), AppError> {
        if self.is_admin() {
            Ok(())
        } else {
            Err(AppError::Authorization("Administrator role required".to_string()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_token_round_trip() {
        let claims = UserClaims::new("EMP-2201", Some("Dana Ortiz"), 1);
        let token = claims.create_token("secret").unwrap();
        let parsed = UserClaims::from_token(&token, "secret").unwrap();
        assert_eq!(parsed.user_id, "EMP-2201");
        assert_eq!(parsed.role, Role::Operator);
        assert!(UserClaims::from_token(&token, "other").is_err());
    }

    #[test]
    fn test_role_survives_token() {
        let claims = UserClaims::new("EMP-9000", None, 1).with_role(Role::Admin);
        let token = claims.create_token("secret").unwrap();
        let parsed = UserClaims::from_token(&token, "secret").unwrap();
        assert!(parsed.is_admin());
        assert!(parsed.require_admin().is_ok());
    }

    #[test]
    fn test_operator_is_not_admin() {
        let claims = UserClaims::new("EMP-2201", None, 1);
        assert!(matches!(claims.require_admin(), Err(AppError::Authorization(_))));
    }

    #[test]
    fn test_missing_role_defaults_to_operator() {
        let claims: UserClaims = serde_json::from_value(serde_json::json!({
            "sub": "EMP-2201",
            "user_id": "EMP-2201",
            "exp": 0,
            "iat": 0
        }))
        .unwrap();
        assert_eq!(claims.role, Role::Operator);
    }
}
