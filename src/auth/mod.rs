use std::fmt;
use std::str::FromStr;

use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Authentication required")]
    MissingSession,

    #[error("Insufficient permissions")]
    InsufficientRole,

    #[error("Invalid session token: {0}")]
    InvalidToken(String),

    #[error("Invalid email or password")]
    InvalidCredentials,

    #[error(transparent)]
    Token(#[from] jsonwebtoken::errors::Error),

    #[error(transparent)]
    Hash(#[from] bcrypt::BcryptError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Dev,
    Admin,
    Editor,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Dev => "dev",
            Role::Admin => "admin",
            Role::Editor => "editor",
        }
    }
}

impl FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "dev" => Ok(Role::Dev),
            "admin" => Ok(Role::Admin),
            "editor" => Ok(Role::Editor),
            other => Err(format!("Invalid role '{}': expected dev, admin or editor", other)),
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The authenticated caller, passed explicitly into every service operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Principal {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub role: Role,
}

/// What an operation requires of the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    /// Any authenticated role
    Authenticated,
    /// Only the elevated `dev` role (user management, audit logs)
    Dev,
}

/// Check the session against the access level. Both a missing session and an
/// insufficient role are authorization failures; the operation must not run.
pub fn authorize(principal: Option<&Principal>, access: Access) -> Result<&Principal, AuthError> {
    let principal = principal.ok_or(AuthError::MissingSession)?;
    match access {
        Access::Authenticated => Ok(principal),
        Access::Dev if principal.role == Role::Dev => Ok(principal),
        Access::Dev => Err(AuthError::InsufficientRole),
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: Uuid,
    pub email: String,
    pub name: String,
    pub role: Role,
    pub exp: i64,
    pub iat: i64,
}

impl From<Claims> for Principal {
    fn from(claims: Claims) -> Self {
        Self {
            id: claims.sub,
            name: claims.name,
            email: claims.email,
            role: claims.role,
        }
    }
}

/// Signs and verifies session tokens (HS256).
#[derive(Clone)]
pub struct TokenIssuer {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    expiry_hours: u64,
}

impl TokenIssuer {
    pub fn new(secret: &str, expiry_hours: u64) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            expiry_hours,
        }
    }

    pub fn expiry_secs(&self) -> u64 {
        self.expiry_hours * 3600
    }

    pub fn issue(&self, principal: &Principal) -> Result<String, AuthError> {
        let now = Utc::now();
        let claims = Claims {
            sub: principal.id,
            email: principal.email.clone(),
            name: principal.name.clone(),
            role: principal.role,
            exp: (now + Duration::hours(self.expiry_hours as i64)).timestamp(),
            iat: now.timestamp(),
        };
        Ok(encode(&Header::default(), &claims, &self.encoding_key)?)
    }

    pub fn validate(&self, token: &str) -> Result<Principal, AuthError> {
        let data = decode::<Claims>(token, &self.decoding_key, &Validation::default())
            .map_err(|e| AuthError::InvalidToken(e.to_string()))?;
        Ok(data.claims.into())
    }
}

pub fn hash_password(password: &str, cost: u32) -> Result<String, AuthError> {
    Ok(bcrypt::hash(password, cost)?)
}

pub fn verify_password(password: &str, hash: &str) -> Result<bool, AuthError> {
    Ok(bcrypt::verify(password, hash)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn principal(role: Role) -> Principal {
        Principal {
            id: Uuid::new_v4(),
            name: "Ana".into(),
            email: "ana@example.com".into(),
            role,
        }
    }

    #[test]
    fn token_round_trips_principal() {
        let issuer = TokenIssuer::new("test-secret", 1);
        let editor = principal(Role::Editor);
        let token = issuer.issue(&editor).unwrap();
        assert_eq!(issuer.validate(&token).unwrap(), editor);
    }

    #[test]
    fn token_from_other_secret_is_rejected() {
        let token = TokenIssuer::new("a", 1).issue(&principal(Role::Dev)).unwrap();
        assert!(matches!(
            TokenIssuer::new("b", 1).validate(&token),
            Err(AuthError::InvalidToken(_))
        ));
    }

    #[test]
    fn dev_access_requires_dev_role() {
        let admin = principal(Role::Admin);
        let dev = principal(Role::Dev);

        assert!(authorize(None, Access::Authenticated).is_err());
        assert!(authorize(Some(&admin), Access::Authenticated).is_ok());
        assert!(matches!(authorize(Some(&admin), Access::Dev), Err(AuthError::InsufficientRole)));
        assert!(authorize(Some(&dev), Access::Dev).is_ok());
    }

    #[test]
    fn password_hash_verifies() {
        let hash = hash_password("correct horse", 4).unwrap();
        assert!(verify_password("correct horse", &hash).unwrap());
        assert!(!verify_password("wrong horse", &hash).unwrap());
    }
}
