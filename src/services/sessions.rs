use std::sync::Arc;

use serde::Serialize;
use tracing::{info, warn};

use crate::auth::{authorize, verify_password, Access, AuthError, Principal, TokenIssuer};

use super::audit::{AuditAction, AuditLogger, AuditOutcome, NewAuditEntry};
use super::error::{ServiceError, ServiceResult};
use super::users::{AdminUser, UserService, USERS_TABLE};

#[derive(Debug, Clone, Serialize)]
pub struct LoginResponse {
    pub token: String,
    pub expires_in: u64,
    pub user: AdminUser,
}

#[derive(Clone)]
pub struct SessionService {
    users: UserService,
    audit: AuditLogger,
    tokens: Arc<TokenIssuer>,
}

impl SessionService {
    pub fn new(users: UserService, audit: AuditLogger, tokens: Arc<TokenIssuer>) -> Self {
        Self { users, audit, tokens }
    }

    /// Check credentials and issue a session token. Unknown e-mail, wrong
    /// password and inactive account all produce the same error.
    pub async fn login(&self, email: &str, password: &str) -> ServiceResult<LoginResponse> {
        let Some((user, hash)) = self.users.find_credentials(email).await? else {
            warn!("Login failed for unknown account {}", email);
            return Err(AuthError::InvalidCredentials.into());
        };

        let candidate = password.to_string();
        let valid = tokio::task::spawn_blocking(move || verify_password(&candidate, &hash)).await??;
        if !valid || !user.is_active {
            warn!("Login failed for {}", user.email);
            return Err(AuthError::InvalidCredentials.into());
        }

        let principal = user.principal();
        let token = self.tokens.issue(&principal)?;

        let entry = NewAuditEntry::new(Some(&principal), AuditAction::Login, USERS_TABLE).entity_id(user.id);
        let _ = self.audit.record(entry).await;

        info!("{} logged in", user.email);
        Ok(LoginResponse {
            token,
            expires_in: self.tokens.expiry_secs(),
            user,
        })
    }

    /// Tokens are stateless; logging out only leaves an audit entry.
    pub async fn logout(&self, principal: Option<&Principal>) -> ServiceResult<AuditOutcome> {
        let principal = authorize(principal, Access::Authenticated)?;
        let entry = NewAuditEntry::new(Some(principal), AuditAction::Logout, USERS_TABLE).entity_id(principal.id);
        Ok(self.audit.record(entry).await)
    }

    /// The caller's current account; a deleted or deactivated account no
    /// longer counts as a session.
    pub async fn me(&self, principal: Option<&Principal>) -> ServiceResult<AdminUser> {
        let principal = authorize(principal, Access::Authenticated)?;
        match self.users.find(principal.id).await? {
            Some(user) if user.is_active => Ok(user),
            _ => Err(ServiceError::Unauthorized(AuthError::MissingSession.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::MemoryRecordStore;
    use crate::services::audit::AUDIT_TABLE;
    use crate::services::users::{NewUserInput, UpdateUserInput};

    async fn fixture() -> (Arc<MemoryRecordStore>, UserService, SessionService, AdminUser) {
        let store = Arc::new(MemoryRecordStore::new());
        let audit = AuditLogger::new(store.clone());
        let users = UserService::new(store.clone(), audit.clone(), 4);
        let sessions = SessionService::new(users.clone(), audit, Arc::new(TokenIssuer::new("secret", 1)));
        let user = users
            .bootstrap(NewUserInput {
                email: "dev@example.com".into(),
                name: "Dev".into(),
                password: "correct-password".into(),
                role: "dev".into(),
                permissions: vec![],
            })
            .await
            .unwrap()
            .into_inner();
        (store, users, sessions, user)
    }

    #[tokio::test]
    async fn login_issues_token_and_audits() {
        let (store, _users, sessions, user) = fixture().await;
        let response = sessions.login("Dev@Example.com", "correct-password").await.unwrap();

        let principal = TokenIssuer::new("secret", 1).validate(&response.token).unwrap();
        assert_eq!(principal.id, user.id);
        assert_eq!(response.expires_in, 3600);

        let last = store.rows(AUDIT_TABLE).pop().unwrap();
        assert_eq!(last["action"], "login");
        assert_eq!(last["user_id"], user.id.to_string());
    }

    #[tokio::test]
    async fn wrong_password_and_inactive_accounts_fail_alike() {
        let (_store, users, sessions, user) = fixture().await;
        assert!(matches!(
            sessions.login("dev@example.com", "wrong-password").await,
            Err(ServiceError::Unauthorized(_))
        ));
        assert!(matches!(
            sessions.login("nobody@example.com", "correct-password").await,
            Err(ServiceError::Unauthorized(_))
        ));

        // A second dev deactivates the first
        let other = users
            .bootstrap(NewUserInput {
                email: "ops@example.com".into(),
                name: "Ops".into(),
                password: "another-password".into(),
                role: "dev".into(),
                permissions: vec![],
            })
            .await
            .unwrap()
            .into_inner();
        let _ = users
            .update(
                Some(&other.principal()),
                user.id,
                UpdateUserInput {
                    is_active: Some(false),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert!(matches!(
            sessions.login("dev@example.com", "correct-password").await,
            Err(ServiceError::Unauthorized(_))
        ));
        assert!(sessions.me(Some(&user.principal())).await.is_err());
    }
}
