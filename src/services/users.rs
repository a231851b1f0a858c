use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::info;
use uuid::Uuid;

use crate::auth::{authorize, hash_password, Access, Principal, Role};
use crate::database::{decode, decode_all, Fields, Query, RecordStore, Row, SortDirection};

use super::audit::{changed_fields, snapshot, AuditAction, AuditLogger, Audited, NewAuditEntry};
use super::error::{ServiceError, ServiceResult};
use super::validation;

pub const USERS_TABLE: &str = "admin_users";
// password_hash is never tracked, so it never reaches an audit snapshot
const TRACKED: &[&str] = &["email", "name", "role", "permissions", "is_active"];

/// An admin account as exposed by the API. Has no password hash field, so
/// decoding a row drops it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AdminUser {
    pub id: Uuid,
    pub email: String,
    pub name: String,
    pub role: Role,
    #[serde(default)]
    pub permissions: Value,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl AdminUser {
    pub fn principal(&self) -> Principal {
        Principal {
            id: self.id,
            name: self.name.clone(),
            email: self.email.clone(),
            role: self.role,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewUserInput {
    pub email: String,
    pub name: String,
    pub password: String,
    pub role: String,
    #[serde(default)]
    pub permissions: Vec<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateUserInput {
    pub email: Option<String>,
    pub name: Option<String>,
    pub password: Option<String>,
    pub role: Option<String>,
    pub permissions: Option<Vec<String>>,
    pub is_active: Option<bool>,
}

/// Admin account management. Every operation requires the `dev` role,
/// except `bootstrap` which runs from the command line.
#[derive(Clone)]
pub struct UserService {
    store: Arc<dyn RecordStore>,
    audit: AuditLogger,
    password_cost: u32,
}

impl UserService {
    pub fn new(store: Arc<dyn RecordStore>, audit: AuditLogger, password_cost: u32) -> Self {
        Self {
            store,
            audit,
            password_cost,
        }
    }

    pub async fn list(&self, principal: Option<&Principal>) -> ServiceResult<Vec<AdminUser>> {
        authorize(principal, Access::Dev)?;
        let query = Query::new().order_by("name", SortDirection::Asc);
        Ok(decode_all(self.store.select(USERS_TABLE, &query).await?)?)
    }

    pub async fn get(&self, principal: Option<&Principal>, id: Uuid) -> ServiceResult<AdminUser> {
        authorize(principal, Access::Dev)?;
        Ok(decode(self.row(id).await?)?)
    }

    pub async fn create(&self, principal: Option<&Principal>, input: NewUserInput) -> ServiceResult<Audited<AdminUser>> {
        let principal = authorize(principal, Access::Dev)?;
        self.insert(Some(principal), input).await
    }

    /// Create an account without a session, as a system action.
    pub async fn bootstrap(&self, input: NewUserInput) -> ServiceResult<Audited<AdminUser>> {
        self.insert(None, input).await
    }

    pub async fn update(
        &self,
        principal: Option<&Principal>,
        id: Uuid,
        input: UpdateUserInput,
    ) -> ServiceResult<Audited<AdminUser>> {
        let principal = authorize(principal, Access::Dev)?;

        let mut fields = Fields::new();
        if let Some(email) = &input.email {
            fields = fields.set("email", validation::email(email)?);
        }
        if let Some(name) = &input.name {
            fields = fields.set("name", validation::required("name", name)?);
        }
        if let Some(role) = &input.role {
            fields = fields.set("role", parse_role(role)?.as_str());
        }
        if let Some(permissions) = &input.permissions {
            fields = fields.set("permissions", json!(permissions));
        }
        if let Some(is_active) = input.is_active {
            fields = fields.set("is_active", is_active);
        }
        if let Some(password) = &input.password {
            validation::password(password)?;
        }

        let old = self.row(id).await?;
        if let Some(email) = &input.email {
            self.ensure_email_free(&validation::email(email)?, Some(id)).await?;
        }
        if let Some(password) = input.password {
            fields = fields.set("password_hash", self.hash(password).await?);
        }
        let fields = fields.set("updated_at", Utc::now());

        let new = self
            .store
            .update(USERS_TABLE, &Query::by_id(id), fields)
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| ServiceError::not_found("User not found"))?;

        let (before, mut after) = changed_fields(&old, &new, TRACKED);
        if old.get("password_hash") != new.get("password_hash") {
            if let Value::Object(map) = &mut after {
                map.insert("password_changed".to_string(), Value::Bool(true));
            }
        }
        let entry = NewAuditEntry::new(Some(principal), AuditAction::Update, USERS_TABLE)
            .entity_id(id)
            .old_value(before)
            .new_value(after);
        let audit = self.audit.record(entry).await;

        Ok(Audited {
            value: decode(new)?,
            audit,
        })
    }

    /// Delete an account. Deleting the caller's own account is refused before
    /// anything is read or written.
    pub async fn delete(&self, principal: Option<&Principal>, id: Uuid) -> ServiceResult<Audited<AdminUser>> {
        let principal = authorize(principal, Access::Dev)?;
        if principal.id == id {
            return Err(ServiceError::validation("You cannot delete your own account"));
        }

        let old = self.row(id).await?;
        self.store.remove(USERS_TABLE, &Query::by_id(id)).await?;

        let entry = NewAuditEntry::new(Some(principal), AuditAction::Delete, USERS_TABLE)
            .entity_id(id)
            .old_value(snapshot(&old, TRACKED));
        let audit = self.audit.record(entry).await;

        Ok(Audited {
            value: decode(old)?,
            audit,
        })
    }

    /// The account and its password hash, for credential checks.
    pub async fn find_credentials(&self, email: &str) -> ServiceResult<Option<(AdminUser, String)>> {
        let row = self
            .store
            .select_one(USERS_TABLE, &Query::new().eq("email", email.trim().to_lowercase()))
            .await?;
        let Some(row) = row else {
            return Ok(None);
        };
        let hash = row
            .get("password_hash")
            .and_then(Value::as_str)
            .map(String::from)
            .ok_or_else(|| ServiceError::Internal("user row has no password hash".into()))?;
        Ok(Some((decode(row)?, hash)))
    }

    pub async fn find(&self, id: Uuid) -> ServiceResult<Option<AdminUser>> {
        let row = self.store.select_one(USERS_TABLE, &Query::by_id(id)).await?;
        Ok(row.map(decode).transpose()?)
    }

    async fn insert(&self, principal: Option<&Principal>, input: NewUserInput) -> ServiceResult<Audited<AdminUser>> {
        let email = validation::email(&input.email)?;
        let name = validation::required("name", &input.name)?.to_string();
        let role = parse_role(&input.role)?;
        validation::password(&input.password)?;
        self.ensure_email_free(&email, None).await?;

        let password_hash = self.hash(input.password).await?;
        let now = Utc::now();
        let fields = Fields::new()
            .set("id", Uuid::new_v4())
            .set("email", email.as_str())
            .set("name", name)
            .set("password_hash", password_hash)
            .set("role", role.as_str())
            .set("permissions", json!(input.permissions))
            .set("is_active", true)
            .set("created_at", now)
            .set("updated_at", now);
        let row = self.store.insert(USERS_TABLE, fields).await?;
        let user: AdminUser = decode(row.clone())?;

        let entry = NewAuditEntry::new(principal, AuditAction::Create, USERS_TABLE)
            .entity_id(user.id)
            .new_value(snapshot(&row, TRACKED));
        let audit = self.audit.record(entry).await;

        info!("Created {} account {}", user.role, user.email);
        Ok(Audited { value: user, audit })
    }

    async fn row(&self, id: Uuid) -> ServiceResult<Row> {
        self.store
            .select_one(USERS_TABLE, &Query::by_id(id))
            .await?
            .ok_or_else(|| ServiceError::not_found("User not found"))
    }

    async fn ensure_email_free(&self, email: &str, except: Option<Uuid>) -> ServiceResult<()> {
        match self.find_credentials(email).await? {
            Some((existing, _)) if Some(existing.id) != except => Err(ServiceError::conflict(format!(
                "A user with email '{}' already exists",
                email
            ))),
            _ => Ok(()),
        }
    }

    async fn hash(&self, password: String) -> ServiceResult<String> {
        let cost = self.password_cost;
        Ok(tokio::task::spawn_blocking(move || hash_password(&password, cost)).await??)
    }
}

fn parse_role(role: &str) -> ServiceResult<Role> {
    role.parse().map_err(ServiceError::Validation)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::MemoryRecordStore;
    use crate::services::audit::AUDIT_TABLE;

    fn service() -> (Arc<MemoryRecordStore>, UserService) {
        let store = Arc::new(MemoryRecordStore::new());
        let service = UserService::new(store.clone(), AuditLogger::new(store.clone()), 4);
        (store, service)
    }

    fn principal(role: Role) -> Principal {
        Principal {
            id: Uuid::new_v4(),
            name: "Caller".into(),
            email: "caller@example.com".into(),
            role,
        }
    }

    fn input(email: &str) -> NewUserInput {
        NewUserInput {
            email: email.into(),
            name: "Ana".into(),
            password: "s3cret-pass".into(),
            role: "editor".into(),
            permissions: vec![],
        }
    }

    #[tokio::test]
    async fn only_dev_manages_users() {
        let (store, service) = service();
        for role in [Role::Admin, Role::Editor] {
            assert!(matches!(
                service.create(Some(&principal(role)), input("ana@example.com")).await,
                Err(ServiceError::Unauthorized(_))
            ));
        }
        assert!(store.rows(USERS_TABLE).is_empty());
    }

    #[tokio::test]
    async fn email_is_unique_case_insensitively() {
        let (store, service) = service();
        let dev = principal(Role::Dev);
        service.create(Some(&dev), input("ana@example.com")).await.unwrap();
        assert!(matches!(
            service.create(Some(&dev), input("ANA@example.com")).await,
            Err(ServiceError::Conflict(_))
        ));
        assert_eq!(store.rows(USERS_TABLE).len(), 1);
    }

    #[tokio::test]
    async fn password_hash_never_leaves_the_service() {
        let (store, service) = service();
        let dev = principal(Role::Dev);
        let user = service.create(Some(&dev), input("ana@example.com")).await.unwrap().into_inner();

        let body = serde_json::to_value(&user).unwrap();
        assert!(body.get("password_hash").is_none());

        let _ = service
            .update(
                Some(&dev),
                user.id,
                UpdateUserInput {
                    password: Some("another-pass".into()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        for entry in store.rows(AUDIT_TABLE) {
            assert!(!entry.to_owned().into_iter().any(|(_, v)| v.to_string().contains("$2")));
        }
        let last = store.rows(AUDIT_TABLE).pop().unwrap();
        assert_eq!(last["new_value"]["password_changed"], true);
    }

    #[tokio::test]
    async fn self_delete_is_refused() {
        let (store, service) = service();
        let dev_user = service
            .bootstrap(NewUserInput {
                role: "dev".into(),
                ..input("dev@example.com")
            })
            .await
            .unwrap()
            .into_inner();

        let session = dev_user.principal();
        assert!(matches!(
            service.delete(Some(&session), dev_user.id).await,
            Err(ServiceError::Validation(_))
        ));
        assert_eq!(store.rows(USERS_TABLE).len(), 1);

        let other = service.create(Some(&session), input("ana@example.com")).await.unwrap().into_inner();
        service.delete(Some(&session), other.id).await.unwrap();
        assert_eq!(store.rows(USERS_TABLE).len(), 1);
    }

    #[tokio::test]
    async fn short_password_and_bad_role_are_rejected() {
        let (_store, service) = service();
        let dev = principal(Role::Dev);
        let mut short = input("ana@example.com");
        short.password = "1234567".into();
        assert!(matches!(service.create(Some(&dev), short).await, Err(ServiceError::Validation(_))));

        let mut role = input("ana@example.com");
        role.role = "root".into();
        assert!(matches!(service.create(Some(&dev), role).await, Err(ServiceError::Validation(_))));
    }
}
