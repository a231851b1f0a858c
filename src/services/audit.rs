use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::warn;
use uuid::Uuid;

use crate::auth::{authorize, Access, Principal};
use crate::database::{decode, decode_all, Fields, Query, RecordStore, Row, SortDirection};

use super::error::{ServiceError, ServiceResult};

pub const AUDIT_TABLE: &str = "audit_logs";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AuditAction {
    Create,
    Update,
    Delete,
    Login,
    Logout,
}

impl AuditAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            AuditAction::Create => "create",
            AuditAction::Update => "update",
            AuditAction::Delete => "delete",
            AuditAction::Login => "login",
            AuditAction::Logout => "logout",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditEntry {
    pub id: Uuid,
    pub user_id: Option<Uuid>,
    pub action: AuditAction,
    pub entity: String,
    pub entity_id: Option<String>,
    pub old_value: Option<Value>,
    pub new_value: Option<Value>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewAuditEntry {
    /// `None` for system actions
    pub user_id: Option<Uuid>,
    pub action: AuditAction,
    pub entity: String,
    pub entity_id: Option<String>,
    pub old_value: Option<Value>,
    pub new_value: Option<Value>,
}

impl NewAuditEntry {
    pub fn new(principal: Option<&Principal>, action: AuditAction, entity: &str) -> Self {
        Self {
            user_id: principal.map(|p| p.id),
            action,
            entity: entity.to_string(),
            entity_id: None,
            old_value: None,
            new_value: None,
        }
    }

    pub fn entity_id(mut self, id: impl ToString) -> Self {
        self.entity_id = Some(id.to_string());
        self
    }

    pub fn old_value(mut self, value: Value) -> Self {
        self.old_value = Some(value);
        self
    }

    pub fn new_value(mut self, value: Value) -> Self {
        self.new_value = Some(value);
        self
    }
}

/// Whether the audit row for a mutation was written.
///
/// Audit writes are best-effort: a dropped entry is logged and never fails
/// or undoes the mutation it describes.
#[must_use]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuditOutcome {
    Recorded,
    Dropped,
}

/// The result of a mutation together with the fate of its audit entry.
#[derive(Debug, Clone)]
pub struct Audited<T> {
    pub value: T,
    pub audit: AuditOutcome,
}

impl<T> Audited<T> {
    pub fn into_inner(self) -> T {
        self.value
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct AuditFilter {
    pub entity: Option<String>,
    pub action: Option<AuditAction>,
    pub user_id: Option<Uuid>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

#[derive(Clone)]
pub struct AuditLogger {
    store: Arc<dyn RecordStore>,
}

impl AuditLogger {
    pub fn new(store: Arc<dyn RecordStore>) -> Self {
        Self { store }
    }

    pub async fn record(&self, entry: NewAuditEntry) -> AuditOutcome {
        let fields = Fields::new()
            .set("id", Uuid::new_v4())
            .set("user_id", entry.user_id)
            .set("action", entry.action.as_str())
            .set("entity", entry.entity.as_str())
            .set("entity_id", entry.entity_id.as_deref())
            .set("old_value", entry.old_value)
            .set("new_value", entry.new_value)
            .set("created_at", Utc::now());

        match self.store.insert(AUDIT_TABLE, fields).await {
            Ok(_) => AuditOutcome::Recorded,
            Err(e) => {
                warn!(
                    "Dropped audit entry ({} {} {:?}): {}",
                    entry.action.as_str(),
                    entry.entity,
                    entry.entity_id,
                    e
                );
                AuditOutcome::Dropped
            }
        }
    }

    /// Newest first. Dev role only.
    pub async fn list(&self, principal: Option<&Principal>, filter: &AuditFilter) -> ServiceResult<Vec<AuditEntry>> {
        authorize(principal, Access::Dev)?;

        let query = Query::new()
            .eq_opt("entity", filter.entity.as_deref())
            .eq_opt("action", filter.action.map(|a| a.as_str()))
            .eq_opt("user_id", filter.user_id)
            .order_by("created_at", SortDirection::Desc)
            .limit(filter.limit.unwrap_or(50).clamp(1, 500))
            .offset(filter.offset.unwrap_or(0).max(0));

        let rows = self.store.select(AUDIT_TABLE, &query).await?;
        Ok(decode_all(rows)?)
    }

    pub async fn get(&self, principal: Option<&Principal>, id: Uuid) -> ServiceResult<AuditEntry> {
        authorize(principal, Access::Dev)?;
        let row = self
            .store
            .select_one(AUDIT_TABLE, &Query::by_id(id))
            .await?
            .ok_or_else(|| ServiceError::not_found("Audit entry not found"))?;
        Ok(decode(row)?)
    }
}

/// The tracked columns of a row as a JSON object.
pub fn snapshot(row: &Row, tracked: &[&str]) -> Value {
    let map: Map<String, Value> = tracked
        .iter()
        .filter_map(|column| row.get(*column).map(|v| (column.to_string(), v.clone())))
        .collect();
    Value::Object(map)
}

/// Old and new values of only the tracked columns whose values differ.
pub fn changed_fields(old: &Row, new: &Row, tracked: &[&str]) -> (Value, Value) {
    diff(old, new, tracked.iter().copied())
}

/// Like [`changed_fields`], over every top-level key present on either side.
pub fn changed_keys(old: &Row, new: &Row) -> (Value, Value) {
    let mut keys: Vec<&str> = old.keys().chain(new.keys()).map(String::as_str).collect();
    keys.sort_unstable();
    keys.dedup();
    diff(old, new, keys.into_iter())
}

fn diff<'k>(old: &Row, new: &Row, keys: impl Iterator<Item = &'k str>) -> (Value, Value) {
    let mut before = Map::new();
    let mut after = Map::new();
    for key in keys {
        let old_value = old.get(key).unwrap_or(&Value::Null);
        let new_value = new.get(key).unwrap_or(&Value::Null);
        if old_value != new_value {
            before.insert(key.to_string(), old_value.clone());
            after.insert(key.to_string(), new_value.clone());
        }
    }
    (Value::Object(before), Value::Object(after))
}

/// A JSON document as a row for diffing; non-objects diff as a single `value` key.
pub fn as_row(value: &Value) -> Row {
    match value {
        Value::Object(map) => map.clone(),
        other => {
            let mut map = Map::new();
            map.insert("value".to_string(), other.clone());
            map
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::Role;
    use crate::database::MemoryRecordStore;
    use serde_json::json;

    fn row(value: Value) -> Row {
        value.as_object().cloned().unwrap_or_default()
    }

    fn dev() -> Principal {
        Principal {
            id: Uuid::new_v4(),
            name: "Dev".into(),
            email: "dev@example.com".into(),
            role: Role::Dev,
        }
    }

    #[test]
    fn diff_keeps_only_changed_tracked_fields() {
        let old = row(json!({"title": "A", "slug": "a", "updated_at": "t1"}));
        let new = row(json!({"title": "B", "slug": "a", "updated_at": "t2"}));
        let (before, after) = changed_fields(&old, &new, &["title", "slug"]);
        assert_eq!(before, json!({"title": "A"}));
        assert_eq!(after, json!({"title": "B"}));
    }

    #[test]
    fn changed_keys_reports_added_and_removed_keys() {
        let (before, after) = changed_keys(&row(json!({"a": 1, "b": 2})), &row(json!({"b": 2, "c": 3})));
        assert_eq!(before, json!({"a": 1, "c": null}));
        assert_eq!(after, json!({"a": null, "c": 3}));
    }

    #[tokio::test]
    async fn failed_audit_write_is_dropped_not_raised() {
        let store = Arc::new(MemoryRecordStore::new());
        store.fail_writes_to(AUDIT_TABLE);
        let logger = AuditLogger::new(store.clone());

        let outcome = logger
            .record(NewAuditEntry::new(None, AuditAction::Create, "partners").entity_id("x"))
            .await;
        assert_eq!(outcome, AuditOutcome::Dropped);
        assert!(store.rows(AUDIT_TABLE).is_empty());
    }

    #[tokio::test]
    async fn list_is_dev_only_and_filters() {
        let store = Arc::new(MemoryRecordStore::new());
        let logger = AuditLogger::new(store.clone());
        let dev = dev();

        let _ = logger.record(NewAuditEntry::new(Some(&dev), AuditAction::Create, "news")).await;
        let _ = logger.record(NewAuditEntry::new(Some(&dev), AuditAction::Delete, "partners")).await;

        let editor = Principal { role: Role::Editor, ..dev.clone() };
        assert!(matches!(
            logger.list(Some(&editor), &AuditFilter::default()).await,
            Err(ServiceError::Unauthorized(_))
        ));

        let filter = AuditFilter {
            entity: Some("partners".into()),
            ..Default::default()
        };
        let entries = logger.list(Some(&dev), &filter).await.unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].action, AuditAction::Delete);
        assert_eq!(entries[0].user_id, Some(dev.id));
    }
}
