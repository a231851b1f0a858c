use std::sync::Arc;

use uuid::Uuid;

use crate::auth::Principal;
use crate::database::{Fields, Query, RecordStore, Row};

use super::audit::{changed_fields, snapshot, AuditAction, AuditLogger, Audited, NewAuditEntry};
use super::error::{ServiceError, ServiceResult};

/// Read-previous → write → audit for a single table.
///
/// Authorization and validation happen in the owning service before any of
/// these are called. Nothing here is transactional: the audit entry is written
/// after the mutation and its failure only downgrades the outcome.
#[derive(Clone)]
pub struct AuditedTable {
    store: Arc<dyn RecordStore>,
    audit: AuditLogger,
    table: &'static str,
    label: &'static str,
    tracked: &'static [&'static str],
}

impl AuditedTable {
    pub fn new(
        store: Arc<dyn RecordStore>,
        audit: AuditLogger,
        table: &'static str,
        label: &'static str,
        tracked: &'static [&'static str],
    ) -> Self {
        Self {
            store,
            audit,
            table,
            label,
            tracked,
        }
    }

    pub fn table(&self) -> &'static str {
        self.table
    }

    pub async fn find(&self, id: Uuid) -> ServiceResult<Option<Row>> {
        Ok(self.store.select_one(self.table, &Query::by_id(id)).await?)
    }

    pub async fn get(&self, id: Uuid) -> ServiceResult<Row> {
        self.find(id)
            .await?
            .ok_or_else(|| ServiceError::not_found(format!("{} not found", self.label)))
    }

    pub async fn create(&self, principal: &Principal, fields: Fields) -> ServiceResult<Audited<Row>> {
        let row = self.store.insert(self.table, fields).await?;
        let entry = NewAuditEntry::new(Some(principal), AuditAction::Create, self.table)
            .entity_id(row_id(&row))
            .new_value(snapshot(&row, self.tracked));
        let audit = self.audit.record(entry).await;
        Ok(Audited { value: row, audit })
    }

    pub async fn update(&self, principal: &Principal, id: Uuid, fields: Fields) -> ServiceResult<Audited<Row>> {
        let old = self.get(id).await?;
        let new = self
            .store
            .update(self.table, &Query::by_id(id), fields)
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| ServiceError::not_found(format!("{} not found", self.label)))?;

        let (before, after) = changed_fields(&old, &new, self.tracked);
        let entry = NewAuditEntry::new(Some(principal), AuditAction::Update, self.table)
            .entity_id(id)
            .old_value(before)
            .new_value(after);
        let audit = self.audit.record(entry).await;
        Ok(Audited { value: new, audit })
    }

    /// Delete by id, returning the row as it was.
    pub async fn delete(&self, principal: &Principal, id: Uuid) -> ServiceResult<Audited<Row>> {
        let old = self.get(id).await?;
        let removed = self.store.remove(self.table, &Query::by_id(id)).await?;
        if removed == 0 {
            return Err(ServiceError::not_found(format!("{} not found", self.label)));
        }

        let entry = NewAuditEntry::new(Some(principal), AuditAction::Delete, self.table)
            .entity_id(id)
            .old_value(snapshot(&old, self.tracked));
        let audit = self.audit.record(entry).await;
        Ok(Audited { value: old, audit })
    }
}

pub fn row_id(row: &Row) -> String {
    match row.get("id") {
        Some(serde_json::Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
        None => String::new(),
    }
}
