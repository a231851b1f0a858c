use std::cmp::Ordering;
use std::collections::{HashMap, HashSet};
use std::sync::{Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use serde_json::Value;

use super::store::{validate_identifier, Condition, Query, RecordStore, Row, SortDirection, StoreError};
use super::value::Fields;

/// In-process `RecordStore` used by tests and local tooling.
///
/// Failure can be injected for the whole store or for writes to single
/// tables, to exercise fallback and best-effort paths.
#[derive(Default)]
pub struct MemoryRecordStore {
    tables: Mutex<HashMap<String, Vec<Row>>>,
    unavailable: Mutex<bool>,
    failing_tables: Mutex<HashSet<String>>,
}

impl MemoryRecordStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every call fail with `StoreError::Unavailable`.
    pub fn set_unavailable(&self, unavailable: bool) {
        *lock(&self.unavailable) = unavailable;
    }

    /// Make inserts/updates/upserts/removes against `table` fail.
    pub fn fail_writes_to(&self, table: &str) {
        lock(&self.failing_tables).insert(table.to_string());
    }

    /// Snapshot of every row in a table, in insertion order.
    pub fn rows(&self, table: &str) -> Vec<Row> {
        lock(&self.tables).get(table).cloned().unwrap_or_default()
    }

    fn check_available(&self) -> Result<(), StoreError> {
        if *lock(&self.unavailable) {
            return Err(StoreError::Unavailable("memory store marked unavailable".to_string()));
        }
        Ok(())
    }

    fn check_writable(&self, table: &str) -> Result<(), StoreError> {
        self.check_available()?;
        validate_identifier(table)?;
        if lock(&self.failing_tables).contains(table) {
            return Err(StoreError::QueryError(format!("writes to {} are failing", table)));
        }
        Ok(())
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

fn row_matches(row: &Row, conditions: &[Condition]) -> bool {
    conditions.iter().all(|condition| match condition {
        Condition::Eq(column, value) => {
            let actual = row.get(column).unwrap_or(&Value::Null);
            *actual == value.to_json()
        }
        Condition::In(column, values) => {
            let actual = row.get(column).unwrap_or(&Value::Null);
            values.iter().any(|v| *actual == v.to_json())
        }
    })
}

fn compare_json(a: &Value, b: &Value) -> Ordering {
    match (a, b) {
        (Value::Null, Value::Null) => Ordering::Equal,
        // Postgres sorts NULLs last in ascending order.
        (Value::Null, _) => Ordering::Greater,
        (_, Value::Null) => Ordering::Less,
        (Value::Number(x), Value::Number(y)) => x
            .as_f64()
            .partial_cmp(&y.as_f64())
            .unwrap_or(Ordering::Equal),
        (Value::String(x), Value::String(y)) => x.cmp(y),
        (Value::Bool(x), Value::Bool(y)) => x.cmp(y),
        _ => a.to_string().cmp(&b.to_string()),
    }
}

fn sort_and_page(mut rows: Vec<Row>, query: &Query) -> Vec<Row> {
    if !query.order.is_empty() {
        rows.sort_by(|a, b| {
            for (column, direction) in &query.order {
                let left = a.get(column).unwrap_or(&Value::Null);
                let right = b.get(column).unwrap_or(&Value::Null);
                let ordering = match direction {
                    SortDirection::Asc => compare_json(left, right),
                    SortDirection::Desc => compare_json(right, left),
                };
                if ordering != Ordering::Equal {
                    return ordering;
                }
            }
            Ordering::Equal
        });
    }
    let offset = query.offset.unwrap_or(0).max(0) as usize;
    let limit = query.limit.map(|l| l.max(0) as usize).unwrap_or(usize::MAX);
    rows.into_iter().skip(offset).take(limit).collect()
}

#[async_trait]
impl RecordStore for MemoryRecordStore {
    async fn select(&self, table: &str, query: &Query) -> Result<Vec<Row>, StoreError> {
        self.check_available()?;
        validate_identifier(table)?;
        let rows: Vec<Row> = lock(&self.tables)
            .get(table)
            .map(|rows| rows.iter().filter(|r| row_matches(r, &query.conditions)).cloned().collect())
            .unwrap_or_default();
        Ok(sort_and_page(rows, query))
    }

    async fn count(&self, table: &str, query: &Query) -> Result<i64, StoreError> {
        self.check_available()?;
        validate_identifier(table)?;
        let count = lock(&self.tables)
            .get(table)
            .map(|rows| rows.iter().filter(|r| row_matches(r, &query.conditions)).count())
            .unwrap_or(0);
        Ok(count as i64)
    }

    async fn insert(&self, table: &str, fields: Fields) -> Result<Row, StoreError> {
        self.check_writable(table)?;
        let row = fields.to_json_map();
        lock(&self.tables).entry(table.to_string()).or_default().push(row.clone());
        Ok(row)
    }

    async fn update(&self, table: &str, query: &Query, fields: Fields) -> Result<Vec<Row>, StoreError> {
        self.check_writable(table)?;
        let changes = fields.to_json_map();
        let mut tables = lock(&self.tables);
        let mut updated = Vec::new();
        if let Some(rows) = tables.get_mut(table) {
            for row in rows.iter_mut().filter(|r| row_matches(r, &query.conditions)) {
                for (column, value) in &changes {
                    row.insert(column.clone(), value.clone());
                }
                updated.push(row.clone());
            }
        }
        Ok(updated)
    }

    async fn upsert(&self, table: &str, conflict_columns: &[&str], fields: Fields) -> Result<Row, StoreError> {
        self.check_writable(table)?;
        let incoming = fields.to_json_map();
        let mut tables = lock(&self.tables);
        let rows = tables.entry(table.to_string()).or_default();

        let existing = rows.iter_mut().find(|row| {
            conflict_columns
                .iter()
                .all(|c| row.get(*c).unwrap_or(&Value::Null) == incoming.get(*c).unwrap_or(&Value::Null))
        });

        match existing {
            Some(row) => {
                for (column, value) in &incoming {
                    if column != "id" && !conflict_columns.contains(&column.as_str()) {
                        row.insert(column.clone(), value.clone());
                    }
                }
                Ok(row.clone())
            }
            None => {
                rows.push(incoming.clone());
                Ok(incoming)
            }
        }
    }

    async fn remove(&self, table: &str, query: &Query) -> Result<u64, StoreError> {
        self.check_writable(table)?;
        let mut tables = lock(&self.tables);
        let Some(rows) = tables.get_mut(table) else {
            return Ok(0);
        };
        let before = rows.len();
        rows.retain(|r| !row_matches(r, &query.conditions));
        Ok((before - rows.len()) as u64)
    }

    async fn ping(&self) -> Result<(), StoreError> {
        self.check_available()
    }
}
