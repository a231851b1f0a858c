use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde_json::Value;
use thiserror::Error;

use super::value::{Fields, SqlValue};

/// A row as returned by the store: column name to JSON value.
pub type Row = serde_json::Map<String, Value>;

/// Errors from the record store
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Invalid identifier: {0}")]
    InvalidIdentifier(String),

    #[error("Query error: {0}")]
    QueryError(String),

    #[error("Store unavailable: {0}")]
    Unavailable(String),

    #[error("Failed to decode row: {0}")]
    Decode(#[from] serde_json::Error),

    #[error(transparent)]
    Sqlx(#[from] sqlx::Error),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortDirection {
    Asc,
    Desc,
}

impl SortDirection {
    pub fn to_sql(&self) -> &'static str {
        match self {
            SortDirection::Asc => "ASC",
            SortDirection::Desc => "DESC",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Condition {
    /// `column = value`, or `column IS NULL` for a null value
    Eq(String, SqlValue),
    /// `column IN (values...)`; an empty list matches nothing
    In(String, Vec<SqlValue>),
}

/// Filter, ordering and paging for a select/update/remove.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Query {
    pub conditions: Vec<Condition>,
    pub order: Vec<(String, SortDirection)>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

impl Query {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn by_id(id: impl Into<SqlValue>) -> Self {
        Self::new().eq("id", id)
    }

    pub fn eq(mut self, column: &str, value: impl Into<SqlValue>) -> Self {
        self.conditions.push(Condition::Eq(column.to_string(), value.into()));
        self
    }

    /// Adds the condition only when a value is present; handy for optional filters.
    pub fn eq_opt<V: Into<SqlValue>>(self, column: &str, value: Option<V>) -> Self {
        match value {
            Some(v) => self.eq(column, v),
            None => self,
        }
    }

    pub fn is_in<V: Into<SqlValue>>(mut self, column: &str, values: impl IntoIterator<Item = V>) -> Self {
        let values = values.into_iter().map(Into::into).collect();
        self.conditions.push(Condition::In(column.to_string(), values));
        self
    }

    pub fn order_by(mut self, column: &str, direction: SortDirection) -> Self {
        self.order.push((column.to_string(), direction));
        self
    }

    pub fn limit(mut self, limit: i64) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn offset(mut self, offset: i64) -> Self {
        self.offset = Some(offset);
        self
    }
}

/// Thin data-access seam over one relational database.
///
/// Every method acquires a pooled connection for a single round trip and
/// releases it before returning. Nothing here is transactional.
#[async_trait]
pub trait RecordStore: Send + Sync {
    async fn select(&self, table: &str, query: &Query) -> Result<Vec<Row>, StoreError>;

    async fn count(&self, table: &str, query: &Query) -> Result<i64, StoreError>;

    /// Insert one row and return it as stored.
    async fn insert(&self, table: &str, fields: Fields) -> Result<Row, StoreError>;

    /// Update matching rows and return them as stored.
    async fn update(&self, table: &str, query: &Query, fields: Fields) -> Result<Vec<Row>, StoreError>;

    /// Insert or, on a conflict over `conflict_columns`, overwrite the other columns.
    async fn upsert(&self, table: &str, conflict_columns: &[&str], fields: Fields) -> Result<Row, StoreError>;

    /// Delete matching rows, returning how many were removed.
    async fn remove(&self, table: &str, query: &Query) -> Result<u64, StoreError>;

    async fn ping(&self) -> Result<(), StoreError>;

    async fn select_one(&self, table: &str, query: &Query) -> Result<Option<Row>, StoreError> {
        let query = query.clone().limit(1);
        Ok(self.select(table, &query).await?.into_iter().next())
    }
}

/// Deserialize a store row into a typed model.
pub fn decode<T: DeserializeOwned>(row: Row) -> Result<T, StoreError> {
    Ok(serde_json::from_value(Value::Object(row))?)
}

pub fn decode_all<T: DeserializeOwned>(rows: Vec<Row>) -> Result<Vec<T>, StoreError> {
    rows.into_iter().map(decode).collect()
}

/// Validate a table or column name before it is spliced into SQL.
pub fn validate_identifier(name: &str) -> Result<(), StoreError> {
    let mut chars = name.chars();
    let valid_start = matches!(chars.next(), Some(c) if c.is_ascii_alphabetic() || c == '_');
    if !valid_start || !chars.all(|c| c.is_ascii_alphanumeric() || c == '_') {
        return Err(StoreError::InvalidIdentifier(name.to_string()));
    }
    Ok(())
}
