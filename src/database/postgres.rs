use async_trait::async_trait;
use serde_json::Value;
use sqlx::postgres::{PgArguments, PgRow};
use sqlx::query::Query as SqlxQuery;
use sqlx::{PgPool, Postgres, Row as _};

use super::query_builder::SqlBuilder;
use super::store::{validate_identifier, Query, RecordStore, Row, StoreError};
use super::value::{Fields, SqlValue};

/// `RecordStore` backed by a PostgreSQL pool.
#[derive(Clone)]
pub struct PgRecordStore {
    pool: PgPool,
}

impl PgRecordStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    async fn fetch_rows(&self, builder: SqlBuilder) -> Result<Vec<Row>, StoreError> {
        let (sql, params) = builder.build();
        tracing::debug!(sql = %sql, params = params.len(), "executing query");
        let mut q = sqlx::query(&sql);
        for p in params.iter() {
            q = bind_param(q, p);
        }
        let rows = q.fetch_all(&self.pool).await?;
        rows.iter().map(row_from_json).collect()
    }

    /// Wraps a statement so the affected rows come back as JSON objects.
    fn returning_json(statement: SqlBuilder) -> SqlBuilder {
        statement.wrap("WITH t AS (", " RETURNING *) SELECT row_to_json(t) AS row FROM t")
    }
}

#[async_trait]
impl RecordStore for PgRecordStore {
    async fn select(&self, table: &str, query: &Query) -> Result<Vec<Row>, StoreError> {
        let mut builder = SqlBuilder::new("SELECT row_to_json(t) AS row FROM (SELECT * FROM ");
        builder.push_identifier(table)?;
        builder.push_where(&query.conditions)?;
        builder.push_paging(query)?;
        builder.push(") t");
        self.fetch_rows(builder).await
    }

    async fn count(&self, table: &str, query: &Query) -> Result<i64, StoreError> {
        let mut builder = SqlBuilder::new("SELECT COUNT(*) AS count FROM ");
        builder.push_identifier(table)?;
        builder.push_where(&query.conditions)?;
        let (sql, params) = builder.build();

        let mut q = sqlx::query(&sql);
        for p in params.iter() {
            q = bind_param(q, p);
        }
        let row = q.fetch_one(&self.pool).await?;
        let count: i64 = row.try_get("count")?;
        Ok(count)
    }

    async fn insert(&self, table: &str, fields: Fields) -> Result<Row, StoreError> {
        let statement = insert_statement(table, &fields)?;
        let rows = self.fetch_rows(Self::returning_json(statement)).await?;
        rows.into_iter()
            .next()
            .ok_or_else(|| StoreError::QueryError(format!("insert into {} returned no row", table)))
    }

    async fn update(&self, table: &str, query: &Query, fields: Fields) -> Result<Vec<Row>, StoreError> {
        if fields.is_empty() {
            return self.select(table, query).await;
        }
        let mut statement = SqlBuilder::new("UPDATE ");
        statement.push_identifier(table)?;
        statement.push(" SET ");
        statement.push_assignments(&fields)?;
        statement.push_where(&query.conditions)?;
        self.fetch_rows(Self::returning_json(statement)).await
    }

    async fn upsert(&self, table: &str, conflict_columns: &[&str], fields: Fields) -> Result<Row, StoreError> {
        let mut statement = insert_statement(table, &fields)?;
        statement.push(" ON CONFLICT (");
        statement.push_identifier_list(conflict_columns.iter().copied())?;
        statement.push(")");

        let updates: Vec<&str> = fields
            .columns()
            .filter(|c| !conflict_columns.contains(c) && *c != "id")
            .collect();
        if updates.is_empty() {
            // Touch a conflict column so RETURNING still yields the existing row.
            let column = conflict_columns
                .first()
                .ok_or_else(|| StoreError::QueryError("upsert requires a conflict column".to_string()))?;
            validate_identifier(column)?;
            statement.push(&format!(" DO UPDATE SET \"{0}\" = EXCLUDED.\"{0}\"", column));
        } else {
            statement.push(" DO UPDATE SET ");
            for (i, column) in updates.iter().enumerate() {
                validate_identifier(column)?;
                if i > 0 {
                    statement.push(", ");
                }
                statement.push(&format!("\"{0}\" = EXCLUDED.\"{0}\"", column));
            }
        }

        let rows = self.fetch_rows(Self::returning_json(statement)).await?;
        rows.into_iter()
            .next()
            .ok_or_else(|| StoreError::QueryError(format!("upsert into {} returned no row", table)))
    }

    async fn remove(&self, table: &str, query: &Query) -> Result<u64, StoreError> {
        let mut builder = SqlBuilder::new("DELETE FROM ");
        builder.push_identifier(table)?;
        builder.push_where(&query.conditions)?;
        let (sql, params) = builder.build();

        let mut q = sqlx::query(&sql);
        for p in params.iter() {
            q = bind_param(q, p);
        }
        let result = q.execute(&self.pool).await?;
        Ok(result.rows_affected())
    }

    async fn ping(&self) -> Result<(), StoreError> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}

fn insert_statement(table: &str, fields: &Fields) -> Result<SqlBuilder, StoreError> {
    if fields.is_empty() {
        return Err(StoreError::QueryError(format!("insert into {} without columns", table)));
    }
    let mut builder = SqlBuilder::new("INSERT INTO ");
    builder.push_identifier(table)?;
    builder.push(" (");
    builder.push_identifier_list(fields.columns())?;
    builder.push(") VALUES ");
    builder.push_values(fields);
    Ok(builder)
}

fn row_from_json(row: &PgRow) -> Result<Row, StoreError> {
    let value: Value = row.try_get("row")?;
    match value {
        Value::Object(map) => Ok(map),
        other => Err(StoreError::QueryError(format!("unexpected row format: {}", other))),
    }
}

fn bind_param<'q>(
    q: SqlxQuery<'q, Postgres, PgArguments>,
    v: &SqlValue,
) -> SqlxQuery<'q, Postgres, PgArguments> {
    match v {
        // Rendered as a literal by SqlBuilder, never bound.
        SqlValue::Null => q,
        SqlValue::Bool(b) => q.bind(*b),
        SqlValue::Int(i) => q.bind(*i),
        SqlValue::Text(s) => q.bind(s.clone()),
        SqlValue::Uuid(u) => q.bind(*u),
        SqlValue::Timestamp(t) => q.bind(*t),
        SqlValue::Json(j) => q.bind(j.clone()),
    }
}
