use super::store::{validate_identifier, Condition, Query, StoreError};
use super::value::{Fields, SqlValue};

/// Accumulates SQL text together with its bound parameters.
///
/// Placeholders are numbered from the parameter list itself, so callers never
/// track `$N` indices by hand. Null values are written as a `NULL` literal and
/// are not bound.
#[derive(Debug, Default)]
pub struct SqlBuilder {
    sql: String,
    params: Vec<SqlValue>,
}

impl SqlBuilder {
    pub fn new(initial: impl Into<String>) -> Self {
        Self {
            sql: initial.into(),
            params: Vec::new(),
        }
    }

    pub fn push(&mut self, fragment: &str) -> &mut Self {
        self.sql.push_str(fragment);
        self
    }

    /// Append a placeholder for `value` (or `NULL`).
    pub fn push_value(&mut self, value: SqlValue) -> &mut Self {
        if value.is_null() {
            self.sql.push_str("NULL");
        } else {
            self.params.push(value);
            self.sql.push_str(&format!("${}", self.params.len()));
        }
        self
    }

    /// Append a quoted, validated identifier.
    pub fn push_identifier(&mut self, name: &str) -> Result<&mut Self, StoreError> {
        validate_identifier(name)?;
        self.sql.push_str(&format!("\"{}\"", name));
        Ok(self)
    }

    /// Append `a, b, c` for the given identifiers.
    pub fn push_identifier_list<'a>(
        &mut self,
        names: impl IntoIterator<Item = &'a str>,
    ) -> Result<&mut Self, StoreError> {
        for (i, name) in names.into_iter().enumerate() {
            if i > 0 {
                self.push(", ");
            }
            self.push_identifier(name)?;
        }
        Ok(self)
    }

    /// Append ` WHERE ...` for the conditions; nothing when there are none.
    pub fn push_where(&mut self, conditions: &[Condition]) -> Result<&mut Self, StoreError> {
        for (i, condition) in conditions.iter().enumerate() {
            self.push(if i == 0 { " WHERE " } else { " AND " });
            match condition {
                Condition::Eq(column, value) if value.is_null() => {
                    self.push_identifier(column)?;
                    self.push(" IS NULL");
                }
                Condition::Eq(column, value) => {
                    self.push_identifier(column)?;
                    self.push(" = ");
                    self.push_value(value.clone());
                }
                Condition::In(_, values) if values.is_empty() => {
                    self.push("FALSE");
                }
                Condition::In(column, values) => {
                    self.push_identifier(column)?;
                    self.push(" IN (");
                    for (j, value) in values.iter().enumerate() {
                        if j > 0 {
                            self.push(", ");
                        }
                        self.push_value(value.clone());
                    }
                    self.push(")");
                }
            }
        }
        Ok(self)
    }

    /// Append ORDER BY / LIMIT / OFFSET from the query.
    pub fn push_paging(&mut self, query: &Query) -> Result<&mut Self, StoreError> {
        for (i, (column, direction)) in query.order.iter().enumerate() {
            self.push(if i == 0 { " ORDER BY " } else { ", " });
            self.push_identifier(column)?;
            self.push(" ");
            self.push(direction.to_sql());
        }
        if let Some(limit) = query.limit {
            self.push(" LIMIT ");
            self.push_value(SqlValue::Int(limit.max(0)));
        }
        if let Some(offset) = query.offset {
            self.push(" OFFSET ");
            self.push_value(SqlValue::Int(offset.max(0)));
        }
        Ok(self)
    }

    /// Append `"a" = $1, "b" = $2` for an UPDATE SET clause.
    pub fn push_assignments(&mut self, fields: &Fields) -> Result<&mut Self, StoreError> {
        for (i, (column, value)) in fields.iter().enumerate() {
            if i > 0 {
                self.push(", ");
            }
            self.push_identifier(column)?;
            self.push(" = ");
            self.push_value(value.clone());
        }
        Ok(self)
    }

    /// Append `(v1, v2, ...)` for an INSERT VALUES clause.
    pub fn push_values(&mut self, fields: &Fields) -> &mut Self {
        self.push("(");
        for (i, (_, value)) in fields.iter().enumerate() {
            if i > 0 {
                self.push(", ");
            }
            self.push_value(value.clone());
        }
        self.push(")")
    }

    /// Surround the SQL built so far, keeping its parameters and numbering.
    pub fn wrap(mut self, prefix: &str, suffix: &str) -> Self {
        self.sql = format!("{}{}{}", prefix, self.sql, suffix);
        self
    }

    pub fn sql(&self) -> &str {
        &self.sql
    }

    pub fn params(&self) -> &[SqlValue] {
        &self.params
    }

    pub fn build(self) -> (String, Vec<SqlValue>) {
        (self.sql, self.params)
    }
}
