//! SQL fragments assembled at request time: partial `UPDATE ... SET` lists
//! and `WHERE` conjunctions built from optional filters.
//!
//! Only column names from a static [`ColumnMap`] ever reach the SQL text;
//! every value travels as a bound parameter.

use serde_json::{Map, Value};
use sqlx::{postgres::PgArguments, query::QueryAs, Postgres};

use crate::error::{ApiError, ApiResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnKind {
    Text,
    Int,
    Bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Column {
    pub name: &'static str,
    pub kind: ColumnKind,
    pub nullable: bool,
}

impl Column {
    pub const fn text(name: &'static str) -> Self {
        Self { name, kind: ColumnKind::Text, nullable: false }
    }

    pub const fn int(name: &'static str) -> Self {
        Self { name, kind: ColumnKind::Int, nullable: false }
    }

    pub const fn boolean(name: &'static str) -> Self {
        Self { name, kind: ColumnKind::Bool, nullable: false }
    }

    pub const fn nullable(self) -> Self {
        Self { nullable: true, ..self }
    }
}

/// Fixed table from API field names (camelCase) to storage columns.
#[derive(Debug, Clone, Copy)]
pub struct ColumnMap {
    entries: &'static [(&'static str, Column)],
}

impl ColumnMap {
    pub const fn new(entries: &'static [(&'static str, Column)]) -> Self {
        Self { entries }
    }

    pub fn column(&self, field: &str) -> Option<Column> {
        self.entries
            .iter()
            .find(|(name, _)| *name == field)
            .map(|(_, column)| *column)
    }
}

/// A value ready to bind, typed after its target column so NULLs bind with
/// the right Postgres type.
#[derive(Debug, Clone, PartialEq)]
pub enum SqlValue {
    Text(Option<String>),
    Int(Option<i32>),
    Bool(Option<bool>),
}

impl SqlValue {
    fn from_json(field: &str, column: Column, value: &Value) -> ApiResult<Self> {
        let mismatch = || {
            let expected = match column.kind {
                ColumnKind::Text => "a string",
                ColumnKind::Int => "an integer",
                ColumnKind::Bool => "a boolean",
            };
            ApiError::BadRequest(format!("{field}: expected {expected}"))
        };
        if value.is_null() && !column.nullable {
            return Err(ApiError::BadRequest(format!("{field}: may not be null")));
        }
        let converted = match (column.kind, value) {
            (ColumnKind::Text, Value::Null) => SqlValue::Text(None),
            (ColumnKind::Text, Value::String(s)) => SqlValue::Text(Some(s.clone())),
            (ColumnKind::Int, Value::Null) => SqlValue::Int(None),
            (ColumnKind::Int, Value::Number(n)) => {
                let n = n
                    .as_i64()
                    .and_then(|n| i32::try_from(n).ok())
                    .ok_or_else(mismatch)?;
                SqlValue::Int(Some(n))
            }
            (ColumnKind::Bool, Value::Null) => SqlValue::Bool(None),
            (ColumnKind::Bool, Value::Bool(b)) => SqlValue::Bool(Some(*b)),
            _ => return Err(mismatch()),
        };
        Ok(converted)
    }
}

impl From<i32> for SqlValue {
    fn from(v: i32) -> Self {
        SqlValue::Int(Some(v))
    }
}

impl From<String> for SqlValue {
    fn from(v: String) -> Self {
        SqlValue::Text(Some(v))
    }
}

impl From<&str> for SqlValue {
    fn from(v: &str) -> Self {
        SqlValue::Text(Some(v.to_owned()))
    }
}

impl From<bool> for SqlValue {
    fn from(v: bool) -> Self {
        SqlValue::Bool(Some(v))
    }
}

fn bind_all<'q, O>(
    mut query: QueryAs<'q, Postgres, O, PgArguments>,
    values: Vec<SqlValue>,
) -> QueryAs<'q, Postgres, O, PgArguments> {
    for value in values {
        query = match value {
            SqlValue::Text(v) => query.bind(v),
            SqlValue::Int(v) => query.bind(v),
            SqlValue::Bool(v) => query.bind(v),
        };
    }
    query
}

/// `column = $n` fragments and their values, position for position.
#[derive(Debug, Clone, PartialEq)]
pub struct PartialUpdate {
    pub set_cols: Vec<String>,
    pub values: Vec<SqlValue>,
}

impl PartialUpdate {
    /// Walks `changes` in insertion order. Fails without touching storage
    /// when there is nothing to change, when a field has no column, or when
    /// a value does not fit its column.
    pub fn build(changes: &Map<String, Value>, columns: &ColumnMap) -> ApiResult<Self> {
        if changes.is_empty() {
            return Err(ApiError::BadRequest("No data".into()));
        }

        let mut set_cols = Vec::with_capacity(changes.len());
        let mut values = Vec::with_capacity(changes.len());
        for (field, value) in changes {
            let column = columns
                .column(field)
                .ok_or_else(|| ApiError::BadRequest(format!("Unknown field: {field}")))?;
            values.push(SqlValue::from_json(field, column, value)?);
            set_cols.push(format!("{} = ${}", column.name, set_cols.len() + 1));
        }

        Ok(Self { set_cols, values })
    }

    pub fn set_clause(&self) -> String {
        self.set_cols.join(", ")
    }

    /// Placeholder for the first parameter bound after the SET values,
    /// usually the key in the WHERE clause.
    pub fn next_placeholder(&self) -> String {
        format!("${}", self.values.len() + 1)
    }

    pub fn bind<'q, O>(
        self,
        query: QueryAs<'q, Postgres, O, PgArguments>,
    ) -> QueryAs<'q, Postgres, O, PgArguments> {
        bind_all(query, self.values)
    }
}

fn escape_like(term: &str) -> String {
    let mut escaped = String::with_capacity(term.len());
    for c in term.chars() {
        if matches!(c, '\\' | '%' | '_') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

/// Conjunction of the filters actually supplied; absent filters add nothing.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct WhereClause {
    parts: Vec<String>,
    values: Vec<SqlValue>,
}

impl WhereClause {
    pub fn new() -> Self {
        Self::default()
    }

    fn push(&mut self, column: &str, op: &str, value: SqlValue) {
        self.values.push(value);
        self.parts.push(format!("{column} {op} ${}", self.values.len()));
    }

    pub fn eq<V: Into<SqlValue>>(mut self, column: &str, value: Option<V>) -> Self {
        if let Some(v) = value {
            self.push(column, "=", v.into());
        }
        self
    }

    /// Case-insensitive substring match. `%` and `_` in `term` match
    /// themselves.
    pub fn ilike(mut self, column: &str, term: Option<&str>) -> Self {
        if let Some(term) = term {
            self.values.push(format!("%{}%", escape_like(term)).into());
            self.parts
                .push(format!("{column} ILIKE ${} ESCAPE '\\'", self.values.len()));
        }
        self
    }

    pub fn at_most<V: Into<SqlValue>>(mut self, column: &str, bound: Option<V>) -> Self {
        if let Some(v) = bound {
            self.push(column, "<=", v.into());
        }
        self
    }

    pub fn sql(&self) -> String {
        if self.parts.is_empty() {
            String::new()
        } else {
            format!("WHERE {}", self.parts.join(" AND "))
        }
    }

    pub fn bind<'q, O>(
        self,
        query: QueryAs<'q, Postgres, O, PgArguments>,
    ) -> QueryAs<'q, Postgres, O, PgArguments> {
        bind_all(query, self.values)
    }
}
