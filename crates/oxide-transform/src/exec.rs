//! Statement execution and parameter values.
//!
//! [`SchemaConnection`] is the only seam through which statements reach
//! the engine. Catalog rows come back as text, which is all introspection
//! needs.

use async_trait::async_trait;
use chrono::{NaiveDate, NaiveDateTime};
use sqlx::postgres::{PgArguments, PgConnection, PgRow};
use sqlx::query::Query;
use sqlx::{Connection, Postgres, Row};

use crate::error::{Result, TransformError};

/// A value bound to a statement parameter.
#[derive(Debug, Clone, PartialEq)]
pub enum SqlValue {
    /// NULL value.
    Null,
    /// Boolean value.
    Bool(bool),
    /// Integer value.
    Int(i64),
    /// Float value.
    Float(f64),
    /// Text value.
    Text(String),
    /// Binary value.
    Blob(Vec<u8>),
    /// Calendar date.
    Date(NaiveDate),
    /// Date and time without zone.
    Timestamp(NaiveDateTime),
}

/// Trait for types that can be converted to SQL values.
pub trait ToSqlValue {
    /// Converts the value to a `SqlValue`.
    fn to_sql_value(self) -> SqlValue;
}

impl ToSqlValue for SqlValue {
    fn to_sql_value(self) -> SqlValue {
        self
    }
}

impl ToSqlValue for bool {
    fn to_sql_value(self) -> SqlValue {
        SqlValue::Bool(self)
    }
}

impl ToSqlValue for i64 {
    fn to_sql_value(self) -> SqlValue {
        SqlValue::Int(self)
    }
}

impl ToSqlValue for i32 {
    fn to_sql_value(self) -> SqlValue {
        SqlValue::Int(i64::from(self))
    }
}

impl ToSqlValue for f64 {
    fn to_sql_value(self) -> SqlValue {
        SqlValue::Float(self)
    }
}

impl ToSqlValue for &str {
    fn to_sql_value(self) -> SqlValue {
        SqlValue::Text(self.to_string())
    }
}

impl ToSqlValue for String {
    fn to_sql_value(self) -> SqlValue {
        SqlValue::Text(self)
    }
}

impl ToSqlValue for Vec<u8> {
    fn to_sql_value(self) -> SqlValue {
        SqlValue::Blob(self)
    }
}

impl ToSqlValue for NaiveDate {
    fn to_sql_value(self) -> SqlValue {
        SqlValue::Date(self)
    }
}

impl ToSqlValue for NaiveDateTime {
    fn to_sql_value(self) -> SqlValue {
        SqlValue::Timestamp(self)
    }
}

impl<T: ToSqlValue> ToSqlValue for Option<T> {
    fn to_sql_value(self) -> SqlValue {
        self.map_or(SqlValue::Null, ToSqlValue::to_sql_value)
    }
}

/// Prepares an application value for binding.
///
/// Text that spells a boolean (`true`/`false`, any case, surrounding
/// whitespace ignored) is bound as a boolean, since PostgreSQL refuses to
/// assign a text parameter to a boolean column. Everything else is bound
/// as given.
#[must_use]
pub fn coerce_parameter(value: SqlValue) -> SqlValue {
    match value {
        SqlValue::Text(text) => match parse_bool(&text) {
            Some(flag) => SqlValue::Bool(flag),
            None => SqlValue::Text(text),
        },
        other => other,
    }
}

fn parse_bool(text: &str) -> Option<bool> {
    let trimmed = text.trim();
    if trimmed.eq_ignore_ascii_case("true") {
        Some(true)
    } else if trimmed.eq_ignore_ascii_case("false") {
        Some(false)
    } else {
        None
    }
}

/// One row returned by a query, every column rendered as text.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CatalogRow(Vec<Option<String>>);

impl CatalogRow {
    /// Creates a row from its column values.
    #[must_use]
    pub fn new(values: Vec<Option<String>>) -> Self {
        Self(values)
    }

    /// Returns the value at `index`, `None` for NULL or out of range.
    #[must_use]
    pub fn get(&self, index: usize) -> Option<&str> {
        self.0.get(index).and_then(|value| value.as_deref())
    }

    /// Returns the number of columns.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns whether the row has no columns.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// A live connection the provider runs statements on.
#[async_trait]
pub trait SchemaConnection: Send {
    /// Runs a query and returns every row.
    ///
    /// Selected columns must be text (cast them in the query otherwise).
    async fn query(&mut self, sql: &str, params: &[SqlValue]) -> Result<Vec<CatalogRow>>;

    /// Runs a statement and returns the number of affected rows.
    async fn execute(&mut self, sql: &str, params: &[SqlValue]) -> Result<u64>;

    /// Closes the connection.
    async fn close(self) -> Result<()>
    where
        Self: Sized;
}

#[async_trait]
impl SchemaConnection for PgConnection {
    async fn query(&mut self, sql: &str, params: &[SqlValue]) -> Result<Vec<CatalogRow>> {
        let rows = bind_parameters(sqlx::query(sql), params)
            .fetch_all(&mut *self)
            .await
            .map_err(|source| TransformError::execution(sql, source))?;

        rows.iter().map(|row| text_row(sql, row)).collect()
    }

    async fn execute(&mut self, sql: &str, params: &[SqlValue]) -> Result<u64> {
        let result = bind_parameters(sqlx::query(sql), params)
            .execute(&mut *self)
            .await
            .map_err(|source| TransformError::execution(sql, source))?;

        Ok(result.rows_affected())
    }

    async fn close(self) -> Result<()> {
        Connection::close(self).await?;
        Ok(())
    }
}

fn bind_parameters<'q>(
    mut query: Query<'q, Postgres, PgArguments>,
    params: &[SqlValue],
) -> Query<'q, Postgres, PgArguments> {
    for value in params {
        query = match value.clone() {
            SqlValue::Null => query.bind(None::<String>),
            SqlValue::Bool(b) => query.bind(b),
            SqlValue::Int(n) => query.bind(n),
            SqlValue::Float(f) => query.bind(f),
            SqlValue::Text(s) => query.bind(s),
            SqlValue::Blob(bytes) => query.bind(bytes),
            SqlValue::Date(date) => query.bind(date),
            SqlValue::Timestamp(ts) => query.bind(ts),
        };
    }
    query
}

fn text_row(sql: &str, row: &PgRow) -> Result<CatalogRow> {
    (0..row.len())
        .map(|index| {
            row.try_get::<Option<String>, _>(index)
                .map_err(|source| TransformError::execution(sql, source))
        })
        .collect::<Result<Vec<_>>>()
        .map(CatalogRow::new)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_boolean_text_is_coerced() {
        assert_eq!(coerce_parameter("true".to_sql_value()), SqlValue::Bool(true));
        assert_eq!(coerce_parameter("FALSE".to_sql_value()), SqlValue::Bool(false));
        assert_eq!(coerce_parameter(" True ".to_sql_value()), SqlValue::Bool(true));
    }

    #[test]
    fn test_other_text_is_untouched() {
        assert_eq!(
            coerce_parameter("yes".to_sql_value()),
            SqlValue::Text("yes".to_string())
        );
        assert_eq!(
            coerce_parameter("1".to_sql_value()),
            SqlValue::Text("1".to_string())
        );
        assert_eq!(
            coerce_parameter("truest".to_sql_value()),
            SqlValue::Text("truest".to_string())
        );
    }

    #[test]
    fn test_non_text_values_are_untouched() {
        assert_eq!(coerce_parameter(SqlValue::Int(1)), SqlValue::Int(1));
        assert_eq!(coerce_parameter(SqlValue::Null), SqlValue::Null);
        assert_eq!(coerce_parameter(SqlValue::Bool(false)), SqlValue::Bool(false));
    }

    #[test]
    fn test_option_to_sql_value() {
        assert_eq!(None::<i64>.to_sql_value(), SqlValue::Null);
        assert_eq!(Some(7_i32).to_sql_value(), SqlValue::Int(7));
    }

    #[test]
    fn test_catalog_row_access() {
        let row = CatalogRow::new(vec![Some("balance".to_string()), None]);
        assert_eq!(row.len(), 2);
        assert_eq!(row.get(0), Some("balance"));
        assert_eq!(row.get(1), None);
        assert_eq!(row.get(5), None);
        assert!(CatalogRow::default().is_empty());
    }
}
