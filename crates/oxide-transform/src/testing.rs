//! In-memory connection for unit tests.
//!
//! The fake answers the PostgreSQL dialect's catalog queries from a static
//! catalog and records every other statement without applying it.

use async_trait::async_trait;

use crate::dialect::{PostgresDialect, SchemaDialect};
use crate::error::{Result, TransformError};
use crate::exec::{CatalogRow, SchemaConnection, SqlValue};

/// Static catalog contents for one schema.
#[derive(Debug, Clone, Default)]
pub(crate) struct FakeCatalog {
    schema: String,
    tables: Vec<(String, Vec<(String, bool)>)>,
    constraints: Vec<String>,
    indexes: Vec<String>,
}

impl FakeCatalog {
    pub(crate) fn new(schema: &str) -> Self {
        Self {
            schema: schema.to_string(),
            ..Self::default()
        }
    }

    /// Adds a table with `(column, nullable)` pairs, names stored verbatim.
    pub(crate) fn table(mut self, name: &str, columns: &[(&str, bool)]) -> Self {
        let columns = columns
            .iter()
            .map(|(column, nullable)| ((*column).to_string(), *nullable))
            .collect();
        self.tables.push((name.to_string(), columns));
        self
    }

    pub(crate) fn constraint(mut self, name: &str) -> Self {
        self.constraints.push(name.to_string());
        self
    }

    pub(crate) fn index(mut self, name: &str) -> Self {
        self.indexes.push(name.to_string());
        self
    }

    fn columns(&self, schema: &str, table: &str) -> Option<&[(String, bool)]> {
        if schema != self.schema {
            return None;
        }
        self.tables
            .iter()
            .find(|(name, _)| name == table)
            .map(|(_, columns)| columns.as_slice())
    }
}

/// Records statements and answers catalog queries from a [`FakeCatalog`].
#[derive(Debug, Default)]
pub(crate) struct ScriptedConnection {
    catalog: FakeCatalog,
    raw_rows: Option<Vec<CatalogRow>>,
    fail_on: Option<String>,
    queries: Vec<String>,
    executed: Vec<(String, Vec<SqlValue>)>,
}

impl ScriptedConnection {
    pub(crate) fn new(catalog: FakeCatalog) -> Self {
        Self {
            catalog,
            ..Self::default()
        }
    }

    /// Answers every query with `rows` instead of consulting the catalog.
    pub(crate) fn with_raw_rows(mut self, rows: Vec<CatalogRow>) -> Self {
        self.raw_rows = Some(rows);
        self
    }

    /// Fails any executed statement starting with `prefix`.
    pub(crate) fn failing_on(mut self, prefix: &str) -> Self {
        self.fail_on = Some(prefix.to_string());
        self
    }

    pub(crate) fn queries(&self) -> &[String] {
        &self.queries
    }

    pub(crate) fn executed(&self) -> &[(String, Vec<SqlValue>)] {
        &self.executed
    }

    pub(crate) fn statements(&self) -> Vec<&str> {
        self.executed.iter().map(|(sql, _)| sql.as_str()).collect()
    }

    fn answer(&self, sql: &str, params: &[SqlValue]) -> Vec<CatalogRow> {
        let dialect = PostgresDialect::new();
        let text = |index: usize| match params.get(index) {
            Some(SqlValue::Text(value)) => value.as_str(),
            _ => "",
        };
        let row = |values: &[&str]| {
            CatalogRow::new(values.iter().map(|v| Some((*v).to_string())).collect())
        };

        if sql == dialect.table_exists_query() {
            self.catalog
                .columns(text(0), text(1))
                .map(|_| vec![row(&[text(1)])])
                .unwrap_or_default()
        } else if sql == dialect.tables_query() {
            if text(0) != self.catalog.schema {
                return Vec::new();
            }
            self.catalog
                .tables
                .iter()
                .map(|(name, _)| row(&[name.as_str()]))
                .collect()
        } else if sql == dialect.column_exists_query() {
            self.catalog
                .columns(text(0), text(1))
                .unwrap_or_default()
                .iter()
                .filter(|(name, _)| name == text(2) || name == text(3))
                .map(|(name, _)| row(&[name.as_str()]))
                .collect()
        } else if sql == dialect.columns_query() {
            self.catalog
                .columns(text(0), text(1))
                .unwrap_or_default()
                .iter()
                .map(|(name, nullable)| row(&[name.as_str(), if *nullable { "YES" } else { "NO" }]))
                .collect()
        } else if sql == dialect.constraint_exists_query() {
            if text(0) != self.catalog.schema {
                return Vec::new();
            }
            self.catalog
                .constraints
                .iter()
                .filter(|name| *name == text(1))
                .map(|name| row(&[name.as_str()]))
                .collect()
        } else if sql == dialect.index_exists_query() {
            self.catalog
                .indexes
                .iter()
                .filter(|name| *name == text(0))
                .map(|name| row(&[name.as_str()]))
                .collect()
        } else {
            Vec::new()
        }
    }
}

#[async_trait]
impl SchemaConnection for ScriptedConnection {
    async fn query(&mut self, sql: &str, params: &[SqlValue]) -> Result<Vec<CatalogRow>> {
        self.queries.push(sql.to_string());
        if let Some(rows) = &self.raw_rows {
            return Ok(rows.clone());
        }
        Ok(self.answer(sql, params))
    }

    async fn execute(&mut self, sql: &str, params: &[SqlValue]) -> Result<u64> {
        if let Some(prefix) = &self.fail_on {
            if sql.starts_with(prefix.as_str()) {
                return Err(TransformError::execution(
                    sql,
                    sqlx::Error::Protocol("statement rejected".to_string()),
                ));
            }
        }
        self.executed.push((sql.to_string(), params.to_vec()));
        Ok(1)
    }

    async fn close(self) -> Result<()> {
        Ok(())
    }
}
