//! Database dialect implementations.
//!
//! A dialect is a stateless description of one engine: how it quotes and
//! folds identifiers, which native type backs each logical type, the few
//! statement templates that differ between engines, and the catalog
//! queries used for introspection.

mod postgres;

pub use postgres::PostgresDialect;

use crate::error::Result;
use crate::schema::{ColumnSchema, DefaultValue, SqlType};

/// How an engine normalizes unquoted identifiers before storing them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdentifierCase {
    /// Unquoted identifiers are stored lower-case (PostgreSQL).
    Lower,
    /// Unquoted identifiers are stored upper-case (Oracle, Firebird).
    Upper,
    /// Identifiers are stored as written.
    Preserve,
}

impl IdentifierCase {
    /// Folds an identifier the way the engine would.
    #[must_use]
    pub fn fold(self, name: &str) -> String {
        match self {
            Self::Lower => name.to_lowercase(),
            Self::Upper => name.to_uppercase(),
            Self::Preserve => name.to_string(),
        }
    }
}

/// Engine capabilities needed to translate portable schema operations.
///
/// Catalog queries take positional parameters in a fixed order:
///
/// | query                     | parameters                                  |
/// |---------------------------|---------------------------------------------|
/// | `table_exists_query`      | schema, folded table                        |
/// | `tables_query`            | schema                                      |
/// | `column_exists_query`     | schema, folded table, folded column, column |
/// | `columns_query`           | schema, folded table                        |
/// | `constraint_exists_query` | schema, folded constraint                   |
/// | `index_exists_query`      | folded index                                |
///
/// Every selected catalog column is text.
pub trait SchemaDialect: Send + Sync {
    /// Returns the dialect name.
    fn name(&self) -> &'static str;

    /// Returns the engine's identifier folding rule.
    fn identifier_case(&self) -> IdentifierCase;

    /// Returns the schema used when the connection does not name one.
    fn default_schema(&self) -> &'static str;

    /// Returns the native type for a logical type.
    fn type_name(&self, sql_type: &SqlType) -> Result<String>;

    /// Returns the native type used for engine-generated columns, if the
    /// engine expresses identity through a dedicated type.
    fn identity_type(&self, sql_type: &SqlType) -> Option<&'static str>;

    /// Returns the positional parameter placeholder (1-based).
    fn placeholder(&self, index: usize) -> String;

    /// Catalog query: does a table exist.
    fn table_exists_query(&self) -> &'static str;

    /// Catalog query: table names in a schema.
    fn tables_query(&self) -> &'static str;

    /// Catalog query: does a column exist.
    fn column_exists_query(&self) -> &'static str;

    /// Catalog query: column names and nullability (`YES`/`NO`).
    fn columns_query(&self) -> &'static str;

    /// Catalog query: does a constraint exist.
    fn constraint_exists_query(&self) -> &'static str;

    /// Catalog query: does an index exist.
    fn index_exists_query(&self) -> &'static str;

    /// Folds an identifier per [`Self::identifier_case`].
    fn fold_identifier(&self, name: &str) -> String {
        self.identifier_case().fold(name)
    }

    /// Quotes an identifier, doubling embedded quotes.
    fn quote_identifier(&self, name: &str) -> String {
        format!("\"{}\"", name.replace('"', "\"\""))
    }

    /// Renders a default value.
    fn render_default(&self, default: &DefaultValue) -> Option<String> {
        default.to_sql()
    }

    /// Generates the column definition used by CREATE TABLE and ADD COLUMN.
    fn column_definition(&self, column: &ColumnSchema) -> Result<String> {
        let data_type = match self.identity_type(&column.sql_type) {
            Some(native) if column.identity => native.to_string(),
            _ => self.type_name(&column.sql_type)?,
        };

        let mut parts = vec![self.quote_identifier(&column.name), data_type];

        if column.primary_key {
            parts.push("PRIMARY KEY".to_string());
        } else {
            if column.is_not_null() {
                parts.push("NOT NULL".to_string());
            }
            if column.unique {
                parts.push("UNIQUE".to_string());
            }
        }

        if let Some(default_sql) = self.render_default(&column.default) {
            parts.push(format!("DEFAULT {default_sql}"));
        }

        if let Some(ref check) = column.check {
            parts.push(format!("CHECK ({check})"));
        }

        Ok(parts.join(" "))
    }

    /// Generates the statement that drops a table.
    fn drop_table_sql(&self, table: &str) -> String {
        format!("DROP TABLE IF EXISTS {}", self.quote_identifier(table))
    }

    /// Generates the statement that makes a column reject NULL.
    fn set_not_null_sql(&self, table: &str, column: &str) -> String {
        format!(
            "ALTER TABLE {} ALTER COLUMN {} SET NOT NULL",
            self.quote_identifier(table),
            self.quote_identifier(column)
        )
    }
}
