//! PostgreSQL dialect.
//!
//! PostgreSQL folds unquoted identifiers to lower-case and has no statement
//! that changes a column's type while preserving arbitrary data, which is
//! why column changes go through [`crate::mutator::ColumnRewrite`].

use super::{IdentifierCase, SchemaDialect};
use crate::error::{Result, TransformError};
use crate::schema::{DefaultValue, SqlType};

// Views are listed in information_schema.tables too.
const TABLE_EXISTS_SQL: &str = "SELECT table_name::text FROM information_schema.tables \
     WHERE table_schema = $1 AND table_name = $2 AND table_type = 'BASE TABLE'";

const TABLES_SQL: &str = "SELECT table_name::text FROM information_schema.tables \
     WHERE table_schema = $1 AND table_type = 'BASE TABLE'";

const COLUMN_EXISTS_SQL: &str = "SELECT column_name::text FROM information_schema.columns \
     WHERE table_schema = $1 AND table_name = $2 AND (column_name = $3 OR column_name = $4)";

const COLUMNS_SQL: &str = "SELECT column_name::text, is_nullable::text \
     FROM information_schema.columns \
     WHERE table_schema = $1 AND table_name = $2 ORDER BY ordinal_position";

const CONSTRAINT_EXISTS_SQL: &str = "SELECT constraint_name::text \
     FROM information_schema.table_constraints \
     WHERE table_schema = $1 AND constraint_name = $2";

const INDEX_EXISTS_SQL: &str =
    "SELECT indexname::text FROM pg_catalog.pg_indexes WHERE indexname = $1";

/// PostgreSQL dialect.
#[derive(Debug, Clone, Copy, Default)]
pub struct PostgresDialect;

impl PostgresDialect {
    /// Creates a new PostgreSQL dialect.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl SchemaDialect for PostgresDialect {
    fn name(&self) -> &'static str {
        "postgresql"
    }

    fn identifier_case(&self) -> IdentifierCase {
        IdentifierCase::Lower
    }

    fn default_schema(&self) -> &'static str {
        "public"
    }

    fn type_name(&self, sql_type: &SqlType) -> Result<String> {
        let name = match sql_type {
            SqlType::Integer => "INTEGER".to_string(),
            SqlType::BigInt => "BIGINT".to_string(),
            SqlType::SmallInt => "SMALLINT".to_string(),
            SqlType::Text => "TEXT".to_string(),
            SqlType::Varchar(len) => format!("VARCHAR({len})"),
            SqlType::Char(len) => format!("CHAR({len})"),
            SqlType::Boolean => "BOOLEAN".to_string(),
            SqlType::DateTime | SqlType::Timestamp => "TIMESTAMP".to_string(),
            SqlType::Date => "DATE".to_string(),
            SqlType::Time => "TIME".to_string(),
            SqlType::Real => "REAL".to_string(),
            SqlType::Double => "DOUBLE PRECISION".to_string(),
            SqlType::Decimal(p, s) => format!("DECIMAL({p}, {s})"),
            SqlType::Numeric(p, s) => format!("NUMERIC({p}, {s})"),
            SqlType::Blob => "BYTEA".to_string(),
            SqlType::Json => "JSONB".to_string(),
            SqlType::Uuid => "UUID".to_string(),
            SqlType::UnsignedInteger | SqlType::UnsignedBigInt => {
                return Err(TransformError::UnsupportedType {
                    dialect: self.name(),
                    sql_type: format!("{sql_type:?}"),
                });
            }
        };
        Ok(name)
    }

    fn identity_type(&self, sql_type: &SqlType) -> Option<&'static str> {
        match sql_type {
            SqlType::SmallInt => Some("SMALLSERIAL"),
            SqlType::Integer => Some("SERIAL"),
            SqlType::BigInt => Some("BIGSERIAL"),
            _ => None,
        }
    }

    fn placeholder(&self, index: usize) -> String {
        format!("${index}")
    }

    fn table_exists_query(&self) -> &'static str {
        TABLE_EXISTS_SQL
    }

    fn tables_query(&self) -> &'static str {
        TABLES_SQL
    }

    fn column_exists_query(&self) -> &'static str {
        COLUMN_EXISTS_SQL
    }

    fn columns_query(&self) -> &'static str {
        COLUMNS_SQL
    }

    fn constraint_exists_query(&self) -> &'static str {
        CONSTRAINT_EXISTS_SQL
    }

    fn index_exists_query(&self) -> &'static str {
        INDEX_EXISTS_SQL
    }

    fn render_default(&self, default: &DefaultValue) -> Option<String> {
        match default {
            DefaultValue::Bool(true) => Some("TRUE".to_string()),
            DefaultValue::Bool(false) => Some("FALSE".to_string()),
            _ => default.to_sql(),
        }
    }

    fn drop_table_sql(&self, table: &str) -> String {
        format!(
            "DROP TABLE IF EXISTS {} CASCADE",
            self.quote_identifier(table)
        )
    }
}
