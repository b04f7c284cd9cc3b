//! Error types for the transformation provider.

use std::fmt;

/// Kind of schema object named in an error or diagnostic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ObjectKind {
    /// A table.
    Table,
    /// A column of a table.
    Column,
    /// A named constraint (primary key, unique, check).
    Constraint,
    /// An index.
    Index,
}

impl fmt::Display for ObjectKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Table => "table",
            Self::Column => "column",
            Self::Constraint => "constraint",
            Self::Index => "index",
        };
        f.write_str(name)
    }
}

/// Errors that can occur while translating or executing schema operations.
#[derive(Debug, thiserror::Error)]
pub enum TransformError {
    /// A schema object required by the operation does not exist.
    #[error("{kind} '{name}' does not exist")]
    SchemaObjectNotFound {
        /// Kind of the missing object.
        kind: ObjectKind,
        /// Name as supplied by the caller.
        name: String,
    },

    /// A schema object the operation would create already exists.
    #[error("{kind} '{name}' already exists")]
    SchemaObjectExists {
        /// Kind of the conflicting object.
        kind: ObjectKind,
        /// Name as supplied by the caller.
        name: String,
    },

    /// The dialect has no native type for a logical type.
    #[error("Type {sql_type} is not supported by the {dialect} dialect")]
    UnsupportedType {
        /// Dialect name.
        dialect: &'static str,
        /// Debug rendering of the logical type.
        sql_type: String,
    },

    /// The engine rejected a statement.
    #[error("Failed to execute `{statement}`: {source}")]
    Execution {
        /// Statement text that failed.
        statement: String,
        /// Underlying driver error.
        #[source]
        source: sqlx::Error,
    },

    /// Opening or closing the connection failed.
    #[error("Connection error: {0}")]
    Connection(#[from] sqlx::Error),

    /// The connection configuration is invalid.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// The operation's inputs are inconsistent.
    #[error("Invalid operation: {0}")]
    InvalidOperation(String),

    /// A catalog query returned a row of an unexpected shape.
    #[error("Unexpected catalog row for `{statement}`: {message}")]
    UnexpectedCatalogRow {
        /// Catalog query text.
        statement: String,
        /// What was wrong with the row.
        message: String,
    },
}

impl TransformError {
    /// Wraps a driver error together with the statement that caused it.
    pub fn execution(statement: impl Into<String>, source: sqlx::Error) -> Self {
        Self::Execution {
            statement: statement.into(),
            source,
        }
    }

    pub(crate) fn not_found(kind: ObjectKind, name: impl Into<String>) -> Self {
        Self::SchemaObjectNotFound {
            kind,
            name: name.into(),
        }
    }

    pub(crate) fn exists(kind: ObjectKind, name: impl Into<String>) -> Self {
        Self::SchemaObjectExists {
            kind,
            name: name.into(),
        }
    }
}

/// Result type for transformation operations.
pub type Result<T> = std::result::Result<T, TransformError>;
