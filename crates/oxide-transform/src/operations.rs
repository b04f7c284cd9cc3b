//! Portable schema operations.
//!
//! An operation names what should change without saying how an engine
//! does it. [`crate::provider::TransformationProvider::apply`] translates
//! each one into statements for the provider's dialect.

use serde::{Deserialize, Serialize};

use crate::schema::ColumnSchema;

/// A single engine-agnostic schema change.
///
/// Names are given as the migration author wrote them; the provider folds
/// them before use.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum SchemaOperation {
    /// `CREATE TABLE`; columns flagged as primary key form the key.
    CreateTable {
        name: String,
        columns: Vec<ColumnSchema>,
    },

    /// `DROP TABLE ... CASCADE`; the table must exist.
    DropTable { name: String },

    RenameTable { old_name: String, new_name: String },

    /// No-op when the column is already there.
    AddColumn { table: String, column: ColumnSchema },

    /// No-op when the column is already gone.
    DropColumn { table: String, column_name: String },

    RenameColumn {
        table: String,
        old_name: String,
        new_name: String,
    },

    /// Rewrites the column named by `column.name` into `column`, keeping
    /// its rows.
    ChangeColumn { table: String, column: ColumnSchema },

    AddPrimaryKey {
        name: String,
        table: String,
        columns: Vec<String>,
    },

    AddUniqueConstraint {
        name: String,
        table: String,
        columns: Vec<String>,
    },

    /// `expression` is trusted and emitted verbatim.
    AddCheckConstraint {
        name: String,
        table: String,
        expression: String,
    },

    DropConstraint { table: String, name: String },

    CreateIndex {
        name: String,
        table: String,
        columns: Vec<String>,
        unique: bool,
    },

    DropIndex { table: String, name: String },

    /// Trusted statement text, run as is.
    RunSql { sql: String },
}

impl SchemaOperation {
    /// Creates a `CreateTable` operation.
    #[must_use]
    pub fn create_table(name: impl Into<String>, columns: Vec<ColumnSchema>) -> Self {
        Self::CreateTable {
            name: name.into(),
            columns,
        }
    }

    /// Creates a `DropTable` operation.
    #[must_use]
    pub fn drop_table(name: impl Into<String>) -> Self {
        Self::DropTable { name: name.into() }
    }

    /// Creates a `RenameTable` operation.
    #[must_use]
    pub fn rename_table(old_name: impl Into<String>, new_name: impl Into<String>) -> Self {
        Self::RenameTable {
            old_name: old_name.into(),
            new_name: new_name.into(),
        }
    }

    /// Creates an `AddColumn` operation.
    #[must_use]
    pub fn add_column(table: impl Into<String>, column: ColumnSchema) -> Self {
        Self::AddColumn {
            table: table.into(),
            column,
        }
    }

    /// Creates a `DropColumn` operation.
    #[must_use]
    pub fn drop_column(table: impl Into<String>, column_name: impl Into<String>) -> Self {
        Self::DropColumn {
            table: table.into(),
            column_name: column_name.into(),
        }
    }

    /// Creates a `RenameColumn` operation.
    #[must_use]
    pub fn rename_column(
        table: impl Into<String>,
        old_name: impl Into<String>,
        new_name: impl Into<String>,
    ) -> Self {
        Self::RenameColumn {
            table: table.into(),
            old_name: old_name.into(),
            new_name: new_name.into(),
        }
    }

    /// Creates a `ChangeColumn` operation.
    #[must_use]
    pub fn change_column(table: impl Into<String>, column: ColumnSchema) -> Self {
        Self::ChangeColumn {
            table: table.into(),
            column,
        }
    }

    /// Creates a `CreateIndex` operation.
    #[must_use]
    pub fn create_index(
        name: impl Into<String>,
        table: impl Into<String>,
        columns: Vec<String>,
        unique: bool,
    ) -> Self {
        Self::CreateIndex {
            name: name.into(),
            table: table.into(),
            columns,
            unique,
        }
    }

    /// Creates a `DropIndex` operation.
    #[must_use]
    pub fn drop_index(table: impl Into<String>, name: impl Into<String>) -> Self {
        Self::DropIndex {
            table: table.into(),
            name: name.into(),
        }
    }

    /// Creates a `RunSql` operation.
    #[must_use]
    pub fn run_sql(sql: impl Into<String>) -> Self {
        Self::RunSql { sql: sql.into() }
    }

    /// Returns the table the operation works on, if it targets one.
    #[must_use]
    pub fn table(&self) -> Option<&str> {
        match self {
            Self::CreateTable { name, .. } | Self::DropTable { name } => Some(name.as_str()),
            Self::RenameTable { old_name, .. } => Some(old_name.as_str()),
            Self::AddColumn { table, .. }
            | Self::DropColumn { table, .. }
            | Self::RenameColumn { table, .. }
            | Self::ChangeColumn { table, .. }
            | Self::AddPrimaryKey { table, .. }
            | Self::AddUniqueConstraint { table, .. }
            | Self::AddCheckConstraint { table, .. }
            | Self::DropConstraint { table, .. }
            | Self::CreateIndex { table, .. }
            | Self::DropIndex { table, .. } => Some(table.as_str()),
            Self::RunSql { .. } => None,
        }
    }
}
