//! Dialect-aware schema transformations.
//!
//! `oxide-transform` turns portable schema operations into statements for a
//! concrete engine and applies them over a live connection:
//!
//! - **Dialect** - identifier folding and quoting, type mapping, catalog
//!   query text
//! - **Introspector** - existence and shape questions answered from the
//!   live catalog
//! - **Generator** - DDL and DML text for each operation
//! - **Mutator** - the data-preserving rewrite used to change a column
//! - **Provider** - ties the above together over one owned connection
//!
//! Identifiers supplied by the caller are folded the way the engine folds
//! unquoted names and then quoted, so `Accounts`, `accounts` and
//! `ACCOUNTS` all address the same table.
//!
//! # Example
//!
//! ```rust,no_run
//! use oxide_transform::prelude::*;
//!
//! # async fn run() -> oxide_transform::error::Result<()> {
//! let mut provider =
//!     PostgresProvider::connect("postgres://app@localhost/shop?SearchPath=billing").await?;
//!
//! if provider.table_exists("Accounts").await? {
//!     provider
//!         .change_column(
//!             "accounts",
//!             &ColumnSchema::new("Balance", SqlType::Decimal(12, 2)).not_null(),
//!         )
//!         .await?;
//! }
//!
//! provider.close().await
//! # }
//! ```

pub mod config;
pub mod dialect;
pub mod error;
pub mod exec;
pub mod generator;
pub mod introspect;
pub mod mutator;
pub mod operations;
pub mod provider;
pub mod schema;

#[cfg(test)]
mod testing;

/// Prelude for convenient imports.
pub mod prelude {
    pub use crate::config::ProviderConfig;
    pub use crate::dialect::{IdentifierCase, PostgresDialect, SchemaDialect};
    pub use crate::error::{ObjectKind, Result, TransformError};
    pub use crate::exec::{coerce_parameter, CatalogRow, SchemaConnection, SqlValue, ToSqlValue};
    pub use crate::generator::StatementGenerator;
    pub use crate::introspect::Introspector;
    pub use crate::mutator::{ColumnRewrite, RewriteState, RewriteStep};
    pub use crate::operations::SchemaOperation;
    pub use crate::provider::{PostgresProvider, TransformationProvider};
    pub use crate::schema::{ColumnSchema, DefaultValue, SqlType, TableSchema};
}
