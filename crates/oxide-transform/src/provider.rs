//! Transformation provider.
//!
//! The provider owns one live connection and turns portable schema
//! operations into statements for its dialect. Preconditions are checked
//! against the catalog before anything is executed; operations that would
//! change nothing log a warning and return successfully so migrations can
//! be re-applied to a partially migrated schema.

use std::str::FromStr;

use sqlx::postgres::{PgConnectOptions, PgConnection};
use sqlx::Connection;
use tracing::{debug, info, warn};

use crate::config::ProviderConfig;
use crate::dialect::{PostgresDialect, SchemaDialect};
use crate::error::{ObjectKind, Result, TransformError};
use crate::exec::{coerce_parameter, CatalogRow, SchemaConnection, SqlValue};
use crate::generator::StatementGenerator;
use crate::introspect::{find_column, Introspector};
use crate::mutator::{temp_column_name, ColumnRewrite, RewriteState, TEMP_PREFIX};
use crate::operations::SchemaOperation;
use crate::schema::{ColumnSchema, TableSchema};

/// Applies schema operations over an owned connection.
pub struct TransformationProvider<C: SchemaConnection, D: SchemaDialect> {
    connection: C,
    dialect: D,
    default_schema: String,
}

/// Provider for a live PostgreSQL connection.
pub type PostgresProvider = TransformationProvider<PgConnection, PostgresDialect>;

impl PostgresProvider {
    /// Opens a connection from a URL that may carry `SearchPath`.
    pub async fn connect(connection_string: &str) -> Result<Self> {
        let config = ProviderConfig::from_connection_string(connection_string)?;
        Self::connect_with(&config).await
    }

    /// Opens a connection from resolved settings.
    ///
    /// A configured schema also becomes the session's `search_path`, so
    /// statements land in the schema the catalog lookups inspect.
    pub async fn connect_with(config: &ProviderConfig) -> Result<Self> {
        let dialect = PostgresDialect::new();
        let mut options = PgConnectOptions::from_str(&config.connection_url)?;
        if let Some(search_path) = config.session_search_path(&dialect) {
            options = options.options([("search_path", search_path)]);
        }

        let connection = PgConnection::connect_with(&options).await?;
        let default_schema = config.default_schema(&dialect).to_string();
        info!(schema = %default_schema, "Connected to PostgreSQL");

        Ok(Self::new(connection, dialect, default_schema))
    }
}

impl<C: SchemaConnection, D: SchemaDialect> TransformationProvider<C, D> {
    /// Creates a provider over an already open connection.
    pub fn new(connection: C, dialect: D, default_schema: impl Into<String>) -> Self {
        Self {
            connection,
            dialect,
            default_schema: default_schema.into(),
        }
    }

    /// Returns the dialect.
    #[must_use]
    pub fn dialect(&self) -> &D {
        &self.dialect
    }

    /// Returns the connection.
    #[must_use]
    pub fn connection(&self) -> &C {
        &self.connection
    }

    /// Returns the schema every catalog lookup is restricted to.
    #[must_use]
    pub fn default_schema(&self) -> &str {
        &self.default_schema
    }

    /// Closes the connection.
    pub async fn close(self) -> Result<()> {
        self.connection.close().await
    }

    fn introspector(&mut self) -> Introspector<'_, C, D> {
        Introspector::new(&mut self.connection, &self.dialect, &self.default_schema)
    }

    fn generator(&self) -> StatementGenerator<'_, D> {
        StatementGenerator::new(&self.dialect)
    }

    fn fold(&self, name: &str) -> String {
        self.dialect.fold_identifier(name)
    }

    fn fold_all<S: AsRef<str>>(&self, names: &[S]) -> Vec<String> {
        names.iter().map(|name| self.fold(name.as_ref())).collect()
    }

    async fn run(&mut self, sql: &str) -> Result<u64> {
        debug!(sql = %sql, "Executing SQL");
        self.connection.execute(sql, &[]).await
    }

    async fn run_with(&mut self, sql: &str, values: Vec<SqlValue>) -> Result<u64> {
        debug!(sql = %sql, params = values.len(), "Executing SQL");
        let params: Vec<SqlValue> = values.into_iter().map(coerce_parameter).collect();
        self.connection.execute(sql, &params).await
    }

    // Introspection

    /// Returns whether `table` exists in the default schema.
    pub async fn table_exists(&mut self, table: &str) -> Result<bool> {
        self.introspector().table_exists(table).await
    }

    /// Returns whether `column` exists in `table`.
    pub async fn column_exists(&mut self, table: &str, column: &str) -> Result<bool> {
        self.introspector().column_exists(table, column).await
    }

    /// Returns the names of all tables in the default schema.
    pub async fn get_tables(&mut self) -> Result<Vec<String>> {
        self.introspector().get_tables().await
    }

    /// Returns the columns of `table`; only name and nullability are exact.
    pub async fn get_columns(&mut self, table: &str) -> Result<Vec<ColumnSchema>> {
        self.introspector().get_columns(table).await
    }

    /// Finds a column by its folded or exact name.
    pub async fn get_column_by_name(
        &mut self,
        table: &str,
        column: &str,
    ) -> Result<Option<ColumnSchema>> {
        self.introspector().get_column_by_name(table, column).await
    }

    /// Reads back a table, or `None` if it does not exist.
    pub async fn get_table(&mut self, table: &str) -> Result<Option<TableSchema>> {
        if !self.table_exists(table).await? {
            return Ok(None);
        }
        let columns = self.get_columns(table).await?;
        Ok(Some(TableSchema::new(self.fold(table), columns)))
    }

    /// Returns whether a constraint named `name` exists.
    pub async fn constraint_exists(&mut self, table: &str, name: &str) -> Result<bool> {
        self.introspector().constraint_exists(table, name).await
    }

    /// Returns whether an index named `name` exists.
    pub async fn index_exists(&mut self, table: &str, name: &str) -> Result<bool> {
        self.introspector().index_exists(table, name).await
    }

    // Tables

    /// Creates a table. Columns flagged as primary key form the key.
    pub async fn add_table(&mut self, table: &str, columns: &[ColumnSchema]) -> Result<()> {
        if self.table_exists(table).await? {
            warn!(table = %table, "Table already exists, skipping");
            return Ok(());
        }

        let columns: Vec<ColumnSchema> = columns
            .iter()
            .map(|column| column.renamed(self.fold(&column.name)))
            .collect();
        let sql = self.generator().create_table(&self.fold(table), &columns)?;
        self.run(&sql).await?;
        Ok(())
    }

    /// Drops a table and everything depending on it.
    ///
    /// Fails with [`TransformError::SchemaObjectNotFound`] before issuing
    /// anything when the table is missing.
    pub async fn remove_table(&mut self, table: &str) -> Result<()> {
        if !self.table_exists(table).await? {
            return Err(TransformError::not_found(ObjectKind::Table, table));
        }

        let sql = self.generator().drop_table(&self.fold(table));
        self.run(&sql).await?;
        Ok(())
    }

    /// Renames a table.
    pub async fn rename_table(&mut self, old_name: &str, new_name: &str) -> Result<()> {
        if !self.table_exists(old_name).await? {
            return Err(TransformError::not_found(ObjectKind::Table, old_name));
        }
        if self.table_exists(new_name).await? {
            return Err(TransformError::exists(ObjectKind::Table, new_name));
        }

        let sql = self
            .generator()
            .rename_table(&self.fold(old_name), &self.fold(new_name));
        self.run(&sql).await?;
        Ok(())
    }

    /// Drops every table in the default schema.
    pub async fn remove_all_tables(&mut self) -> Result<()> {
        let tables = self.get_tables().await?;
        for table in &tables {
            let sql = self.generator().drop_table(table);
            self.run(&sql).await?;
        }
        info!(schema = %self.default_schema, count = tables.len(), "Dropped all tables");
        Ok(())
    }

    // Columns

    /// Adds a column.
    pub async fn add_column(&mut self, table: &str, column: &ColumnSchema) -> Result<()> {
        if !self.table_exists(table).await? {
            return Err(TransformError::not_found(ObjectKind::Table, table));
        }
        if self.column_exists(table, &column.name).await? {
            warn!(table = %table, column = %column.name, "Column already exists, skipping");
            return Ok(());
        }

        let column = column.renamed(self.fold(&column.name));
        let sql = self.generator().add_column(&self.fold(table), &column)?;
        self.run(&sql).await?;
        Ok(())
    }

    /// Drops a column.
    pub async fn remove_column(&mut self, table: &str, column: &str) -> Result<()> {
        let Some(existing) = self.get_column_by_name(table, column).await? else {
            warn!(table = %table, column = %column, "Column does not exist, skipping removal");
            return Ok(());
        };

        let sql = self
            .generator()
            .remove_column(&self.fold(table), &existing.name);
        self.run(&sql).await?;
        Ok(())
    }

    /// Renames a column.
    pub async fn rename_column(
        &mut self,
        table: &str,
        old_name: &str,
        new_name: &str,
    ) -> Result<()> {
        let Some(existing) = self.get_column_by_name(table, old_name).await? else {
            warn!(table = %table, column = %old_name, "Column does not exist, skipping rename");
            return Ok(());
        };
        if self.column_exists(table, new_name).await? {
            return Err(TransformError::exists(
                ObjectKind::Column,
                format!("{table}.{new_name}"),
            ));
        }

        let sql = self.generator().rename_column(
            &self.fold(table),
            &existing.name,
            &self.fold(new_name),
        );
        self.run(&sql).await?;
        Ok(())
    }

    /// Changes a column's type and flags without losing its data.
    ///
    /// The column is rewritten through a temporary copy (see
    /// [`crate::mutator`]). The stored name is resolved first and used for
    /// every statement. A missing column is a logged no-op. A column
    /// already named like the temporary copy fails with
    /// [`TransformError::SchemaObjectExists`] before anything runs; use
    /// [`Self::resume_column_change`] when it is known to be left over from
    /// an interrupted rewrite.
    pub async fn change_column(&mut self, table: &str, column: &ColumnSchema) -> Result<()> {
        let columns = self.get_columns(table).await?;
        let folded = self.fold(&column.name);

        let Some(existing) = find_column(&columns, &column.name, &folded) else {
            warn!(table = %table, column = %column.name, "Column does not exist, skipping change");
            return Ok(());
        };
        let stored = existing.name.clone();
        let parked = temp_column_name(&stored);
        if columns.iter().any(|c| c.name == parked) {
            return Err(TransformError::exists(ObjectKind::Column, parked));
        }

        let rewrite = ColumnRewrite::new(self.fold(table), column.renamed(&stored));
        self.run_rewrite(table, &stored, &rewrite).await
    }

    /// Finishes a column change that an earlier failure left part-way.
    ///
    /// Where to start is judged from which of the column and its
    /// `temp_` copy exist ([`RewriteState::detect`]), so this must only be
    /// called for a column whose rewrite is known to have been started.
    /// With no copy present it behaves like [`Self::change_column`].
    pub async fn resume_column_change(
        &mut self,
        table: &str,
        column: &ColumnSchema,
    ) -> Result<()> {
        let columns = self.get_columns(table).await?;
        let folded = self.fold(&column.name);

        let present = find_column(&columns, &column.name, &folded).map(|c| c.name.clone());
        let parked = match &present {
            Some(stored) => {
                let parked = temp_column_name(stored);
                columns.iter().any(|c| c.name == parked).then_some(parked)
            }
            None => find_column(
                &columns,
                &temp_column_name(&column.name),
                &temp_column_name(&folded),
            )
            .map(|c| c.name.clone()),
        };
        let stored = match (&present, &parked) {
            (Some(stored), _) => stored.clone(),
            (None, Some(parked)) => parked
                .strip_prefix(TEMP_PREFIX)
                .unwrap_or(parked)
                .to_string(),
            (None, None) => folded,
        };

        let rewrite = ColumnRewrite::new(self.fold(table), column.renamed(&stored));
        let rewrite = match RewriteState::detect(present.is_some(), parked.is_some()) {
            RewriteState::Missing => {
                warn!(table = %table, column = %column.name, "Column does not exist, nothing to resume");
                return Ok(());
            }
            RewriteState::Pending => rewrite,
            RewriteState::Interrupted(step) => {
                info!(
                    table = %table,
                    column = %stored,
                    step = %step,
                    "Resuming interrupted column rewrite"
                );
                rewrite.resume_after(step)
            }
        };
        self.run_rewrite(table, &stored, &rewrite).await
    }

    async fn run_rewrite(
        &mut self,
        table: &str,
        column: &str,
        rewrite: &ColumnRewrite,
    ) -> Result<()> {
        let plan = rewrite.plan(&self.generator())?;
        for (step, sql) in plan {
            self.run(&sql).await?;
            info!(table = %table, column = %column, step = %step, "Column rewrite step applied");
        }
        Ok(())
    }

    // Constraints and indexes

    /// Adds a named primary key.
    pub async fn add_primary_key<S: AsRef<str>>(
        &mut self,
        name: &str,
        table: &str,
        columns: &[S],
    ) -> Result<()> {
        if self.skip_existing_constraint(table, name).await? {
            return Ok(());
        }
        let sql = self.generator().add_primary_key(
            &self.fold(name),
            &self.fold(table),
            &self.fold_all(columns),
        );
        self.run(&sql).await?;
        Ok(())
    }

    /// Adds a named unique constraint.
    pub async fn add_unique_constraint<S: AsRef<str>>(
        &mut self,
        name: &str,
        table: &str,
        columns: &[S],
    ) -> Result<()> {
        if self.skip_existing_constraint(table, name).await? {
            return Ok(());
        }
        let sql = self.generator().add_unique_constraint(
            &self.fold(name),
            &self.fold(table),
            &self.fold_all(columns),
        );
        self.run(&sql).await?;
        Ok(())
    }

    /// Adds a named check constraint. `expression` is emitted verbatim.
    pub async fn add_check_constraint(
        &mut self,
        name: &str,
        table: &str,
        expression: &str,
    ) -> Result<()> {
        if self.skip_existing_constraint(table, name).await? {
            return Ok(());
        }
        let sql =
            self.generator()
                .add_check_constraint(&self.fold(name), &self.fold(table), expression);
        self.run(&sql).await?;
        Ok(())
    }

    async fn skip_existing_constraint(&mut self, table: &str, name: &str) -> Result<bool> {
        let exists = self.constraint_exists(table, name).await?;
        if exists {
            warn!(table = %table, constraint = %name, "Constraint already exists, skipping");
        }
        Ok(exists)
    }

    /// Drops a named constraint.
    pub async fn remove_constraint(&mut self, table: &str, name: &str) -> Result<()> {
        if !self.constraint_exists(table, name).await? {
            warn!(table = %table, constraint = %name, "Constraint does not exist, skipping removal");
            return Ok(());
        }
        let sql = self
            .generator()
            .remove_constraint(&self.fold(table), &self.fold(name));
        self.run(&sql).await?;
        Ok(())
    }

    /// Creates an index.
    pub async fn add_index<S: AsRef<str>>(
        &mut self,
        name: &str,
        table: &str,
        columns: &[S],
        unique: bool,
    ) -> Result<()> {
        if self.index_exists(table, name).await? {
            warn!(table = %table, index = %name, "Index already exists, skipping");
            return Ok(());
        }
        let sql = self.generator().add_index(
            &self.fold(name),
            &self.fold(table),
            &self.fold_all(columns),
            unique,
        );
        self.run(&sql).await?;
        Ok(())
    }

    /// Drops an index.
    pub async fn remove_index(&mut self, table: &str, name: &str) -> Result<()> {
        if !self.index_exists(table, name).await? {
            warn!(table = %table, index = %name, "Index does not exist, skipping removal");
            return Ok(());
        }
        let sql = self.generator().remove_index(&self.fold(name));
        self.run(&sql).await?;
        Ok(())
    }

    // Data

    /// Inserts one row. Returns the number of rows inserted.
    pub async fn insert<S: AsRef<str>>(
        &mut self,
        table: &str,
        columns: &[S],
        values: Vec<SqlValue>,
    ) -> Result<u64> {
        check_arity(columns.len(), values.len())?;
        let sql = self
            .generator()
            .insert(&self.fold(table), &self.fold_all(columns));
        self.run_with(&sql, values).await
    }

    /// Updates rows matching `where_clause`, or every row when it is `None`.
    ///
    /// The clause is emitted verbatim after the bound `SET` values.
    pub async fn update<S: AsRef<str>>(
        &mut self,
        table: &str,
        columns: &[S],
        values: Vec<SqlValue>,
        where_clause: Option<&str>,
    ) -> Result<u64> {
        check_arity(columns.len(), values.len())?;
        let sql = self
            .generator()
            .update(&self.fold(table), &self.fold_all(columns), where_clause);
        self.run_with(&sql, values).await
    }

    /// Deletes rows where `column` equals `value`.
    pub async fn delete(&mut self, table: &str, column: &str, value: SqlValue) -> Result<u64> {
        let sql = self
            .generator()
            .delete(&self.fold(table), &self.fold(column));
        self.run_with(&sql, vec![value]).await
    }

    /// Runs a raw query and returns its rows as text.
    pub async fn execute_query(&mut self, sql: &str) -> Result<Vec<CatalogRow>> {
        debug!(sql = %sql, "Executing query");
        self.connection.query(sql, &[]).await
    }

    /// Runs a raw statement and returns the affected row count.
    pub async fn execute_non_query(&mut self, sql: &str) -> Result<u64> {
        self.run(sql).await
    }

    /// Applies one portable operation.
    pub async fn apply(&mut self, operation: &SchemaOperation) -> Result<()> {
        match operation {
            SchemaOperation::CreateTable { name, columns } => self.add_table(name, columns).await,
            SchemaOperation::DropTable { name } => self.remove_table(name).await,
            SchemaOperation::RenameTable { old_name, new_name } => {
                self.rename_table(old_name, new_name).await
            }
            SchemaOperation::AddColumn { table, column } => self.add_column(table, column).await,
            SchemaOperation::DropColumn { table, column_name } => {
                self.remove_column(table, column_name).await
            }
            SchemaOperation::RenameColumn {
                table,
                old_name,
                new_name,
            } => self.rename_column(table, old_name, new_name).await,
            SchemaOperation::ChangeColumn { table, column } => {
                self.change_column(table, column).await
            }
            SchemaOperation::AddPrimaryKey {
                name,
                table,
                columns,
            } => self.add_primary_key(name, table, columns).await,
            SchemaOperation::AddUniqueConstraint {
                name,
                table,
                columns,
            } => self.add_unique_constraint(name, table, columns).await,
            SchemaOperation::AddCheckConstraint {
                name,
                table,
                expression,
            } => self.add_check_constraint(name, table, expression).await,
            SchemaOperation::DropConstraint { table, name } => {
                self.remove_constraint(table, name).await
            }
            SchemaOperation::CreateIndex {
                name,
                table,
                columns,
                unique,
            } => self.add_index(name, table, columns, *unique).await,
            SchemaOperation::DropIndex { table, name } => self.remove_index(table, name).await,
            SchemaOperation::RunSql { sql } => self.execute_non_query(sql).await.map(|_| ()),
        }
    }

    /// Applies operations in order, stopping at the first failure.
    pub async fn apply_all(&mut self, operations: &[SchemaOperation]) -> Result<()> {
        for operation in operations {
            self.apply(operation).await?;
        }
        Ok(())
    }
}

fn check_arity(columns: usize, values: usize) -> Result<()> {
    if columns == values {
        Ok(())
    } else {
        Err(TransformError::InvalidOperation(format!(
            "{columns} columns but {values} values"
        )))
    }
}
