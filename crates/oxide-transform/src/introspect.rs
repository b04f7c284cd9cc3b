//! Live schema introspection.
//!
//! Every question is answered by a fresh catalog query restricted to the
//! provider's default schema. Caller-supplied names are folded with the
//! dialect's rule before they are compared against catalog names.

use crate::dialect::SchemaDialect;
use crate::error::{Result, TransformError};
use crate::exec::{CatalogRow, SchemaConnection, SqlValue};
use crate::schema::{ColumnSchema, SqlType};

/// Read-only view of the catalog over a borrowed connection.
pub struct Introspector<'a, C: SchemaConnection, D: SchemaDialect> {
    connection: &'a mut C,
    dialect: &'a D,
    schema: &'a str,
}

impl<'a, C: SchemaConnection, D: SchemaDialect> Introspector<'a, C, D> {
    /// Creates an introspector scoped to `schema`.
    pub fn new(connection: &'a mut C, dialect: &'a D, schema: &'a str) -> Self {
        Self {
            connection,
            dialect,
            schema,
        }
    }

    fn text(value: &str) -> SqlValue {
        SqlValue::Text(value.to_string())
    }

    async fn any_row(&mut self, sql: &str, params: &[SqlValue]) -> Result<bool> {
        Ok(!self.connection.query(sql, params).await?.is_empty())
    }

    /// Returns whether `table` exists in the default schema.
    pub async fn table_exists(&mut self, table: &str) -> Result<bool> {
        let params = [
            Self::text(self.schema),
            Self::text(&self.dialect.fold_identifier(table)),
        ];
        self.any_row(self.dialect.table_exists_query(), &params)
            .await
    }

    /// Returns whether `column` exists in `table`.
    ///
    /// A missing table answers `false` without querying columns. The
    /// column matches in folded form or exactly as given, so columns
    /// created quoted by other tools are still found.
    pub async fn column_exists(&mut self, table: &str, column: &str) -> Result<bool> {
        if !self.table_exists(table).await? {
            return Ok(false);
        }

        let params = [
            Self::text(self.schema),
            Self::text(&self.dialect.fold_identifier(table)),
            Self::text(&self.dialect.fold_identifier(column)),
            Self::text(column),
        ];
        self.any_row(self.dialect.column_exists_query(), &params)
            .await
    }

    /// Returns the names of all tables in the default schema, in catalog
    /// order.
    pub async fn get_tables(&mut self) -> Result<Vec<String>> {
        let sql = self.dialect.tables_query();
        let rows = self
            .connection
            .query(sql, &[Self::text(self.schema)])
            .await?;

        rows.iter()
            .map(|row| required(sql, row, 0, "table_name"))
            .collect()
    }

    /// Returns the columns of `table`.
    ///
    /// Only name and nullability are read back; the type is always
    /// [`SqlType::Text`].
    pub async fn get_columns(&mut self, table: &str) -> Result<Vec<ColumnSchema>> {
        let sql = self.dialect.columns_query();
        let params = [
            Self::text(self.schema),
            Self::text(&self.dialect.fold_identifier(table)),
        ];
        let rows = self.connection.query(sql, &params).await?;

        rows.iter()
            .map(|row| {
                let name = required(sql, row, 0, "column_name")?;
                let nullable = required(sql, row, 1, "is_nullable")? == "YES";
                let column = ColumnSchema::new(name, SqlType::Text);
                Ok(if nullable {
                    column.nullable()
                } else {
                    column.not_null()
                })
            })
            .collect()
    }

    /// Finds a column by its folded or exact name.
    pub async fn get_column_by_name(
        &mut self,
        table: &str,
        name: &str,
    ) -> Result<Option<ColumnSchema>> {
        let folded = self.dialect.fold_identifier(name);
        let columns = self.get_columns(table).await?;
        Ok(find_column(&columns, name, &folded).cloned())
    }

    /// Returns whether a constraint named `name` exists in the default
    /// schema. Constraint names are schema-wide, so `table` is not
    /// consulted.
    pub async fn constraint_exists(&mut self, _table: &str, name: &str) -> Result<bool> {
        let params = [
            Self::text(self.schema),
            Self::text(&self.dialect.fold_identifier(name)),
        ];
        self.any_row(self.dialect.constraint_exists_query(), &params)
            .await
    }

    /// Returns whether an index named `name` exists anywhere in the
    /// database.
    pub async fn index_exists(&mut self, _table: &str, name: &str) -> Result<bool> {
        let params = [Self::text(&self.dialect.fold_identifier(name))];
        self.any_row(self.dialect.index_exists_query(), &params)
            .await
    }
}

/// Finds a column whose stored name equals `folded` or `name`.
pub(crate) fn find_column<'c>(
    columns: &'c [ColumnSchema],
    name: &str,
    folded: &str,
) -> Option<&'c ColumnSchema> {
    columns
        .iter()
        .find(|column| column.name == folded || column.name == name)
}

fn required(sql: &str, row: &CatalogRow, index: usize, column: &str) -> Result<String> {
    row.get(index)
        .map(str::to_string)
        .ok_or_else(|| TransformError::UnexpectedCatalogRow {
            statement: sql.to_string(),
            message: format!("missing {column} at position {index}"),
        })
}
