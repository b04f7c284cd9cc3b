//! Statement generation.
//!
//! The generator turns the structural inputs of a portable operation into
//! statement text. It expects names in the form the engine stores them
//! (already folded, or resolved from the catalog) and quotes every one.

use crate::dialect::SchemaDialect;
use crate::error::Result;
use crate::schema::ColumnSchema;

/// Builds statements for one dialect.
#[derive(Debug, Clone, Copy)]
pub struct StatementGenerator<'d, D: SchemaDialect + ?Sized> {
    dialect: &'d D,
}

impl<'d, D: SchemaDialect + ?Sized> StatementGenerator<'d, D> {
    /// Creates a generator for `dialect`.
    pub fn new(dialect: &'d D) -> Self {
        Self { dialect }
    }

    fn quote(&self, name: &str) -> String {
        self.dialect.quote_identifier(name)
    }

    fn quote_list(&self, names: &[String]) -> String {
        names
            .iter()
            .map(|name| self.quote(name))
            .collect::<Vec<_>>()
            .join(", ")
    }

    /// CREATE TABLE, with a table-level primary key when more than one
    /// column is flagged.
    pub fn create_table(&self, table: &str, columns: &[ColumnSchema]) -> Result<String> {
        let primary_key: Vec<String> = columns
            .iter()
            .filter(|c| c.primary_key)
            .map(|c| c.name.clone())
            .collect();
        let composite = primary_key.len() > 1;

        let mut defs = Vec::with_capacity(columns.len() + 1);
        for column in columns {
            if composite && column.primary_key {
                let mut inline = column.clone();
                inline.primary_key = false;
                defs.push(self.dialect.column_definition(&inline)?);
            } else {
                defs.push(self.dialect.column_definition(column)?);
            }
        }
        if composite {
            defs.push(format!("PRIMARY KEY ({})", self.quote_list(&primary_key)));
        }

        Ok(format!(
            "CREATE TABLE {} (\n  {}\n)",
            self.quote(table),
            defs.join(",\n  ")
        ))
    }

    /// DROP TABLE in the dialect's form.
    pub fn drop_table(&self, table: &str) -> String {
        self.dialect.drop_table_sql(table)
    }

    /// ALTER TABLE ... RENAME TO.
    pub fn rename_table(&self, old_name: &str, new_name: &str) -> String {
        format!(
            "ALTER TABLE {} RENAME TO {}",
            self.quote(old_name),
            self.quote(new_name)
        )
    }

    /// ALTER TABLE ... ADD COLUMN.
    pub fn add_column(&self, table: &str, column: &ColumnSchema) -> Result<String> {
        Ok(format!(
            "ALTER TABLE {} ADD COLUMN {}",
            self.quote(table),
            self.dialect.column_definition(column)?
        ))
    }

    /// ALTER TABLE ... DROP COLUMN.
    pub fn remove_column(&self, table: &str, column: &str) -> String {
        format!(
            "ALTER TABLE {} DROP COLUMN {}",
            self.quote(table),
            self.quote(column)
        )
    }

    /// ALTER TABLE ... RENAME COLUMN.
    pub fn rename_column(&self, table: &str, old_name: &str, new_name: &str) -> String {
        format!(
            "ALTER TABLE {} RENAME COLUMN {} TO {}",
            self.quote(table),
            self.quote(old_name),
            self.quote(new_name)
        )
    }

    /// Copies every row's `source` into `target`.
    pub fn copy_column(&self, table: &str, target: &str, source: &str) -> String {
        format!(
            "UPDATE {} SET {}={}",
            self.quote(table),
            self.quote(target),
            self.quote(source)
        )
    }

    /// Makes a column reject NULL.
    pub fn set_not_null(&self, table: &str, column: &str) -> String {
        self.dialect.set_not_null_sql(table, column)
    }

    /// ADD PRIMARY KEY on one column, with an engine-chosen constraint name.
    pub fn set_primary_key(&self, table: &str, column: &str) -> String {
        format!(
            "ALTER TABLE {} ADD PRIMARY KEY ({})",
            self.quote(table),
            self.quote(column)
        )
    }

    /// ADD CONSTRAINT ... PRIMARY KEY.
    pub fn add_primary_key(&self, name: &str, table: &str, columns: &[String]) -> String {
        format!(
            "ALTER TABLE {} ADD CONSTRAINT {} PRIMARY KEY ({})",
            self.quote(table),
            self.quote(name),
            self.quote_list(columns)
        )
    }

    /// ADD CONSTRAINT ... UNIQUE.
    pub fn add_unique_constraint(&self, name: &str, table: &str, columns: &[String]) -> String {
        format!(
            "ALTER TABLE {} ADD CONSTRAINT {} UNIQUE ({})",
            self.quote(table),
            self.quote(name),
            self.quote_list(columns)
        )
    }

    /// ADD CONSTRAINT ... CHECK. The expression is emitted verbatim.
    pub fn add_check_constraint(&self, name: &str, table: &str, expression: &str) -> String {
        format!(
            "ALTER TABLE {} ADD CONSTRAINT {} CHECK ({})",
            self.quote(table),
            self.quote(name),
            expression
        )
    }

    /// ALTER TABLE ... DROP CONSTRAINT.
    pub fn remove_constraint(&self, table: &str, name: &str) -> String {
        format!(
            "ALTER TABLE {} DROP CONSTRAINT {}",
            self.quote(table),
            self.quote(name)
        )
    }

    /// CREATE [UNIQUE] INDEX.
    pub fn add_index(&self, name: &str, table: &str, columns: &[String], unique: bool) -> String {
        let mut sql = String::from("CREATE ");
        if unique {
            sql.push_str("UNIQUE ");
        }
        sql.push_str("INDEX ");
        sql.push_str(&self.quote(name));
        sql.push_str(" ON ");
        sql.push_str(&self.quote(table));
        sql.push_str(" (");
        sql.push_str(&self.quote_list(columns));
        sql.push(')');
        sql
    }

    /// DROP INDEX.
    pub fn remove_index(&self, name: &str) -> String {
        format!("DROP INDEX {}", self.quote(name))
    }

    /// INSERT with one placeholder per column.
    pub fn insert(&self, table: &str, columns: &[String]) -> String {
        let placeholders: Vec<String> = (1..=columns.len())
            .map(|index| self.dialect.placeholder(index))
            .collect();
        format!(
            "INSERT INTO {} ({}) VALUES ({})",
            self.quote(table),
            self.quote_list(columns),
            placeholders.join(", ")
        )
    }

    /// UPDATE with one placeholder per column. The where clause is
    /// emitted verbatim.
    pub fn update(&self, table: &str, columns: &[String], where_clause: Option<&str>) -> String {
        let assignments: Vec<String> = columns
            .iter()
            .enumerate()
            .map(|(i, column)| format!("{}={}", self.quote(column), self.dialect.placeholder(i + 1)))
            .collect();
        let mut sql = format!(
            "UPDATE {} SET {}",
            self.quote(table),
            assignments.join(", ")
        );
        if let Some(condition) = where_clause {
            sql.push_str(" WHERE ");
            sql.push_str(condition);
        }
        sql
    }

    /// DELETE matching one column against a placeholder.
    pub fn delete(&self, table: &str, column: &str) -> String {
        format!(
            "DELETE FROM {} WHERE {} = {}",
            self.quote(table),
            self.quote(column),
            self.dialect.placeholder(1)
        )
    }
}
