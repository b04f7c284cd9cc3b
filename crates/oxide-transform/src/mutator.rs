//! Column rewrite for engines that cannot change a column in place.
//!
//! The rewrite keeps the data by parking the old column under a temporary
//! name, adding the new definition, copying every row across and dropping
//! the parked column. NOT NULL is only applied once every row has a value.
//!
//! The statements are not atomic as a group. A failure part-way leaves the
//! table in one of the [`RewriteStep`] states. Resuming from there is an
//! explicit request (see [`RewriteState::detect`]): a column that merely
//! happens to be called `temp_<name>` looks the same as a parked one.
//! Callers that need all-or-nothing behaviour run the change inside their
//! own transaction.

use std::fmt;

use crate::dialect::SchemaDialect;
use crate::error::Result;
use crate::generator::StatementGenerator;
use crate::schema::ColumnSchema;

/// Prefix of the column the old data is parked in.
pub const TEMP_PREFIX: &str = "temp_";

/// Returns the parking name for `column`.
#[must_use]
pub fn temp_column_name(column: &str) -> String {
    format!("{TEMP_PREFIX}{column}")
}

/// State reached after each statement of a rewrite.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum RewriteStep {
    /// The old column is parked under the temporary name.
    Renamed,
    /// The new column exists, nullable.
    Added,
    /// Every row's value is copied into the new column.
    Copied,
    /// The parked column is gone.
    DroppedTemp,
    /// NOT NULL is enforced on the new column.
    Constrained,
    /// The new column is the primary key.
    Keyed,
}

impl fmt::Display for RewriteStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Renamed => "renamed",
            Self::Added => "added",
            Self::Copied => "copied",
            Self::DroppedTemp => "dropped_temp",
            Self::Constrained => "constrained",
            Self::Keyed => "keyed",
        };
        f.write_str(name)
    }
}

/// Where a rewrite has to start, judged from which columns exist.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RewriteState {
    /// Neither the column nor its parked copy exists.
    Missing,
    /// The column exists and no rewrite is in progress.
    Pending,
    /// A previous rewrite stopped after the given step.
    Interrupted(RewriteStep),
}

impl RewriteState {
    /// Classifies a column from the presence of itself and its parked copy,
    /// assuming the caller knows a rewrite of it was started.
    ///
    /// Only the parked copy present means the rename ran but the add did
    /// not. Both present means the add ran; the copy is repeated since it
    /// cannot be told apart from a partial one.
    #[must_use]
    pub fn detect(column_present: bool, temp_present: bool) -> Self {
        match (column_present, temp_present) {
            (false, false) => Self::Missing,
            (true, false) => Self::Pending,
            (false, true) => Self::Interrupted(RewriteStep::Renamed),
            (true, true) => Self::Interrupted(RewriteStep::Added),
        }
    }
}

/// Plan for rewriting one column.
#[derive(Debug, Clone)]
pub struct ColumnRewrite {
    table: String,
    target: ColumnSchema,
    completed: Option<RewriteStep>,
}

impl ColumnRewrite {
    /// Plans a rewrite of `table`.`target.name` into `target`.
    ///
    /// Both names must already be in stored form.
    #[must_use]
    pub fn new(table: impl Into<String>, target: ColumnSchema) -> Self {
        Self {
            table: table.into(),
            target,
            completed: None,
        }
    }

    /// Skips every step up to and including `step`.
    #[must_use]
    pub fn resume_after(mut self, step: RewriteStep) -> Self {
        self.completed = Some(step);
        self
    }

    /// Returns the parking name of the column.
    #[must_use]
    pub fn temp_name(&self) -> String {
        temp_column_name(&self.target.name)
    }

    /// Returns whether the plan ends by enforcing NOT NULL.
    #[must_use]
    pub fn requires_not_null(&self) -> bool {
        self.target.is_not_null()
    }

    /// Returns whether the plan ends by adding the primary key.
    #[must_use]
    pub fn requires_primary_key(&self) -> bool {
        self.target.primary_key
    }

    /// Returns the remaining statements, each tagged with the state it
    /// reaches.
    ///
    /// The column is added without NOT NULL and without PRIMARY KEY; both
    /// are applied once the rows are copied and the parked column, which
    /// still carries the old key, is gone.
    pub fn plan<D: SchemaDialect + ?Sized>(
        &self,
        generator: &StatementGenerator<'_, D>,
    ) -> Result<Vec<(RewriteStep, String)>> {
        let table = self.table.as_str();
        let column = self.target.name.as_str();
        let temp = self.temp_name();
        let mut staged = self.target.clone().nullable();
        staged.primary_key = false;

        let mut steps = vec![
            (
                RewriteStep::Renamed,
                generator.rename_column(table, column, &temp),
            ),
            (RewriteStep::Added, generator.add_column(table, &staged)?),
            (
                RewriteStep::Copied,
                generator.copy_column(table, column, &temp),
            ),
            (
                RewriteStep::DroppedTemp,
                generator.remove_column(table, &temp),
            ),
        ];
        if self.requires_not_null() {
            steps.push((
                RewriteStep::Constrained,
                generator.set_not_null(table, column),
            ));
        }
        if self.requires_primary_key() {
            steps.push((
                RewriteStep::Keyed,
                generator.set_primary_key(table, column),
            ));
        }

        Ok(steps
            .into_iter()
            .filter(|(step, _)| self.completed.map_or(true, |done| *step > done))
            .collect())
    }
}
