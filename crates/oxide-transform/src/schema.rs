//! Column and table descriptions.
//!
//! Columns describe either the desired state handed in by a caller or the
//! observed state read back from the catalog. Tables only exist as observed
//! state: nothing here is cached between calls.

use serde::{Deserialize, Serialize};

/// Engine-neutral column type; a dialect maps each one to a native type
/// or rejects it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SqlType {
    /// 32-bit signed.
    Integer,
    /// 64-bit signed.
    BigInt,
    /// 16-bit signed.
    SmallInt,
    /// 32-bit unsigned; PostgreSQL has no such type.
    UnsignedInteger,
    /// 64-bit unsigned; PostgreSQL has no such type.
    UnsignedBigInt,
    Text,
    /// Text capped at the given length.
    Varchar(usize),
    /// Blank-padded text of the given length.
    Char(usize),
    Boolean,
    /// Calendar date plus wall-clock time.
    DateTime,
    Date,
    /// Wall-clock time without a date.
    Time,
    /// Same storage as `DateTime`.
    Timestamp,
    /// 4-byte float.
    Real,
    /// 8-byte float.
    Double,
    /// Exact number: `(precision, scale)`.
    Decimal(u8, u8),
    /// Exact number: `(precision, scale)`, spelled `NUMERIC`.
    Numeric(u8, u8),
    /// Raw bytes.
    Blob,
    /// Structured document.
    Json,
    Uuid,
}

/// What a column holds when an insert leaves it out.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum DefaultValue {
    /// No `DEFAULT` clause.
    None,
    Null,
    Bool(bool),
    Integer(i64),
    Float(f64),
    /// Literal text, quoted on output.
    String(String),
    /// Emitted as written, e.g. `now()`.
    Expression(String),
}

impl DefaultValue {
    /// Renders the `DEFAULT` operand, or `None` when there is no default.
    ///
    /// Booleans come out as `1`/`0`; dialects with a boolean literal
    /// override this in [`crate::dialect::SchemaDialect::render_default`].
    #[must_use]
    pub fn to_sql(&self) -> Option<String> {
        let rendered = match self {
            Self::None => return None,
            Self::Null => "NULL".to_string(),
            Self::Bool(flag) => u8::from(*flag).to_string(),
            Self::Integer(value) => value.to_string(),
            Self::Float(value) => value.to_string(),
            Self::String(text) => format!("'{}'", text.replace('\'', "''")),
            Self::Expression(expr) => expr.clone(),
        };
        Some(rendered)
    }
}

/// Definition of a column.
///
/// Nullability is a single flag, so a column is always exactly one of
/// nullable or NOT NULL.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnSchema {
    pub name: String,
    pub sql_type: SqlType,
    /// `false` means NOT NULL.
    pub nullable: bool,
    pub default: DefaultValue,
    /// Inline `PRIMARY KEY`; several flagged columns form a composite key.
    pub primary_key: bool,
    /// Values generated by the engine (`SERIAL` family on PostgreSQL).
    pub identity: bool,
    /// Inline `UNIQUE`.
    pub unique: bool,
    /// Inline `CHECK` expression, emitted verbatim.
    pub check: Option<String>,
}

impl ColumnSchema {
    /// Creates a new nullable column.
    #[must_use]
    pub fn new(name: impl Into<String>, sql_type: SqlType) -> Self {
        Self {
            name: name.into(),
            sql_type,
            nullable: true,
            default: DefaultValue::None,
            primary_key: false,
            identity: false,
            unique: false,
            check: None,
        }
    }

    /// Sets the column as NOT NULL.
    #[must_use]
    pub fn not_null(mut self) -> Self {
        self.nullable = false;
        self
    }

    /// Sets the column as nullable.
    #[must_use]
    pub fn nullable(mut self) -> Self {
        self.nullable = true;
        self
    }

    /// Sets the default value.
    #[must_use]
    pub fn default(mut self, value: DefaultValue) -> Self {
        self.default = value;
        self
    }

    /// Sets the column as the primary key.
    #[must_use]
    pub fn primary_key(mut self) -> Self {
        self.primary_key = true;
        self.nullable = false; // Primary keys are always NOT NULL
        self
    }

    /// Marks the column as engine-generated.
    #[must_use]
    pub fn identity(mut self) -> Self {
        self.identity = true;
        self
    }

    /// Sets the column as unique.
    #[must_use]
    pub fn unique(mut self) -> Self {
        self.unique = true;
        self
    }

    /// Sets a check constraint.
    #[must_use]
    pub fn check(mut self, expr: impl Into<String>) -> Self {
        self.check = Some(expr.into());
        self
    }

    /// Returns a copy of this definition under another name.
    #[must_use]
    pub fn renamed(&self, name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..self.clone()
        }
    }

    /// Returns whether the column rejects NULL values.
    #[must_use]
    pub fn is_not_null(&self) -> bool {
        !self.nullable
    }
}

/// A table as observed in the catalog.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableSchema {
    /// Table name as stored by the engine.
    pub name: String,
    /// Columns in catalog order.
    pub columns: Vec<ColumnSchema>,
}

impl TableSchema {
    /// Creates a table with the given columns.
    #[must_use]
    pub fn new(name: impl Into<String>, columns: Vec<ColumnSchema>) -> Self {
        Self {
            name: name.into(),
            columns,
        }
    }

    /// Gets a column by its stored name.
    #[must_use]
    pub fn get_column(&self, name: &str) -> Option<&ColumnSchema> {
        self.columns.iter().find(|c| c.name == name)
    }
}
