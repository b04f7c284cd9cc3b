//! Provider configuration.
//!
//! The only option the provider itself interprets is `SearchPath`, read
//! from the query string of the connection URL. Everything else is passed
//! through to the driver.

use url::Url;

use crate::dialect::SchemaDialect;
use crate::error::{Result, TransformError};

/// Connection option selecting the default schema.
pub const SEARCH_PATH_KEY: &str = "SearchPath";

/// Environment variable read by [`ProviderConfig::from_env`].
pub const DATABASE_URL_ENV: &str = "DATABASE_URL";

/// Resolved connection settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderConfig {
    /// Connection URL handed to the driver, without `SearchPath`.
    pub connection_url: String,
    /// Schema named by `SearchPath`, if any.
    pub search_path: Option<String>,
}

impl ProviderConfig {
    /// Parses a connection URL, extracting `SearchPath` (key matched
    /// case-insensitively, value percent-decoded and taken as the exact
    /// schema name).
    pub fn from_connection_string(connection_string: &str) -> Result<Self> {
        let trimmed = connection_string.trim();
        if trimmed.is_empty() {
            return Err(TransformError::InvalidConfig(
                "connection string is empty".to_string(),
            ));
        }

        let mut url = Url::parse(trimmed)
            .map_err(|err| TransformError::InvalidConfig(format!("invalid connection URL: {err}")))?;

        let mut search_path = None;
        let mut kept = Vec::new();
        for (key, value) in url.query_pairs() {
            if key.eq_ignore_ascii_case(SEARCH_PATH_KEY) {
                if value.is_empty() {
                    return Err(TransformError::InvalidConfig(format!(
                        "{SEARCH_PATH_KEY} must name a schema"
                    )));
                }
                search_path = Some(value.into_owned());
            } else {
                kept.push((key.into_owned(), value.into_owned()));
            }
        }

        if kept.is_empty() {
            url.set_query(None);
        } else {
            url.query_pairs_mut().clear().extend_pairs(&kept);
        }

        Ok(Self {
            connection_url: url.to_string(),
            search_path,
        })
    }

    /// Reads the connection URL from `DATABASE_URL`.
    pub fn from_env() -> Result<Self> {
        let url = std::env::var(DATABASE_URL_ENV).map_err(|_| {
            TransformError::InvalidConfig(format!("{DATABASE_URL_ENV} is not set"))
        })?;
        Self::from_connection_string(&url)
    }

    /// Returns the value for the session's `search_path`, quoted so the
    /// engine does not fold it, when a schema was configured.
    #[must_use]
    pub fn session_search_path<D: SchemaDialect>(&self, dialect: &D) -> Option<String> {
        self.search_path
            .as_deref()
            .map(|schema| dialect.quote_identifier(schema))
    }

    /// Returns the configured schema, or the dialect's conventional one.
    #[must_use]
    pub fn default_schema<'a, D: SchemaDialect>(&'a self, dialect: &D) -> &'a str {
        self.search_path
            .as_deref()
            .unwrap_or_else(|| dialect.default_schema())
    }
}
