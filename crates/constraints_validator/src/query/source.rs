//! Data-source collaborators consumed by query rules.
//!
//! A query rule resolves a [`DataSource`] by name through a
//! [`DataSourceRegistry`] once, when it is initialized. Every evaluation then
//! opens a [`Connection`], prepares the statement, binds parameters and reads
//! the [`ResultCursor`]. Connections, statements and cursors are scoped to one
//! evaluation and released when dropped.

use crate::error::DataSourceError;
use constraints_core::Value;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// Name looked up when a query rule does not name a data source.
pub const DEFAULT_DATA_SOURCE: &str = "default";

/// Resolves data sources by name.
pub trait DataSourceRegistry: Send + Sync {
    /// Looks up the data source registered under `name`.
    fn lookup(&self, name: &str) -> Result<Arc<dyn DataSource>, DataSourceError>;
}

/// A source of connections.
pub trait DataSource: Send + Sync {
    /// Opens a connection. It is released when the returned box is dropped.
    fn connection(&self) -> Result<Box<dyn Connection + '_>, DataSourceError>;
}

/// An open connection.
pub trait Connection {
    /// Prepares a statement with positional `?` markers.
    fn prepare(&mut self, sql: &str) -> Result<Box<dyn PreparedQuery + '_>, DataSourceError>;
}

/// A prepared statement awaiting its parameters.
pub trait PreparedQuery {
    /// Binds `value` to the marker at `index`, counting from 1.
    fn bind(&mut self, index: usize, value: &Value) -> Result<(), DataSourceError>;

    /// Executes the statement.
    fn execute_query(&mut self) -> Result<Box<dyn ResultCursor + '_>, DataSourceError>;
}

/// Rows produced by an executed statement.
pub trait ResultCursor {
    /// Returns true while at least one unread row remains.
    fn has_next(&mut self) -> Result<bool, DataSourceError>;
}

/// In-memory [`DataSourceRegistry`] keyed by name.
///
/// # Example
///
/// ```rust,no_run
/// use constraints_validator::{DataFusionSource, DataSourceRegistry, DataSources};
/// use std::sync::Arc;
///
/// let registry = DataSources::new()
///     .with_default(Arc::new(DataFusionSource::new().unwrap()))
///     .with_source("inventory", Arc::new(DataFusionSource::new().unwrap()));
///
/// assert!(registry.lookup("default").is_ok());
/// assert!(registry.lookup("billing").is_err());
/// ```
#[derive(Clone, Default)]
pub struct DataSources {
    sources: HashMap<String, Arc<dyn DataSource>>,
}

impl DataSources {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `source` under `name`, replacing any previous entry.
    pub fn register(&mut self, name: impl Into<String>, source: Arc<dyn DataSource>) {
        self.sources.insert(name.into(), source);
    }

    /// Builder-style [`register`](Self::register).
    pub fn with_source(mut self, name: impl Into<String>, source: Arc<dyn DataSource>) -> Self {
        self.register(name, source);
        self
    }

    /// Registers `source` under [`DEFAULT_DATA_SOURCE`].
    pub fn with_default(self, source: Arc<dyn DataSource>) -> Self {
        self.with_source(DEFAULT_DATA_SOURCE, source)
    }

    /// Returns the number of registered sources.
    pub fn len(&self) -> usize {
        self.sources.len()
    }

    /// Returns true if no source is registered.
    pub fn is_empty(&self) -> bool {
        self.sources.is_empty()
    }
}

impl fmt::Debug for DataSources {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names: Vec<&String> = self.sources.keys().collect();
        names.sort();
        f.debug_struct("DataSources").field("sources", &names).finish()
    }
}

impl DataSourceRegistry for DataSources {
    fn lookup(&self, name: &str) -> Result<Arc<dyn DataSource>, DataSourceError> {
        self.sources
            .get(name)
            .cloned()
            .ok_or_else(|| DataSourceError::NotFound(name.to_string()))
    }
}
