//! Error types for data-source collaborators.

use constraints_core::BoxError;
use thiserror::Error;

/// Errors raised by data-source registries, connections, prepared queries
/// and result cursors.
#[derive(Debug, Error)]
pub enum DataSourceError {
    /// No data source is registered under the name
    #[error("DataSource not found: {0}")]
    NotFound(String),

    /// A parameter value cannot be bound to a marker
    #[error("Cannot bind parameter marker #{index}: {reason}")]
    Bind { index: usize, reason: String },

    /// A marker index outside of the statement's markers
    #[error("Parameter marker #{index} is out of range, statement has {count} markers")]
    MarkerOutOfRange { index: usize, count: usize },

    /// The underlying driver failed
    #[error("{context}: {source}")]
    Driver {
        context: String,
        #[source]
        source: BoxError,
    },
}

impl DataSourceError {
    /// Creates a new bind error.
    pub fn bind(index: usize, reason: impl Into<String>) -> Self {
        Self::Bind {
            index,
            reason: reason.into(),
        }
    }

    /// Creates a new driver error.
    pub fn driver(context: impl Into<String>, source: impl Into<BoxError>) -> Self {
        Self::Driver {
            context: context.into(),
            source: source.into(),
        }
    }

    /// Returns true if the error rejects a parameter value.
    pub fn is_bind_error(&self) -> bool {
        matches!(self, Self::Bind { .. } | Self::MarkerOutOfRange { .. })
    }
}
