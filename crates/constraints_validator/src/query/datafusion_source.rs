//! In-process SQL data source backed by DataFusion.
//!
//! Tables are Arrow record batches registered on a [`SessionContext`]. Queries
//! run synchronously: the source owns a tokio runtime and blocks on each
//! execution, so it must not be used from inside an async task. A query only
//! answers whether a row exists, so plans are limited to their first row.

use super::source::{Connection, DataSource, PreparedQuery, ResultCursor};
use crate::error::DataSourceError;
use arrow_array::RecordBatch;
use constraints_core::Value;
use datafusion::execution::context::SQLOptions;
use datafusion::prelude::SessionContext;
use datafusion::scalar::ScalarValue;
use std::fmt;
use tokio::runtime::Runtime;

/// A [`DataSource`] answering read-only SQL over registered record batches.
///
/// # Example
///
/// ```rust
/// use arrow_array::{Int64Array, RecordBatch};
/// use arrow_schema::{DataType, Field, Schema};
/// use constraints_core::Value;
/// use constraints_validator::{DataFusionSource, DataSource};
/// use std::sync::Arc;
///
/// let schema = Arc::new(Schema::new(vec![Field::new("id", DataType::Int64, false)]));
/// let batch = RecordBatch::try_new(schema, vec![Arc::new(Int64Array::from(vec![1, 2]))])
///     .unwrap();
///
/// let source = DataFusionSource::new().unwrap();
/// source.register_batch("rooms", batch).unwrap();
///
/// let mut connection = source.connection().unwrap();
/// let mut query = connection.prepare("SELECT id FROM rooms WHERE id = ?").unwrap();
/// query.bind(1, &Value::Int(2)).unwrap();
/// assert!(query.execute_query().unwrap().has_next().unwrap());
/// ```
pub struct DataFusionSource {
    session: SessionContext,
    runtime: Runtime,
}

impl DataFusionSource {
    /// Creates a source with an empty session.
    pub fn new() -> Result<Self, DataSourceError> {
        Self::with_session(SessionContext::new())
    }

    /// Creates a source over an existing session.
    pub fn with_session(session: SessionContext) -> Result<Self, DataSourceError> {
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(1)
            .enable_all()
            .build()
            .map_err(|e| DataSourceError::driver("Failed to create tokio runtime", e))?;

        Ok(Self { session, runtime })
    }

    /// Registers `batch` as table `table`.
    pub fn register_batch(&self, table: &str, batch: RecordBatch) -> Result<(), DataSourceError> {
        self.session
            .register_batch(table, batch)
            .map(|_| ())
            .map_err(|e| DataSourceError::driver(format!("Failed to register table '{table}'"), e))
    }

    /// Returns the underlying session.
    pub fn session(&self) -> &SessionContext {
        &self.session
    }
}

impl fmt::Debug for DataFusionSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DataFusionSource")
            .field("session_id", &self.session.session_id())
            .finish()
    }
}

impl DataSource for DataFusionSource {
    fn connection(&self) -> Result<Box<dyn Connection + '_>, DataSourceError> {
        Ok(Box::new(DataFusionConnection { source: self }))
    }
}

struct DataFusionConnection<'s> {
    source: &'s DataFusionSource,
}

impl Connection for DataFusionConnection<'_> {
    fn prepare(&mut self, sql: &str) -> Result<Box<dyn PreparedQuery + '_>, DataSourceError> {
        let (sql, markers) = number_markers(sql);
        Ok(Box::new(DataFusionQuery {
            source: self.source,
            sql,
            parameters: vec![None; markers],
        }))
    }
}

struct DataFusionQuery<'s> {
    source: &'s DataFusionSource,
    sql: String,
    parameters: Vec<Option<ScalarValue>>,
}

impl PreparedQuery for DataFusionQuery<'_> {
    fn bind(&mut self, index: usize, value: &Value) -> Result<(), DataSourceError> {
        let count = self.parameters.len();
        let slot = index
            .checked_sub(1)
            .and_then(|position| self.parameters.get_mut(position))
            .ok_or(DataSourceError::MarkerOutOfRange { index, count })?;
        *slot = Some(to_scalar(index, value)?);
        Ok(())
    }

    fn execute_query(&mut self) -> Result<Box<dyn ResultCursor + '_>, DataSourceError> {
        let parameters = self
            .parameters
            .iter()
            .enumerate()
            .map(|(position, parameter)| {
                parameter
                    .clone()
                    .ok_or_else(|| DataSourceError::bind(position + 1, "no value bound"))
            })
            .collect::<Result<Vec<_>, _>>()?;

        let options = SQLOptions::new()
            .with_allow_ddl(false)
            .with_allow_dml(false)
            .with_allow_statements(false);

        let session = &self.source.session;
        let sql = self.sql.as_str();
        let batches = self
            .source
            .runtime
            .block_on(async move {
                let frame = session.sql_with_options(sql, options).await?;
                let frame = if parameters.is_empty() {
                    frame
                } else {
                    frame.with_param_values(parameters)?
                };
                frame.limit(0, Some(1))?.collect().await
            })
            .map_err(|e| DataSourceError::driver(format!("Failed to execute query '{sql}'"), e))?;

        let found = batches.iter().any(|batch| batch.num_rows() > 0);
        Ok(Box::new(FirstRow { found }))
    }
}

/// Cursor over the at most one row an existence query fetches.
struct FirstRow {
    found: bool,
}

impl ResultCursor for FirstRow {
    fn has_next(&mut self) -> Result<bool, DataSourceError> {
        Ok(self.found)
    }
}

#[derive(Clone, Copy)]
enum Scan {
    Code,
    Quoted(char),
    LineComment,
    BlockComment,
}

/// Rewrites positional `?` markers to `$1..$n`, leaving quoted text and
/// comments untouched.
fn number_markers(sql: &str) -> (String, usize) {
    let mut rewritten = String::with_capacity(sql.len() + 8);
    let mut markers = 0;
    let mut state = Scan::Code;
    let mut chars = sql.chars().peekable();

    while let Some(c) = chars.next() {
        rewritten.push(c);
        state = match (state, c) {
            (Scan::Code, '?') => {
                rewritten.pop();
                markers += 1;
                rewritten.push('$');
                rewritten.push_str(&markers.to_string());
                Scan::Code
            }
            (Scan::Code, '\'' | '"') => Scan::Quoted(c),
            (Scan::Code, '-') if chars.next_if_eq(&'-').is_some() => {
                rewritten.push('-');
                Scan::LineComment
            }
            (Scan::Code, '/') if chars.next_if_eq(&'*').is_some() => {
                rewritten.push('*');
                Scan::BlockComment
            }
            (Scan::Quoted(open), _) if c == open => Scan::Code,
            (Scan::LineComment, '\n') => Scan::Code,
            (Scan::BlockComment, '*') if chars.next_if_eq(&'/').is_some() => {
                rewritten.push('/');
                Scan::Code
            }
            (state, _) => state,
        };
    }

    (rewritten, markers)
}

fn to_scalar(index: usize, value: &Value) -> Result<ScalarValue, DataSourceError> {
    match value {
        Value::Null => Ok(ScalarValue::Null),
        Value::Bool(b) => Ok(ScalarValue::Boolean(Some(*b))),
        Value::Int(i) => Ok(ScalarValue::Int64(Some(*i))),
        Value::Float(f) => Ok(ScalarValue::Float64(Some(*f))),
        Value::String(s) => Ok(ScalarValue::Utf8(Some(s.clone()))),
        Value::Timestamp(ts) => Ok(ScalarValue::TimestampMicrosecond(
            Some(ts.timestamp_micros()),
            Some("UTC".into()),
        )),
        other => Err(DataSourceError::bind(
            index,
            format!("{} values are not supported", other.type_name()),
        )),
    }
}
