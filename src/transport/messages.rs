//! Message types exchanged with a Beeswax-style query service.
//!
//! These mirror the request and response structures of the service's RPC
//! interface. The wire encoding belongs to the client implementation; the
//! driver only sees these decoded values.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Separator between fields of a raw result row.
pub const FIELD_DELIMITER: char = '\t';

/// Query submission request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Query {
    /// SQL text to execute
    pub query: String,
    /// Execution configuration as `key=value` entries
    pub configuration: Vec<String>,
    /// Optional user to run the query as
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hadoop_user: Option<String>,
}

impl Query {
    /// Create a query with an empty configuration set.
    pub fn new(sql: impl Into<String>) -> Self {
        Self {
            query: sql.into(),
            configuration: Vec::new(),
            hadoop_user: None,
        }
    }

    /// Add a configuration entry.
    pub fn with_configuration(mut self, key: &str, value: &str) -> Self {
        self.configuration.push(format!("{}={}", key, value));
        self
    }
}

/// Opaque server-issued token identifying one submitted query.
///
/// Handles serialize so a job can be reattached from another process.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct QueryHandle {
    /// Server query id
    pub id: String,
    /// Server log context
    pub log_context: String,
}

impl QueryHandle {
    /// Create a new handle.
    pub fn new(id: impl Into<String>, log_context: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            log_context: log_context.into(),
        }
    }

    /// Serialize the handle to JSON for storage outside this process.
    pub fn to_json(&self) -> Result<String, crate::error::ConnectionError> {
        serde_json::to_string(self)
            .map_err(|e| crate::error::ConnectionError::ParseError(e.to_string()))
    }

    /// Restore a handle written by [`to_json`](Self::to_json).
    pub fn from_json(json: &str) -> Result<Self, crate::error::ConnectionError> {
        serde_json::from_str(json)
            .map_err(|e| crate::error::ConnectionError::ParseError(format!("invalid handle: {}", e)))
    }
}

impl fmt::Display for QueryHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.id)
    }
}

/// Job state reported by polling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum QueryState {
    Created,
    Initialized,
    Compiled,
    Running,
    Finished,
    Exception,
}

impl QueryState {
    /// No further transition happens from this state.
    pub fn is_terminal(&self) -> bool {
        matches!(self, QueryState::Finished | QueryState::Exception)
    }

    /// The state is not the failure-terminal state.
    pub fn is_success(&self) -> bool {
        !matches!(self, QueryState::Exception)
    }

    /// Protocol ordinal of the state.
    pub fn as_i32(&self) -> i32 {
        match self {
            QueryState::Created => 0,
            QueryState::Initialized => 1,
            QueryState::Compiled => 2,
            QueryState::Running => 3,
            QueryState::Finished => 4,
            QueryState::Exception => 5,
        }
    }
}

impl TryFrom<i32> for QueryState {
    type Error = crate::error::TransportError;

    fn try_from(value: i32) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(QueryState::Created),
            1 => Ok(QueryState::Initialized),
            2 => Ok(QueryState::Compiled),
            3 => Ok(QueryState::Running),
            4 => Ok(QueryState::Finished),
            5 => Ok(QueryState::Exception),
            other => Err(crate::error::TransportError::InvalidResponse(format!(
                "unknown query state {}",
                other
            ))),
        }
    }
}

impl fmt::Display for QueryState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            QueryState::Created => "CREATED",
            QueryState::Initialized => "INITIALIZED",
            QueryState::Compiled => "COMPILED",
            QueryState::Running => "RUNNING",
            QueryState::Finished => "FINISHED",
            QueryState::Exception => "EXCEPTION",
        };
        f.write_str(name)
    }
}

/// One page of results returned by a fetch call.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResultBatch {
    /// Whether the server had rows ready
    pub ready: bool,
    /// Raw rows, fields joined by [`FIELD_DELIMITER`]
    pub data: Vec<String>,
    /// Server offset of the first row in this batch
    pub start_row: i64,
    /// Whether the server reports more batches. Advisory only.
    pub has_more: bool,
}

impl ResultBatch {
    /// Create a batch from rows.
    pub fn new(data: Vec<String>, has_more: bool) -> Self {
        Self {
            ready: true,
            data,
            start_row: 0,
            has_more,
        }
    }

    /// Set the server offset of the first row.
    pub fn with_start_row(mut self, start_row: i64) -> Self {
        self.start_row = start_row;
        self
    }

    /// Number of rows in the batch.
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Check if the batch holds no rows.
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

/// Declared name and type of one result column.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldSchema {
    /// Column name
    pub name: String,
    /// Declared type name as reported by the server, e.g. `bigint`
    #[serde(rename = "type")]
    pub type_name: String,
    /// Optional column comment
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
}

impl FieldSchema {
    /// Create a field schema.
    pub fn new(name: impl Into<String>, type_name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            type_name: type_name.into(),
            comment: None,
        }
    }
}

/// Result shape of a finished query.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResultsMetadata {
    /// Ordered column schemas
    pub field_schemas: Vec<FieldSchema>,
}

impl ResultsMetadata {
    /// Create metadata from field schemas.
    pub fn new(field_schemas: Vec<FieldSchema>) -> Self {
        Self { field_schemas }
    }
}

/// Acknowledgement returned by a cancel call.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CancelStatus {
    /// Server status code, zero on success
    pub status_code: i32,
    /// Server error messages, if any
    #[serde(default)]
    pub error_msgs: Vec<String>,
}

impl CancelStatus {
    /// Successful acknowledgement.
    pub fn ok() -> Self {
        Self::default()
    }

    /// Check if the server accepted the cancel.
    pub fn is_ok(&self) -> bool {
        self.status_code == 0
    }
}
