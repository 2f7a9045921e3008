//! Error types for beeswax-rs.
//!
//! This module defines domain-specific error types organized by functional area.

use crate::transport::messages::QueryState;
use std::fmt;
use thiserror::Error;

/// Top-level error type encompassing all possible errors.
#[derive(Error, Debug)]
pub enum DriverError {
    /// Session-level errors
    #[error(transparent)]
    Connection(#[from] ConnectionError),

    /// Query lifecycle errors
    #[error(transparent)]
    Query(#[from] QueryError),

    /// Positional scan contract violations
    #[error(transparent)]
    Scan(#[from] ScanError),

    /// Data conversion errors
    #[error(transparent)]
    Conversion(#[from] ConversionError),

    /// RPC transport errors
    #[error(transparent)]
    Transport(#[from] TransportError),
}

/// Errors related to the session and its configuration.
#[derive(Error, Debug)]
pub enum ConnectionError {
    /// The session has been closed
    #[error("Session is closed")]
    ConnectionClosed,

    /// Invalid configuration value
    #[error("Invalid connection parameter '{parameter}': {message}")]
    InvalidParameter { parameter: String, message: String },

    /// Connection string or stored handle could not be parsed
    #[error("Parse error: {0}")]
    ParseError(String),
}

/// Errors related to the lifecycle of a submitted query.
#[derive(Error, Debug)]
pub enum QueryError {
    /// The remote job reached the failure-terminal state
    #[error("Query failed execution: {state}")]
    ExecutionFailed { state: QueryState },

    /// A row accessor was called before a successful advance
    #[error("No row to scan, advance() has not returned true")]
    NoCurrentRow,

    /// The owning session was closed or the job was superseded
    #[error("Query was cancelled")]
    Cancelled,

    /// Operation not valid in the cursor's current state
    #[error("Invalid cursor state: {0}")]
    InvalidState(String),
}

/// Errors raised by positional scans, always caused by the caller.
#[derive(Error, Debug)]
pub enum ScanError {
    /// Destination count differs from the row's field count
    #[error("Can't scan into {expected} destinations with input of length {actual}")]
    ArityMismatch { expected: usize, actual: usize },

    /// A destination slot has a type the scanner does not fill
    #[error("Can't scan into destination {index} of type {type_name}")]
    UnsupportedType {
        index: usize,
        type_name: &'static str,
    },
}

/// Errors related to data type conversion.
#[derive(Error, Debug)]
pub enum ConversionError {
    /// The schema reports a column type this driver does not know
    #[error("Unsupported column type: {column_type}")]
    UnsupportedColumnType { column_type: String },

    /// Failed to convert a raw field
    #[error("Failed to convert '{value}' to {target}: {message}")]
    ValueConversionFailed {
        value: String,
        target: String,
        message: String,
    },

    /// Row shape does not match the cached schema
    #[error("Schema mismatch: {0}")]
    SchemaMismatch(String),

    /// Arrow error
    #[error("Arrow error: {0}")]
    ArrowError(String),
}

/// Errors related to the RPC transport.
#[derive(Error, Debug)]
pub enum TransportError {
    /// The remote procedure call failed
    #[error("RPC '{operation}' failed: {message}")]
    Rpc {
        operation: &'static str,
        message: String,
    },

    /// Network I/O error
    #[error("Network I/O error: {0}")]
    IoError(String),

    /// Call did not complete in time
    #[error("Transport timeout after {timeout_ms}ms")]
    Timeout { timeout_ms: u64 },

    /// Transport has already been released
    #[error("Transport is not connected")]
    Disconnected,

    /// Invalid response from server
    #[error("Invalid server response: {0}")]
    InvalidResponse(String),
}

/// Coarse error classification for callers that only branch on category.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// RPC or network failure
    Transport,
    /// Remote job failed
    Execution,
    /// Operation invalid for the current state
    InvalidState,
    /// Caller passed bad arguments
    InvalidArgument,
    /// Value or schema could not be converted
    Conversion,
    /// Operation was cancelled
    Cancelled,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorKind::Transport => write!(f, "TRANSPORT"),
            ErrorKind::Execution => write!(f, "EXECUTION"),
            ErrorKind::InvalidState => write!(f, "INVALID_STATE"),
            ErrorKind::InvalidArgument => write!(f, "INVALID_ARGUMENT"),
            ErrorKind::Conversion => write!(f, "CONVERSION"),
            ErrorKind::Cancelled => write!(f, "CANCELLED"),
        }
    }
}

impl DriverError {
    /// Classify the error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            DriverError::Connection(e) => e.kind(),
            DriverError::Query(e) => e.kind(),
            DriverError::Scan(_) => ErrorKind::InvalidArgument,
            DriverError::Conversion(_) => ErrorKind::Conversion,
            DriverError::Transport(_) => ErrorKind::Transport,
        }
    }
}

impl ConnectionError {
    /// Classify the error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            ConnectionError::ConnectionClosed => ErrorKind::InvalidState,
            _ => ErrorKind::InvalidArgument,
        }
    }
}

impl QueryError {
    /// Classify the error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            QueryError::ExecutionFailed { .. } => ErrorKind::Execution,
            QueryError::Cancelled => ErrorKind::Cancelled,
            QueryError::NoCurrentRow | QueryError::InvalidState(_) => ErrorKind::InvalidState,
        }
    }
}

impl From<arrow::error::ArrowError> for ConversionError {
    fn from(err: arrow::error::ArrowError) -> Self {
        ConversionError::ArrowError(err.to_string())
    }
}

impl From<std::io::Error> for TransportError {
    fn from(err: std::io::Error) -> Self {
        TransportError::IoError(err.to_string())
    }
}
