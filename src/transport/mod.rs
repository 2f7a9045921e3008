//! Transport layer boundary.
//!
//! The driver talks to the query service through the [`BeeswaxClient`] trait.
//! Socket setup, authentication and wire encoding live in the client
//! implementation; this module only defines the calls and the decoded
//! message types.
//!
//! # Architecture
//!
//! - `protocol` - RPC client trait definition
//! - `messages` - Request and response types

pub mod messages;
pub mod protocol;

// Re-export commonly used types
pub use messages::{
    CancelStatus, FieldSchema, Query, QueryHandle, QueryState, ResultBatch, ResultsMetadata,
    FIELD_DELIMITER,
};
pub use protocol::BeeswaxClient;
