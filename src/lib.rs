//! # beeswax-rs
//!
//! Async client driver for SQL services with a handle-based job model.
//!
//! A query is submitted and answered with an opaque handle; the client then
//! polls the job until it finishes and pages through the results. This crate
//! implements that lifecycle on top of any RPC client that implements
//! [`transport::BeeswaxClient`]: a [`QuerySession`] submits queries and a
//! [`ResultCursor`] waits for the job, caches its column schema and streams
//! rows with typed decoding.
//!
//! ## Example
//!
//! ```no_run
//! # use beeswax_rs::*;
//! # use beeswax_rs::transport::BeeswaxClient;
//! # async fn example(client: impl BeeswaxClient + 'static) -> Result<(), Box<dyn std::error::Error>> {
//! let params: ConnectionParams = "beeswax://localhost:21000?batch_size=1000".parse()?;
//! let mut session = QuerySession::with_params(client, &params)?;
//!
//! // Submit a query; the cursor waits for the job on first use
//! let mut cursor = session.submit("SELECT name, visits FROM pages").await?;
//!
//! while cursor.advance().await {
//!     let mut row = Row::new();
//!     cursor.map_scan(&mut row)?;
//!     println!("{:?}", row);
//! }
//!
//! // Or export as Arrow
//! let mut cursor = session.submit("SELECT name, visits FROM pages").await?;
//! while let Some(batch) = cursor.next_record_batch().await? {
//!     println!("Rows: {}", batch.num_rows());
//! }
//!
//! // Close session, cancelling the bound job
//! session.close().await?;
//! # Ok(())
//! # }
//! ```

// Module declarations
pub mod arrow_conversion;
pub mod connection;
pub mod error;
pub mod query;
pub mod transport;
pub mod types;

// Re-export public API
pub use arrow_conversion::ArrowConverter;
pub use connection::{ConnectionBuilder, ConnectionParams, QuerySession, ScanMode, SessionOptions};
pub use error::{
    ConnectionError, ConversionError, DriverError, ErrorKind, QueryError, ScanError,
    TransportError,
};
pub use query::{CursorState, QueryStatus, ResultCursor, ScanSlot};
pub use transport::{QueryHandle, QueryState};
pub use types::{convert_raw_value, ColumnSchema, ColumnType, Row, TypeMapper, Value};
