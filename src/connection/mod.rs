//! Session management for Beeswax-style query services.
//!
//! This module provides connection parameter parsing and the [`QuerySession`]
//! that owns the RPC client and the job it is bound to.
//!
//! # Example
//!
//! ```no_run
//! # use beeswax_rs::connection::{ConnectionBuilder, ConnectionParams};
//! # use std::str::FromStr;
//! # fn example() -> Result<(), Box<dyn std::error::Error>> {
//! // Using ConnectionBuilder
//! let params = ConnectionBuilder::new()
//!     .host("impala.internal")
//!     .port(21000)
//!     .poll_interval(std::time::Duration::from_millis(250))
//!     .batch_size(5_000)
//!     .build()?;
//!
//! // Or parse from connection string
//! let params = ConnectionParams::from_str(
//!     "beeswax://impala.internal:21000?poll_interval_ms=250&batch_size=5000"
//! )?;
//! # Ok(())
//! # }
//! ```

pub mod params;
pub mod session;

pub use params::{ConnectionBuilder, ConnectionParams, ScanMode, SessionOptions};
pub use session::{QuerySession, SessionState};
