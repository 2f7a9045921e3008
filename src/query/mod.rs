//! Result consumption for submitted queries.
//!
//! # Overview
//!
//! The query module is organized into:
//! - `results` - the [`ResultCursor`] that waits for a job and streams its rows
//! - `scan` - positional decoding of a row into typed destinations
//! - `status` - job status snapshots returned by polling
//!
//! # Example
//!
//! ```no_run
//! use beeswax_rs::QuerySession;
//! use beeswax_rs::transport::BeeswaxClient;
//!
//! # async fn example(client: impl BeeswaxClient + 'static) -> Result<(), Box<dyn std::error::Error>> {
//! let mut session = QuerySession::new(client, Default::default())?;
//! let mut cursor = session.submit("SELECT id, name FROM users").await?;
//!
//! println!("columns: {:?}", cursor.columns().await);
//!
//! while cursor.advance().await {
//!     let mut id = 0i64;
//!     let mut name = String::new();
//!     cursor.scan_into(&mut [&mut id, &mut name])?;
//!     println!("{id}: {name}");
//! }
//!
//! session.close().await?;
//! # Ok(())
//! # }
//! ```

pub mod results;
pub mod scan;
pub mod status;

pub use results::{CursorState, ResultCursor};
pub use scan::{scan_row, ScanSlot};
pub use status::QueryStatus;
