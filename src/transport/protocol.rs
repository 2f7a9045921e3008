//! RPC client abstraction trait.
//!
//! This module defines the `BeeswaxClient` trait that abstracts the underlying
//! RPC client. The driver never encodes requests itself; any client that can
//! issue these calls over an already-open transport plugs in here.

use crate::error::TransportError;
use async_trait::async_trait;

use super::messages::{CancelStatus, Query, QueryHandle, QueryState, ResultBatch, ResultsMetadata};

/// Already-connected RPC client for a handle-based query service.
///
/// Calls on one handle must not overlap; the driver serialises them by
/// keeping the client behind a mutex.
#[async_trait]
pub trait BeeswaxClient: Send + Sync {
    /// Submit a query.
    ///
    /// # Returns
    ///
    /// The handle identifying the new job.
    ///
    /// # Errors
    ///
    /// Returns `TransportError` if the call fails.
    async fn query(&mut self, query: &Query) -> Result<QueryHandle, TransportError>;

    /// Fetch the current state of a job.
    ///
    /// # Errors
    ///
    /// Returns `TransportError` if the call fails.
    async fn get_state(&mut self, handle: &QueryHandle) -> Result<QueryState, TransportError>;

    /// Fetch the next page of rows.
    ///
    /// # Arguments
    ///
    /// * `handle` - Job handle
    /// * `start_over` - Restart from the first row
    /// * `max_rows` - Page size hint
    ///
    /// # Errors
    ///
    /// Returns `TransportError` if the call fails.
    async fn fetch(
        &mut self,
        handle: &QueryHandle,
        start_over: bool,
        max_rows: i32,
    ) -> Result<ResultBatch, TransportError>;

    /// Fetch the column schema of a finished job.
    ///
    /// # Errors
    ///
    /// Returns `TransportError` if the call fails.
    async fn get_results_metadata(
        &mut self,
        handle: &QueryHandle,
    ) -> Result<ResultsMetadata, TransportError>;

    /// Cancel a job.
    ///
    /// # Errors
    ///
    /// Returns `TransportError` if the call fails.
    async fn cancel(&mut self, handle: &QueryHandle) -> Result<CancelStatus, TransportError>;

    /// Release the transport.
    async fn close(&mut self) -> Result<(), TransportError>;

    /// Check if the transport is still open.
    fn is_connected(&self) -> bool;
}
