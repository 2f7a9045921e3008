//! Common test utilities for beeswax-rs integration tests.
//!
//! The tests drive a [`ScriptedClient`], an in-memory `BeeswaxClient` that
//! replays a fixed sequence of job states and result pages and records every
//! call it receives. No query service is needed.

#![allow(dead_code)]

use async_trait::async_trait;
use beeswax_rs::error::TransportError;
use beeswax_rs::transport::{
    BeeswaxClient, CancelStatus, FieldSchema, Query, QueryHandle, QueryState, ResultBatch,
    ResultsMetadata,
};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

// ============================================================================
// Call Recording
// ============================================================================

/// Calls received by a [`ScriptedClient`].
#[derive(Debug, Default)]
pub struct CallLog {
    pub queries: Vec<Query>,
    pub polls: usize,
    pub fetches: Vec<(bool, i32)>,
    pub metadata_requests: usize,
    pub cancels: Vec<QueryHandle>,
    pub closes: usize,
}

pub type SharedLog = Arc<Mutex<CallLog>>;

// ============================================================================
// Scripted Client
// ============================================================================

/// In-memory client that replays scripted responses.
///
/// Job states are returned in order and the last one repeats. Result pages
/// are returned in order; once they run out, an empty final page is served.
pub struct ScriptedClient {
    states: VecDeque<QueryState>,
    pages: VecDeque<ResultBatch>,
    metadata: ResultsMetadata,
    fail_fetch_at: Option<usize>,
    next_handle: usize,
    connected: bool,
    log: SharedLog,
}

impl ScriptedClient {
    /// Client whose jobs finish immediately with the given columns.
    pub fn new(columns: &[(&str, &str)]) -> Self {
        Self {
            states: VecDeque::from(vec![QueryState::Finished]),
            pages: VecDeque::new(),
            metadata: metadata(columns),
            fail_fetch_at: None,
            next_handle: 0,
            connected: true,
            log: SharedLog::default(),
        }
    }

    /// Replace the sequence of job states.
    pub fn with_states(mut self, states: &[QueryState]) -> Self {
        self.states = states.iter().copied().collect();
        self
    }

    /// Append a page of tab-delimited rows.
    pub fn with_page(mut self, rows: &[&str], has_more: bool) -> Self {
        self.pages.push_back(ResultBatch::new(
            rows.iter().map(|r| r.to_string()).collect(),
            has_more,
        ));
        self
    }

    /// Fail the `n`-th fetch call (zero-based).
    pub fn failing_fetch_at(mut self, n: usize) -> Self {
        self.fail_fetch_at = Some(n);
        self
    }

    /// Handle to the call log, valid after the client is moved into a session.
    pub fn log(&self) -> SharedLog {
        Arc::clone(&self.log)
    }
}

#[async_trait]
impl BeeswaxClient for ScriptedClient {
    async fn query(&mut self, query: &Query) -> Result<QueryHandle, TransportError> {
        if !self.connected {
            return Err(TransportError::Disconnected);
        }
        self.log.lock().unwrap().queries.push(query.clone());
        self.next_handle += 1;
        Ok(QueryHandle::new(
            format!("job-{}", self.next_handle),
            "scripted",
        ))
    }

    async fn get_state(&mut self, _handle: &QueryHandle) -> Result<QueryState, TransportError> {
        self.log.lock().unwrap().polls += 1;
        let state = if self.states.len() > 1 {
            self.states.pop_front()
        } else {
            self.states.front().copied()
        };
        Ok(state.unwrap_or(QueryState::Finished))
    }

    async fn fetch(
        &mut self,
        _handle: &QueryHandle,
        start_over: bool,
        max_rows: i32,
    ) -> Result<ResultBatch, TransportError> {
        let call = {
            let mut log = self.log.lock().unwrap();
            log.fetches.push((start_over, max_rows));
            log.fetches.len() - 1
        };
        if self.fail_fetch_at == Some(call) {
            return Err(TransportError::IoError("connection reset by peer".to_string()));
        }
        Ok(self
            .pages
            .pop_front()
            .unwrap_or_else(|| ResultBatch::new(Vec::new(), false)))
    }

    async fn get_results_metadata(
        &mut self,
        _handle: &QueryHandle,
    ) -> Result<ResultsMetadata, TransportError> {
        self.log.lock().unwrap().metadata_requests += 1;
        Ok(self.metadata.clone())
    }

    async fn cancel(&mut self, handle: &QueryHandle) -> Result<CancelStatus, TransportError> {
        self.log.lock().unwrap().cancels.push(handle.clone());
        Ok(CancelStatus::ok())
    }

    async fn close(&mut self) -> Result<(), TransportError> {
        self.log.lock().unwrap().closes += 1;
        self.connected = false;
        Ok(())
    }

    fn is_connected(&self) -> bool {
        self.connected
    }
}

// ============================================================================
// Helpers
// ============================================================================

/// Build result metadata from `(name, type)` pairs.
pub fn metadata(columns: &[(&str, &str)]) -> ResultsMetadata {
    ResultsMetadata::new(
        columns
            .iter()
            .map(|(name, type_name)| FieldSchema::new(*name, *type_name))
            .collect(),
    )
}

/// Route driver logs to the test output; set `RUST_LOG` to see them.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}
