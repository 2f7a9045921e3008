//! Job status returned by polling.

use crate::transport::messages::QueryState;

/// Snapshot of a job's state from a single poll.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QueryStatus {
    state: QueryState,
}

impl QueryStatus {
    /// Create a status from a polled state.
    pub fn new(state: QueryState) -> Self {
        Self { state }
    }

    /// The polled state.
    pub fn state(&self) -> QueryState {
        self.state
    }

    /// The job reached a terminal state.
    pub fn is_complete(&self) -> bool {
        self.state.is_terminal()
    }

    /// The job is not in the failure-terminal state.
    pub fn is_success(&self) -> bool {
        self.state.is_success()
    }
}
