//! Query session over one RPC client.
//!
//! A session binds at most one job handle at a time. Submitting a new query
//! or attaching to a stored handle replaces the binding, and closing the
//! session cancels the bound job and invalidates every cursor it created.

use crate::connection::params::{ConnectionParams, SessionOptions};
use crate::error::{ConnectionError, DriverError, TransportError};
use crate::query::ResultCursor;
use crate::transport::messages::{Query, QueryHandle};
use crate::transport::BeeswaxClient;
use std::sync::Arc;
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

/// Job binding of a session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionState {
    /// No job handle is held
    Idle,

    /// A job handle is held
    Bound(QueryHandle),

    /// The session is closed
    Closed,
}

impl SessionState {
    /// Check if the session is closed.
    pub fn is_closed(&self) -> bool {
        matches!(self, SessionState::Closed)
    }

    /// The bound handle, if any.
    pub fn handle(&self) -> Option<&QueryHandle> {
        match self {
            SessionState::Bound(handle) => Some(handle),
            _ => None,
        }
    }
}

/// Connection-level entry point for running queries.
///
/// # Example
///
/// ```no_run
/// use beeswax_rs::{QuerySession, SessionOptions};
/// use beeswax_rs::transport::BeeswaxClient;
/// use std::time::Duration;
///
/// # async fn example(client: impl BeeswaxClient + 'static) -> Result<(), Box<dyn std::error::Error>> {
/// let options = SessionOptions::default().with_poll_interval(Duration::from_millis(250));
/// let mut session = QuerySession::new(client, options)?;
///
/// let mut cursor = session.submit("SELECT count(*) FROM events").await?;
/// cursor.wait_until_ready().await?;
/// let rows = cursor.fetch_all().await?;
/// println!("{} rows", rows.len());
///
/// session.close().await?;
/// # Ok(())
/// # }
/// ```
pub struct QuerySession {
    /// RPC client shared with the session's cursors
    client: Arc<Mutex<dyn BeeswaxClient>>,

    /// Options handed to each cursor
    options: SessionOptions,

    /// Current job binding
    state: SessionState,

    /// Fires on close; parent of every cursor token
    shutdown: CancellationToken,

    /// Token of the cursor for the bound job
    job_token: Option<CancellationToken>,
}

impl QuerySession {
    /// Create a session over a connected client.
    ///
    /// # Errors
    /// - `ConnectionError::ConnectionClosed` if the client is not connected
    /// - `ConnectionError::InvalidParameter` if the options are invalid
    pub fn new(
        client: impl BeeswaxClient + 'static,
        options: SessionOptions,
    ) -> Result<Self, ConnectionError> {
        if !client.is_connected() {
            return Err(ConnectionError::ConnectionClosed);
        }
        Self::from_shared(Arc::new(Mutex::new(client)), options)
    }

    /// Create a session using the options carried by connection parameters.
    pub fn with_params(
        client: impl BeeswaxClient + 'static,
        params: &ConnectionParams,
    ) -> Result<Self, ConnectionError> {
        debug!(address = %params.address(), "opening query session");
        Self::new(client, params.options.clone())
    }

    /// Create a session over a client that is already shared.
    pub fn from_shared(
        client: Arc<Mutex<dyn BeeswaxClient>>,
        options: SessionOptions,
    ) -> Result<Self, ConnectionError> {
        options.validate()?;

        Ok(Self {
            client,
            options,
            state: SessionState::Idle,
            shutdown: CancellationToken::new(),
            job_token: None,
        })
    }

    /// Current job binding.
    pub fn state(&self) -> &SessionState {
        &self.state
    }

    /// Check if the session is closed.
    pub fn is_closed(&self) -> bool {
        self.state.is_closed()
    }

    /// The bound job handle, if any.
    pub fn handle(&self) -> Option<&QueryHandle> {
        self.state.handle()
    }

    /// Session options.
    pub fn options(&self) -> &SessionOptions {
        &self.options
    }

    /// Submit a query and return a cursor over its results.
    ///
    /// The query is sent with an empty execution configuration. The returned
    /// cursor is unresolved; nothing waits for the job here. A job that is
    /// still bound is cancelled first and its cursor is invalidated.
    ///
    /// # Errors
    /// - `ConnectionError::ConnectionClosed` if the session is closed
    /// - `TransportError` if cancelling the previous job or submitting fails
    pub async fn submit(&mut self, sql: &str) -> Result<ResultCursor, DriverError> {
        self.ensure_open()?;
        self.release_job().await?;

        let query = Query::new(sql);
        let handle = {
            let mut client = self.client.lock().await;
            client.query(&query).await?
        };

        debug!(handle = %handle, "submitted query");
        Ok(self.bind(handle))
    }

    /// Bind a previously submitted job and return a cursor over it.
    ///
    /// Used with handles restored through [`QueryHandle::from_json`] to pick up
    /// a job started elsewhere. A different bound job is cancelled first.
    ///
    /// # Errors
    /// - `ConnectionError::ConnectionClosed` if the session is closed
    /// - `TransportError` if cancelling the previous job fails
    pub async fn attach(&mut self, handle: QueryHandle) -> Result<ResultCursor, DriverError> {
        self.ensure_open()?;

        if self.state.handle() == Some(&handle) {
            if let Some(token) = self.job_token.take() {
                token.cancel();
            }
        } else {
            self.release_job().await?;
        }

        debug!(handle = %handle, "attached to query");
        Ok(self.bind(handle))
    }

    /// Close the session.
    ///
    /// Signals every cursor of this session first, so a concurrent
    /// `wait_until_ready` ends with `QueryError::Cancelled`. Then cancels the
    /// bound job, if any, and releases the transport. The session is closed
    /// afterwards even when a step fails; the first failure is returned.
    /// Closing a closed session does nothing.
    pub async fn close(&mut self) -> Result<(), DriverError> {
        if self.state.is_closed() {
            return Ok(());
        }

        self.shutdown.cancel();
        self.job_token = None;

        let mut first_error: Option<DriverError> = None;

        if let SessionState::Bound(handle) =
            std::mem::replace(&mut self.state, SessionState::Idle)
        {
            if let Err(err) = self.cancel_handle(&handle).await {
                first_error.get_or_insert(err);
            }
        }

        let released = {
            let mut client = self.client.lock().await;
            client.close().await
        };
        if let Err(err) = released {
            warn!(error = %err, "failed to release transport");
            first_error.get_or_insert(err.into());
        }

        self.state = SessionState::Closed;
        debug!("query session closed");

        match first_error {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    fn ensure_open(&self) -> Result<(), ConnectionError> {
        if self.state.is_closed() {
            return Err(ConnectionError::ConnectionClosed);
        }
        Ok(())
    }

    fn bind(&mut self, handle: QueryHandle) -> ResultCursor {
        let token = self.shutdown.child_token();
        self.job_token = Some(token.clone());
        self.state = SessionState::Bound(handle.clone());

        ResultCursor::new(
            Arc::clone(&self.client),
            handle,
            self.options.clone(),
            token,
        )
    }

    /// Cancel the bound job and invalidate its cursor.
    ///
    /// The binding is dropped even when the cancel call fails.
    async fn release_job(&mut self) -> Result<(), DriverError> {
        if let Some(token) = self.job_token.take() {
            token.cancel();
        }

        match std::mem::replace(&mut self.state, SessionState::Idle) {
            SessionState::Bound(handle) => self.cancel_handle(&handle).await,
            other => {
                self.state = other;
                Ok(())
            }
        }
    }

    async fn cancel_handle(&self, handle: &QueryHandle) -> Result<(), DriverError> {
        let status = {
            let mut client = self.client.lock().await;
            client.cancel(handle).await
        };

        match status {
            Ok(status) if status.is_ok() => {
                debug!(handle = %handle, "cancelled query");
                Ok(())
            }
            Ok(status) => {
                warn!(
                    handle = %handle,
                    status_code = status.status_code,
                    "query cancel rejected"
                );
                Err(TransportError::Rpc {
                    operation: "cancel",
                    message: format!(
                        "status {}: {}",
                        status.status_code,
                        status.error_msgs.join("; ")
                    ),
                }
                .into())
            }
            Err(err) => {
                warn!(handle = %handle, error = %err, "query cancel failed");
                Err(err.into())
            }
        }
    }
}

impl Drop for QuerySession {
    fn drop(&mut self) {
        self.shutdown.cancel();
    }
}

impl std::fmt::Debug for QuerySession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QuerySession")
            .field("state", &self.state)
            .field("options", &self.options)
            .field("client", &"<BeeswaxClient>")
            .finish()
    }
}
