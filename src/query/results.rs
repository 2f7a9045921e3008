//! Result cursor over an asynchronous query job.
//!
//! A [`ResultCursor`] is bound to one job handle. It polls the job until it
//! reaches a terminal state, caches the column schema, and then streams rows
//! page by page from the service.
//!
//! ```text
//! Unresolved --poll*--> Ready --advance*--> Exhausted
//!      |                  |
//!      +-----> Failed <---+        (any state) --close--> Cancelled
//! ```

use crate::arrow_conversion::ArrowConverter;
use crate::connection::params::SessionOptions;
use crate::error::{DriverError, QueryError};
use crate::query::scan::{scan_row, ScanSlot};
use crate::query::status::QueryStatus;
use crate::transport::messages::{QueryHandle, QueryState, FIELD_DELIMITER};
use crate::transport::BeeswaxClient;
use crate::types::{ColumnSchema, Row};
use arrow::array::RecordBatch;
use std::sync::Arc;
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

/// Lifecycle state of a cursor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CursorState {
    /// Not yet known to have finished
    Unresolved,
    /// Job finished; rows may be read
    Ready,
    /// All rows have been read
    Exhausted,
    /// The job failed remotely (`Some`) or a stream operation failed (`None`)
    Failed(Option<QueryState>),
    /// The owning session was closed or the job was superseded
    Cancelled,
}

impl CursorState {
    /// No more rows will ever be produced.
    pub fn is_finished(&self) -> bool {
        matches!(
            self,
            CursorState::Exhausted | CursorState::Failed(_) | CursorState::Cancelled
        )
    }
}

/// Read position within the fetched pages.
#[derive(Debug)]
struct ReadHead {
    batch: Vec<String>,
    offset: usize,
    has_more: bool,
    current: Option<Vec<String>>,
}

impl ReadHead {
    fn new() -> Self {
        Self {
            batch: Vec::new(),
            offset: 0,
            has_more: true,
            current: None,
        }
    }

    fn batch_exhausted(&self) -> bool {
        self.offset >= self.batch.len()
    }
}

/// Pull-based cursor over the rows of one submitted query.
///
/// Cursors are created by [`QuerySession::submit`](crate::QuerySession::submit)
/// or [`QuerySession::attach`](crate::QuerySession::attach). Operations that
/// need the job to be finished (`advance`, `columns`, `fetch_all`) wait for
/// it on first use; every wait is cut short when the session closes.
pub struct ResultCursor {
    /// Client shared with the owning session
    client: Arc<Mutex<dyn BeeswaxClient>>,
    handle: QueryHandle,
    options: SessionOptions,
    /// Fires when the session closes or the job is superseded
    cancel: CancellationToken,
    state: CursorState,
    schema: Option<ColumnSchema>,
    head: ReadHead,
    arrow: Option<ArrowConverter>,
    last_error: Option<DriverError>,
}

impl std::fmt::Debug for ResultCursor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResultCursor")
            .field("handle", &self.handle)
            .field("state", &self.state)
            .field("schema", &self.schema)
            .field("client", &"<BeeswaxClient>")
            .finish()
    }
}

impl ResultCursor {
    pub(crate) fn new(
        client: Arc<Mutex<dyn BeeswaxClient>>,
        handle: QueryHandle,
        options: SessionOptions,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            client,
            handle,
            options,
            cancel,
            state: CursorState::Unresolved,
            schema: None,
            head: ReadHead::new(),
            arrow: None,
            last_error: None,
        }
    }

    /// The job handle this cursor reads from.
    pub fn handle(&self) -> &QueryHandle {
        &self.handle
    }

    /// Current lifecycle state.
    pub fn state(&self) -> CursorState {
        self.state
    }

    /// The job is known to have finished successfully.
    pub fn is_ready(&self) -> bool {
        matches!(self.state, CursorState::Ready | CursorState::Exhausted)
    }

    /// Cached schema, if it has been fetched.
    pub fn schema(&self) -> Option<&ColumnSchema> {
        self.schema.as_ref()
    }

    /// Take the error swallowed by the last failed `advance` or `columns`.
    pub fn take_error(&mut self) -> Option<DriverError> {
        self.last_error.take()
    }

    /// Check the job state with a single round trip.
    ///
    /// # Errors
    /// - `QueryError::ExecutionFailed` if the job reports `EXCEPTION`
    /// - `QueryError::Cancelled` if the session was closed
    /// - `TransportError` if the call fails
    pub async fn poll(&mut self) -> Result<QueryStatus, DriverError> {
        self.ensure_live()?;

        let state = tokio::select! {
            biased;
            _ = self.cancel.cancelled() => None,
            result = async {
                let mut client = self.client.lock().await;
                client.get_state(&self.handle).await
            } => Some(result?),
        };
        let state = match state {
            Some(state) => state,
            None => return Err(self.cancelled()),
        };

        debug!(handle = %self.handle, %state, "polled query state");

        if state == QueryState::Exception {
            self.state = CursorState::Failed(Some(state));
            return Err(QueryError::ExecutionFailed { state }.into());
        }

        Ok(QueryStatus::new(state))
    }

    /// Poll until the job reaches a terminal state.
    ///
    /// Sleeps `poll_interval` between polls. On the first successful
    /// completion the column schema is fetched and cached. The wait has no
    /// upper bound of its own; closing the session ends it with
    /// `QueryError::Cancelled`.
    ///
    /// # Errors
    /// - `QueryError::ExecutionFailed` carrying the terminal state
    /// - `QueryError::Cancelled` if the session was closed
    /// - `TransportError` if a poll or the schema fetch fails
    pub async fn wait_until_ready(&mut self) -> Result<QueryStatus, DriverError> {
        self.ensure_live()?;

        match self.state {
            CursorState::Ready | CursorState::Exhausted => {
                self.ensure_schema().await?;
                return Ok(QueryStatus::new(QueryState::Finished));
            }
            CursorState::Failed(Some(state)) => {
                return Err(QueryError::ExecutionFailed { state }.into());
            }
            CursorState::Failed(None) => {
                return Err(QueryError::InvalidState(
                    "cursor failed while streaming".to_string(),
                )
                .into());
            }
            CursorState::Cancelled => return Err(QueryError::Cancelled.into()),
            CursorState::Unresolved => {}
        }

        loop {
            // poll() moves the cursor to Failed on EXCEPTION
            let status = self.poll().await?;

            if status.is_complete() {
                debug!(handle = %self.handle, "query finished");
                self.state = CursorState::Ready;
                self.ensure_schema().await?;
                return Ok(status);
            }

            let cancelled = tokio::select! {
                biased;
                _ = self.cancel.cancelled() => true,
                _ = tokio::time::sleep(self.options.poll_interval) => false,
            };
            if cancelled {
                return Err(self.cancelled());
            }
        }
    }

    /// Move the read head to the next row.
    ///
    /// Waits for the job first if needed and fetches the next page when the
    /// current one is used up. Returns `false` at end of stream and on any
    /// failure; the error is logged and kept for [`take_error`](Self::take_error).
    /// Once `false` has been returned the cursor is finished and later calls
    /// return `false` without contacting the service.
    pub async fn advance(&mut self) -> bool {
        self.head.current = None;

        if self.state.is_finished() {
            return false;
        }

        match self.try_advance().await {
            Ok(true) => true,
            Ok(false) => {
                debug!(handle = %self.handle, "result stream exhausted");
                self.state = CursorState::Exhausted;
                false
            }
            Err(err) => {
                warn!(handle = %self.handle, error = %err, "advance failed");
                if !self.state.is_finished() {
                    self.state = CursorState::Failed(None);
                }
                self.last_error = Some(err);
                false
            }
        }
    }

    async fn try_advance(&mut self) -> Result<bool, DriverError> {
        if !self.is_ready() || self.schema.is_none() {
            self.wait_until_ready().await?;
        }
        self.ensure_live()?;

        if self.head.batch_exhausted() {
            if !self.head.has_more {
                return Ok(false);
            }

            let fetched = tokio::select! {
                biased;
                _ = self.cancel.cancelled() => None,
                result = async {
                    let mut client = self.client.lock().await;
                    client.fetch(&self.handle, false, self.options.batch_size).await
                } => Some(result?),
            };
            let batch = match fetched {
                Some(batch) => batch,
                None => return Err(self.cancelled()),
            };

            debug!(
                handle = %self.handle,
                rows = batch.len(),
                has_more = batch.has_more,
                "fetched result batch"
            );

            self.head.has_more = batch.has_more;
            self.head.batch = batch.data;
            self.head.offset = 0;

            // the has_more flag is advisory; an empty page ends the stream
            if self.head.batch.is_empty() {
                return Ok(false);
            }
        }

        let raw = &self.head.batch[self.head.offset];
        self.head.current = Some(raw.split(FIELD_DELIMITER).map(str::to_string).collect());
        self.head.offset += 1;

        Ok(true)
    }

    /// Raw fields of the current row.
    ///
    /// # Errors
    /// Returns `QueryError::NoCurrentRow` unless the last `advance` returned `true`.
    pub fn read_fields(&self) -> Result<&[String], QueryError> {
        self.head.current.as_deref().ok_or(QueryError::NoCurrentRow)
    }

    /// Decode the current row positionally into `dest`.
    ///
    /// Parse failures follow the session's [`ScanMode`](crate::ScanMode).
    ///
    /// # Errors
    /// - `QueryError::NoCurrentRow` before a successful `advance`
    /// - `ScanError::ArityMismatch` / `ScanError::UnsupportedType`
    /// - `ConversionError` in strict mode
    pub fn scan_into(&self, dest: &mut [&mut dyn ScanSlot]) -> Result<(), DriverError> {
        let fields = self.read_fields()?;
        scan_row(fields, dest, self.options.scan_mode)
    }

    /// Column names, waiting for the job if the schema is not cached yet.
    ///
    /// Returns an empty list if the job fails or the schema cannot be read.
    pub async fn columns(&mut self) -> Vec<String> {
        if self.schema.is_none() {
            if let Err(err) = self.wait_until_ready().await {
                warn!(handle = %self.handle, error = %err, "could not resolve columns");
                self.last_error = Some(err);
                return Vec::new();
            }
        }

        self.schema
            .as_ref()
            .map(ColumnSchema::names)
            .unwrap_or_default()
    }

    /// Decode the current row into `row`, keyed by column name.
    ///
    /// # Errors
    /// - `QueryError::NoCurrentRow` before a successful `advance`
    /// - `ConversionError` if a value does not convert to its declared type
    pub fn map_scan(&self, row: &mut Row) -> Result<(), DriverError> {
        let fields = self.read_fields()?;
        let schema = self
            .schema
            .as_ref()
            .ok_or_else(|| QueryError::InvalidState("schema not loaded".to_string()))?;
        schema.decode_row(fields, row)?;
        Ok(())
    }

    /// Read every remaining row, converting each by the column schema.
    ///
    /// All rows are held in memory, so this is meant for bounded results.
    ///
    /// # Errors
    /// Returns the first conversion error, or the error that ended the stream
    /// early.
    pub async fn fetch_all(&mut self) -> Result<Vec<Row>, DriverError> {
        // rows cannot be converted without a schema, so resolve it before reading
        if !self.state.is_finished() {
            self.wait_until_ready().await?;
        }

        let mut rows = Vec::new();

        while self.advance().await {
            let mut row = Row::new();
            self.map_scan(&mut row)?;
            rows.push(row);
        }

        self.stream_result()?;
        Ok(rows)
    }

    /// Read up to `batch_size` remaining rows as an Arrow RecordBatch.
    ///
    /// Returns `None` once the stream is exhausted. Rows consumed here are no
    /// longer available through `read_fields`.
    ///
    /// # Errors
    /// Returns `ConversionError` if the schema has no Arrow mapping or a value
    /// does not parse, or the error that ended the stream early.
    pub async fn next_record_batch(&mut self) -> Result<Option<RecordBatch>, DriverError> {
        if !self.state.is_finished() {
            self.wait_until_ready().await?;
        }

        if self.arrow.is_none() {
            if let Some(schema) = &self.schema {
                self.arrow = Some(ArrowConverter::new(schema)?);
            }
        }

        let limit = self.options.batch_size.max(1) as usize;
        let mut rows = Vec::new();
        while rows.len() < limit && self.advance().await {
            if let Some(row) = self.head.current.take() {
                rows.push(row);
            }
        }

        if rows.is_empty() {
            self.stream_result()?;
            return Ok(None);
        }

        let converter = self
            .arrow
            .as_ref()
            .ok_or_else(|| QueryError::InvalidState("schema not loaded".to_string()))?;
        Ok(Some(converter.convert_rows(&rows)?))
    }

    /// Fetch and cache the schema if it is missing.
    async fn ensure_schema(&mut self) -> Result<(), DriverError> {
        if self.schema.is_some() {
            return Ok(());
        }

        let metadata = tokio::select! {
            biased;
            _ = self.cancel.cancelled() => None,
            result = async {
                let mut client = self.client.lock().await;
                client.get_results_metadata(&self.handle).await
            } => Some(result?),
        };
        let metadata = match metadata {
            Some(metadata) => metadata,
            None => return Err(self.cancelled()),
        };

        debug!(
            handle = %self.handle,
            columns = metadata.field_schemas.len(),
            "cached result schema"
        );
        self.schema = Some(ColumnSchema::from(metadata));
        Ok(())
    }

    fn ensure_live(&mut self) -> Result<(), DriverError> {
        if self.cancel.is_cancelled() {
            return Err(self.cancelled());
        }
        Ok(())
    }

    fn cancelled(&mut self) -> DriverError {
        debug!(handle = %self.handle, "cursor cancelled");
        self.state = CursorState::Cancelled;
        QueryError::Cancelled.into()
    }

    /// Error for a stream that stopped for a reason other than exhaustion.
    fn stream_result(&mut self) -> Result<(), DriverError> {
        match self.state {
            CursorState::Failed(state) => Err(self.last_error.take().unwrap_or_else(|| {
                match state {
                    Some(state) => QueryError::ExecutionFailed { state }.into(),
                    None => QueryError::InvalidState("cursor failed while streaming".to_string())
                        .into(),
                }
            })),
            CursorState::Cancelled => {
                self.last_error = None;
                Err(QueryError::Cancelled.into())
            }
            _ => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::connection::params::ScanMode;
    use crate::error::{ConversionError, ScanError, TransportError};
    use crate::transport::messages::{
        CancelStatus, FieldSchema, Query, ResultBatch, ResultsMetadata,
    };
    use crate::types::Value;
    use async_trait::async_trait;
    use mockall::mock;
    use std::time::Duration;

    mock! {
        pub Client {}

        #[async_trait]
        impl BeeswaxClient for Client {
            async fn query(&mut self, query: &Query) -> Result<QueryHandle, TransportError>;
            async fn get_state(&mut self, handle: &QueryHandle) -> Result<QueryState, TransportError>;
            async fn fetch(&mut self, handle: &QueryHandle, start_over: bool, max_rows: i32) -> Result<ResultBatch, TransportError>;
            async fn get_results_metadata(&mut self, handle: &QueryHandle) -> Result<ResultsMetadata, TransportError>;
            async fn cancel(&mut self, handle: &QueryHandle) -> Result<CancelStatus, TransportError>;
            async fn close(&mut self) -> Result<(), TransportError>;
            fn is_connected(&self) -> bool;
        }
    }

    fn options() -> SessionOptions {
        SessionOptions::default().with_poll_interval(Duration::from_millis(1))
    }

    fn cursor_with(mock: MockClient, options: SessionOptions) -> ResultCursor {
        let client: Arc<Mutex<dyn BeeswaxClient>> = Arc::new(Mutex::new(mock));
        ResultCursor::new(
            client,
            QueryHandle::new("q-1", "ctx"),
            options,
            CancellationToken::new(),
        )
    }

    fn cursor(mock: MockClient) -> ResultCursor {
        cursor_with(mock, options())
    }

    fn metadata() -> ResultsMetadata {
        ResultsMetadata::new(vec![
            FieldSchema::new("id", "bigint"),
            FieldSchema::new("name", "string"),
        ])
    }

    fn expect_finished(mock: &mut MockClient) {
        mock.expect_get_state()
            .times(1)
            .returning(|_| Ok(QueryState::Finished));
        mock.expect_get_results_metadata()
            .times(1)
            .returning(|_| Ok(metadata()));
    }

    fn batch(rows: &[&str], has_more: bool) -> ResultBatch {
        ResultBatch::new(rows.iter().map(|r| r.to_string()).collect(), has_more)
    }

    #[tokio::test]
    async fn test_wait_polls_until_finished() {
        let mut mock = MockClient::new();
        let mut states = vec![QueryState::Running, QueryState::Running, QueryState::Finished]
            .into_iter();
        mock.expect_get_state()
            .times(3)
            .returning(move |_| Ok(states.next().unwrap()));
        mock.expect_get_results_metadata()
            .times(1)
            .returning(|_| Ok(metadata()));

        let mut cursor = cursor(mock);
        let status = cursor.wait_until_ready().await.unwrap();

        assert!(status.is_complete());
        assert!(status.is_success());
        assert_eq!(cursor.state(), CursorState::Ready);

        // second wait is answered from cache
        cursor.wait_until_ready().await.unwrap();
    }

    #[tokio::test]
    async fn test_poll_is_single_round_trip() {
        let mut mock = MockClient::new();
        mock.expect_get_state()
            .times(1)
            .returning(|_| Ok(QueryState::Compiled));

        let mut cursor = cursor(mock);
        let status = cursor.poll().await.unwrap();

        assert_eq!(status.state(), QueryState::Compiled);
        assert!(!status.is_complete());
        assert_eq!(cursor.state(), CursorState::Unresolved);
    }

    #[tokio::test]
    async fn test_exception_fails_and_stops_rpcs() {
        let mut mock = MockClient::new();
        mock.expect_get_state()
            .times(1)
            .returning(|_| Ok(QueryState::Exception));
        mock.expect_fetch().never();
        mock.expect_get_results_metadata().never();

        let mut cursor = cursor(mock);
        let err = cursor.wait_until_ready().await.unwrap_err();

        assert!(matches!(
            err,
            DriverError::Query(QueryError::ExecutionFailed {
                state: QueryState::Exception
            })
        ));
        assert_eq!(cursor.state(), CursorState::Failed(Some(QueryState::Exception)));

        assert!(!cursor.advance().await);
        assert!(!cursor.advance().await);
        assert!(cursor.columns().await.is_empty());
    }

    #[tokio::test]
    async fn test_poll_transport_error_is_surfaced() {
        let mut mock = MockClient::new();
        mock.expect_get_state().times(1).returning(|_| {
            Err(TransportError::Rpc {
                operation: "get_state",
                message: "connection reset".to_string(),
            })
        });

        let mut cursor = cursor(mock);
        let err = cursor.wait_until_ready().await.unwrap_err();
        assert!(matches!(err, DriverError::Transport(_)));
    }

    #[tokio::test]
    async fn test_rows_across_batches_in_order() {
        let mut mock = MockClient::new();
        expect_finished(&mut mock);
        let mut pages = vec![
            batch(&["1\talice", "2\tbob"], true),
            batch(&["3\tcarol"], false),
        ]
        .into_iter();
        mock.expect_fetch()
            .times(2)
            .withf(|_, start_over, max_rows| !*start_over && *max_rows == 10_000)
            .returning(move |_, _, _| Ok(pages.next().unwrap()));

        let mut cursor = cursor(mock);
        let mut seen = Vec::new();
        while cursor.advance().await {
            seen.push(cursor.read_fields().unwrap().to_vec());
        }

        assert_eq!(
            seen,
            vec![
                vec!["1".to_string(), "alice".to_string()],
                vec!["2".to_string(), "bob".to_string()],
                vec!["3".to_string(), "carol".to_string()],
            ]
        );
        assert_eq!(cursor.state(), CursorState::Exhausted);

        // sticky: no further fetch (times(2) above)
        assert!(!cursor.advance().await);
        assert!(cursor.take_error().is_none());
    }

    #[tokio::test]
    async fn test_empty_batch_ends_stream_despite_has_more() {
        let mut mock = MockClient::new();
        expect_finished(&mut mock);
        let mut pages = vec![batch(&["1\ta", "2\tb"], true), batch(&[], true)].into_iter();
        mock.expect_fetch()
            .times(2)
            .returning(move |_, _, _| Ok(pages.next().unwrap()));

        let mut cursor = cursor(mock);
        assert!(cursor.advance().await);
        assert!(cursor.advance().await);
        assert!(!cursor.advance().await);
        assert!(!cursor.advance().await);
    }

    #[tokio::test]
    async fn test_fetch_failure_is_false_and_sticky() {
        let mut mock = MockClient::new();
        expect_finished(&mut mock);
        mock.expect_fetch().times(1).returning(|_, _, _| {
            Err(TransportError::IoError("broken pipe".to_string()))
        });

        let mut cursor = cursor(mock);
        assert!(!cursor.advance().await);
        assert_eq!(cursor.state(), CursorState::Failed(None));
        assert!(matches!(
            cursor.take_error(),
            Some(DriverError::Transport(TransportError::IoError(_)))
        ));
        assert!(!cursor.advance().await);
    }

    #[tokio::test]
    async fn test_read_fields_requires_current_row() {
        let mut mock = MockClient::new();
        expect_finished(&mut mock);
        mock.expect_fetch()
            .times(1)
            .returning(|_, _, _| Ok(batch(&["x"], false)));

        let mut cursor = cursor(mock);
        assert!(matches!(cursor.read_fields(), Err(QueryError::NoCurrentRow)));

        assert!(cursor.advance().await);
        assert_eq!(cursor.read_fields().unwrap(), &["x".to_string()]);

        assert!(!cursor.advance().await);
        assert!(matches!(cursor.read_fields(), Err(QueryError::NoCurrentRow)));
    }

    #[tokio::test]
    async fn test_columns_cached_before_and_after_advance() {
        let mut mock = MockClient::new();
        expect_finished(&mut mock);
        mock.expect_fetch()
            .times(1)
            .returning(|_, _, _| Ok(batch(&["1\ta"], false)));

        let mut cursor = cursor(mock);
        let before = cursor.columns().await;
        assert!(cursor.advance().await);
        let after = cursor.columns().await;

        assert_eq!(before, vec!["id", "name"]);
        assert_eq!(before, after);
    }

    #[tokio::test]
    async fn test_scan_into_current_row() {
        let mut mock = MockClient::new();
        expect_finished(&mut mock);
        mock.expect_fetch()
            .times(1)
            .returning(|_, _, _| Ok(batch(&["42\tdeep thought"], false)));

        let mut cursor = cursor(mock);
        let mut id = 0i64;
        let mut name = String::new();
        assert!(matches!(
            cursor.scan_into(&mut [&mut id, &mut name]),
            Err(DriverError::Query(QueryError::NoCurrentRow))
        ));

        assert!(cursor.advance().await);
        cursor.scan_into(&mut [&mut id, &mut name]).unwrap();
        assert_eq!(id, 42);
        assert_eq!(name, "deep thought");

        let mut extra = 0i32;
        let err = cursor
            .scan_into(&mut [&mut id, &mut name, &mut extra])
            .unwrap_err();
        assert!(matches!(err, DriverError::Scan(ScanError::ArityMismatch { .. })));
        assert_eq!(id, 42);
        assert_eq!(extra, 0);
    }

    #[tokio::test]
    async fn test_strict_scan_mode() {
        let mut mock = MockClient::new();
        expect_finished(&mut mock);
        mock.expect_fetch()
            .times(1)
            .returning(|_, _, _| Ok(batch(&["oops"], false)));

        let mut cursor = cursor_with(mock, options().with_scan_mode(ScanMode::Strict));
        assert!(cursor.advance().await);

        let mut n = 7i32;
        let err = cursor.scan_into(&mut [&mut n]).unwrap_err();
        assert!(matches!(err, DriverError::Conversion(_)));
        assert_eq!(n, 7);
    }

    #[tokio::test]
    async fn test_fetch_all_converts_by_schema() {
        let mut mock = MockClient::new();
        expect_finished(&mut mock);
        let mut pages = vec![batch(&["1\talice"], true), batch(&["1234567890123\tbob"], false)]
            .into_iter();
        mock.expect_fetch()
            .times(2)
            .returning(move |_, _, _| Ok(pages.next().unwrap()));

        let mut cursor = cursor(mock);
        let rows = cursor.fetch_all().await.unwrap();

        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0]["id"], Value::Int64(1));
        assert_eq!(rows[1]["id"], Value::Int64(1_234_567_890_123));
        assert_eq!(rows[1]["name"], Value::Text("bob".to_string()));
    }

    #[tokio::test]
    async fn test_fetch_all_propagates_conversion_error() {
        let mut mock = MockClient::new();
        expect_finished(&mut mock);
        mock.expect_fetch()
            .times(1)
            .returning(|_, _, _| Ok(batch(&["not-a-number\talice"], false)));

        let mut cursor = cursor(mock);
        let err = cursor.fetch_all().await.unwrap_err();
        assert!(matches!(
            err,
            DriverError::Conversion(ConversionError::ValueConversionFailed { .. })
        ));
    }

    #[tokio::test]
    async fn test_fetch_all_reports_failed_job() {
        let mut mock = MockClient::new();
        mock.expect_get_state()
            .times(1)
            .returning(|_| Ok(QueryState::Exception));

        let mut cursor = cursor(mock);
        let err = cursor.fetch_all().await.unwrap_err();
        assert!(matches!(
            err,
            DriverError::Query(QueryError::ExecutionFailed { .. })
        ));
    }

    #[tokio::test]
    async fn test_map_scan_current_row() {
        let mut mock = MockClient::new();
        expect_finished(&mut mock);
        mock.expect_fetch()
            .times(1)
            .returning(|_, _, _| Ok(batch(&["9\tzed"], false)));

        let mut cursor = cursor(mock);
        assert!(cursor.advance().await);

        let mut row = Row::new();
        cursor.map_scan(&mut row).unwrap();
        assert_eq!(row.get("id"), Some(&Value::Int64(9)));
        assert_eq!(row.get("name"), Some(&Value::Text("zed".to_string())));
    }

    #[tokio::test]
    async fn test_record_batches() {
        let mut mock = MockClient::new();
        expect_finished(&mut mock);
        let mut pages = vec![batch(&["1\ta", "2\tb", "3\tc"], false)].into_iter();
        mock.expect_fetch()
            .times(1)
            .returning(move |_, _, _| Ok(pages.next().unwrap()));

        let mut cursor = cursor_with(mock, options().with_batch_size(2));
        let first = cursor.next_record_batch().await.unwrap().unwrap();
        let second = cursor.next_record_batch().await.unwrap().unwrap();

        assert_eq!(first.num_rows(), 2);
        assert_eq!(second.num_rows(), 1);
        assert_eq!(first.schema().field(0).name(), "id");
        assert!(cursor.next_record_batch().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_record_batch_retries_missing_schema() {
        let mut mock = MockClient::new();
        mock.expect_get_state()
            .times(1)
            .returning(|_| Ok(QueryState::Finished));
        let mut calls = 0;
        mock.expect_get_results_metadata()
            .times(2)
            .returning(move |_| {
                calls += 1;
                if calls == 1 {
                    Err(TransportError::Disconnected)
                } else {
                    Ok(metadata())
                }
            });
        mock.expect_fetch()
            .times(1)
            .returning(|_, _, _| Ok(batch(&["1\ta", "2\tb", "3\tc"], false)));

        let mut cursor = cursor(mock);
        let err = cursor.wait_until_ready().await.unwrap_err();
        assert!(matches!(err, DriverError::Transport(TransportError::Disconnected)));
        assert!(cursor.schema().is_none());

        let batch = cursor.next_record_batch().await.unwrap().unwrap();
        assert_eq!(batch.num_rows(), 3);
        assert!(cursor.next_record_batch().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_fetch_all_keeps_rows_when_schema_unavailable() {
        let mut mock = MockClient::new();
        mock.expect_get_state()
            .times(1)
            .returning(|_| Ok(QueryState::Finished));
        mock.expect_get_results_metadata()
            .times(2)
            .returning(|_| Err(TransportError::Disconnected));
        mock.expect_fetch().never();

        let mut cursor = cursor(mock);
        assert!(cursor.wait_until_ready().await.is_err());

        let err = cursor.fetch_all().await.unwrap_err();
        assert!(matches!(err, DriverError::Transport(TransportError::Disconnected)));
        assert_eq!(cursor.state(), CursorState::Ready);
    }

    #[tokio::test]
    async fn test_cancel_interrupts_wait() {
        let mut mock = MockClient::new();
        mock.expect_get_state()
            .returning(|_| Ok(QueryState::Running));

        let token = CancellationToken::new();
        let client: Arc<Mutex<dyn BeeswaxClient>> = Arc::new(Mutex::new(mock));
        let mut cursor = ResultCursor::new(
            client,
            QueryHandle::new("q-1", "ctx"),
            SessionOptions::default().with_poll_interval(Duration::from_secs(3600)),
            token.clone(),
        );

        let canceller = tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            token.cancel();
        });

        let err = cursor.wait_until_ready().await.unwrap_err();
        assert!(matches!(err, DriverError::Query(QueryError::Cancelled)));
        assert_eq!(cursor.state(), CursorState::Cancelled);
        assert!(!cursor.advance().await);

        canceller.await.unwrap();
    }
}
