//! Connection parameter parsing and session options.
//!
//! The transport itself is opened by the RPC client implementation; these
//! parameters carry the address it needs plus the options the driver uses
//! while polling and fetching.

use crate::error::ConnectionError;
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

/// Default Beeswax service port.
pub const DEFAULT_PORT: u16 = 21000;

/// Default delay between two state polls.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Default page size hint for fetch calls.
pub const DEFAULT_BATCH_SIZE: i32 = 10_000;

/// Default transport connection timeout.
pub const DEFAULT_CONNECTION_TIMEOUT: Duration = Duration::from_secs(10);

/// How positional scans treat fields that do not parse.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ScanMode {
    /// Unparseable numeric fields become zero.
    #[default]
    Lenient,
    /// Unparseable fields fail the scan.
    Strict,
}

impl FromStr for ScanMode {
    type Err = ConnectionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "lenient" => Ok(ScanMode::Lenient),
            "strict" => Ok(ScanMode::Strict),
            _ => Err(ConnectionError::InvalidParameter {
                parameter: "scan_mode".to_string(),
                message: format!("Expected 'lenient' or 'strict', got: {}", s),
            }),
        }
    }
}

/// Options that control how a session drives its queries.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionOptions {
    /// Delay between state polls while waiting for a job
    pub poll_interval: Duration,

    /// Page size hint sent with every fetch
    pub batch_size: i32,

    /// Transport connection timeout, used by the client implementation
    pub connection_timeout: Duration,

    /// Parse-failure policy of positional scans
    pub scan_mode: ScanMode,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self {
            poll_interval: DEFAULT_POLL_INTERVAL,
            batch_size: DEFAULT_BATCH_SIZE,
            connection_timeout: DEFAULT_CONNECTION_TIMEOUT,
            scan_mode: ScanMode::Lenient,
        }
    }
}

impl SessionOptions {
    /// Set the poll interval.
    pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }

    /// Set the fetch page size hint.
    pub fn with_batch_size(mut self, batch_size: i32) -> Self {
        self.batch_size = batch_size;
        self
    }

    /// Set the connection timeout.
    pub fn with_connection_timeout(mut self, timeout: Duration) -> Self {
        self.connection_timeout = timeout;
        self
    }

    /// Set the scan parse-failure policy.
    pub fn with_scan_mode(mut self, scan_mode: ScanMode) -> Self {
        self.scan_mode = scan_mode;
        self
    }

    /// Check the options are usable.
    pub fn validate(&self) -> Result<(), ConnectionError> {
        if self.batch_size <= 0 {
            return Err(ConnectionError::InvalidParameter {
                parameter: "batch_size".to_string(),
                message: "Batch size must be greater than 0".to_string(),
            });
        }
        if self.connection_timeout.is_zero() {
            return Err(ConnectionError::InvalidParameter {
                parameter: "connection_timeout".to_string(),
                message: "Connection timeout must be greater than 0".to_string(),
            });
        }
        Ok(())
    }
}

/// Address of the query service plus session options.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionParams {
    /// Service host
    pub host: String,

    /// Service port (default: 21000)
    pub port: u16,

    /// Session options
    pub options: SessionOptions,
}

impl ConnectionParams {
    /// Create a new ConnectionBuilder.
    pub fn builder() -> ConnectionBuilder {
        ConnectionBuilder::new()
    }

    /// `host:port` address for the transport.
    pub fn address(&self) -> String {
        if self.host.contains(':') {
            format!("[{}]:{}", self.host, self.port)
        } else {
            format!("{}:{}", self.host, self.port)
        }
    }
}

impl fmt::Display for ConnectionParams {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "beeswax://{}", self.address())
    }
}

impl FromStr for ConnectionParams {
    type Err = ConnectionError;

    /// Parse a connection string in the format:
    /// `beeswax://host[:port][?param=value&...]`
    ///
    /// Recognised parameters are `poll_interval_ms`, `batch_size`,
    /// `timeout` (seconds) and `scan_mode`.
    ///
    /// # Examples
    ///
    /// ```
    /// # use beeswax_rs::connection::ConnectionParams;
    /// # use std::str::FromStr;
    /// let params = ConnectionParams::from_str("beeswax://impalad-1:21000?batch_size=500")?;
    /// assert_eq!(params.options.batch_size, 500);
    /// # Ok::<(), Box<dyn std::error::Error>>(())
    /// ```
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let url = s.trim();

        let url = url.strip_prefix("beeswax://").ok_or_else(|| {
            ConnectionError::ParseError(
                "Connection string must start with 'beeswax://'".to_string(),
            )
        })?;

        let (host_port, query_string) = match url.split_once('?') {
            Some((main, query)) => (main, Some(query)),
            None => (url, None),
        };

        let params = parse_query_params(query_string)?;
        let (host, port) = parse_host_port(host_port.trim_end_matches('/'))?;

        let builder = ConnectionBuilder::new().host(&host).port(port);
        apply_query_params(builder, params)?.build()
    }
}

/// Builder for constructing ConnectionParams with validation.
#[derive(Debug, Clone, Default)]
pub struct ConnectionBuilder {
    host: Option<String>,
    port: Option<u16>,
    options: SessionOptions,
}

impl ConnectionBuilder {
    /// Create a new ConnectionBuilder with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the service host.
    pub fn host(mut self, host: &str) -> Self {
        self.host = Some(host.to_string());
        self
    }

    /// Set the service port.
    pub fn port(mut self, port: u16) -> Self {
        self.port = Some(port);
        self
    }

    /// Set the poll interval.
    pub fn poll_interval(mut self, interval: Duration) -> Self {
        self.options.poll_interval = interval;
        self
    }

    /// Set the fetch page size hint.
    pub fn batch_size(mut self, batch_size: i32) -> Self {
        self.options.batch_size = batch_size;
        self
    }

    /// Set the connection timeout.
    pub fn connection_timeout(mut self, timeout: Duration) -> Self {
        self.options.connection_timeout = timeout;
        self
    }

    /// Set the scan parse-failure policy.
    pub fn scan_mode(mut self, scan_mode: ScanMode) -> Self {
        self.options.scan_mode = scan_mode;
        self
    }

    /// Build the ConnectionParams with validation.
    pub fn build(self) -> Result<ConnectionParams, ConnectionError> {
        let host = self.host.ok_or_else(|| ConnectionError::InvalidParameter {
            parameter: "host".to_string(),
            message: "Host is required".to_string(),
        })?;

        if host.is_empty() {
            return Err(ConnectionError::InvalidParameter {
                parameter: "host".to_string(),
                message: "Host cannot be empty".to_string(),
            });
        }

        let port = self.port.unwrap_or(DEFAULT_PORT);
        if port == 0 {
            return Err(ConnectionError::InvalidParameter {
                parameter: "port".to_string(),
                message: "Port must be greater than 0".to_string(),
            });
        }

        self.options.validate()?;

        Ok(ConnectionParams {
            host,
            port,
            options: self.options,
        })
    }
}

/// Parse query parameters from URL query string.
fn parse_query_params(query: Option<&str>) -> Result<HashMap<String, String>, ConnectionError> {
    let mut params = HashMap::new();

    if let Some(query) = query {
        for pair in query.split('&') {
            if pair.is_empty() {
                continue;
            }

            let (key, value) = pair.split_once('=').ok_or_else(|| {
                ConnectionError::ParseError(format!("Invalid query parameter format: {}", pair))
            })?;

            let key = urlencoding::decode(key)
                .map_err(|e| ConnectionError::ParseError(format!("Failed to decode key: {}", e)))?
                .into_owned();
            let value = urlencoding::decode(value)
                .map_err(|e| ConnectionError::ParseError(format!("Failed to decode value: {}", e)))?
                .into_owned();

            params.insert(key, value);
        }
    }

    Ok(params)
}

/// Parse host and port.
fn parse_host_port(host_port: &str) -> Result<(String, u16), ConnectionError> {
    // IPv6 literal: [host]:port
    if let Some(rest) = host_port.strip_prefix('[') {
        let (host, port_part) = rest.split_once(']').ok_or_else(|| {
            ConnectionError::ParseError(format!("Unterminated IPv6 address: {}", host_port))
        })?;

        let port = match port_part.strip_prefix(':') {
            Some(port) => port
                .parse()
                .map_err(|_| ConnectionError::ParseError(format!("Invalid port: {}", port)))?,
            None => DEFAULT_PORT,
        };

        return Ok((host.to_string(), port));
    }

    match host_port.rsplit_once(':') {
        Some((host, port_str)) => {
            let port = port_str
                .parse()
                .map_err(|_| ConnectionError::ParseError(format!("Invalid port: {}", port_str)))?;
            Ok((host.to_string(), port))
        }
        None => Ok((host_port.to_string(), DEFAULT_PORT)),
    }
}

fn parse_number<T: FromStr>(key: &str, value: &str) -> Result<T, ConnectionError> {
    value.parse().map_err(|_| ConnectionError::InvalidParameter {
        parameter: key.to_string(),
        message: format!("Invalid numeric value: {}", value),
    })
}

/// Apply query parameters to builder.
fn apply_query_params(
    mut builder: ConnectionBuilder,
    params: HashMap<String, String>,
) -> Result<ConnectionBuilder, ConnectionError> {
    for (key, value) in params {
        match key.as_str() {
            "poll_interval_ms" => {
                let ms: u64 = parse_number(&key, &value)?;
                builder = builder.poll_interval(Duration::from_millis(ms));
            }
            "batch_size" => {
                builder = builder.batch_size(parse_number(&key, &value)?);
            }
            "timeout" | "connection_timeout" => {
                let secs: u64 = parse_number(&key, &value)?;
                builder = builder.connection_timeout(Duration::from_secs(secs));
            }
            "scan_mode" => {
                builder = builder.scan_mode(value.parse()?);
            }
            _ => {
                return Err(ConnectionError::InvalidParameter {
                    parameter: key,
                    message: "Unknown connection parameter".to_string(),
                });
            }
        }
    }

    Ok(builder)
}
