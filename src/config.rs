//! Static stream configuration.
//!
//! Everything the client needs to know before connecting: where the camera
//! lives, which boundary token separates parts, and the resource limits.
//! Values come from code (`with_*` setters) or from `MJPEG_*` environment
//! variables.

use std::env;
use std::time::Duration;

use crate::error::{MjpegError, Result};
use crate::protocol::{DEFAULT_BOUNDARY, DEFAULT_MAX_BUFFER_SIZE};

/// Default HTTP port of the camera server.
pub const DEFAULT_PORT: u16 = 8080;

/// Default stream path on the camera server.
pub const DEFAULT_PATH: &str = "/stream.mjpeg";

/// Default time allowed for connecting and receiving response headers.
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

/// Default size of a single read from the connection.
pub const DEFAULT_CHUNK_SIZE: usize = 1024;

/// Connection and extraction parameters for one stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamConfig {
    /// Camera host name or IP address.
    pub host: String,
    /// Camera HTTP port.
    pub port: u16,
    /// Request path of the MJPEG endpoint.
    pub path: String,
    /// Boundary token agreed with the server.
    pub boundary: String,
    /// Upper bound on buffered, not-yet-emitted bytes.
    pub max_buffer_size: usize,
    /// Limit for connection establishment and response headers.
    pub connect_timeout: Duration,
    /// Optional limit on the wait for each chunk.
    pub read_timeout: Option<Duration>,
    /// Read size for reader-backed sources.
    pub chunk_size: usize,
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: DEFAULT_PORT,
            path: DEFAULT_PATH.to_string(),
            boundary: DEFAULT_BOUNDARY.to_string(),
            max_buffer_size: DEFAULT_MAX_BUFFER_SIZE,
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            read_timeout: None,
            chunk_size: DEFAULT_CHUNK_SIZE,
        }
    }
}

impl StreamConfig {
    /// Create a configuration for `host` with all other values defaulted.
    pub fn new(host: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            ..Self::default()
        }
    }

    /// Read configuration from `MJPEG_*` environment variables.
    ///
    /// Unset variables keep their defaults; set but unparsable ones are errors.
    pub fn from_env() -> Result<Self> {
        let defaults = Self::default();

        let config = Self {
            host: env::var("MJPEG_HOST").unwrap_or(defaults.host),
            port: parse_var("MJPEG_PORT")?.unwrap_or(defaults.port),
            path: env::var("MJPEG_PATH").unwrap_or(defaults.path),
            boundary: env::var("MJPEG_BOUNDARY").unwrap_or(defaults.boundary),
            max_buffer_size: parse_var("MJPEG_MAX_BUFFER_BYTES")?
                .unwrap_or(defaults.max_buffer_size),
            connect_timeout: parse_var("MJPEG_CONNECT_TIMEOUT_SECS")?
                .map(Duration::from_secs)
                .unwrap_or(defaults.connect_timeout),
            read_timeout: parse_var("MJPEG_READ_TIMEOUT_SECS")?.map(Duration::from_secs),
            chunk_size: parse_var("MJPEG_CHUNK_SIZE")?.unwrap_or(defaults.chunk_size),
        };

        config.validate()?;
        Ok(config)
    }

    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    pub fn with_path(mut self, path: impl Into<String>) -> Self {
        self.path = path.into();
        self
    }

    pub fn with_boundary(mut self, boundary: impl Into<String>) -> Self {
        self.boundary = boundary.into();
        self
    }

    pub fn with_max_buffer_size(mut self, max_buffer_size: usize) -> Self {
        self.max_buffer_size = max_buffer_size;
        self
    }

    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    pub fn with_read_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.read_timeout = timeout;
        self
    }

    pub fn with_chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = chunk_size;
        self
    }

    /// Full URL of the stream endpoint.
    pub fn url(&self) -> String {
        let path = self.path.trim_start_matches('/');
        format!("http://{}:{}/{}", self.host, self.port, path)
    }

    /// Reject values the client cannot work with.
    pub fn validate(&self) -> Result<()> {
        if self.host.trim().is_empty() {
            return Err(MjpegError::Config("host must not be empty".into()));
        }
        if self.boundary.is_empty() {
            return Err(MjpegError::Config("boundary must not be empty".into()));
        }
        if self.boundary.contains(['\r', '\n']) {
            return Err(MjpegError::Config(
                "boundary must not contain line breaks".into(),
            ));
        }
        if self.max_buffer_size == 0 {
            return Err(MjpegError::Config(
                "max buffer size must be positive".into(),
            ));
        }
        if self.chunk_size == 0 {
            return Err(MjpegError::Config("chunk size must be positive".into()));
        }
        Ok(())
    }
}

fn parse_var<T: std::str::FromStr>(key: &str) -> Result<Option<T>> {
    match env::var(key) {
        Ok(value) if value.trim().is_empty() => Ok(None),
        Ok(value) => value
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| MjpegError::Config(format!("{key}: invalid value {value:?}"))),
        Err(_) => Ok(None),
    }
}
