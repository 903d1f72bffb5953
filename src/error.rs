//! Error types for mjpeg-client.

use std::time::Duration;

use thiserror::Error;

/// Main error type for all stream operations.
///
/// Every variant is terminal for the viewing loop. Recoverable conditions
/// (a malformed `Content-Length`, a frame that fails to decode) have their own
/// types and never surface here.
#[derive(Debug, Error)]
pub enum MjpegError {
    /// I/O error while reading from the underlying stream.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// HTTP client error (connect, TLS, body read).
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Server answered with a non-success status.
    #[error("HTTP status {status} from {url}")]
    HttpStatus { status: u16, url: String },

    /// Connection could not be established or was dropped.
    #[error("Connection error: {0}")]
    Connection(String),

    /// Connection establishment did not complete in time.
    #[error("Connection timed out after {0:?}")]
    ConnectTimeout(Duration),

    /// No chunk arrived within the configured read timeout.
    #[error("No data received for {0:?}")]
    ReadTimeout(Duration),

    /// Buffer grew past its limit without yielding a frame.
    #[error("Buffer overflow: {buffered} bytes buffered without a complete frame (limit {limit})")]
    BufferOverflow { buffered: usize, limit: usize },

    /// A part declared a payload that can never fit in the buffer.
    #[error("Frame too large: declared {declared} bytes, buffer limit is {limit}")]
    FrameTooLarge { declared: usize, limit: usize },

    /// Invalid static configuration.
    #[error("Invalid configuration: {0}")]
    Config(String),
}

/// Result type alias using MjpegError.
pub type Result<T> = std::result::Result<T, MjpegError>;
