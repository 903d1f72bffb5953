//! HTTP chunk source.
//!
//! Opens one GET against the camera's MJPEG endpoint with `reqwest`, checks
//! the status and the declared content type, then hands out body chunks as
//! they arrive.
//!
//! # Example
//!
//! ```ignore
//! use mjpeg_client::{StreamConfig, transport::{ChunkSource, HttpChunkSource}};
//!
//! let config = StreamConfig::new("192.168.1.7");
//! let mut source = HttpChunkSource::connect(&config).await?;
//! while let Some(chunk) = source.next_chunk().await? {
//!     println!("{} bytes", chunk.len());
//! }
//! ```

use std::time::Duration;

use bytes::Bytes;
use reqwest::header::CONTENT_TYPE;
use reqwest::Response;

use super::ChunkSource;
use crate::config::StreamConfig;
use crate::error::{MjpegError, Result};
use crate::protocol::Handshake;

/// Body of a streaming HTTP response, read chunk by chunk.
pub struct HttpChunkSource {
    response: Response,
    handshake: Handshake,
    read_timeout: Option<Duration>,
}

impl HttpChunkSource {
    /// Connect to `config.url()` and validate the response.
    ///
    /// Connecting and receiving the response headers must finish within
    /// `config.connect_timeout`. After that the body is read without a time
    /// limit unless `config.read_timeout` is set.
    pub async fn connect(config: &StreamConfig) -> Result<Self> {
        let url = config.url();
        tracing::debug!("Connecting to MJPEG stream at {}", url);

        let client = reqwest::Client::builder()
            .connect_timeout(config.connect_timeout)
            .build()?;

        let response = tokio::time::timeout(config.connect_timeout, client.get(&url).send())
            .await
            .map_err(|_| MjpegError::ConnectTimeout(config.connect_timeout))?
            .map_err(|e| {
                if e.is_timeout() {
                    MjpegError::ConnectTimeout(config.connect_timeout)
                } else if e.is_connect() {
                    MjpegError::Connection(format!("could not connect to {}: {}", url, e))
                } else {
                    MjpegError::Http(e)
                }
            })?;

        Self::from_response(response, &config.boundary, config.read_timeout)
    }

    /// Wrap an already received response.
    ///
    /// Fails on a non-success status. A content type that does not mention
    /// `boundary` is logged as a warning and otherwise ignored.
    pub fn from_response(
        response: Response,
        boundary: &str,
        read_timeout: Option<Duration>,
    ) -> Result<Self> {
        let status = response.status();
        if !status.is_success() {
            return Err(MjpegError::HttpStatus {
                status: status.as_u16(),
                url: response.url().to_string(),
            });
        }

        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok());
        let handshake = Handshake::inspect(content_type, boundary);

        if !handshake.boundary_matched {
            tracing::warn!(
                "Boundary '{}' not found in Content-Type header (actual: {:?}), proceeding anyway",
                boundary,
                handshake.content_type
            );
        } else if !handshake.is_mixed_replace() {
            tracing::warn!(
                "Unexpected stream content type: {:?}",
                handshake.content_type
            );
        }

        Ok(Self {
            response,
            handshake,
            read_timeout,
        })
    }

    /// Result of the content-type check.
    pub fn handshake(&self) -> &Handshake {
        &self.handshake
    }
}

impl ChunkSource for HttpChunkSource {
    async fn next_chunk(&mut self) -> Result<Option<Bytes>> {
        loop {
            let chunk = match self.read_timeout {
                Some(limit) => tokio::time::timeout(limit, self.response.chunk())
                    .await
                    .map_err(|_| MjpegError::ReadTimeout(limit))??,
                None => self.response.chunk().await?,
            };

            match chunk {
                Some(chunk) if chunk.is_empty() => continue,
                other => return Ok(other),
            }
        }
    }
}
