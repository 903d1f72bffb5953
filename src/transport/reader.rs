//! Chunk source over any async reader.

use std::time::Duration;

use bytes::Bytes;
use tokio::io::{AsyncRead, AsyncReadExt};

use super::ChunkSource;
use crate::config::{StreamConfig, DEFAULT_CHUNK_SIZE};
use crate::error::{MjpegError, Result};

/// Reads chunks of up to `chunk_size` bytes from `R`.
pub struct ReaderChunkSource<R> {
    reader: R,
    buf: Vec<u8>,
    read_timeout: Option<Duration>,
}

impl<R> ReaderChunkSource<R>
where
    R: AsyncRead + Unpin,
{
    /// Wrap `reader` with the default 1 KiB chunk size.
    pub fn new(reader: R) -> Self {
        Self::with_chunk_size(reader, DEFAULT_CHUNK_SIZE)
    }

    /// Wrap `reader`, reading at most `chunk_size` bytes per chunk.
    pub fn with_chunk_size(reader: R, chunk_size: usize) -> Self {
        Self {
            reader,
            buf: vec![0u8; chunk_size.max(1)],
            read_timeout: None,
        }
    }

    /// Wrap `reader` using the chunk size and read timeout from `config`.
    pub fn from_config(reader: R, config: &StreamConfig) -> Self {
        Self::with_chunk_size(reader, config.chunk_size).with_read_timeout(config.read_timeout)
    }

    /// Fail a read that waits longer than `timeout`.
    pub fn with_read_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.read_timeout = timeout;
        self
    }

    /// Unwrap the underlying reader.
    pub fn into_inner(self) -> R {
        self.reader
    }
}

impl<R> ChunkSource for ReaderChunkSource<R>
where
    R: AsyncRead + Unpin,
{
    async fn next_chunk(&mut self) -> Result<Option<Bytes>> {
        let read = self.reader.read(&mut self.buf);
        let n = match self.read_timeout {
            Some(limit) => tokio::time::timeout(limit, read)
                .await
                .map_err(|_| MjpegError::ReadTimeout(limit))??,
            None => read.await?,
        };

        if n == 0 {
            return Ok(None); // EOF
        }
        Ok(Some(Bytes::copy_from_slice(&self.buf[..n])))
    }
}
