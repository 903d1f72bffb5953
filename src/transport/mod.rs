//! Transport module - sources of raw stream chunks.
//!
//! Provides:
//! - [`ChunkSource`]: the interface the viewing loop pulls chunks from
//! - [`HttpChunkSource`]: one long-lived HTTP GET against the camera
//! - [`ReaderChunkSource`]: any `tokio::io::AsyncRead` (sockets, pipes, files)

use std::future::Future;

use bytes::Bytes;

use crate::error::Result;

mod http;
mod reader;

pub use http::HttpChunkSource;
pub use reader::ReaderChunkSource;

/// An ordered, lazily produced sequence of byte chunks.
///
/// Chunk sizes are arbitrary and unrelated to frame boundaries. Returned
/// chunks are never empty; `Ok(None)` marks the end of the stream. Any error
/// is terminal for the stream.
pub trait ChunkSource {
    /// Wait for the next chunk.
    fn next_chunk(&mut self) -> impl Future<Output = Result<Option<Bytes>>>;
}
