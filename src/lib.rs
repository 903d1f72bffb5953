//! # mjpeg-client
//!
//! Live MJPEG-over-HTTP client: turns a `multipart/x-mixed-replace` response
//! into a sequence of complete JPEG frames.
//!
//! ## Architecture
//!
//! - **Transport** ([`transport`]): chunk sources (HTTP body, any async reader)
//! - **Protocol** ([`protocol`]): incremental frame extraction from arbitrary chunks
//! - **Sink** ([`sink`]): decode/display interface for extracted frames
//! - **Viewer** ([`Viewer`]): the single-task loop tying them together
//!
//! Frames come out in stream order, each exactly as long as its part's
//! `Content-Length`, no matter how the network splits the bytes.
//!
//! ## Example
//!
//! ```ignore
//! use mjpeg_client::{FrameExtractor, StreamConfig, Viewer};
//! use mjpeg_client::sink::JpegInspectSink;
//! use mjpeg_client::transport::HttpChunkSource;
//!
//! #[tokio::main]
//! async fn main() -> mjpeg_client::Result<()> {
//!     let config = StreamConfig::new("192.168.1.7");
//!     let source = HttpChunkSource::connect(&config).await?;
//!     let extractor = FrameExtractor::from_config(&config);
//!
//!     let mut viewer = Viewer::new(source, extractor, JpegInspectSink::new());
//!     let summary = viewer.run().await?;
//!     println!("{} frames", summary.frames_displayed);
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod error;
pub mod protocol;
pub mod sink;
pub mod transport;
pub mod writer;

mod viewer;

pub use config::StreamConfig;
pub use error::{MjpegError, Result};
pub use protocol::{Frame, FrameExtractor};
pub use viewer::{EndReason, RunSummary, Viewer};
