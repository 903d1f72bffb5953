//! Sink module - where extracted frames go.
//!
//! A [`FrameSink`] receives each complete frame in stream order, decodes and
//! displays it, and tells the viewing loop whether to keep going. Decoding
//! failures are per-frame: the loop skips that frame and continues.
//!
//! Closures work as sinks:
//!
//! ```
//! use mjpeg_client::sink::{DecodeError, FrameSink, SinkControl};
//! use mjpeg_client::protocol::Frame;
//!
//! let mut seen = 0;
//! let mut sink = |frame: Frame| {
//!     seen += frame.len();
//!     Ok::<_, DecodeError>(SinkControl::Continue)
//! };
//! sink.show(Frame::from_slice(0, b"abc")).unwrap();
//! assert_eq!(seen, 3);
//! ```

mod jpeg;

pub use jpeg::{inspect_jpeg, JpegInfo, JpegInspectSink};

use thiserror::Error;

use crate::protocol::Frame;

/// What the viewing loop should do after a frame was shown.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SinkControl {
    /// Keep reading frames.
    Continue,
    /// The user asked to stop.
    Stop,
}

/// A frame's bytes could not be decoded as an image.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    #[error("empty image payload")]
    Empty,

    #[error("missing JPEG start-of-image marker")]
    MissingStartOfImage,

    #[error("JPEG data truncated at offset {0}")]
    Truncated(usize),

    #[error("invalid JPEG marker 0x{marker:02X} at offset {offset}")]
    InvalidMarker { marker: u8, offset: usize },

    #[error("no JPEG frame header before image data")]
    MissingFrameHeader,

    #[error("invalid image dimensions {width}x{height}")]
    InvalidDimensions { width: u16, height: u16 },

    /// Decoder-specific failure from a custom sink.
    #[error("decode failed: {0}")]
    Other(String),
}

/// Consumer of extracted frames.
pub trait FrameSink {
    /// Decode and display one frame. Ownership of the frame moves here.
    fn show(&mut self, frame: Frame) -> Result<SinkControl, DecodeError>;

    /// Release display resources. Called once when the viewing loop ends.
    fn close(&mut self) {}
}

impl<F> FrameSink for F
where
    F: FnMut(Frame) -> Result<SinkControl, DecodeError>,
{
    fn show(&mut self, frame: Frame) -> Result<SinkControl, DecodeError> {
        self(frame)
    }
}
