//! Incremental frame extraction from a multipart byte stream.
//!
//! Uses `bytes::BytesMut` as the single accumulation buffer; payloads are
//! split off it without copying. The extractor keeps no parse position
//! between calls: every [`FrameExtractor::feed`] rescans from the start of the
//! buffer, so any chunking of the input yields the same frames.
//!
//! Per part, extraction walks:
//! marker → `Content-Length` label → end of value line → blank line →
//! payload → trailing CRLF. Whenever one of these is not yet buffered the
//! scan stops and the bytes from the marker onward are kept for the next feed.
//!
//! # Example
//!
//! ```
//! use mjpeg_client::protocol::{build_part, FrameExtractor};
//!
//! let mut extractor = FrameExtractor::new("frameboundary");
//! let part = build_part("frameboundary", b"\xFF\xD8\xFF\xD9");
//!
//! // Data arrives in arbitrary pieces
//! assert!(extractor.feed(&part[..10]).unwrap().is_empty());
//! let frames = extractor.feed(&part[10..]).unwrap();
//!
//! assert_eq!(frames.len(), 1);
//! assert_eq!(frames[0].payload(), b"\xFF\xD8\xFF\xD9");
//! ```

use bytes::{Buf, BytesMut};

use super::wire_format::{
    find, frame_marker, parse_content_length, LengthParseError, CONTENT_LENGTH_LABEL, CRLF,
    DEFAULT_MAX_BUFFER_SIZE, HEADER_TERMINATOR,
};
use super::Frame;
use crate::config::StreamConfig;
use crate::error::{MjpegError, Result};

/// Initial buffer capacity; grows on demand up to the configured limit.
const INITIAL_CAPACITY: usize = 64 * 1024;

/// Why the extractor stopped accepting data.
#[derive(Debug, Clone, Copy)]
enum Failure {
    Overflow { buffered: usize },
    TooLarge { declared: usize },
}

/// Extractor state. Parse progress is never stored here.
#[derive(Debug, Clone, Copy)]
enum State {
    /// Accepting chunks.
    Scanning,
    /// A fatal error occurred; every later feed reports it again.
    Failed(Failure),
}

/// Outcome of one extraction attempt at the front of the buffer.
enum Step {
    /// A complete frame was split off.
    Extracted(Frame),
    /// A corrupt part was dropped; scan again.
    Skipped,
    /// Not enough data buffered.
    NeedMore,
}

/// Accumulates stream chunks and carves out complete frames.
pub struct FrameExtractor {
    /// Bytes not yet emitted or known to be garbage.
    buffer: BytesMut,
    /// `--<boundary>\r\nContent-Type: image/jpeg\r\n`.
    marker: Vec<u8>,
    boundary: String,
    state: State,
    max_buffer_size: usize,
    frames_emitted: u64,
    corrupt_parts: u64,
}

impl FrameExtractor {
    /// Create an extractor for `boundary` with the default 8 MiB buffer limit.
    pub fn new(boundary: &str) -> Self {
        Self::with_max_buffer_size(boundary, DEFAULT_MAX_BUFFER_SIZE)
    }

    /// Create an extractor with a custom buffer limit.
    pub fn with_max_buffer_size(boundary: &str, max_buffer_size: usize) -> Self {
        Self {
            buffer: BytesMut::with_capacity(INITIAL_CAPACITY.min(max_buffer_size)),
            marker: frame_marker(boundary),
            boundary: boundary.to_string(),
            state: State::Scanning,
            max_buffer_size,
            frames_emitted: 0,
            corrupt_parts: 0,
        }
    }

    /// Create an extractor from stream configuration.
    pub fn from_config(config: &StreamConfig) -> Self {
        Self::with_max_buffer_size(&config.boundary, config.max_buffer_size)
    }

    /// Append a chunk and extract every frame it completes.
    ///
    /// Returns the frames in stream order; the vector is empty when the chunk
    /// only extended a partial part. Incomplete data is kept for the next call.
    ///
    /// # Errors
    ///
    /// - [`MjpegError::FrameTooLarge`] if a part declares a payload that cannot
    ///   fit within the buffer limit.
    /// - [`MjpegError::BufferOverflow`] if the buffer exceeds its limit and
    ///   this call produced no frame.
    ///
    /// Both are fatal: the buffer is released and later calls fail the same way.
    /// Frames completed earlier in the same call are still returned; the
    /// error then surfaces on the next call.
    pub fn feed(&mut self, chunk: &[u8]) -> Result<Vec<Frame>> {
        if let State::Failed(failure) = self.state {
            return Err(self.error_for(failure));
        }

        self.buffer.extend_from_slice(chunk);

        let mut frames = Vec::new();
        loop {
            match self.try_extract_one() {
                Ok(Step::Extracted(frame)) => frames.push(frame),
                Ok(Step::Skipped) => continue,
                Ok(Step::NeedMore) => break,
                Err(failure) => {
                    let err = self.fail(failure);
                    if frames.is_empty() {
                        return Err(err);
                    }
                    // Hand out what completed first; the next feed reports the failure.
                    return Ok(frames);
                }
            }
        }

        if frames.is_empty() && self.buffer.len() > self.max_buffer_size {
            let buffered = self.buffer.len();
            return Err(self.fail(Failure::Overflow { buffered }));
        }

        Ok(frames)
    }

    /// Try to extract a single frame from the front of the buffer.
    fn try_extract_one(&mut self) -> std::result::Result<Step, Failure> {
        let Some(start) = find(&self.buffer, &self.marker, 0) else {
            return Ok(Step::NeedMore);
        };

        if start > 0 {
            tracing::trace!("Discarding {} bytes before frame marker", start);
            self.buffer.advance(start);
        }

        // From here on the marker sits at offset 0.
        let Some(label) = find(&self.buffer, CONTENT_LENGTH_LABEL, self.marker.len()) else {
            return Ok(Step::NeedMore);
        };
        let value_start = label + CONTENT_LENGTH_LABEL.len();

        let Some(line_end) = find(&self.buffer, CRLF, value_start) else {
            return Ok(Step::NeedMore);
        };

        let length = match parse_content_length(&self.buffer[value_start..line_end]) {
            Ok(length) => length,
            Err(LengthParseError::OutOfRange(_)) => {
                return Err(Failure::TooLarge {
                    declared: usize::MAX,
                });
            }
            Err(e) => {
                tracing::warn!("Skipping part with bad length header: {}", e);
                self.corrupt_parts += 1;
                self.buffer.advance(line_end + CRLF.len());
                return Ok(Step::Skipped);
            }
        };

        // Smallest possible part for this length: no extra headers.
        let minimum_part =
            (line_end + HEADER_TERMINATOR.len() + CRLF.len()).saturating_add(length);
        if minimum_part > self.max_buffer_size {
            return Err(Failure::TooLarge { declared: length });
        }

        let Some(separator) = find(&self.buffer, HEADER_TERMINATOR, line_end) else {
            return Ok(Step::NeedMore);
        };
        let payload_start = separator + HEADER_TERMINATOR.len();
        let payload_end = payload_start + length;

        if self.buffer.len() < payload_end + CRLF.len() {
            return Ok(Step::NeedMore);
        }

        let has_trailer = &self.buffer[payload_end..payload_end + CRLF.len()] == CRLF;

        self.buffer.advance(payload_start);
        let payload = self.buffer.split_to(length).freeze();
        if has_trailer {
            self.buffer.advance(CRLF.len());
        } else {
            tracing::debug!("Part payload not followed by CRLF");
        }

        let frame = Frame::new(self.frames_emitted, payload);
        self.frames_emitted += 1;
        tracing::debug!(
            "Extracted frame {} ({} bytes, {} buffered)",
            frame.sequence(),
            frame.len(),
            self.buffer.len()
        );

        Ok(Step::Extracted(frame))
    }

    /// Enter the failed state and release the buffer.
    fn fail(&mut self, failure: Failure) -> MjpegError {
        self.state = State::Failed(failure);
        self.buffer = BytesMut::new();
        self.error_for(failure)
    }

    fn error_for(&self, failure: Failure) -> MjpegError {
        match failure {
            Failure::Overflow { buffered } => MjpegError::BufferOverflow {
                buffered,
                limit: self.max_buffer_size,
            },
            Failure::TooLarge { declared } => MjpegError::FrameTooLarge {
                declared,
                limit: self.max_buffer_size,
            },
        }
    }

    /// Number of buffered bytes.
    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    /// Check if the buffer is empty.
    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    /// Drop buffered bytes and clear a previous failure.
    pub fn clear(&mut self) {
        self.buffer.clear();
        self.state = State::Scanning;
    }

    /// Boundary token this extractor looks for.
    pub fn boundary(&self) -> &str {
        &self.boundary
    }

    /// Configured buffer limit.
    pub fn max_buffer_size(&self) -> usize {
        self.max_buffer_size
    }

    /// Total frames emitted since creation.
    pub fn frames_emitted(&self) -> u64 {
        self.frames_emitted
    }

    /// Parts dropped because of an unparsable `Content-Length`.
    pub fn corrupt_parts_skipped(&self) -> u64 {
        self.corrupt_parts
    }

    /// Whether a fatal error has stopped this extractor.
    pub fn is_failed(&self) -> bool {
        matches!(self.state, State::Failed(_))
    }
}

impl std::fmt::Debug for FrameExtractor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FrameExtractor")
            .field("boundary", &self.boundary)
            .field("buffered", &self.buffer.len())
            .field("state", &self.state)
            .field("max_buffer_size", &self.max_buffer_size)
            .field("frames_emitted", &self.frames_emitted)
            .finish()
    }
}
