//! Extracted frame type.
//!
//! A [`Frame`] is one complete, length-verified JPEG payload carved out of the
//! extractor's buffer. The payload is a `bytes::Bytes` split off the buffer
//! without copying; ownership moves to whoever receives the frame.
//!
//! # Example
//!
//! ```
//! use mjpeg_client::protocol::Frame;
//! use bytes::Bytes;
//!
//! let frame = Frame::new(0, Bytes::from_static(b"\xFF\xD8\xFF\xD9"));
//! assert_eq!(frame.len(), 4);
//! assert_eq!(frame.sequence(), 0);
//! ```

use bytes::Bytes;

/// One complete image extracted from the stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    /// Zero-based position of this frame among the frames emitted so far.
    sequence: u64,
    /// Encoded image bytes; length equals the part's `Content-Length`.
    payload: Bytes,
}

impl Frame {
    /// Create a new frame.
    pub fn new(sequence: u64, payload: Bytes) -> Self {
        Self { sequence, payload }
    }

    /// Create a frame from a slice (copies data).
    pub fn from_slice(sequence: u64, payload: &[u8]) -> Self {
        Self {
            sequence,
            payload: Bytes::copy_from_slice(payload),
        }
    }

    /// Position of this frame in the stream.
    #[inline]
    pub fn sequence(&self) -> u64 {
        self.sequence
    }

    /// Borrow the payload.
    #[inline]
    pub fn payload(&self) -> &[u8] {
        &self.payload
    }

    /// Payload length in bytes.
    #[inline]
    pub fn len(&self) -> usize {
        self.payload.len()
    }

    /// Whether the part declared `Content-Length: 0`.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.payload.is_empty()
    }

    /// Consume the frame, keeping only its payload.
    #[inline]
    pub fn into_payload(self) -> Bytes {
        self.payload
    }
}

impl AsRef<[u8]> for Frame {
    fn as_ref(&self) -> &[u8] {
        &self.payload
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_frame_accessors() {
        let frame = Frame::new(7, Bytes::from_static(b"hello"));
        assert_eq!(frame.sequence(), 7);
        assert_eq!(frame.payload(), b"hello");
        assert_eq!(frame.len(), 5);
        assert!(!frame.is_empty());
        assert_eq!(frame.as_ref(), b"hello");
    }

    #[test]
    fn test_frame_empty() {
        let frame = Frame::from_slice(0, b"");
        assert!(frame.is_empty());
        assert_eq!(frame.into_payload(), Bytes::new());
    }
}
