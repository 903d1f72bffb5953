//! JPEG header inspection.
//!
//! Walks the marker segments of a baseline or progressive JPEG up to the
//! start-of-frame header and reports the image geometry. Pixel data is not
//! decoded.

use serde::Serialize;

use super::{DecodeError, FrameSink, SinkControl};
use crate::protocol::Frame;

const MARKER_PREFIX: u8 = 0xFF;
const SOI: u8 = 0xD8;
const EOI: u8 = 0xD9;
const SOS: u8 = 0xDA;
const TEM: u8 = 0x01;

/// Geometry read from a JPEG start-of-frame segment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct JpegInfo {
    pub width: u16,
    pub height: u16,
    /// Color components (1 = grayscale, 3 = YCbCr).
    pub components: u8,
    /// Sample precision in bits.
    pub precision: u8,
    pub progressive: bool,
    /// Whether the payload ends with an end-of-image marker.
    pub complete: bool,
}

/// Start-of-frame markers: 0xC0..=0xCF except DHT, JPG and DAC.
fn is_start_of_frame(marker: u8) -> bool {
    matches!(marker, 0xC0..=0xCF) && !matches!(marker, 0xC4 | 0xC8 | 0xCC)
}

/// Markers that carry no length field.
fn is_standalone(marker: u8) -> bool {
    matches!(marker, 0xD0..=0xD7 | TEM)
}

fn read_u16(data: &[u8], offset: usize) -> Result<u16, DecodeError> {
    data.get(offset..offset + 2)
        .map(|b| u16::from_be_bytes([b[0], b[1]]))
        .ok_or(DecodeError::Truncated(offset))
}

/// Read the geometry of a JPEG image without decoding its pixels.
///
/// # Example
///
/// ```
/// use mjpeg_client::sink::inspect_jpeg;
///
/// assert!(inspect_jpeg(b"not a jpeg").is_err());
/// ```
pub fn inspect_jpeg(data: &[u8]) -> Result<JpegInfo, DecodeError> {
    if data.is_empty() {
        return Err(DecodeError::Empty);
    }
    if data.len() < 2 || data[0] != MARKER_PREFIX || data[1] != SOI {
        return Err(DecodeError::MissingStartOfImage);
    }

    let mut pos = 2;
    loop {
        if pos >= data.len() {
            return Err(DecodeError::Truncated(pos));
        }
        if data[pos] != MARKER_PREFIX {
            return Err(DecodeError::InvalidMarker {
                marker: data[pos],
                offset: pos,
            });
        }

        // Any number of 0xFF fill bytes may precede a marker.
        while pos < data.len() && data[pos] == MARKER_PREFIX {
            pos += 1;
        }
        let Some(&marker) = data.get(pos) else {
            return Err(DecodeError::Truncated(pos));
        };
        pos += 1;

        if is_standalone(marker) {
            continue;
        }
        if marker == SOS || marker == EOI {
            return Err(DecodeError::MissingFrameHeader);
        }

        let length = read_u16(data, pos)? as usize;
        if length < 2 {
            return Err(DecodeError::InvalidMarker {
                marker,
                offset: pos - 1,
            });
        }

        if is_start_of_frame(marker) {
            let precision = *data.get(pos + 2).ok_or(DecodeError::Truncated(pos + 2))?;
            let height = read_u16(data, pos + 3)?;
            let width = read_u16(data, pos + 5)?;
            let components = *data.get(pos + 7).ok_or(DecodeError::Truncated(pos + 7))?;

            if width == 0 || components == 0 {
                return Err(DecodeError::InvalidDimensions { width, height });
            }

            return Ok(JpegInfo {
                width,
                height,
                components,
                precision,
                progressive: matches!(marker, 0xC2 | 0xC6 | 0xCA | 0xCE),
                complete: data.ends_with(&[MARKER_PREFIX, EOI]),
            });
        }

        pos += length;
    }
}

/// Sink that validates each frame's JPEG header and logs its geometry.
///
/// Optionally requests a stop after a fixed number of frames.
#[derive(Debug, Default)]
pub struct JpegInspectSink {
    frame_limit: Option<u64>,
    shown: u64,
    last: Option<JpegInfo>,
    closed: bool,
}

impl JpegInspectSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Ask the loop to stop once `limit` frames were shown.
    pub fn with_frame_limit(mut self, limit: Option<u64>) -> Self {
        self.frame_limit = limit;
        self
    }

    /// Frames successfully inspected.
    pub fn shown(&self) -> u64 {
        self.shown
    }

    /// Geometry of the most recent good frame.
    pub fn last_info(&self) -> Option<&JpegInfo> {
        self.last.as_ref()
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }
}

impl FrameSink for JpegInspectSink {
    fn show(&mut self, frame: Frame) -> Result<SinkControl, DecodeError> {
        let info = inspect_jpeg(frame.payload())?;
        if !info.complete {
            tracing::debug!("Frame {} has no end-of-image marker", frame.sequence());
        }

        tracing::info!(
            "Frame {}: {}x{}, {} bytes",
            frame.sequence(),
            info.width,
            info.height,
            frame.len()
        );

        self.shown += 1;
        self.last = Some(info);

        match self.frame_limit {
            Some(limit) if self.shown >= limit => Ok(SinkControl::Stop),
            _ => Ok(SinkControl::Continue),
        }
    }

    fn close(&mut self) {
        if !self.closed {
            tracing::debug!("Inspect sink closed after {} frames", self.shown);
            self.closed = true;
        }
    }
}

/// Build a minimal, structurally valid JPEG for tests.
#[cfg(test)]
pub(crate) fn tiny_jpeg(width: u16, height: u16) -> Vec<u8> {
    let mut data = vec![MARKER_PREFIX, SOI];
    // APP0 with a 4-byte body
    data.extend_from_slice(&[0xFF, 0xE0, 0x00, 0x06, b'J', b'F', b'I', b'F']);
    // SOF0: length 11, precision 8, height, width, 1 component
    data.extend_from_slice(&[0xFF, 0xC0, 0x00, 0x0B, 0x08]);
    data.extend_from_slice(&height.to_be_bytes());
    data.extend_from_slice(&width.to_be_bytes());
    data.extend_from_slice(&[0x01, 0x01, 0x11, 0x00]);
    // SOS and a few bytes of entropy-coded data
    data.extend_from_slice(&[0xFF, 0xDA, 0x00, 0x08, 0x01, 0x01, 0x00, 0x00, 0x3F, 0x00]);
    data.extend_from_slice(&[0x12, 0x34, 0x56]);
    data.extend_from_slice(&[MARKER_PREFIX, EOI]);
    data
}
