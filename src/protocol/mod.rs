//! Protocol module - multipart wire format, frame extraction, and frame type.
//!
//! This module implements the `multipart/x-mixed-replace` data path:
//! - Part markers, `Content-Length` parsing, and part encoding
//! - Frame extractor for accumulating arbitrarily fragmented chunks
//! - Frame struct owning one complete JPEG payload

mod frame;
mod frame_extractor;
mod wire_format;

pub use frame::Frame;
pub use frame_extractor::FrameExtractor;
pub use wire_format::{
    build_part, encode_part_header, frame_marker, parse_content_length, stream_content_type,
    Handshake, LengthParseError, BOUNDARY_PREFIX, CONTENT_LENGTH_LABEL, CRLF, DEFAULT_BOUNDARY,
    DEFAULT_MAX_BUFFER_SIZE, HEADER_TERMINATOR, PART_CONTENT_TYPE, STREAM_MEDIA_TYPE,
};
