//! Wire format of a `multipart/x-mixed-replace` JPEG stream.
//!
//! Each image travels as one part:
//! ```text
//! --<boundary>\r\n
//! Content-Type: image/jpeg\r\n
//! Content-Length: <decimal>\r\n
//! \r\n
//! <payload bytes>\r\n
//! ```
//!
//! Parts repeat for as long as the connection stays open.

use thiserror::Error;

/// Line terminator used by every header line and after each payload.
pub const CRLF: &[u8] = b"\r\n";

/// Blank-line separator between the part headers and the payload.
pub const HEADER_TERMINATOR: &[u8] = b"\r\n\r\n";

/// Prefix placed before the boundary token in every marker.
pub const BOUNDARY_PREFIX: &[u8] = b"--";

/// Fixed media-type header line that follows the boundary.
pub const PART_CONTENT_TYPE: &[u8] = b"Content-Type: image/jpeg";

/// Label of the length header, including the separator space.
pub const CONTENT_LENGTH_LABEL: &[u8] = b"Content-Length: ";

/// Media type of the whole response.
pub const STREAM_MEDIA_TYPE: &str = "multipart/x-mixed-replace";

/// Boundary token used by the reference camera server.
pub const DEFAULT_BOUNDARY: &str = "frameboundary";

/// Default upper bound on buffered, not-yet-emitted bytes (8 MiB).
pub const DEFAULT_MAX_BUFFER_SIZE: usize = 8 * 1024 * 1024;

/// A `Content-Length` value that is not a non-negative decimal integer.
///
/// Recovered inside the extractor; the offending part is skipped.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LengthParseError {
    /// Value is empty after trimming whitespace.
    #[error("empty Content-Length value")]
    Empty,

    /// Value contains something other than ASCII digits.
    #[error("non-numeric Content-Length value: {0:?}")]
    NotNumeric(String),

    /// Value does not fit in `usize`.
    #[error("Content-Length value out of range: {0}")]
    OutOfRange(String),
}

/// Build the marker that introduces every part: `--<boundary>\r\nContent-Type: image/jpeg\r\n`.
pub fn frame_marker(boundary: &str) -> Vec<u8> {
    let mut marker = Vec::with_capacity(
        BOUNDARY_PREFIX.len() + boundary.len() + PART_CONTENT_TYPE.len() + 2 * CRLF.len(),
    );
    marker.extend_from_slice(BOUNDARY_PREFIX);
    marker.extend_from_slice(boundary.as_bytes());
    marker.extend_from_slice(CRLF);
    marker.extend_from_slice(PART_CONTENT_TYPE);
    marker.extend_from_slice(CRLF);
    marker
}

/// Parse the raw bytes between `Content-Length: ` and its line terminator.
///
/// Surrounding ASCII whitespace and a single leading `+` are ignored. A minus
/// sign or any other non-digit is [`LengthParseError::NotNumeric`].
///
/// A well-formed value too large for `usize` is [`LengthParseError::OutOfRange`].
/// [`FrameExtractor`](super::FrameExtractor) treats that the same as any other
/// length over its buffer limit, and fails with `FrameTooLarge` rather than
/// skipping the part.
///
/// # Example
///
/// ```
/// use mjpeg_client::protocol::parse_content_length;
///
/// assert_eq!(parse_content_length(b"1024"), Ok(1024));
/// assert_eq!(parse_content_length(b"+5"), Ok(5));
/// assert!(parse_content_length(b"-5").is_err());
/// ```
pub fn parse_content_length(raw: &[u8]) -> Result<usize, LengthParseError> {
    let value = raw.trim_ascii();
    if value.is_empty() {
        return Err(LengthParseError::Empty);
    }

    let text = String::from_utf8_lossy(value);
    let digits = value.strip_prefix(b"+").unwrap_or(value);
    if digits.is_empty() || !digits.iter().all(u8::is_ascii_digit) {
        return Err(LengthParseError::NotNumeric(text.into_owned()));
    }

    String::from_utf8_lossy(digits)
        .parse::<usize>()
        .map_err(|_| LengthParseError::OutOfRange(text.into_owned()))
}

/// Encode the header block of one part, up to and including the blank line.
pub fn encode_part_header(boundary: &str, payload_len: usize) -> Vec<u8> {
    format!(
        "--{boundary}\r\nContent-Type: image/jpeg\r\nContent-Length: {payload_len}\r\n\r\n"
    )
    .into_bytes()
}

/// Build a complete part: header block, payload, trailing CRLF.
///
/// # Example
///
/// ```
/// use mjpeg_client::protocol::build_part;
///
/// let part = build_part("frameboundary", b"jpeg");
/// assert!(part.starts_with(b"--frameboundary\r\n"));
/// assert!(part.ends_with(b"jpeg\r\n"));
/// ```
pub fn build_part(boundary: &str, payload: &[u8]) -> Vec<u8> {
    let mut part = encode_part_header(boundary, payload.len());
    part.reserve(payload.len() + CRLF.len());
    part.extend_from_slice(payload);
    part.extend_from_slice(CRLF);
    part
}

/// Top-level `Content-Type` value announcing a stream with `boundary`.
pub fn stream_content_type(boundary: &str) -> String {
    format!("{STREAM_MEDIA_TYPE}; boundary={boundary}")
}

/// Result of checking a response's declared content type against the
/// boundary the client expects.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Handshake {
    /// Raw `Content-Type` value, empty when the header was missing.
    pub content_type: String,
    /// `boundary=` parameter, if the value carried one.
    pub declared_boundary: Option<String>,
    /// Whether the expected boundary token appears in the content type.
    pub boundary_matched: bool,
}

impl Handshake {
    /// Inspect a `Content-Type` header value.
    ///
    /// A mismatch is only a warning: extraction proceeds with the expected
    /// boundary either way.
    pub fn inspect(content_type: Option<&str>, expected_boundary: &str) -> Self {
        let content_type = content_type.unwrap_or_default().to_string();
        let declared_boundary = content_type
            .split(';')
            .skip(1)
            .filter_map(|param| param.split_once('='))
            .find(|(key, _)| key.trim().eq_ignore_ascii_case("boundary"))
            .map(|(_, value)| {
                let value = value.trim().trim_matches('"');
                value.strip_prefix("--").unwrap_or(value).to_string()
            });

        let boundary_matched = match &declared_boundary {
            Some(declared) => declared == expected_boundary,
            None => !expected_boundary.is_empty() && content_type.contains(expected_boundary),
        };

        Self {
            content_type,
            declared_boundary,
            boundary_matched,
        }
    }

    /// Whether the media type is `multipart/x-mixed-replace`.
    pub fn is_mixed_replace(&self) -> bool {
        self.content_type
            .split(';')
            .next()
            .map(|media| media.trim().eq_ignore_ascii_case(STREAM_MEDIA_TYPE))
            .unwrap_or(false)
    }
}

/// Find the first occurrence of `needle` in `haystack` at or after `from`.
pub(crate) fn find(haystack: &[u8], needle: &[u8], from: usize) -> Option<usize> {
    if needle.is_empty() || from >= haystack.len() {
        return None;
    }
    haystack[from..]
        .windows(needle.len())
        .position(|window| window == needle)
        .map(|pos| from + pos)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_frame_marker_layout() {
        let marker = frame_marker("abc");
        assert_eq!(marker, b"--abc\r\nContent-Type: image/jpeg\r\n");
    }

    #[test]
    fn test_parse_content_length_valid() {
        assert_eq!(parse_content_length(b"0"), Ok(0));
        assert_eq!(parse_content_length(b"48213"), Ok(48213));
        assert_eq!(parse_content_length(b" 17 "), Ok(17));
        assert_eq!(parse_content_length(b"+1"), Ok(1));
    }

    #[test]
    fn test_parse_content_length_rejects_garbage() {
        assert_eq!(parse_content_length(b""), Err(LengthParseError::Empty));
        assert_eq!(parse_content_length(b"   "), Err(LengthParseError::Empty));
        assert!(matches!(
            parse_content_length(b"abc"),
            Err(LengthParseError::NotNumeric(_))
        ));
        assert!(matches!(
            parse_content_length(b"-1"),
            Err(LengthParseError::NotNumeric(_))
        ));
        assert!(matches!(
            parse_content_length(b"+"),
            Err(LengthParseError::NotNumeric(_))
        ));
        assert!(matches!(
            parse_content_length(b"++1"),
            Err(LengthParseError::NotNumeric(_))
        ));
        assert!(matches!(
            parse_content_length(b"12x"),
            Err(LengthParseError::NotNumeric(_))
        ));
    }

    #[test]
    fn test_parse_content_length_overflow() {
        let result = parse_content_length(b"999999999999999999999999999999");
        assert!(matches!(result, Err(LengthParseError::OutOfRange(_))));
    }

    #[test]
    fn test_build_part_matches_server_layout() {
        let part = build_part("frameboundary", b"\xFF\xD8\xFF\xD9");
        let mut expected = b"--frameboundary\r\nContent-Type: image/jpeg\r\nContent-Length: 4\r\n\r\n".to_vec();
        expected.extend_from_slice(b"\xFF\xD8\xFF\xD9\r\n");
        assert_eq!(part, expected);
    }

    #[test]
    fn test_stream_content_type() {
        assert_eq!(
            stream_content_type("frameboundary"),
            "multipart/x-mixed-replace; boundary=frameboundary"
        );
    }

    #[test]
    fn test_handshake_matching_boundary() {
        let hs = Handshake::inspect(
            Some("multipart/x-mixed-replace;boundary=frameboundary"),
            "frameboundary",
        );
        assert!(hs.boundary_matched);
        assert!(hs.is_mixed_replace());
        assert_eq!(hs.declared_boundary.as_deref(), Some("frameboundary"));
    }

    #[test]
    fn test_handshake_quoted_and_dashed_boundary() {
        let hs = Handshake::inspect(
            Some("multipart/x-mixed-replace; boundary=\"--frameboundary\""),
            "frameboundary",
        );
        assert!(hs.boundary_matched);
    }

    #[test]
    fn test_handshake_mismatch_is_reported() {
        let hs = Handshake::inspect(
            Some("multipart/x-mixed-replace; boundary=other"),
            "frameboundary",
        );
        assert!(!hs.boundary_matched);
        assert_eq!(hs.declared_boundary.as_deref(), Some("other"));
    }

    #[test]
    fn test_handshake_missing_header() {
        let hs = Handshake::inspect(None, "frameboundary");
        assert!(!hs.boundary_matched);
        assert!(!hs.is_mixed_replace());
        assert!(hs.content_type.is_empty());
    }

    #[test]
    fn test_find() {
        assert_eq!(find(b"abcabc", b"bc", 0), Some(1));
        assert_eq!(find(b"abcabc", b"bc", 2), Some(4));
        assert_eq!(find(b"abcabc", b"zz", 0), None);
        assert_eq!(find(b"abc", b"abcd", 0), None);
        assert_eq!(find(b"abc", b"a", 3), None);
    }
}
