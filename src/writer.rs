//! Part writer for serving a multipart JPEG stream.
//!
//! The server side of the wire format: every JPEG handed to
//! [`PartWriter::write_frame`] goes out as one `multipart/x-mixed-replace`
//! part and is flushed immediately, so a viewer sees it without waiting for
//! the next image.
//!
//! # Example
//!
//! ```ignore
//! use mjpeg_client::writer::PartWriter;
//!
//! let mut writer = PartWriter::new(socket, "frameboundary");
//! for jpeg in camera_frames {
//!     writer.write_frame(&jpeg).await?;
//! }
//! ```

use std::io::IoSlice;

use tokio::io::{AsyncWrite, AsyncWriteExt};

use crate::error::{MjpegError, Result};
use crate::protocol::{encode_part_header, stream_content_type, CRLF};

/// Writes JPEG payloads as multipart parts to an async writer.
pub struct PartWriter<W> {
    writer: W,
    boundary: String,
    parts_written: u64,
}

impl<W> PartWriter<W>
where
    W: AsyncWrite + Unpin,
{
    /// Wrap `writer`, separating parts with `boundary`.
    pub fn new(writer: W, boundary: impl Into<String>) -> Self {
        Self {
            writer,
            boundary: boundary.into(),
            parts_written: 0,
        }
    }

    /// Value for the response's `Content-Type` header.
    pub fn content_type(&self) -> String {
        stream_content_type(&self.boundary)
    }

    /// Write one part carrying `payload` and flush.
    pub async fn write_frame(&mut self, payload: &[u8]) -> Result<()> {
        let header = encode_part_header(&self.boundary, payload.len());
        let pieces: [&[u8]; 3] = [&header, payload, CRLF];
        let total: usize = pieces.iter().map(|p| p.len()).sum();

        let mut written = 0;
        while written < total {
            let slices = remaining_slices(&pieces, written);
            let n = self.writer.write_vectored(&slices).await?;
            if n == 0 {
                return Err(MjpegError::Io(std::io::Error::new(
                    std::io::ErrorKind::WriteZero,
                    "write_vectored returned 0",
                )));
            }
            written += n;
        }

        self.writer.flush().await?;
        self.parts_written += 1;
        tracing::trace!("Wrote part {} ({} bytes)", self.parts_written, payload.len());
        Ok(())
    }

    /// Parts written so far.
    pub fn parts_written(&self) -> u64 {
        self.parts_written
    }

    /// Flush and shut down the underlying writer.
    pub async fn shutdown(&mut self) -> Result<()> {
        self.writer.shutdown().await?;
        Ok(())
    }

    /// Unwrap the underlying writer.
    pub fn into_inner(self) -> W {
        self.writer
    }
}

/// Build IoSlices for whatever remains after `skip_bytes` have been written.
fn remaining_slices<'a>(pieces: &[&'a [u8]], skip_bytes: usize) -> Vec<IoSlice<'a>> {
    let mut slices = Vec::with_capacity(pieces.len());
    let mut offset = 0;

    for piece in pieces {
        let end = offset + piece.len();
        if skip_bytes < end && !piece.is_empty() {
            let start_in_piece = skip_bytes.saturating_sub(offset);
            slices.push(IoSlice::new(&piece[start_in_piece..]));
        }
        offset = end;
    }

    slices
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::build_part;
    use tokio::io::{duplex, AsyncReadExt};

    #[test]
    fn test_remaining_slices_skips_written_bytes() {
        let pieces: [&[u8]; 3] = [b"head", b"body", b"\r\n"];

        let all = remaining_slices(&pieces, 0);
        assert_eq!(all.len(), 3);

        let rest = remaining_slices(&pieces, 6);
        assert_eq!(rest.len(), 2);
        assert_eq!(&*rest[0], b"dy");
        assert_eq!(&*rest[1], b"\r\n");

        assert!(remaining_slices(&pieces, 10).is_empty());
    }

    #[tokio::test]
    async fn test_write_frame_produces_part() {
        let (client, mut server) = duplex(4096);
        let mut writer = PartWriter::new(client, "frameboundary");

        writer.write_frame(b"\xFF\xD8jpeg\xFF\xD9").await.unwrap();
        writer.shutdown().await.unwrap();

        let mut received = Vec::new();
        server.read_to_end(&mut received).await.unwrap();

        assert_eq!(received, build_part("frameboundary", b"\xFF\xD8jpeg\xFF\xD9"));
        assert_eq!(writer.parts_written(), 1);
    }

    #[tokio::test]
    async fn test_write_frame_through_small_pipe() {
        // A pipe smaller than one part forces partial vectored writes.
        let (client, mut server) = duplex(16);
        let payload = vec![0xAB; 300];

        let reader = tokio::spawn(async move {
            let mut received = Vec::new();
            server.read_to_end(&mut received).await.unwrap();
            received
        });

        let mut writer = PartWriter::new(client, "b");
        writer.write_frame(&payload).await.unwrap();
        writer.write_frame(b"").await.unwrap();
        writer.shutdown().await.unwrap();
        drop(writer);

        let received = reader.await.unwrap();
        let mut expected = build_part("b", &payload);
        expected.extend(build_part("b", b""));
        assert_eq!(received, expected);
    }

    #[test]
    fn test_content_type() {
        let (client, _server) = duplex(64);
        let writer = PartWriter::new(client, "frameboundary");
        assert_eq!(
            writer.content_type(),
            "multipart/x-mixed-replace; boundary=frameboundary"
        );
    }
}
