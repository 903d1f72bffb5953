//! The viewing loop.
//!
//! [`Viewer`] ties the pieces together:
//! 1. Pull the next chunk from the [`ChunkSource`]
//! 2. Feed it to the [`FrameExtractor`]
//! 3. Hand every completed frame to the [`FrameSink`], in stream order
//! 4. Repeat until the stream ends, the sink asks to stop, or a fatal error
//!
//! Awaiting the next chunk is the only suspension point; extraction and
//! display run to completion in between. The sink is closed exactly once on
//! every exit path, including when the `run` future is dropped.
//!
//! # Example
//!
//! ```ignore
//! use mjpeg_client::{FrameExtractor, StreamConfig, Viewer};
//! use mjpeg_client::sink::JpegInspectSink;
//! use mjpeg_client::transport::HttpChunkSource;
//!
//! let config = StreamConfig::new("192.168.1.7");
//! let source = HttpChunkSource::connect(&config).await?;
//! let mut viewer = Viewer::new(source, FrameExtractor::from_config(&config), JpegInspectSink::new());
//! let summary = viewer.run().await?;
//! ```

use serde::Serialize;

use crate::error::Result;
use crate::protocol::FrameExtractor;
use crate::sink::{FrameSink, SinkControl};
use crate::transport::ChunkSource;

/// Why a run ended without error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EndReason {
    /// The source reported end of stream.
    StreamEnded,
    /// The sink asked to stop.
    StopRequested,
    /// The run was cancelled from outside (e.g. Ctrl-C).
    Interrupted,
}

/// Counters describing one run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RunSummary {
    pub chunks_received: u64,
    pub bytes_received: u64,
    /// Frames handed to the sink.
    pub frames_extracted: u64,
    /// Frames the sink decoded and displayed.
    pub frames_displayed: u64,
    /// Frames the sink failed to decode.
    pub frames_skipped: u64,
    /// Parts dropped for an unparsable `Content-Length`.
    pub corrupt_parts: u64,
    pub end_reason: EndReason,
}

#[derive(Debug, Default)]
struct Progress {
    chunks_received: u64,
    bytes_received: u64,
    frames_extracted: u64,
    frames_displayed: u64,
    frames_skipped: u64,
}

/// Drives chunks from a source through the extractor into a sink.
pub struct Viewer<S, K: FrameSink> {
    source: S,
    extractor: FrameExtractor,
    sink: K,
    progress: Progress,
    closed: bool,
}

impl<S, K> Viewer<S, K>
where
    S: ChunkSource,
    K: FrameSink,
{
    /// Create a viewer over `source`, using `extractor` and displaying into `sink`.
    pub fn new(source: S, extractor: FrameExtractor, sink: K) -> Self {
        Self {
            source,
            extractor,
            sink,
            progress: Progress::default(),
            closed: false,
        }
    }

    /// Run until the stream ends, the sink stops, or a fatal error occurs.
    ///
    /// The sink is closed before this returns, whatever the outcome.
    pub async fn run(&mut self) -> Result<RunSummary> {
        let result = self.pump().await;
        self.close();

        match &result {
            Ok(summary) => tracing::debug!(
                "Stream finished ({:?}): {} frames displayed, {} skipped",
                summary.end_reason,
                summary.frames_displayed,
                summary.frames_skipped
            ),
            Err(e) => tracing::error!("Stream terminated: {}", e),
        }

        result
    }

    /// Main loop - reads chunks and dispatches frames.
    async fn pump(&mut self) -> Result<RunSummary> {
        loop {
            let Some(chunk) = self.source.next_chunk().await? else {
                return Ok(self.summary(EndReason::StreamEnded));
            };

            self.progress.chunks_received += 1;
            self.progress.bytes_received += chunk.len() as u64;

            let frames = self.extractor.feed(&chunk)?;

            for frame in frames {
                self.progress.frames_extracted += 1;
                let sequence = frame.sequence();

                match self.sink.show(frame) {
                    Ok(SinkControl::Continue) => self.progress.frames_displayed += 1,
                    Ok(SinkControl::Stop) => {
                        self.progress.frames_displayed += 1;
                        tracing::debug!("Sink requested stop after frame {}", sequence);
                        return Ok(self.summary(EndReason::StopRequested));
                    }
                    Err(e) => {
                        tracing::warn!("Failed to decode frame {}: {}", sequence, e);
                        self.progress.frames_skipped += 1;
                    }
                }
            }
        }
    }

    /// Snapshot of the counters so far.
    pub fn summary(&self, end_reason: EndReason) -> RunSummary {
        RunSummary {
            chunks_received: self.progress.chunks_received,
            bytes_received: self.progress.bytes_received,
            frames_extracted: self.progress.frames_extracted,
            frames_displayed: self.progress.frames_displayed,
            frames_skipped: self.progress.frames_skipped,
            corrupt_parts: self.extractor.corrupt_parts_skipped(),
            end_reason,
        }
    }

    /// Close the sink if it is still open.
    pub fn close(&mut self) {
        if !self.closed {
            self.closed = true;
            self.sink.close();
        }
    }

    pub fn sink(&self) -> &K {
        &self.sink
    }

    pub fn extractor(&self) -> &FrameExtractor {
        &self.extractor
    }

    pub fn source(&self) -> &S {
        &self.source
    }
}

impl<S, K: FrameSink> Drop for Viewer<S, K> {
    fn drop(&mut self) {
        if !self.closed {
            self.closed = true;
            self.sink.close();
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::VecDeque;

    use bytes::Bytes;

    use super::*;
    use crate::error::MjpegError;
    use crate::protocol::{build_part, Frame};
    use crate::sink::DecodeError;

    const BOUNDARY: &str = "frameboundary";

    /// Source replaying scripted results.
    struct ScriptedSource {
        items: VecDeque<Result<Bytes>>,
    }

    impl ScriptedSource {
        fn chunks(chunks: Vec<Vec<u8>>) -> Self {
            Self {
                items: chunks.into_iter().map(|c| Ok(Bytes::from(c))).collect(),
            }
        }

        fn then_fail(mut self) -> Self {
            self.items
                .push_back(Err(MjpegError::Connection("connection reset".into())));
            self
        }
    }

    impl ChunkSource for ScriptedSource {
        async fn next_chunk(&mut self) -> Result<Option<Bytes>> {
            self.items.pop_front().transpose()
        }
    }

    /// Sink recording payloads, failing on payloads starting with `!`.
    #[derive(Default)]
    struct RecordingSink {
        payloads: Vec<Vec<u8>>,
        stop_after: Option<usize>,
        closes: usize,
    }

    impl FrameSink for RecordingSink {
        fn show(&mut self, frame: Frame) -> std::result::Result<SinkControl, DecodeError> {
            if frame.payload().starts_with(b"!") {
                return Err(DecodeError::Other("bad image".into()));
            }
            self.payloads.push(frame.payload().to_vec());
            match self.stop_after {
                Some(n) if self.payloads.len() >= n => Ok(SinkControl::Stop),
                _ => Ok(SinkControl::Continue),
            }
        }

        fn close(&mut self) {
            self.closes += 1;
        }
    }

    fn stream_of(payloads: &[&[u8]]) -> Vec<u8> {
        payloads
            .iter()
            .flat_map(|p| build_part(BOUNDARY, p))
            .collect()
    }

    #[tokio::test]
    async fn test_runs_until_stream_end() {
        let stream = stream_of(&[&b"a"[..], &b"bb"[..], &b"ccc"[..]]);
        let chunks = stream.chunks(7).map(<[u8]>::to_vec).collect();
        let mut viewer = Viewer::new(
            ScriptedSource::chunks(chunks),
            FrameExtractor::new(BOUNDARY),
            RecordingSink::default(),
        );

        let summary = viewer.run().await.unwrap();

        assert_eq!(summary.end_reason, EndReason::StreamEnded);
        assert_eq!(summary.frames_displayed, 3);
        assert_eq!(summary.bytes_received, stream.len() as u64);
        assert_eq!(
            viewer.sink().payloads,
            vec![b"a".to_vec(), b"bb".to_vec(), b"ccc".to_vec()]
        );
        assert_eq!(viewer.sink().closes, 1);
    }

    #[tokio::test]
    async fn test_stop_request_ends_run_mid_batch() {
        let stream = stream_of(&[&b"one"[..], &b"two"[..], &b"three"[..]]);
        let sink = RecordingSink {
            stop_after: Some(2),
            ..Default::default()
        };
        let mut viewer = Viewer::new(
            ScriptedSource::chunks(vec![stream]),
            FrameExtractor::new(BOUNDARY),
            sink,
        );

        let summary = viewer.run().await.unwrap();

        assert_eq!(summary.end_reason, EndReason::StopRequested);
        assert_eq!(summary.frames_displayed, 2);
        assert_eq!(viewer.sink().payloads.len(), 2);
        assert_eq!(viewer.sink().closes, 1);
    }

    #[tokio::test]
    async fn test_decode_error_skips_one_frame() {
        let stream = stream_of(&[&b"ok1"[..], &b"!broken"[..], &b"ok2"[..]]);
        let mut viewer = Viewer::new(
            ScriptedSource::chunks(vec![stream]),
            FrameExtractor::new(BOUNDARY),
            RecordingSink::default(),
        );

        let summary = viewer.run().await.unwrap();

        assert_eq!(summary.frames_extracted, 3);
        assert_eq!(summary.frames_displayed, 2);
        assert_eq!(summary.frames_skipped, 1);
        assert_eq!(viewer.sink().payloads, vec![b"ok1".to_vec(), b"ok2".to_vec()]);
    }

    #[tokio::test]
    async fn test_source_error_is_fatal_and_closes_sink() {
        let source = ScriptedSource::chunks(vec![stream_of(&[&b"x"[..]])]).then_fail();
        let mut viewer = Viewer::new(
            source,
            FrameExtractor::new(BOUNDARY),
            RecordingSink::default(),
        );

        let result = viewer.run().await;

        assert!(matches!(result, Err(MjpegError::Connection(_))));
        assert_eq!(viewer.sink().payloads, vec![b"x".to_vec()]);
        assert_eq!(viewer.sink().closes, 1);
    }

    #[tokio::test]
    async fn test_overflow_is_fatal() {
        let mut viewer = Viewer::new(
            ScriptedSource::chunks(vec![vec![b'z'; 40], vec![b'z'; 40]]),
            FrameExtractor::with_max_buffer_size(BOUNDARY, 64),
            RecordingSink::default(),
        );

        let result = viewer.run().await;

        assert!(matches!(result, Err(MjpegError::BufferOverflow { .. })));
        assert_eq!(viewer.summary(EndReason::StreamEnded).chunks_received, 2);
        assert_eq!(viewer.sink().closes, 1);
    }

    #[tokio::test]
    async fn test_corrupt_parts_are_counted() {
        let mut stream =
            b"--frameboundary\r\nContent-Type: image/jpeg\r\nContent-Length: nope\r\n\r\n".to_vec();
        stream.extend(build_part(BOUNDARY, b"fine"));
        let mut viewer = Viewer::new(
            ScriptedSource::chunks(vec![stream]),
            FrameExtractor::new(BOUNDARY),
            RecordingSink::default(),
        );

        let summary = viewer.run().await.unwrap();

        assert_eq!(summary.corrupt_parts, 1);
        assert_eq!(summary.frames_displayed, 1);
    }

    #[tokio::test]
    async fn test_closure_sink() {
        let mut lengths = Vec::new();
        {
            let sink = |frame: Frame| {
                lengths.push(frame.len());
                Ok::<_, DecodeError>(SinkControl::Continue)
            };
            let mut viewer = Viewer::new(
                ScriptedSource::chunks(vec![stream_of(&[&b"1234"[..], &b""[..]])]),
                FrameExtractor::new(BOUNDARY),
                sink,
            );
            viewer.run().await.unwrap();
        }
        assert_eq!(lengths, vec![4, 0]);
    }

    #[test]
    fn test_drop_closes_sink() {
        use std::cell::Cell;
        use std::rc::Rc;

        struct FlagSink(Rc<Cell<bool>>);
        impl FrameSink for FlagSink {
            fn show(&mut self, _frame: Frame) -> std::result::Result<SinkControl, DecodeError> {
                Ok(SinkControl::Continue)
            }
            fn close(&mut self) {
                self.0.set(true);
            }
        }

        let closed = Rc::new(Cell::new(false));
        let viewer = Viewer::new(
            ScriptedSource::chunks(vec![]),
            FrameExtractor::new(BOUNDARY),
            FlagSink(closed.clone()),
        );
        drop(viewer);

        assert!(closed.get());
    }

    #[test]
    fn test_summary_serializes() {
        let viewer = Viewer::new(
            ScriptedSource::chunks(vec![]),
            FrameExtractor::new(BOUNDARY),
            RecordingSink::default(),
        );
        let json = serde_json::to_value(viewer.summary(EndReason::Interrupted)).unwrap();

        assert_eq!(json["end_reason"], "interrupted");
        assert_eq!(json["frames_displayed"], 0);
    }
}
