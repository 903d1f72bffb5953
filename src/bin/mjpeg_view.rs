//! mjpeg-view - watch a camera's MJPEG stream from the terminal.
//!
//! Connects to the configured endpoint, validates every frame's JPEG header,
//! and logs its geometry. Stops on Ctrl-C, at the end of the stream, or after
//! `MJPEG_MAX_FRAMES` frames, then prints a JSON summary of the run.
//!
//! Configuration comes from `MJPEG_*` environment variables (a `.env` file is
//! loaded first), see [`mjpeg_client::StreamConfig::from_env`].

use anyhow::Context;
use mjpeg_client::sink::JpegInspectSink;
use mjpeg_client::transport::HttpChunkSource;
use mjpeg_client::{EndReason, FrameExtractor, MjpegError, StreamConfig, Viewer};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

/// Read `MJPEG_MAX_FRAMES`; unset or blank means no limit.
fn parse_frame_limit(raw: Option<&str>) -> anyhow::Result<Option<u64>> {
    let Some(value) = raw.map(str::trim).filter(|value| !value.is_empty()) else {
        return Ok(None);
    };

    match value.parse::<u64>() {
        Ok(0) => anyhow::bail!("MJPEG_MAX_FRAMES must be a positive integer, got 0"),
        Ok(limit) => Ok(Some(limit)),
        Err(e) => Err(e).with_context(|| {
            format!("MJPEG_MAX_FRAMES must be a positive integer, got {value:?}")
        }),
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = StreamConfig::from_env()?;
    let frame_limit = parse_frame_limit(std::env::var("MJPEG_MAX_FRAMES").ok().as_deref())?;

    info!("Connecting to MJPEG stream at: {}", config.url());

    let source = match HttpChunkSource::connect(&config).await {
        Ok(source) => source,
        Err(e) => {
            error!("Could not open stream at {}: {}", config.url(), e);
            if matches!(e, MjpegError::Connection(_) | MjpegError::ConnectTimeout(_)) {
                error!(
                    "Make sure the camera server is running and '{}' is reachable",
                    config.host
                );
            }
            return Err(e.into());
        }
    };

    let sink = JpegInspectSink::new().with_frame_limit(frame_limit);
    let mut viewer = Viewer::new(source, FrameExtractor::from_config(&config), sink);

    let outcome = tokio::select! {
        result = viewer.run() => Some(result),
        _ = tokio::signal::ctrl_c() => None,
    };

    let summary = match outcome {
        Some(Ok(summary)) => summary,
        Some(Err(e)) => return Err(e.into()),
        None => {
            info!("Interrupted");
            viewer.close();
            viewer.summary(EndReason::Interrupted)
        }
    };

    println!("{}", serde_json::to_string_pretty(&summary)?);
    info!("Client exited");
    Ok(())
}
