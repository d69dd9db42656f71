//! Video processor - stream metadata via ffprobe

use async_trait::async_trait;
use serde::Deserialize;
use std::path::Path;
use tokio::process::Command;
use tracing::{debug, error};

use crate::error::{ExtractionError, ExtractionResult};
use crate::metadata::VideoMetadata;
use crate::traits::MediaProcessor;

#[derive(Debug, Deserialize)]
struct FFprobeOutput {
    format: Option<FFprobeFormat>,
    streams: Option<Vec<FFprobeStream>>,
}

#[derive(Debug, Deserialize)]
struct FFprobeFormat {
    duration: Option<String>,
}

#[derive(Debug, Deserialize)]
struct FFprobeStream {
    codec_type: Option<String>,
    codec_name: Option<String>,
    width: Option<u32>,
    height: Option<u32>,
    duration: Option<String>,
}

pub struct VideoProcessor {
    ffprobe_path: String,
}

impl VideoProcessor {
    pub fn new(ffprobe_path: String) -> Self {
        Self { ffprobe_path }
    }

    /// Run ffprobe against a file on disk.
    #[tracing::instrument(skip(self, file_path), fields(service = "video"))]
    pub async fn extract_from_path(&self, file_path: &Path) -> ExtractionResult<VideoMetadata> {
        debug!(path = %file_path.display(), "Probing video");

        let output = Command::new(&self.ffprobe_path)
            .args([
                "-v",
                "error",
                "-show_format",
                "-show_streams",
                "-of",
                "json",
            ])
            .arg(file_path)
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|e| ExtractionError::Probe(format!("failed to run ffprobe: {}", e)))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            error!(stderr = %stderr, "ffprobe exited with failure");
            return Err(ExtractionError::Probe(stderr.trim().to_string()));
        }

        parse_ffprobe_output(&output.stdout)
    }
}

fn parse_seconds(value: Option<&String>) -> Option<f64> {
    value
        .and_then(|d| d.parse::<f64>().ok())
        .filter(|d| d.is_finite() && *d >= 0.0)
}

/// Picks the first video stream; container duration wins over stream duration.
pub(crate) fn parse_ffprobe_output(stdout: &[u8]) -> ExtractionResult<VideoMetadata> {
    let json_output: FFprobeOutput =
        serde_json::from_slice(stdout).map_err(|e| ExtractionError::Parse(e.to_string()))?;

    let video_stream = json_output.streams.and_then(|streams| {
        streams
            .into_iter()
            .find(|s| s.codec_type.as_deref() == Some("video"))
    });

    let duration = parse_seconds(
        json_output
            .format
            .as_ref()
            .and_then(|f| f.duration.as_ref()),
    )
    .or_else(|| parse_seconds(video_stream.as_ref().and_then(|s| s.duration.as_ref())));

    Ok(VideoMetadata {
        duration,
        width: video_stream.as_ref().and_then(|s| s.width),
        height: video_stream.as_ref().and_then(|s| s.height),
        codec: video_stream.and_then(|s| s.codec_name),
    })
}

#[async_trait]
impl MediaProcessor for VideoProcessor {
    type Metadata = VideoMetadata;

    // ffprobe seeks within the file; the caller hands over a downloaded copy
    async fn extract_metadata(&self, path: &Path) -> ExtractionResult<VideoMetadata> {
        self.extract_from_path(path).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"{
        "streams": [
            {"index": 0, "codec_type": "audio", "codec_name": "aac", "duration": "10.00"},
            {"index": 1, "codec_type": "video", "codec_name": "h264",
             "width": 1920, "height": 1080, "duration": "9.98"}
        ],
        "format": {"filename": "clip.mp4", "duration": "10.016000"}
    }"#;

    #[test]
    fn test_parse_picks_video_stream() {
        let metadata = parse_ffprobe_output(SAMPLE.as_bytes()).unwrap();
        assert_eq!(metadata.width, Some(1920));
        assert_eq!(metadata.height, Some(1080));
        assert_eq!(metadata.codec.as_deref(), Some("h264"));
        assert_eq!(metadata.duration, Some(10.016));
    }

    #[test]
    fn test_parse_falls_back_to_stream_duration() {
        let json = r#"{"streams": [{"codec_type": "video", "codec_name": "vp9",
            "width": 640, "height": 360, "duration": "4.5"}], "format": {}}"#;
        let metadata = parse_ffprobe_output(json.as_bytes()).unwrap();
        assert_eq!(metadata.duration, Some(4.5));
        assert_eq!(metadata.codec.as_deref(), Some("vp9"));
    }

    #[test]
    fn test_parse_without_video_stream() {
        let json = r#"{"streams": [{"codec_type": "audio", "codec_name": "mp3"}],
            "format": {"duration": "N/A"}}"#;
        let metadata = parse_ffprobe_output(json.as_bytes()).unwrap();
        assert_eq!(metadata.width, None);
        assert_eq!(metadata.codec, None);
        assert_eq!(metadata.duration, None);
    }

    #[test]
    fn test_parse_rejects_garbage() {
        let result = parse_ffprobe_output(b"ffprobe: command not found");
        assert!(matches!(result, Err(ExtractionError::Parse(_))));
    }

    #[tokio::test]
    async fn test_missing_ffprobe_binary_is_probe_error() {
        let processor = VideoProcessor::new("/nonexistent/ffprobe".to_string());
        let file = tempfile::NamedTempFile::new().unwrap();
        std::fs::write(file.path(), b"\x00\x00\x00\x18ftypmp42").unwrap();
        let result = processor.extract_metadata(file.path()).await;
        assert!(matches!(result, Err(ExtractionError::Probe(_))));
    }
}
