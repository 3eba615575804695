// FFprobe tier: authoritative, but spawns a process per file

use std::path::Path;
use std::process::Command;
use serde::Deserialize;

use crate::error::{GalleryError, Result};
use crate::metadata::{MediaProbe, VideoInfo};

#[derive(Debug, Deserialize)]
struct FFprobeOutput {
    streams: Option<Vec<FFprobeStream>>,
    format: Option<FFprobeFormat>,
}

#[derive(Debug, Deserialize)]
struct FFprobeStream {
    codec_type: Option<String>,
    width: Option<i64>,
    height: Option<i64>,
}

#[derive(Debug, Deserialize)]
struct FFprobeFormat {
    duration: Option<String>,
}

pub struct FfprobeProbe;

impl MediaProbe for FfprobeProbe {
    fn name(&self) -> &'static str {
        "ffprobe"
    }

    fn probe(&self, path: &Path) -> Result<VideoInfo> {
        let output = Command::new(crate::tools::ffprobe_path())
            .args([
                "-v", "quiet",
                "-print_format", "json",
                "-show_format",
                "-show_streams",
            ])
            .arg(path)
            .output()
            .map_err(|e| GalleryError::Classification(format!("Failed to run ffprobe: {}", e)))?;

        if !output.status.success() {
            return Err(GalleryError::Classification(format!(
                "ffprobe exited with {}",
                output.status
            )));
        }

        parse_probe_output(&output.stdout)
    }
}

/// Read the first video stream's frame size and the container duration.
///
/// A stream without a frame size is an error, not an unknown result with the
/// measured duration, so the filename heuristic still gets a say.
fn parse_probe_output(stdout: &[u8]) -> Result<VideoInfo> {
    let probe_output: FFprobeOutput = serde_json::from_slice(stdout)
        .map_err(|e| GalleryError::Classification(format!("Failed to parse ffprobe output: {}", e)))?;

    let stream = probe_output
        .streams
        .as_deref()
        .unwrap_or_default()
        .iter()
        .find(|s| s.codec_type.as_deref() == Some("video"))
        .ok_or_else(|| GalleryError::Classification("no video stream".into()))?;

    let width = stream.width.unwrap_or(0);
    let height = stream.height.unwrap_or(0);
    if width <= 0 || height <= 0 {
        return Err(GalleryError::Classification(format!(
            "video stream has no frame size ({}x{})",
            width, height
        )));
    }

    let duration = probe_output
        .format
        .and_then(|f| f.duration)
        .and_then(|d| d.parse::<f64>().ok())
        .unwrap_or(0.0);

    Ok(VideoInfo::from_dimensions(width, height, duration))
}
