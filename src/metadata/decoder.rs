// Decoder tier: open the file with ffmpeg and read the parsed input stream.
// Skipped entirely when no ffmpeg binary can be run.

use std::path::Path;
use ffmpeg_sidecar::command::FfmpegCommand;
use ffmpeg_sidecar::event::{FfmpegEvent, StreamTypeSpecificData};

use crate::error::{GalleryError, Result};
use crate::metadata::{MediaProbe, VideoInfo};

pub struct DecoderProbe;

/// What ffmpeg reported about the first video stream of input 0.
#[derive(Debug, Clone, Copy, PartialEq)]
struct DecodedStream {
    width: u32,
    height: u32,
    fps: f32,
}

impl MediaProbe for DecoderProbe {
    fn name(&self) -> &'static str {
        "decoder"
    }

    fn probe(&self, path: &Path) -> Result<VideoInfo> {
        if !crate::tools::is_tool_available("ffmpeg") {
            return Err(GalleryError::Classification("ffmpeg not available".into()));
        }

        // Zero output frames: ffmpeg parses the container headers and stops.
        let mut child = FfmpegCommand::new_with_path(crate::tools::ffmpeg_path())
            .hide_banner()
            .input(path)
            .args(["-frames:v", "0"])
            .format("null")
            .output("-")
            .spawn()
            .map_err(|e| GalleryError::Classification(format!("Failed to run ffmpeg: {}", e)))?;

        let mut stream: Option<DecodedStream> = None;
        let mut duration: Option<f64> = None;

        let events = child
            .iter()
            .map_err(|e| GalleryError::Classification(format!("ffmpeg output unreadable: {}", e)))?;

        for event in events {
            match event {
                FfmpegEvent::ParsedInputStream(input) if stream.is_none() => {
                    if let StreamTypeSpecificData::Video(video) = &input.type_specific_data {
                        stream = Some(DecodedStream {
                            width: video.width,
                            height: video.height,
                            fps: video.fps,
                        });
                    }
                }
                FfmpegEvent::ParsedDuration(d) if d.input_index == 0 => {
                    duration = Some(d.duration);
                }
                _ => {}
            }
        }

        // Exit status is irrelevant: the null muxer may complain about zero frames.
        let _ = child.wait();

        let stream = stream
            .ok_or_else(|| GalleryError::Classification("ffmpeg reported no video stream".into()))?;
        into_video_info(stream, duration)
    }
}

/// Duration is ffmpeg's parsed container duration in place of frame count
/// over fps: with zero output frames no frame count is ever read. A stream
/// without a usable fps still reports 0.
fn into_video_info(stream: DecodedStream, duration: Option<f64>) -> Result<VideoInfo> {
    if stream.width == 0 || stream.height == 0 {
        return Err(GalleryError::Classification("decoder reported empty frame size".into()));
    }

    let duration = if stream.fps > 0.0 {
        duration.unwrap_or(0.0).max(0.0)
    } else {
        0.0
    };

    Ok(VideoInfo::from_dimensions(
        i64::from(stream.width),
        i64::from(stream.height),
        duration,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metadata::Orientation;

    #[test]
    fn test_vertical_stream() {
        let info = into_video_info(
            DecodedStream { width: 1080, height: 1920, fps: 30.0 },
            Some(15.0),
        ).unwrap();
        assert_eq!(info.orientation, Orientation::Vertical);
        assert_eq!(info.duration, 15.0);
    }

    #[test]
    fn test_no_frame_rate_means_no_duration() {
        let info = into_video_info(
            DecodedStream { width: 1920, height: 1080, fps: 0.0 },
            Some(99.0),
        ).unwrap();
        assert_eq!(info.orientation, Orientation::Horizontal);
        assert_eq!(info.duration, 0.0);
    }

    #[test]
    fn test_empty_frame_size_falls_through() {
        assert!(into_video_info(DecodedStream { width: 0, height: 0, fps: 25.0 }, None).is_err());
    }

    #[test]
    fn test_unreadable_input_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing file.mp4");
        assert!(DecoderProbe.probe(&path).is_err());
    }
}
