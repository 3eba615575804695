// Orientation classification
//
// A classifier is an ordered list of probes. Each probe either measures the
// video or fails; the first success wins. When every probe fails the video
// is reported as unknown with zeroed measurements.

pub mod decoder;
pub mod ffprobe;
pub mod heuristic;

use std::fmt;
use std::path::Path;
use std::str::FromStr;
use serde::{Deserialize, Serialize};

use crate::constants::{HORIZONTAL_MIN_ASPECT, VERTICAL_MAX_ASPECT};
use crate::error::{GalleryError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Orientation {
    Vertical,
    Horizontal,
    Square,
    Unknown,
}

impl Orientation {
    pub fn as_str(&self) -> &'static str {
        match self {
            Orientation::Vertical => "vertical",
            Orientation::Horizontal => "horizontal",
            Orientation::Square => "square",
            Orientation::Unknown => "unknown",
        }
    }

    /// Lenient read of a stored value; anything unrecognised is unknown.
    pub fn from_db(value: Option<&str>) -> Self {
        value.and_then(|v| v.parse().ok()).unwrap_or(Orientation::Unknown)
    }
}

impl FromStr for Orientation {
    type Err = GalleryError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "vertical" => Ok(Orientation::Vertical),
            "horizontal" => Ok(Orientation::Horizontal),
            "square" => Ok(Orientation::Square),
            "unknown" => Ok(Orientation::Unknown),
            other => Err(GalleryError::Validation(format!("unknown orientation '{}'", other))),
        }
    }
}

impl fmt::Display for Orientation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Classify a frame size. Height <= 0 is treated as aspect 1.0.
pub fn classify_aspect(width: i64, height: i64) -> Orientation {
    let aspect = if height > 0 {
        width as f64 / height as f64
    } else {
        1.0
    };

    if aspect < VERTICAL_MAX_ASPECT {
        Orientation::Vertical
    } else if aspect > HORIZONTAL_MIN_ASPECT {
        Orientation::Horizontal
    } else {
        Orientation::Square
    }
}

/// Result of classifying one video file.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct VideoInfo {
    pub orientation: Orientation,
    pub width: i64,
    pub height: i64,
    /// Seconds; 0 means not measured.
    pub duration: f64,
}

impl VideoInfo {
    pub fn unknown() -> Self {
        Self {
            orientation: Orientation::Unknown,
            width: 0,
            height: 0,
            duration: 0.0,
        }
    }

    /// Measured frame size, orientation derived with the standard thresholds.
    pub fn from_dimensions(width: i64, height: i64, duration: f64) -> Self {
        Self {
            orientation: classify_aspect(width, height),
            width,
            height,
            duration,
        }
    }

    pub fn is_known(&self) -> bool {
        self.orientation != Orientation::Unknown
    }
}

/// One tier of the classification chain.
pub trait MediaProbe: Send + Sync {
    fn name(&self) -> &'static str;

    /// Measure `path`. An `Err` hands the file to the next tier.
    fn probe(&self, path: &Path) -> Result<VideoInfo>;
}

pub struct Classifier {
    probes: Vec<Box<dyn MediaProbe>>,
}

impl Classifier {
    pub fn new(probes: Vec<Box<dyn MediaProbe>>) -> Self {
        Self { probes }
    }

    /// decoder (ffmpeg) -> ffprobe -> filename keywords
    pub fn with_default_probes() -> Self {
        Self::new(vec![
            Box::new(decoder::DecoderProbe),
            Box::new(ffprobe::FfprobeProbe),
            Box::new(heuristic::FilenameHeuristic),
        ])
    }

    pub fn probe_names(&self) -> Vec<&'static str> {
        self.probes.iter().map(|p| p.name()).collect()
    }

    /// Classify a file. Never fails: exhausting every tier yields `VideoInfo::unknown()`.
    pub fn classify(&self, path: &Path) -> VideoInfo {
        for probe in &self.probes {
            match probe.probe(path) {
                Ok(info) => {
                    log::debug!(
                        "{}: {} {}x{} {:.2}s via {}",
                        path.display(), info.orientation, info.width, info.height,
                        info.duration, probe.name()
                    );
                    return info;
                }
                Err(e) => {
                    log::debug!("{} probe failed for {}: {}", probe.name(), path.display(), e);
                }
            }
        }

        log::info!("Could not classify {}", path.display());
        VideoInfo::unknown()
    }
}

impl Default for Classifier {
    fn default() -> Self {
        Self::with_default_probes()
    }
}
