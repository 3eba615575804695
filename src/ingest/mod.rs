// Ingest: discovering videos in the root and importing uploads into it

pub mod copy;
pub mod discover;
pub mod paths;

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use serde::{Deserialize, Serialize};

use crate::constants::ACTION_UPLOAD;
use crate::db::schema::{self, NewVideo};
use crate::error::{GalleryError, Result};
use crate::gallery::Gallery;
use crate::metadata::{Orientation, VideoInfo};

/// Orientation requested by the uploader.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OrientationChoice {
    /// Use whatever the classifier reports.
    #[default]
    Auto,
    Fixed(Orientation),
}

impl OrientationChoice {
    fn apply(self, detected: VideoInfo) -> VideoInfo {
        match self {
            OrientationChoice::Auto => detected,
            OrientationChoice::Fixed(orientation) => VideoInfo { orientation, ..detected },
        }
    }
}

impl FromStr for OrientationChoice {
    type Err = GalleryError;

    fn from_str(s: &str) -> Result<Self> {
        if s.trim().eq_ignore_ascii_case("auto") {
            return Ok(OrientationChoice::Auto);
        }
        match s.parse::<Orientation>()? {
            Orientation::Unknown => Err(GalleryError::Validation(
                "orientation must be auto, vertical, horizontal or square".into(),
            )),
            o => Ok(OrientationChoice::Fixed(o)),
        }
    }
}

impl fmt::Display for OrientationChoice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OrientationChoice::Auto => f.write_str("auto"),
            OrientationChoice::Fixed(o) => write!(f, "{}", o),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportedVideo {
    pub filename: String,
    pub display_name: String,
    pub path: PathBuf,
    pub info: VideoInfo,
}

/// Import an uploaded file into the video root.
///
/// `original_name` is the name the uploader gave the file; it becomes the
/// display name and, sanitised and de-duplicated, the stored filename. Any
/// stale record under the chosen filename is replaced by a fresh one.
pub fn import_video(
    gallery: &Gallery,
    source: &Path,
    original_name: &str,
    choice: OrientationChoice,
) -> Result<ImportedVideo> {
    let original_name = original_name.trim();
    if original_name.is_empty() {
        return Err(GalleryError::Validation("no file name given".into()));
    }

    let allowed = paths::extension_of(original_name)
        .map(|ext| gallery.config().is_allowed_extension(ext))
        .unwrap_or(false);
    if !allowed {
        return Err(GalleryError::Validation(format!(
            "file type not allowed: {} (allowed: {})",
            original_name,
            gallery.config().allowed_extensions.join(", ")
        )));
    }

    if !source.is_file() {
        return Err(GalleryError::NotFound(format!("upload source {}", source.display())));
    }

    let filename = paths::unique_filename(gallery.video_root(), original_name)?;
    let dest = gallery.video_root().join(&filename);
    copy::copy_with_verify(source, &dest)?;

    let info = choice.apply(gallery.classifier().classify(&dest));
    let video = NewVideo {
        filename: filename.clone(),
        display_name: original_name.to_string(),
        info,
    };

    let details = format!(
        "file: {}, orientation: {} ({}), size: {}x{}, duration: {:.1}s",
        filename, info.orientation, choice, info.width, info.height, info.duration
    );

    let stored = gallery.store().transaction(|tx| {
        schema::replace_video(tx, &video)?;
        schema::insert_admin_log(tx, ACTION_UPLOAD, &details)?;
        Ok(())
    });

    if let Err(e) = stored {
        // Do not leave an untracked copy behind
        if let Err(rm) = fs::remove_file(&dest) {
            log::error!("Failed to remove {} after store error: {}", dest.display(), rm);
        }
        return Err(GalleryError::io_failure(format!("storing upload {} failed: {}", filename, e)));
    }

    log::info!("Imported {} as {}", original_name, details);

    Ok(ImportedVideo {
        filename,
        display_name: video.display_name,
        path: dest,
        info,
    })
}

#[cfg(test)]
mod tests;
