// Filename tier: keyword guess, placeholder dimensions, no duration

use std::path::Path;

use crate::constants::{
    HEURISTIC_HORIZONTAL_DIMS, HEURISTIC_VERTICAL_DIMS, HORIZONTAL_KEYWORDS, VERTICAL_KEYWORDS,
};
use crate::error::{GalleryError, Result};
use crate::metadata::{MediaProbe, Orientation, VideoInfo};

pub struct FilenameHeuristic;

impl MediaProbe for FilenameHeuristic {
    fn name(&self) -> &'static str {
        "filename"
    }

    fn probe(&self, path: &Path) -> Result<VideoInfo> {
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_lowercase())
            .unwrap_or_default();

        guess_from_name(&name)
            .ok_or_else(|| GalleryError::Classification("no orientation keyword in filename".into()))
    }
}

fn guess_from_name(lower_name: &str) -> Option<VideoInfo> {
    let (orientation, (width, height)) = if VERTICAL_KEYWORDS.iter().any(|k| lower_name.contains(k)) {
        (Orientation::Vertical, HEURISTIC_VERTICAL_DIMS)
    } else if HORIZONTAL_KEYWORDS.iter().any(|k| lower_name.contains(k)) {
        (Orientation::Horizontal, HEURISTIC_HORIZONTAL_DIMS)
    } else {
        return None;
    };

    Some(VideoInfo {
        orientation,
        width,
        height,
        duration: 0.0,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn guess(name: &str) -> Result<VideoInfo> {
        FilenameHeuristic.probe(Path::new(name))
    }

    #[test]
    fn test_vertical_keywords() {
        let info = guess("Dance_TikTok_2023.mp4").unwrap();
        assert_eq!(info.orientation, Orientation::Vertical);
        assert_eq!((info.width, info.height), (1080, 1920));
        assert_eq!(info.duration, 0.0);

        assert_eq!(guess("моё Вертикальное.mp4").unwrap().orientation, Orientation::Vertical);
    }

    #[test]
    fn test_horizontal_keywords() {
        let info = guess("trip-4K.mkv").unwrap();
        assert_eq!(info.orientation, Orientation::Horizontal);
        assert_eq!((info.width, info.height), (1920, 1080));
        assert_eq!(guess("Горизонт.webm").unwrap().orientation, Orientation::Horizontal);
    }

    #[test]
    fn test_vertical_checked_before_horizontal() {
        // "shorts" and "hd" both match
        assert_eq!(guess("shorts_hd.mp4").unwrap().orientation, Orientation::Vertical);
    }

    #[test]
    fn test_no_keyword_fails() {
        // "birthday" would match "hd"
        assert!(guess("family.mp4").is_err());
    }

    #[test]
    fn test_only_file_name_is_inspected() {
        assert!(guess("/videos/vertical/family.mp4").is_err());
    }
}
