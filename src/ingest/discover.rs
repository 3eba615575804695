// Video discovery in the gallery root

use std::collections::BTreeSet;
use std::path::Path;
use walkdir::WalkDir;

use crate::config::GalleryConfig;
use crate::error::{GalleryError, Result};

/// Filenames of all allowed videos directly inside the video root.
/// Subdirectories are not descended into.
pub fn discover_videos(config: &GalleryConfig) -> Result<BTreeSet<String>> {
    let root = &config.video_root;
    if !root.is_dir() {
        return Err(GalleryError::NotFound(format!(
            "video root {}",
            root.display()
        )));
    }

    let mut names = BTreeSet::new();

    for entry in WalkDir::new(root)
        .min_depth(1)
        .max_depth(1)
        .follow_links(true)
        .into_iter()
    {
        let entry = match entry {
            Ok(e) => e,
            Err(e) => {
                log::warn!("Skipping unreadable entry in {}: {}", root.display(), e);
                continue;
            }
        };

        let path = entry.path();
        if !entry.file_type().is_file() || !is_allowed_video(path, config) {
            continue;
        }

        match entry.file_name().to_str() {
            Some(name) => {
                names.insert(name.to_string());
            }
            None => log::warn!("Skipping non UTF-8 filename {}", path.display()),
        }
    }

    Ok(names)
}

/// Check the extension against the configured allow-set (case-insensitive).
pub fn is_allowed_video(path: &Path, config: &GalleryConfig) -> bool {
    match path.extension().and_then(|e| e.to_str()) {
        Some(ext) => config.is_allowed_extension(ext),
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn test_lists_allowed_files_only() {
        let dir = tempfile::tempdir().unwrap();
        let config = GalleryConfig::for_root(dir.path());
        for name in ["a.mp4", "B.MKV", "notes.txt", "noext"] {
            fs::write(dir.path().join(name), b"x").unwrap();
        }
        fs::create_dir_all(dir.path().join("sub")).unwrap();
        fs::write(dir.path().join("sub").join("nested.mp4"), b"x").unwrap();
        fs::create_dir_all(dir.path().join("folder.mp4")).unwrap();

        let names = discover_videos(&config).unwrap();
        let expected: BTreeSet<String> = ["B.MKV", "a.mp4"].iter().map(|s| s.to_string()).collect();
        assert_eq!(names, expected);
    }

    #[test]
    fn test_missing_root_is_not_found() {
        let config = GalleryConfig::for_root("/definitely/not/here");
        assert!(discover_videos(&config).unwrap_err().is_not_found());
    }

    #[test]
    fn test_custom_allow_set() {
        let mut config = GalleryConfig::for_root("/tmp");
        config.allowed_extensions = vec!["mp4".into()];
        assert!(is_allowed_video(Path::new("x.MP4"), &config));
        assert!(!is_allowed_video(Path::new("x.webm"), &config));
    }
}
