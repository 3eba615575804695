// Shared gallery context
//
// One `Gallery` per process, shared behind an `Arc` by the CLI, the
// background scanner and any presentation layer on top.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

use crate::admin::AdminAuthority;
use crate::config::GalleryConfig;
use crate::db::Store;
use crate::error::Result;
use crate::metadata::Classifier;

pub struct Gallery {
    config: GalleryConfig,
    store: Store,
    classifier: Classifier,
    authority: AdminAuthority,
    /// Held around each single-row read-modify-write in batch operations.
    row_lock: Mutex<()>,
    /// Held for the whole of a folder scan.
    scan_lock: Mutex<()>,
}

impl Gallery {
    /// Open the gallery with the default ffmpeg/ffprobe/filename classifier.
    pub fn open(config: GalleryConfig) -> Result<Self> {
        Self::with_classifier(config, Classifier::with_default_probes())
    }

    /// Create the video root if needed, open and migrate the store.
    pub fn with_classifier(config: GalleryConfig, classifier: Classifier) -> Result<Self> {
        config.validate()?;
        fs::create_dir_all(&config.video_root)?;

        let store = Store::open(&config.resolved_db_path())?;
        let authority = AdminAuthority::new(config.admin_key.clone());

        log::info!(
            "Gallery opened: root={}, db={}, probes={:?}",
            config.video_root.display(),
            store.path().display(),
            classifier.probe_names()
        );

        Ok(Self {
            config,
            store,
            classifier,
            authority,
            row_lock: Mutex::new(()),
            scan_lock: Mutex::new(()),
        })
    }

    pub fn config(&self) -> &GalleryConfig {
        &self.config
    }

    pub fn video_root(&self) -> &Path {
        &self.config.video_root
    }

    pub fn store(&self) -> &Store {
        &self.store
    }

    pub fn classifier(&self) -> &Classifier {
        &self.classifier
    }

    pub fn authority(&self) -> &AdminAuthority {
        &self.authority
    }

    /// Resolve a requested, possibly percent-encoded, filename to a file under the root.
    pub fn resolve(&self, filename: &str) -> Option<PathBuf> {
        crate::ingest::paths::resolve_video_path(&self.config, filename)
    }

    /// File of a video record, by its stored filename.
    pub fn stored_path(&self, filename: &str) -> Option<PathBuf> {
        crate::ingest::paths::stored_video_path(&self.config, filename)
    }

    // A panic while holding either lock must not wedge the gallery.
    pub(crate) fn row_guard(&self) -> MutexGuard<'_, ()> {
        self.row_lock.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub(crate) fn scan_guard(&self) -> MutexGuard<'_, ()> {
        self.scan_lock.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[cfg(test)]
pub(crate) mod testing {
    //! Fixtures shared by the scenario tests.

    use std::collections::HashMap;
    use std::path::{Path, PathBuf};
    use std::sync::{Arc, Mutex};
    use tempfile::TempDir;

    use super::Gallery;
    use crate::config::GalleryConfig;
    use crate::error::{GalleryError, Result};
    use crate::metadata::{Classifier, MediaProbe, VideoInfo};

    pub const ADMIN_KEY: &str = "letmein";

    /// Probe that answers from a filename -> measurements table.
    #[derive(Clone, Default)]
    pub struct FakeProbe {
        known: Arc<Mutex<HashMap<String, VideoInfo>>>,
    }

    impl FakeProbe {
        pub fn set(&self, filename: &str, width: i64, height: i64, duration: f64) {
            self.known
                .lock()
                .unwrap()
                .insert(filename.to_string(), VideoInfo::from_dimensions(width, height, duration));
        }

        pub fn forget(&self, filename: &str) {
            self.known.lock().unwrap().remove(filename);
        }
    }

    impl MediaProbe for FakeProbe {
        fn name(&self) -> &'static str {
            "fake"
        }

        fn probe(&self, path: &Path) -> Result<VideoInfo> {
            let name = path
                .file_name()
                .map(|n| n.to_string_lossy().to_string())
                .unwrap_or_default();
            self.known
                .lock()
                .unwrap()
                .get(&name)
                .copied()
                .ok_or_else(|| GalleryError::Classification(format!("no fake data for {}", name)))
        }
    }

    /// Gallery over a fresh temp root, classified only by `probe`.
    /// The database sits next to the root so tests may delete the root.
    pub fn test_gallery(probe: &FakeProbe) -> (TempDir, Gallery) {
        let tmp = TempDir::new().unwrap();
        let mut config = GalleryConfig::for_root(tmp.path().join("videos"));
        config.db_path = Some(tmp.path().join("gallery.db"));
        config.admin_key = Some(ADMIN_KEY.to_string());
        let classifier = Classifier::new(vec![Box::new(probe.clone())]);
        let gallery = Gallery::with_classifier(config, classifier).unwrap();
        (tmp, gallery)
    }

    /// Put a dummy video file into the gallery root.
    pub fn touch(gallery: &Gallery, filename: &str) -> PathBuf {
        let path = gallery.video_root().join(filename);
        std::fs::write(&path, b"not really a video").unwrap();
        path
    }
}

#[cfg(test)]
mod tests {
    use super::testing::*;

    #[test]
    fn test_open_creates_root_and_db() {
        let probe = FakeProbe::default();
        let (_tmp, gallery) = test_gallery(&probe);
        assert!(gallery.video_root().is_dir());
        assert!(gallery.store().path().exists());
        assert_eq!(gallery.classifier().probe_names(), vec!["fake"]);
    }

    #[test]
    fn test_resolve_goes_through_root() {
        let probe = FakeProbe::default();
        let (_tmp, gallery) = test_gallery(&probe);
        let path = touch(&gallery, "clip.mp4");
        assert_eq!(gallery.resolve("clip.mp4"), Some(path));
        assert_eq!(gallery.resolve("other.mp4"), None);
    }
}
