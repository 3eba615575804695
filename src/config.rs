// Gallery configuration
// JSON file (explicit path, else the per-user config dir) with env overrides on top.

use std::env;
use std::path::{Path, PathBuf};
use serde::{Deserialize, Serialize};

use crate::constants::{
    ALLOWED_EXTENSIONS, CONFIG_FILENAME, DB_FILENAME, DEFAULT_HISTORY_LIMIT,
    DEFAULT_SCAN_INTERVAL_SECS, GALLERY_FOLDER,
};
use crate::error::{GalleryError, Result};

pub const VIDEO_ROOT_ENV: &str = "VIDGALLERY_VIDEO_ROOT";
pub const DB_PATH_ENV: &str = "VIDGALLERY_DB_PATH";
pub const ADMIN_KEY_ENV: &str = "VIDGALLERY_ADMIN_KEY";
pub const SCAN_INTERVAL_ENV: &str = "VIDGALLERY_SCAN_INTERVAL_SECS";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct GalleryConfig {
    pub video_root: PathBuf,
    pub db_path: Option<PathBuf>,
    pub scan_interval_secs: u64,
    pub allowed_extensions: Vec<String>,
    pub admin_key: Option<String>,
    pub history_limit: usize,
}

impl Default for GalleryConfig {
    fn default() -> Self {
        Self {
            video_root: PathBuf::from("videos"),
            db_path: None,
            scan_interval_secs: DEFAULT_SCAN_INTERVAL_SECS,
            allowed_extensions: ALLOWED_EXTENSIONS.iter().map(|e| e.to_string()).collect(),
            admin_key: None,
            history_limit: DEFAULT_HISTORY_LIMIT,
        }
    }
}

impl GalleryConfig {
    /// Config rooted at `video_root` with every other field defaulted.
    pub fn for_root(video_root: impl Into<PathBuf>) -> Self {
        Self {
            video_root: video_root.into(),
            ..Self::default()
        }
    }

    /// Load configuration.
    ///
    /// An explicit `path` must exist. Without one, the per-user config file is
    /// read when present. Environment overrides are applied last.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = match path {
            Some(p) => Self::from_file(p)?,
            None => match default_config_path() {
                Some(p) if p.exists() => Self::from_file(&p)?,
                _ => Self::default(),
            },
        };
        config.apply_env();
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path).map_err(|e| {
            GalleryError::Config(format!("cannot read {}: {}", path.display(), e))
        })?;
        let config: Self = serde_json::from_str(&raw)?;
        log::debug!("Loaded config from {}", path.display());
        Ok(config)
    }

    fn apply_env(&mut self) {
        if let Ok(v) = env::var(VIDEO_ROOT_ENV) {
            self.video_root = PathBuf::from(v);
        }
        if let Ok(v) = env::var(DB_PATH_ENV) {
            self.db_path = Some(PathBuf::from(v));
        }
        if let Ok(v) = env::var(ADMIN_KEY_ENV) {
            if !v.is_empty() {
                self.admin_key = Some(v);
            }
        }
        if let Ok(v) = env::var(SCAN_INTERVAL_ENV) {
            match v.parse() {
                Ok(secs) => self.scan_interval_secs = secs,
                Err(_) => log::warn!("Ignoring invalid {}={}", SCAN_INTERVAL_ENV, v),
            }
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.scan_interval_secs == 0 {
            return Err(GalleryError::Config("scanIntervalSecs must be positive".into()));
        }
        if self.allowed_extensions.is_empty() {
            return Err(GalleryError::Config("allowedExtensions must not be empty".into()));
        }
        Ok(())
    }

    /// Database location: explicit `db_path`, else `<video_root>/.vidgallery/gallery.db`.
    pub fn resolved_db_path(&self) -> PathBuf {
        self.db_path
            .clone()
            .unwrap_or_else(|| self.video_root.join(GALLERY_FOLDER).join(DB_FILENAME))
    }

    /// Case-insensitive extension check against the allow-set.
    pub fn is_allowed_extension(&self, ext: &str) -> bool {
        self.allowed_extensions
            .iter()
            .any(|allowed| allowed.eq_ignore_ascii_case(ext))
    }
}

/// `<config dir>/vidgallery/config.json` for the current user.
pub fn default_config_path() -> Option<PathBuf> {
    directories::ProjectDirs::from("", "", "vidgallery")
        .map(|dirs| dirs.config_dir().join(CONFIG_FILENAME))
}
