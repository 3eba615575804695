// vidgallery Constants
// Thresholds and keyword sets below are classification policy. Changing them
// reclassifies existing libraries on the next re-detect.

// Paths
pub const GALLERY_FOLDER: &str = ".vidgallery";
pub const DB_FILENAME: &str = "gallery.db";
pub const CONFIG_FILENAME: &str = "config.json";

// Video extensions accepted by the scanner and upload
pub const ALLOWED_EXTENSIONS: [&str; 5] = ["mp4", "avi", "mov", "mkv", "webm"];

// Orientation thresholds (width / height)
pub const VERTICAL_MAX_ASPECT: f64 = 0.75;
pub const HORIZONTAL_MIN_ASPECT: f64 = 1.33;

// Placeholder dimensions reported by the filename heuristic
pub const HEURISTIC_VERTICAL_DIMS: (i64, i64) = (1080, 1920);
pub const HEURISTIC_HORIZONTAL_DIMS: (i64, i64) = (1920, 1080);

// Lower-case substrings; vertical is checked first
pub const VERTICAL_KEYWORDS: [&str; 9] = [
    "vertical", "portrait", "вертика", "верт", "vert", "tiktok", "reels", "shorts", "story",
];
pub const HORIZONTAL_KEYWORDS: [&str; 8] = [
    "horizontal", "landscape", "горизонт", "гор", "horiz", "fullhd", "hd", "4k",
];

// Scanner
pub const DEFAULT_SCAN_INTERVAL_SECS: u64 = 1800; // 30 minutes

// Catalog
pub const DEFAULT_HISTORY_LIMIT: usize = 10;
pub const TOP_VIDEOS_LIMIT: i64 = 5;
pub const DEFAULT_ADMIN_LOG_LIMIT: i64 = 50;

// SQLite busy timeout for short-lived connections
pub const DB_BUSY_TIMEOUT_MS: u64 = 5_000;

// Upload names that sanitise to nothing
pub const FALLBACK_STEM: &str = "video";

// Admin audit log action labels
pub const ACTION_GRANT_ADMIN: &str = "grant_admin";
pub const ACTION_BAN: &str = "ban";
pub const ACTION_UNBAN: &str = "unban";
pub const ACTION_DELETE: &str = "delete";
pub const ACTION_RENAME: &str = "rename";
pub const ACTION_FORCE_ORIENTATION: &str = "force_orientation";
pub const ACTION_CLEAR_LOGS: &str = "clear_logs";
pub const ACTION_RESCAN: &str = "rescan";
pub const ACTION_REDETECT: &str = "redetect_orientations";
pub const ACTION_FIX_ORIENTATIONS: &str = "fix_orientations";
pub const ACTION_UPLOAD: &str = "upload";
