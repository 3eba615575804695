// External tool resolver for ffmpeg/ffprobe
//
// Resolution order:
// 1) Environment variable override (VIDGALLERY_FFPROBE_PATH, VIDGALLERY_FFMPEG_PATH)
// 2) Binary next to the vidgallery executable (or in its bin/ subfolder)
// 3) PATH lookup

use std::env;
use std::path::PathBuf;
use std::process::Command;
use std::sync::OnceLock;

pub const FFPROBE_ENV: &str = "VIDGALLERY_FFPROBE_PATH";
pub const FFMPEG_ENV: &str = "VIDGALLERY_FFMPEG_PATH";

fn exe_dir() -> Option<PathBuf> {
    env::current_exe()
        .ok()
        .and_then(|p| p.parent().map(|d| d.to_path_buf()))
}

fn resolve_tool(env_key: &str, default_name: &str) -> PathBuf {
    if let Ok(v) = env::var(env_key) {
        let p = PathBuf::from(&v);
        if p.exists() {
            return p;
        }
        log::warn!("{} points to missing file {}, ignoring", env_key, v);
    }

    let mut filename = default_name.to_string();
    if cfg!(windows) && !filename.to_lowercase().ends_with(".exe") {
        filename.push_str(".exe");
    }

    if let Some(dir) = exe_dir() {
        for candidate in [dir.join(&filename), dir.join("bin").join(&filename)] {
            if candidate.exists() {
                return candidate;
            }
        }
    }

    PathBuf::from(default_name)
}

/// Get path to ffprobe binary
pub fn ffprobe_path() -> PathBuf {
    resolve_tool(FFPROBE_ENV, "ffprobe")
}

/// Get path to ffmpeg binary
pub fn ffmpeg_path() -> PathBuf {
    resolve_tool(FFMPEG_ENV, "ffmpeg")
}

fn runs(path: &PathBuf) -> bool {
    Command::new(path)
        .arg("-version")
        .output()
        .map(|o| o.status.success())
        .unwrap_or(false)
}

/// Check if a tool can be executed. The answer is cached for the process lifetime.
pub fn is_tool_available(tool: &str) -> bool {
    static FFPROBE: OnceLock<bool> = OnceLock::new();
    static FFMPEG: OnceLock<bool> = OnceLock::new();

    match tool {
        "ffprobe" => *FFPROBE.get_or_init(|| runs(&ffprobe_path())),
        "ffmpeg" => *FFMPEG.get_or_init(|| runs(&ffmpeg_path())),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_tool_fallback() {
        let path = resolve_tool("VIDGALLERY_TEST_NONEXISTENT", "testcmd");
        assert_eq!(path, PathBuf::from("testcmd"));
    }

    #[test]
    fn test_env_override() {
        let dir = tempfile::tempdir().unwrap();
        let tool = dir.path().join("fake_probe");
        std::fs::write(&tool, "test").unwrap();

        std::env::set_var("VIDGALLERY_TEST_TOOL", tool.to_str().unwrap());
        let path = resolve_tool("VIDGALLERY_TEST_TOOL", "default");
        assert_eq!(path, tool);
        std::env::remove_var("VIDGALLERY_TEST_TOOL");
    }

    #[test]
    fn test_env_override_missing_file_falls_back() {
        std::env::set_var("VIDGALLERY_TEST_MISSING", "/definitely/not/here");
        let path = resolve_tool("VIDGALLERY_TEST_MISSING", "default");
        assert_eq!(path, PathBuf::from("default"));
        std::env::remove_var("VIDGALLERY_TEST_MISSING");
    }

    #[test]
    fn test_unknown_tool_unavailable() {
        assert!(!is_tool_available("exiftool"));
    }
}
