// Filename handling: percent-decoding, root-relative resolution, upload naming

use std::fs;
use std::path::{Component, Path, PathBuf};
use std::sync::LazyLock;
use regex::Regex;

use crate::config::GalleryConfig;
use crate::constants::FALLBACK_STEM;
use crate::error::{GalleryError, Result};

/// Decode `%XX` escapes. Returns None if the decoded bytes are not UTF-8.
/// Malformed escapes are kept literally.
pub fn percent_decode(raw: &str) -> Option<String> {
    let bytes = raw.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;

    while i < bytes.len() {
        if bytes[i] == b'%' && i + 2 < bytes.len() {
            if let (Some(hi), Some(lo)) = (hex_value(bytes[i + 1]), hex_value(bytes[i + 2])) {
                out.push(hi << 4 | lo);
                i += 3;
                continue;
            }
        }
        out.push(bytes[i]);
        i += 1;
    }

    String::from_utf8(out).ok()
}

fn hex_value(b: u8) -> Option<u8> {
    match b {
        b'0'..=b'9' => Some(b - b'0'),
        b'a'..=b'f' => Some(b - b'a' + 10),
        b'A'..=b'F' => Some(b - b'A' + 10),
        _ => None,
    }
}

/// Human-readable form of a stored filename.
pub fn display_name_for(filename: &str) -> String {
    percent_decode(filename).unwrap_or_else(|| filename.to_string())
}

/// A single plain path component; anything else could escape the root.
fn is_plain_name(name: &str) -> bool {
    let mut components = Path::new(name).components();
    matches!(
        (components.next(), components.next()),
        (Some(Component::Normal(_)), None)
    )
}

/// Path of a filename already stored as a key, taken literally.
/// Stored names are on-disk names and are never decoded again.
pub fn stored_video_path(config: &GalleryConfig, filename: &str) -> Option<PathBuf> {
    if !is_plain_name(filename) {
        log::warn!("Refusing to resolve '{}' outside the video root", filename);
        return None;
    }
    let path = config.video_root.join(filename);
    path.exists().then_some(path)
}

/// Find the file for a requested `filename` under the video root.
///
/// The name is percent-decoded first. When no file exists under the decoded
/// name, directory entries with an allowed extension are compared after
/// decoding them too.
pub fn resolve_video_path(config: &GalleryConfig, filename: &str) -> Option<PathBuf> {
    let decoded = display_name_for(filename);

    if !is_plain_name(&decoded) {
        log::warn!("Refusing to resolve '{}' outside the video root", filename);
        return None;
    }

    let direct = config.video_root.join(&decoded);
    if direct.exists() {
        return Some(direct);
    }

    let entries = fs::read_dir(&config.video_root).ok()?;
    for entry in entries.filter_map(|e| e.ok()) {
        let path = entry.path();
        if !super::discover::is_allowed_video(&path, config) {
            continue;
        }
        let Some(name) = entry.file_name().to_str().map(str::to_owned) else {
            continue;
        };
        if display_name_for(&name) == decoded {
            return Some(path);
        }
    }

    None
}

/// Split at the last dot of the final path segment; a leading dot run is not an extension.
fn split_extension(name: &str) -> (&str, &str) {
    let segment_start = name.rfind(['/', '\\']).map(|i| i + 1).unwrap_or(0);
    match name.rfind('.') {
        Some(dot) if dot > segment_start && name[segment_start..dot].chars().any(|c| c != '.') => {
            (&name[..dot], &name[dot..])
        }
        _ => (name, ""),
    }
}

/// Extension of `name` without the dot, if any.
pub fn extension_of(name: &str) -> Option<&str> {
    let (_, ext) = split_extension(name);
    ext.strip_prefix('.').filter(|e| !e.is_empty())
}

static UNSAFE_CHARS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"[<>:"/\\|?*]"#).expect("static pattern"));

/// Replace characters that are unsafe in filenames, keeping any Unicode letters.
pub fn safe_filename(name: &str) -> String {
    let (stem, ext) = split_extension(name);
    let cleaned = UNSAFE_CHARS.replace_all(stem, "_");
    let trimmed = cleaned.trim_matches(|c| c == ' ' || c == '.');
    let stem = if trimmed.is_empty() { FALLBACK_STEM } else { trimmed };
    format!("{}{}", stem, ext)
}

/// Sanitise `name` and append `_1`, `_2`, ... until it does not collide in `dir`.
pub fn unique_filename(dir: &Path, name: &str) -> Result<String> {
    let safe = safe_filename(name);
    if !dir.join(&safe).exists() {
        return Ok(safe);
    }

    let (stem, ext) = split_extension(&safe);
    for i in 1..10_000 {
        let candidate = format!("{}_{}{}", stem, i, ext);
        if !dir.join(&candidate).exists() {
            return Ok(candidate);
        }
    }

    Err(GalleryError::Conflict(format!("no free filename for {}", safe)))
}
