// Database schema types and query helpers
//
// Helpers take a plain `&Connection`; a `&Transaction` derefs to one, so the
// same helpers compose into the multi-table units driven from `Store::transaction`.

use std::collections::HashSet;
use rusqlite::{Connection, params, OptionalExtension, Row};
use serde::{Deserialize, Serialize};

use crate::error::{GalleryError, Result};
use crate::metadata::{Orientation, VideoInfo};

// ----- Video -----

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Video {
    pub filename: String,
    pub display_name: String,
    pub orientation: Orientation,
    pub width: i64,
    pub height: i64,
    pub duration: f64,
    pub banned: bool,
    pub views: i64,
    pub likes: i64,
    pub dislikes: i64,
    pub created_at: String,
    pub updated_at: String,
}

/// Row shape used by gallery listings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VideoSummary {
    pub filename: String,
    pub display_name: String,
    pub orientation: Orientation,
}

#[derive(Debug, Clone)]
pub struct NewVideo {
    pub filename: String,
    pub display_name: String,
    pub info: VideoInfo,
}

const VIDEO_COLUMNS: &str = "filename, display_name, orientation, width, height, duration,
    banned, views, likes, dislikes, created_at, updated_at";

// Columns may be NULL in databases written by older builds.
fn map_video(row: &Row) -> rusqlite::Result<Video> {
    let filename: String = row.get(0)?;
    let display_name: Option<String> = row.get(1)?;
    let orientation: Option<String> = row.get(2)?;
    Ok(Video {
        display_name: display_name.unwrap_or_else(|| filename.clone()),
        filename,
        orientation: Orientation::from_db(orientation.as_deref()),
        width: row.get::<_, Option<i64>>(3)?.unwrap_or(0),
        height: row.get::<_, Option<i64>>(4)?.unwrap_or(0),
        duration: row.get::<_, Option<f64>>(5)?.unwrap_or(0.0),
        banned: row.get::<_, Option<i64>>(6)?.unwrap_or(0) != 0,
        views: row.get::<_, Option<i64>>(7)?.unwrap_or(0),
        likes: row.get::<_, Option<i64>>(8)?.unwrap_or(0),
        dislikes: row.get::<_, Option<i64>>(9)?.unwrap_or(0),
        created_at: row.get::<_, Option<String>>(10)?.unwrap_or_default(),
        updated_at: row.get::<_, Option<String>>(11)?.unwrap_or_default(),
    })
}

fn map_summary(row: &Row) -> rusqlite::Result<VideoSummary> {
    let filename: String = row.get(0)?;
    let display_name: Option<String> = row.get(1)?;
    let orientation: Option<String> = row.get(2)?;
    Ok(VideoSummary {
        display_name: display_name.unwrap_or_else(|| filename.clone()),
        filename,
        orientation: Orientation::from_db(orientation.as_deref()),
    })
}

/// Insert a discovered video. Returns false if the filename is already known.
pub fn insert_video_if_absent(conn: &Connection, video: &NewVideo) -> Result<bool> {
    let inserted = conn.execute(
        "INSERT OR IGNORE INTO videos (filename, orientation, display_name, width, height, duration)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        params![
            video.filename,
            video.info.orientation.as_str(),
            video.display_name,
            video.info.width,
            video.info.height,
            video.info.duration,
        ],
    )?;
    Ok(inserted > 0)
}

/// Replace any existing row (and its ban/rating rows) with a fresh active record.
/// Call inside a transaction.
pub fn replace_video(conn: &Connection, video: &NewVideo) -> Result<()> {
    delete_video_rows(conn, &video.filename)?;
    conn.execute(
        "INSERT INTO videos
            (filename, orientation, display_name, width, height, duration, banned, views, likes, dislikes)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, 0, 0, 0, 0)",
        params![
            video.filename,
            video.info.orientation.as_str(),
            video.display_name,
            video.info.width,
            video.info.height,
            video.info.duration,
        ],
    )?;
    Ok(())
}

pub fn get_video(conn: &Connection, filename: &str) -> Result<Option<Video>> {
    let result = conn.query_row(
        &format!("SELECT {} FROM videos WHERE filename = ?1", VIDEO_COLUMNS),
        params![filename],
        map_video,
    ).optional()?;
    Ok(result)
}

/// Like `get_video`, but a missing record is an error.
pub fn require_video(conn: &Connection, filename: &str) -> Result<Video> {
    get_video(conn, filename)?
        .ok_or_else(|| GalleryError::NotFound(format!("video {}", filename)))
}

pub fn list_filenames(conn: &Connection) -> Result<HashSet<String>> {
    let mut stmt = conn.prepare("SELECT filename FROM videos")?;
    let names = stmt
        .query_map([], |row| row.get::<_, String>(0))?
        .collect::<rusqlite::Result<HashSet<_>>>()?;
    Ok(names)
}

/// Filenames with any measurement still at 0 (or NULL).
pub fn list_incomplete(conn: &Connection) -> Result<Vec<String>> {
    let mut stmt = conn.prepare(
        "SELECT filename FROM videos
         WHERE IFNULL(width, 0) = 0 OR IFNULL(height, 0) = 0 OR IFNULL(duration, 0) = 0
         ORDER BY filename",
    )?;
    let names = stmt
        .query_map([], |row| row.get::<_, String>(0))?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(names)
}

/// All (filename, orientation) pairs, for batch re-classification.
pub fn list_orientations(conn: &Connection) -> Result<Vec<(String, Orientation)>> {
    let mut stmt = conn.prepare("SELECT filename, orientation FROM videos ORDER BY filename")?;
    let rows = stmt
        .query_map([], |row| {
            let orientation: Option<String> = row.get(1)?;
            Ok((row.get::<_, String>(0)?, Orientation::from_db(orientation.as_deref())))
        })?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(rows)
}

pub fn update_video_info(conn: &Connection, filename: &str, info: &VideoInfo) -> Result<usize> {
    let n = conn.execute(
        "UPDATE videos SET orientation = ?1, width = ?2, height = ?3, duration = ?4,
                updated_at = CURRENT_TIMESTAMP
         WHERE filename = ?5",
        params![info.orientation.as_str(), info.width, info.height, info.duration, filename],
    )?;
    Ok(n)
}

/// Override orientation only; measurements are left as they are.
pub fn set_orientation(conn: &Connection, filename: &str, orientation: Orientation) -> Result<usize> {
    let n = conn.execute(
        "UPDATE videos SET orientation = ?1, updated_at = CURRENT_TIMESTAMP WHERE filename = ?2",
        params![orientation.as_str(), filename],
    )?;
    Ok(n)
}

/// Remove a video with its ban record and ratings. History rows are kept.
/// Call inside a transaction.
pub fn delete_video_rows(conn: &Connection, filename: &str) -> Result<usize> {
    let n = conn.execute("DELETE FROM videos WHERE filename = ?1", params![filename])?;
    conn.execute("DELETE FROM banned_videos WHERE filename = ?1", params![filename])?;
    conn.execute("DELETE FROM video_ratings WHERE filename = ?1", params![filename])?;
    Ok(n)
}

/// Rewrite the filename key in all four tables. Call inside a transaction.
pub fn rename_video_rows(conn: &Connection, old: &str, new: &str) -> Result<()> {
    conn.execute(
        "UPDATE videos SET filename = ?1, updated_at = CURRENT_TIMESTAMP WHERE filename = ?2",
        params![new, old],
    )?;
    conn.execute("UPDATE video_history SET filename = ?1 WHERE filename = ?2", params![new, old])?;
    conn.execute("UPDATE banned_videos SET filename = ?1 WHERE filename = ?2", params![new, old])?;
    conn.execute("UPDATE video_ratings SET filename = ?1 WHERE filename = ?2", params![new, old])?;
    Ok(())
}

// ----- Ban -----

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BannedVideo {
    pub filename: String,
    pub orientation: Orientation,
    pub views: i64,
    pub reason: String,
    pub banned_at: String,
}

/// Mark banned and write (or overwrite) the ban record. Call inside a transaction.
pub fn ban_video_rows(conn: &Connection, filename: &str, reason: &str) -> Result<()> {
    conn.execute(
        "UPDATE videos SET banned = 1, updated_at = CURRENT_TIMESTAMP WHERE filename = ?1",
        params![filename],
    )?;
    conn.execute(
        "INSERT OR REPLACE INTO banned_videos (filename, reason) VALUES (?1, ?2)",
        params![filename, reason],
    )?;
    Ok(())
}

/// Clear the banned flag and drop the ban record. Call inside a transaction.
pub fn unban_video_rows(conn: &Connection, filename: &str) -> Result<()> {
    conn.execute(
        "UPDATE videos SET banned = 0, updated_at = CURRENT_TIMESTAMP WHERE filename = ?1",
        params![filename],
    )?;
    conn.execute("DELETE FROM banned_videos WHERE filename = ?1", params![filename])?;
    Ok(())
}

pub fn get_ban_reason(conn: &Connection, filename: &str) -> Result<Option<String>> {
    let reason = conn.query_row(
        "SELECT IFNULL(reason, '') FROM banned_videos WHERE filename = ?1",
        params![filename],
        |row| row.get(0),
    ).optional()?;
    Ok(reason)
}

pub fn list_banned(conn: &Connection) -> Result<Vec<BannedVideo>> {
    let mut stmt = conn.prepare(
        "SELECT v.filename, v.orientation, IFNULL(v.views, 0), IFNULL(b.reason, ''), b.banned_at
         FROM videos v
         JOIN banned_videos b ON v.filename = b.filename
         ORDER BY b.banned_at DESC, b.id DESC",
    )?;
    let rows = stmt
        .query_map([], |row| {
            let orientation: Option<String> = row.get(1)?;
            Ok(BannedVideo {
                filename: row.get(0)?,
                orientation: Orientation::from_db(orientation.as_deref()),
                views: row.get(2)?,
                reason: row.get(3)?,
                banned_at: row.get::<_, Option<String>>(4)?.unwrap_or_default(),
            })
        })?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(rows)
}

// ----- Catalog queries -----

/// Non-banned videos. `order_by` must come from a fixed whitelist, never user text.
pub fn list_active(conn: &Connection, order_by: &str) -> Result<Vec<VideoSummary>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT filename, display_name, orientation FROM videos
         WHERE IFNULL(banned, 0) = 0
         ORDER BY {}",
        order_by
    ))?;
    let rows = stmt
        .query_map([], map_summary)?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(rows)
}

/// Case-insensitive substring match on display name or filename, non-banned only.
pub fn search_active(conn: &Connection, term: &str) -> Result<Vec<VideoSummary>> {
    // SQLite's LOWER() only folds ASCII, so non-ASCII terms are matched in Rust.
    let needle = term.to_lowercase();
    let rows = list_active(conn, "created_at DESC, filename ASC")?;
    Ok(rows
        .into_iter()
        .filter(|v| {
            v.display_name.to_lowercase().contains(&needle)
                || v.filename.to_lowercase().contains(&needle)
        })
        .collect())
}

pub fn list_vertical_active(conn: &Connection) -> Result<Vec<String>> {
    let mut stmt = conn.prepare(
        "SELECT filename FROM videos
         WHERE orientation = 'vertical' AND IFNULL(banned, 0) = 0
         ORDER BY filename",
    )?;
    let names = stmt
        .query_map([], |row| row.get::<_, String>(0))?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(names)
}

/// Every video, banned included, newest first.
pub fn list_all(conn: &Connection) -> Result<Vec<Video>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {} FROM videos ORDER BY created_at DESC, filename ASC",
        VIDEO_COLUMNS
    ))?;
    let rows = stmt
        .query_map([], map_video)?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(rows)
}

// ----- Stats -----

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GalleryStats {
    pub total_videos: i64,
    pub banned_videos: i64,
    pub vertical_videos: i64,
    pub horizontal_videos: i64,
    pub square_videos: i64,
    pub unknown_videos: i64,
    pub total_views: i64,
    pub total_likes: i64,
    pub total_dislikes: i64,
    pub total_duration_hours: f64,
    pub popular_videos: Vec<(String, i64)>,
}

pub fn gallery_stats(conn: &Connection, top_limit: i64) -> Result<GalleryStats> {
    let mut stats = conn.query_row(
        "SELECT COUNT(*),
                IFNULL(SUM(banned = 1), 0),
                IFNULL(SUM(orientation = 'vertical'), 0),
                IFNULL(SUM(orientation = 'horizontal'), 0),
                IFNULL(SUM(orientation = 'square'), 0),
                IFNULL(SUM(orientation = 'unknown'), 0),
                IFNULL(SUM(views), 0),
                IFNULL(SUM(likes), 0),
                IFNULL(SUM(dislikes), 0),
                IFNULL(SUM(duration), 0.0)
         FROM videos",
        [],
        |row| {
            let total_seconds: f64 = row.get(9)?;
            Ok(GalleryStats {
                total_videos: row.get(0)?,
                banned_videos: row.get(1)?,
                vertical_videos: row.get(2)?,
                horizontal_videos: row.get(3)?,
                square_videos: row.get(4)?,
                unknown_videos: row.get(5)?,
                total_views: row.get(6)?,
                total_likes: row.get(7)?,
                total_dislikes: row.get(8)?,
                total_duration_hours: (total_seconds / 3600.0 * 100.0).round() / 100.0,
                popular_videos: Vec::new(),
            })
        },
    )?;

    let mut stmt = conn.prepare(
        "SELECT filename, IFNULL(views, 0) FROM videos ORDER BY views DESC, filename ASC LIMIT ?1",
    )?;
    stats.popular_videos = stmt
        .query_map(params![top_limit], |row| Ok((row.get(0)?, row.get(1)?)))?
        .collect::<rusqlite::Result<Vec<_>>>()?;

    Ok(stats)
}

// ----- History -----

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryEntry {
    pub id: i64,
    pub session_id: String,
    pub filename: String,
    pub watched_at: String,
}

pub fn insert_history(conn: &Connection, session_id: &str, filename: &str) -> Result<i64> {
    conn.execute(
        "INSERT INTO video_history (session_id, filename) VALUES (?1, ?2)",
        params![session_id, filename],
    )?;
    Ok(conn.last_insert_rowid())
}

pub fn increment_views(conn: &Connection, filename: &str) -> Result<usize> {
    let n = conn.execute(
        "UPDATE videos SET views = IFNULL(views, 0) + 1 WHERE filename = ?1",
        params![filename],
    )?;
    Ok(n)
}

/// Newest first. Rows may reference videos that no longer exist.
pub fn list_history(conn: &Connection, session_id: &str, limit: i64) -> Result<Vec<HistoryEntry>> {
    let mut stmt = conn.prepare(
        "SELECT id, session_id, filename, watched_at FROM video_history
         WHERE session_id = ?1
         ORDER BY watched_at DESC, id DESC
         LIMIT ?2",
    )?;
    let rows = stmt
        .query_map(params![session_id, limit], |row| {
            Ok(HistoryEntry {
                id: row.get(0)?,
                session_id: row.get(1)?,
                filename: row.get(2)?,
                watched_at: row.get::<_, Option<String>>(3)?.unwrap_or_default(),
            })
        })?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(rows)
}

pub fn count_history(conn: &Connection, filename: &str) -> Result<i64> {
    let count = conn.query_row(
        "SELECT COUNT(*) FROM video_history WHERE filename = ?1",
        params![filename],
        |row| row.get(0),
    )?;
    Ok(count)
}

// ----- Ratings -----

pub fn get_rating(conn: &Connection, session_id: &str, filename: &str) -> Result<Option<i64>> {
    let rating = conn.query_row(
        "SELECT rating FROM video_ratings WHERE session_id = ?1 AND filename = ?2",
        params![session_id, filename],
        |row| row.get(0),
    ).optional()?;
    Ok(rating)
}

pub fn insert_rating(conn: &Connection, session_id: &str, filename: &str, rating: i64) -> Result<()> {
    conn.execute(
        "INSERT INTO video_ratings (session_id, filename, rating) VALUES (?1, ?2, ?3)",
        params![session_id, filename, rating],
    )?;
    Ok(())
}

/// Bump `likes` (positive rating) or `dislikes` (negative rating).
pub fn increment_vote_counter(conn: &Connection, filename: &str, positive: bool) -> Result<usize> {
    let sql = if positive {
        "UPDATE videos SET likes = IFNULL(likes, 0) + 1 WHERE filename = ?1"
    } else {
        "UPDATE videos SET dislikes = IFNULL(dislikes, 0) + 1 WHERE filename = ?1"
    };
    Ok(conn.execute(sql, params![filename])?)
}

pub fn count_ratings(conn: &Connection, filename: &str) -> Result<i64> {
    let count = conn.query_row(
        "SELECT COUNT(*) FROM video_ratings WHERE filename = ?1",
        params![filename],
        |row| row.get(0),
    )?;
    Ok(count)
}

// ----- Admin log -----

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdminLogEntry {
    pub id: i64,
    pub action: String,
    pub details: String,
    pub performed_at: String,
}

pub fn insert_admin_log(conn: &Connection, action: &str, details: &str) -> Result<i64> {
    conn.execute(
        "INSERT INTO admin_logs (action, details) VALUES (?1, ?2)",
        params![action, details],
    )?;
    Ok(conn.last_insert_rowid())
}

pub fn list_admin_logs(conn: &Connection, limit: i64) -> Result<Vec<AdminLogEntry>> {
    let mut stmt = conn.prepare(
        "SELECT id, IFNULL(action, ''), IFNULL(details, ''), performed_at FROM admin_logs
         ORDER BY performed_at DESC, id DESC
         LIMIT ?1",
    )?;
    let rows = stmt
        .query_map(params![limit], |row| {
            Ok(AdminLogEntry {
                id: row.get(0)?,
                action: row.get(1)?,
                details: row.get(2)?,
                performed_at: row.get::<_, Option<String>>(3)?.unwrap_or_default(),
            })
        })?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(rows)
}

pub fn clear_admin_logs(conn: &Connection) -> Result<usize> {
    Ok(conn.execute("DELETE FROM admin_logs", [])?)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn setup_db() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        crate::db::migrations::run_migrations(&conn).unwrap();
        conn
    }

    fn new_video(name: &str, w: i64, h: i64) -> NewVideo {
        NewVideo {
            filename: name.to_string(),
            display_name: name.to_string(),
            info: VideoInfo::from_dimensions(w, h, 60.0),
        }
    }

    #[test]
    fn test_insert_if_absent_keeps_existing_row() {
        let conn = setup_db();
        assert!(insert_video_if_absent(&conn, &new_video("a.mp4", 1080, 1920)).unwrap());
        increment_views(&conn, "a.mp4").unwrap();

        assert!(!insert_video_if_absent(&conn, &new_video("a.mp4", 1920, 1080)).unwrap());
        let video = get_video(&conn, "a.mp4").unwrap().unwrap();
        assert_eq!(video.orientation, Orientation::Vertical);
        assert_eq!(video.views, 1);
    }

    #[test]
    fn test_list_active_excludes_banned() {
        let conn = setup_db();
        insert_video_if_absent(&conn, &new_video("a.mp4", 1920, 1080)).unwrap();
        insert_video_if_absent(&conn, &new_video("b.mp4", 1920, 1080)).unwrap();
        ban_video_rows(&conn, "a.mp4", "spam").unwrap();

        let names: Vec<String> = list_active(&conn, "filename ASC")
            .unwrap()
            .into_iter()
            .map(|v| v.filename)
            .collect();
        assert_eq!(names, vec!["b.mp4"]);
        assert_eq!(get_ban_reason(&conn, "a.mp4").unwrap().as_deref(), Some("spam"));
    }

    #[test]
    fn test_search_is_case_insensitive_for_cyrillic() {
        let conn = setup_db();
        let mut video = new_video("clip1.mp4", 1920, 1080);
        video.display_name = "Море Летом".to_string();
        insert_video_if_absent(&conn, &video).unwrap();

        assert_eq!(search_active(&conn, "море").unwrap().len(), 1);
        assert_eq!(search_active(&conn, "CLIP").unwrap().len(), 1);
        assert!(search_active(&conn, "зима").unwrap().is_empty());
    }

    #[test]
    fn test_incomplete_rows() {
        let conn = setup_db();
        insert_video_if_absent(&conn, &new_video("full.mp4", 1920, 1080)).unwrap();
        insert_video_if_absent(&conn, &NewVideo {
            filename: "empty.mp4".into(),
            display_name: "empty.mp4".into(),
            info: VideoInfo::unknown(),
        }).unwrap();

        assert_eq!(list_incomplete(&conn).unwrap(), vec!["empty.mp4".to_string()]);
    }

    #[test]
    fn test_stats_rounding_and_top_list() {
        let conn = setup_db();
        for (name, views) in [("a.mp4", 3), ("b.mp4", 7), ("c.mp4", 1)] {
            let mut v = new_video(name, 1080, 1920);
            v.info.duration = 1800.0;
            insert_video_if_absent(&conn, &v).unwrap();
            for _ in 0..views {
                increment_views(&conn, name).unwrap();
            }
        }

        let stats = gallery_stats(&conn, 2).unwrap();
        assert_eq!(stats.total_videos, 3);
        assert_eq!(stats.vertical_videos, 3);
        assert_eq!(stats.total_views, 11);
        assert_eq!(stats.total_duration_hours, 1.5);
        assert_eq!(stats.popular_videos, vec![("b.mp4".to_string(), 7), ("a.mp4".to_string(), 3)]);
    }

    #[test]
    fn test_stats_on_empty_db() {
        let conn = setup_db();
        let stats = gallery_stats(&conn, 5).unwrap();
        assert_eq!(stats, GalleryStats::default());
    }

    #[test]
    fn test_legacy_null_columns_are_tolerated() {
        let conn = setup_db();
        conn.execute(
            "INSERT INTO videos (filename, orientation, display_name, views) VALUES ('legacy.mp4', NULL, NULL, NULL)",
            [],
        ).unwrap();

        let video = get_video(&conn, "legacy.mp4").unwrap().unwrap();
        assert_eq!(video.display_name, "legacy.mp4");
        assert_eq!(video.orientation, Orientation::Unknown);
        assert_eq!(video.views, 0);
    }

    #[test]
    fn test_admin_log_newest_first() {
        let conn = setup_db();
        insert_admin_log(&conn, "ban", "first").unwrap();
        insert_admin_log(&conn, "unban", "second").unwrap();

        let logs = list_admin_logs(&conn, 10).unwrap();
        assert_eq!(logs[0].details, "second");
        assert_eq!(clear_admin_logs(&conn).unwrap(), 2);
        assert!(list_admin_logs(&conn, 10).unwrap().is_empty());
    }
}
