// Catalog: read side of the gallery plus per-session view/rating bookkeeping

use std::path::{Path, PathBuf};
use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};

use crate::constants::TOP_VIDEOS_LIMIT;
use crate::db::schema::{self, BannedVideo, GalleryStats, HistoryEntry, Video, VideoSummary};
use crate::error::{GalleryError, Result};
use crate::gallery::Gallery;
use crate::ingest::paths;
use crate::metadata::Orientation;
use crate::session::SessionId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortKey {
    #[default]
    Filename,
    CreatedAt,
    Views,
    Likes,
}

impl SortKey {
    /// Unrecognised keys sort by filename.
    pub fn parse(raw: &str) -> Self {
        match raw.trim().to_lowercase().as_str() {
            "created_at" | "date" => SortKey::CreatedAt,
            "views" => SortKey::Views,
            "likes" => SortKey::Likes,
            _ => SortKey::Filename,
        }
    }

    fn column(self) -> &'static str {
        match self {
            SortKey::Filename => "filename",
            SortKey::CreatedAt => "created_at",
            SortKey::Views => "views",
            SortKey::Likes => "likes",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    #[default]
    Asc,
    Desc,
}

impl SortOrder {
    /// Anything but "desc" is ascending.
    pub fn parse(raw: &str) -> Self {
        if raw.trim().eq_ignore_ascii_case("desc") {
            SortOrder::Desc
        } else {
            SortOrder::Asc
        }
    }

    fn sql(self) -> &'static str {
        match self {
            SortOrder::Asc => "ASC",
            SortOrder::Desc => "DESC",
        }
    }
}

pub fn list_active(gallery: &Gallery, key: SortKey, order: SortOrder) -> Result<Vec<VideoSummary>> {
    let order_by = match key {
        SortKey::Filename => format!("filename {}", order.sql()),
        other => format!("{} {}, filename ASC", other.column(), order.sql()),
    };
    let conn = gallery.store().connect()?;
    schema::list_active(&conn, &order_by)
}

/// Newest first; the default gallery view.
pub fn recent_active(gallery: &Gallery) -> Result<Vec<VideoSummary>> {
    let conn = gallery.store().connect()?;
    schema::list_active(&conn, "created_at DESC, filename ASC")
}

pub fn search_active(gallery: &Gallery, term: &str) -> Result<Vec<VideoSummary>> {
    let conn = gallery.store().connect()?;
    schema::search_active(&conn, term.trim())
}

/// Filenames of non-banned vertical videos, alphabetical.
pub fn list_vertical_active(gallery: &Gallery) -> Result<Vec<String>> {
    let conn = gallery.store().connect()?;
    schema::list_vertical_active(&conn)
}

/// A random non-banned vertical video other than `exclude`.
pub fn random_vertical(gallery: &Gallery, exclude: Option<&str>) -> Result<Option<String>> {
    let exclude = exclude.map(paths::display_name_for);
    let candidates: Vec<String> = list_vertical_active(gallery)?
        .into_iter()
        .filter(|f| Some(f) != exclude.as_ref())
        .collect();
    Ok(candidates.choose(&mut rand::thread_rng()).cloned())
}

pub fn stats(gallery: &Gallery) -> Result<GalleryStats> {
    let conn = gallery.store().connect()?;
    schema::gallery_stats(&conn, TOP_VIDEOS_LIMIT)
}

/// Full record, banned or not.
pub fn get_video(gallery: &Gallery, filename: &str) -> Result<Video> {
    let conn = gallery.store().connect()?;
    schema::require_video(&conn, filename)
}

pub fn list_all(gallery: &Gallery) -> Result<Vec<Video>> {
    let conn = gallery.store().connect()?;
    schema::list_all(&conn)
}

pub fn list_banned(gallery: &Gallery) -> Result<Vec<BannedVideo>> {
    let conn = gallery.store().connect()?;
    schema::list_banned(&conn)
}

/// Record that `session` started watching `filename`.
///
/// The request is resolved like a playback request, so an encoded alias
/// counts against the record of the file it names.
pub fn record_view(gallery: &Gallery, session: &SessionId, filename: &str) -> Result<Video> {
    let key = stored_key(gallery.resolve(filename).as_deref(), filename);
    gallery.store().transaction(|tx| {
        let video = schema::require_video(tx, &key)?;
        if video.banned {
            return Err(GalleryError::Forbidden(format!("{} is banned", key)));
        }
        schema::insert_history(tx, session.as_str(), &key)?;
        schema::increment_views(tx, &key)?;
        Ok(Video { views: video.views + 1, ..video })
    })
}

// Record key for a request: the on-disk name it resolved to, else the raw name.
fn stored_key(resolved: Option<&Path>, requested: &str) -> String {
    resolved
        .and_then(|p| p.file_name())
        .and_then(|n| n.to_str())
        .unwrap_or(requested)
        .to_string()
}

/// Most recent views first. Entries may point at deleted videos.
pub fn watch_history(gallery: &Gallery, session: &SessionId, limit: usize) -> Result<Vec<HistoryEntry>> {
    let conn = gallery.store().connect()?;
    schema::list_history(&conn, session.as_str(), limit as i64)
}

/// The vertical video this session watched before `current`, else a random one.
pub fn previous_vertical(gallery: &Gallery, session: &SessionId, current: &str) -> Result<Option<String>> {
    let current = paths::display_name_for(current);
    let history = watch_history(gallery, session, gallery.config().history_limit)?;
    let verticals = list_vertical_active(gallery)?;

    let previous = history
        .iter()
        .map(|h| h.filename.as_str())
        .skip_while(|f| *f != current)
        .find(|f| *f != current && verticals.iter().any(|v| v == f));

    match previous {
        Some(f) => Ok(Some(f.to_string())),
        None => random_vertical(gallery, Some(&current)),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Vote {
    Like,
    Dislike,
}

impl Vote {
    fn rating(self) -> i64 {
        match self {
            Vote::Like => 1,
            Vote::Dislike => -1,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RateOutcome {
    Recorded,
    /// This session already voted on the video; nothing changed.
    AlreadyRated(Vote),
}

/// One vote per session and video. The first vote is final.
pub fn rate(gallery: &Gallery, session: &SessionId, filename: &str, vote: Vote) -> Result<RateOutcome> {
    let _guard = gallery.row_guard();
    gallery.store().transaction(|tx| {
        let video = schema::require_video(tx, filename)?;
        if video.banned {
            return Err(GalleryError::Forbidden(format!("{} is banned", filename)));
        }

        if let Some(existing) = schema::get_rating(tx, session.as_str(), filename)? {
            let previous = if existing > 0 { Vote::Like } else { Vote::Dislike };
            return Ok(RateOutcome::AlreadyRated(previous));
        }

        schema::insert_rating(tx, session.as_str(), filename, vote.rating())?;
        schema::increment_vote_counter(tx, filename, vote == Vote::Like)?;
        Ok(RateOutcome::Recorded)
    })
}

/// Where to read a video from and how to label it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Playback {
    pub path: PathBuf,
    pub mime_type: String,
    pub orientation: Orientation,
}

pub fn resolve_playback(gallery: &Gallery, filename: &str) -> Result<Playback> {
    let path = gallery.resolve(filename);
    let key = stored_key(path.as_deref(), filename);

    let conn = gallery.store().connect()?;
    let record = schema::get_video(&conn, &key)?;
    if record.as_ref().map(|v| v.banned).unwrap_or(false) {
        return Err(GalleryError::Forbidden(format!("{} is banned", key)));
    }

    let path = path.ok_or_else(|| GalleryError::NotFound(format!("video file {}", filename)))?;
    let mime_type = mime_guess::from_path(&path).first_or_octet_stream().to_string();

    Ok(Playback {
        path,
        mime_type,
        orientation: record.map(|v| v.orientation).unwrap_or(Orientation::Unknown),
    })
}
