// Admin operations
//
// Access is a per-session capability: a session that presented the admin key
// receives an `AdminToken`, and every operation below requires one. Each
// mutating operation appends exactly one entry to the admin log.

use std::collections::HashSet;
use std::fs;
use std::io;
use std::sync::Mutex;
use serde::{Deserialize, Serialize};

use crate::constants::{
    ACTION_BAN, ACTION_CLEAR_LOGS, ACTION_DELETE, ACTION_FIX_ORIENTATIONS,
    ACTION_FORCE_ORIENTATION, ACTION_GRANT_ADMIN, ACTION_REDETECT, ACTION_RENAME,
    ACTION_RESCAN, ACTION_UNBAN,
};
use crate::db::schema::{self, AdminLogEntry};
use crate::error::{GalleryError, Result};
use crate::gallery::Gallery;
use crate::ingest::paths;
use crate::metadata::Orientation;
use crate::scan::{self, ScanReport};
use crate::session::SessionId;

/// Proof that a session holds admin rights. Only this module can mint one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdminToken {
    session: SessionId,
}

impl AdminToken {
    pub fn session(&self) -> &SessionId {
        &self.session
    }
}

/// Tracks which sessions have been granted admin rights.
pub struct AdminAuthority {
    admin_key: Option<String>,
    granted: Mutex<HashSet<SessionId>>,
}

impl AdminAuthority {
    pub fn new(admin_key: Option<String>) -> Self {
        let admin_key = admin_key.filter(|k| !k.is_empty());
        if admin_key.is_none() {
            log::warn!("No admin key configured: any session can obtain admin rights");
        }
        Self {
            admin_key,
            granted: Mutex::new(HashSet::new()),
        }
    }

    pub fn requires_key(&self) -> bool {
        self.admin_key.is_some()
    }

    fn granted(&self) -> std::sync::MutexGuard<'_, HashSet<SessionId>> {
        self.granted.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Check `key` and remember `session` as an admin.
    pub fn grant(&self, session: &SessionId, key: Option<&str>) -> Result<AdminToken> {
        if let Some(expected) = &self.admin_key {
            if key != Some(expected.as_str()) {
                log::warn!("Rejected admin grant for session {}", session);
                return Err(GalleryError::Forbidden("invalid admin key".into()));
            }
        }
        self.granted().insert(session.clone());
        Ok(AdminToken { session: session.clone() })
    }

    /// Token for a session granted earlier.
    pub fn authorize(&self, session: &SessionId) -> Result<AdminToken> {
        if self.granted().contains(session) {
            Ok(AdminToken { session: session.clone() })
        } else {
            Err(GalleryError::Forbidden("admin access required".into()))
        }
    }

    /// Drop admin rights for `session`. Returns false if it had none.
    pub fn revoke(&self, session: &SessionId) -> bool {
        self.granted().remove(session)
    }
}

fn log_action(gallery: &Gallery, action: &str, details: &str) -> Result<()> {
    let conn = gallery.store().connect()?;
    schema::insert_admin_log(&conn, action, details)?;
    log::info!("admin {}: {}", action, details);
    Ok(())
}

/// Grant admin rights to `session` and record the grant.
pub fn grant_admin(gallery: &Gallery, session: &SessionId, key: Option<&str>) -> Result<AdminToken> {
    let token = gallery.authority().grant(session, key)?;
    log_action(gallery, ACTION_GRANT_ADMIN, &format!("session: {}", session))?;
    Ok(token)
}

/// Hide a video from the catalog. Banning again replaces the reason.
pub fn ban(gallery: &Gallery, _token: &AdminToken, filename: &str, reason: &str) -> Result<()> {
    let details = format!("file: {}, reason: {}", filename, reason);
    gallery.store().transaction(|tx| {
        schema::require_video(tx, filename)?;
        schema::ban_video_rows(tx, filename, reason)?;
        schema::insert_admin_log(tx, ACTION_BAN, &details)?;
        Ok(())
    })?;
    log::info!("admin {}: {}", ACTION_BAN, details);
    Ok(())
}

pub fn unban(gallery: &Gallery, _token: &AdminToken, filename: &str) -> Result<()> {
    let details = format!("file: {}", filename);
    gallery.store().transaction(|tx| {
        schema::require_video(tx, filename)?;
        schema::unban_video_rows(tx, filename)?;
        schema::insert_admin_log(tx, ACTION_UNBAN, &details)?;
        Ok(())
    })?;
    log::info!("admin {}: {}", ACTION_UNBAN, details);
    Ok(())
}

/// Remove the file, then the record with its ban and ratings.
///
/// A file that is already gone is fine. Any other failure to remove it
/// leaves the store untouched. Watch history is kept.
pub fn delete(gallery: &Gallery, _token: &AdminToken, filename: &str) -> Result<()> {
    let conn = gallery.store().connect()?;
    let record = schema::get_video(&conn, filename)?;
    let path = gallery.stored_path(filename);

    if record.is_none() && path.is_none() {
        return Err(GalleryError::NotFound(format!("video {}", filename)));
    }

    if let Some(path) = &path {
        match fs::remove_file(path) {
            Ok(()) => {}
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => {
                log::error!("Failed to delete {}: {}", path.display(), e);
                return Err(e.into());
            }
        }
    }

    let details = format!("file: {}", filename);
    gallery.store().transaction(|tx| {
        schema::delete_video_rows(tx, filename)?;
        schema::insert_admin_log(tx, ACTION_DELETE, &details)?;
        Ok(())
    })?;
    log::info!("admin {}: {}", ACTION_DELETE, details);
    Ok(())
}

/// Rename a video on disk and in every table that refers to it.
///
/// A `new_name` without an extension takes the old one. The file is renamed
/// first; if the store update then fails the file is moved back and the
/// failure is reported as an IO error. Returns the final filename.
pub fn rename(gallery: &Gallery, _token: &AdminToken, old_name: &str, new_name: &str) -> Result<String> {
    let new_name = new_name.trim();
    if new_name.is_empty() {
        return Err(GalleryError::Validation("new name must not be empty".into()));
    }
    if new_name.contains(['/', '\\']) || new_name == "." || new_name == ".." {
        return Err(GalleryError::Validation(format!("invalid file name: {}", new_name)));
    }

    let new_name = match (paths::extension_of(new_name), paths::extension_of(old_name)) {
        (None, Some(ext)) => format!("{}.{}", new_name.trim_end_matches('.'), ext),
        _ => new_name.to_string(),
    };
    let allowed = paths::extension_of(&new_name)
        .map(|ext| gallery.config().is_allowed_extension(ext))
        .unwrap_or(false);
    if !allowed {
        return Err(GalleryError::Validation(format!("file type not allowed: {}", new_name)));
    }

    let _row = gallery.row_guard();

    let conn = gallery.store().connect()?;
    schema::require_video(&conn, old_name)?;
    let old_path = gallery
        .stored_path(old_name)
        .ok_or_else(|| GalleryError::NotFound(format!("video file {}", old_name)))?;

    let new_path = gallery.video_root().join(&new_name);
    if fs::symlink_metadata(&new_path).is_ok() {
        return Err(GalleryError::Conflict(format!("{} already exists", new_name)));
    }

    fs::rename(&old_path, &new_path)?;

    let details = format!("{} -> {}", old_name, new_name);
    let updated = gallery.store().transaction(|tx| {
        schema::rename_video_rows(tx, old_name, &new_name)?;
        schema::insert_admin_log(tx, ACTION_RENAME, &details)?;
        Ok(())
    });

    if let Err(e) = updated {
        match fs::rename(&new_path, &old_path) {
            Ok(()) => log::warn!("Rename {} rolled back: {}", details, e),
            Err(back) => log::error!(
                "Rename {} failed ({}) and {} could not be moved back: {}",
                details, e, new_path.display(), back
            ),
        }
        return Err(GalleryError::io_failure(format!("rename {} failed: {}", details, e)));
    }

    log::info!("admin {}: {}", ACTION_RENAME, details);
    Ok(new_name)
}

/// Override the stored orientation. Measurements are left alone.
pub fn force_reorientation(
    gallery: &Gallery,
    _token: &AdminToken,
    filename: &str,
    orientation: Orientation,
) -> Result<()> {
    if orientation == Orientation::Unknown {
        return Err(GalleryError::Validation(
            "orientation must be vertical, horizontal or square".into(),
        ));
    }

    let details = format!("file: {}, orientation: {}", filename, orientation);
    let _row = gallery.row_guard();
    gallery.store().transaction(|tx| {
        if schema::set_orientation(tx, filename, orientation)? == 0 {
            return Err(GalleryError::NotFound(format!("video {}", filename)));
        }
        schema::insert_admin_log(tx, ACTION_FORCE_ORIENTATION, &details)?;
        Ok(())
    })?;
    log::info!("admin {}: {}", ACTION_FORCE_ORIENTATION, details);
    Ok(())
}

/// Empty the admin log. The clear itself is the one remaining entry.
pub fn clear_logs(gallery: &Gallery, _token: &AdminToken) -> Result<usize> {
    let cleared = gallery.store().transaction(|tx| {
        let n = schema::clear_admin_logs(tx)?;
        schema::insert_admin_log(tx, ACTION_CLEAR_LOGS, &format!("{} entries removed", n))?;
        Ok(n)
    })?;
    log::info!("admin {}: {} entries removed", ACTION_CLEAR_LOGS, cleared);
    Ok(cleared)
}

pub fn admin_logs(gallery: &Gallery, _token: &AdminToken, limit: i64) -> Result<Vec<AdminLogEntry>> {
    let conn = gallery.store().connect()?;
    schema::list_admin_logs(&conn, limit)
}

/// Scan the folder now instead of waiting for the background scanner.
pub fn rescan(gallery: &Gallery, _token: &AdminToken) -> Result<ScanReport> {
    let report = scan::scan(gallery)?;
    log_action(
        gallery,
        ACTION_RESCAN,
        &format!(
            "added: {}, updated: {}, removed: {}",
            report.added.len(),
            report.updated.len(),
            report.removed.len()
        ),
    )?;
    Ok(report)
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchReport {
    pub examined: usize,
    pub updated: Vec<String>,
    pub failed: Vec<String>,
}

/// Re-classify every video and store every known result.
/// Forced orientations are overwritten too.
pub fn redetect_all(gallery: &Gallery, _token: &AdminToken) -> Result<BatchReport> {
    let report = reclassify_each(gallery, |_, _| true)?;
    log_action(
        gallery,
        ACTION_REDETECT,
        &format!("examined: {}, updated: {}", report.examined, report.updated.len()),
    )?;
    Ok(report)
}

/// Re-classify every video, storing only results that change the orientation.
pub fn fix_orientations(gallery: &Gallery, _token: &AdminToken) -> Result<BatchReport> {
    let report = reclassify_each(gallery, |stored, detected| stored != detected)?;
    log_action(
        gallery,
        ACTION_FIX_ORIENTATIONS,
        &format!("examined: {}, fixed: {}", report.examined, report.updated.join(", ")),
    )?;
    Ok(report)
}

// Per-row locking only: readers may observe a partly updated batch.
fn reclassify_each<F>(gallery: &Gallery, should_update: F) -> Result<BatchReport>
where
    F: Fn(Orientation, Orientation) -> bool,
{
    let videos = {
        let conn = gallery.store().connect()?;
        schema::list_orientations(&conn)?
    };

    let mut report = BatchReport::default();
    for (filename, stored) in videos {
        report.examined += 1;

        let Some(path) = gallery.stored_path(&filename) else {
            log::debug!("Skipping {}: file not found", filename);
            continue;
        };

        let info = gallery.classifier().classify(&path);
        if !info.is_known() || !should_update(stored, info.orientation) {
            continue;
        }

        let _row = gallery.row_guard();
        let result = gallery
            .store()
            .connect()
            .and_then(|conn| schema::update_video_info(&conn, &filename, &info));
        match result {
            Ok(_) => {
                log::info!("{}: {} -> {}", filename, stored, info.orientation);
                report.updated.push(filename);
            }
            Err(e) => {
                log::error!("Failed to update orientation of {}: {}", filename, e);
                report.failed.push(filename);
            }
        }
    }

    Ok(report)
}
