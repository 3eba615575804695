// Folder scanner: reconcile the store with the files in the video root

use std::collections::{BTreeSet, HashSet};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::db::schema::{self, NewVideo};
use crate::error::Result;
use crate::gallery::Gallery;
use crate::ingest::{discover, paths};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScanReport {
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub added: Vec<String>,
    pub updated: Vec<String>,
    pub removed: Vec<String>,
}

impl ScanReport {
    pub fn is_noop(&self) -> bool {
        self.added.is_empty() && self.updated.is_empty() && self.removed.is_empty()
    }
}

/// Run one full reconciliation pass.
///
/// New files are classified and inserted, records whose measurements are
/// still zero are re-classified (kept as they are if the result is unknown),
/// and records whose file is gone are deleted. Scans never overlap: a caller
/// arriving mid-scan waits for it to finish and then scans again.
pub fn scan(gallery: &Gallery) -> Result<ScanReport> {
    let _guard = gallery.scan_guard();
    let started_at = Utc::now();

    let on_disk = discover::discover_videos(gallery.config())?;
    let conn = gallery.store().connect()?;
    let in_store: HashSet<String> = schema::list_filenames(&conn)?;

    let mut added = Vec::new();
    for filename in on_disk.iter().filter(|f| !in_store.contains(*f)) {
        let info = gallery.classifier().classify(&gallery.video_root().join(filename));
        let video = NewVideo {
            filename: filename.clone(),
            display_name: paths::display_name_for(filename),
            info,
        };
        if schema::insert_video_if_absent(&conn, &video)? {
            log::info!("Added {} ({})", filename, info.orientation);
            added.push(filename.clone());
        }
    }

    let mut updated = Vec::new();
    for filename in schema::list_incomplete(&conn)? {
        if !on_disk.contains(&filename) || added.contains(&filename) {
            continue;
        }
        let info = gallery.classifier().classify(&gallery.video_root().join(&filename));
        if !info.is_known() {
            continue;
        }
        let _row = gallery.row_guard();
        if schema::update_video_info(&conn, &filename, &info)? > 0 {
            log::info!("Updated {} ({} {}x{})", filename, info.orientation, info.width, info.height);
            updated.push(filename);
        }
    }

    let gone: BTreeSet<&String> = in_store.iter().filter(|f| !on_disk.contains(*f)).collect();
    let mut removed = Vec::new();
    for filename in gone {
        let deleted = gallery
            .store()
            .transaction(|tx| schema::delete_video_rows(tx, filename))?;
        if deleted > 0 {
            log::info!("Removed {} (file no longer on disk)", filename);
            removed.push(filename.clone());
        }
    }

    let report = ScanReport {
        started_at,
        finished_at: Utc::now(),
        added,
        updated,
        removed,
    };

    log::info!(
        "Scan of {} finished: {} added, {} updated, {} removed",
        gallery.video_root().display(),
        report.added.len(),
        report.updated.len(),
        report.removed.len()
    );

    Ok(report)
}
