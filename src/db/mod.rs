// Database module

pub mod migrations;
pub mod schema;

use std::path::{Path, PathBuf};
use std::time::Duration;
use rusqlite::{Connection, Transaction};
use anyhow::Result;

use crate::constants::{DB_BUSY_TIMEOUT_MS, GALLERY_FOLDER};

/// Open or create a database at the given path
pub fn open_db(db_path: &Path) -> Result<Connection> {
    if let Some(parent) = db_path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }

    let conn = connect_raw(db_path)?;

    // WAL lets catalog reads proceed while a scan is writing
    conn.execute_batch("PRAGMA journal_mode = WAL;")?;

    migrations::run_migrations(&conn)?;

    Ok(conn)
}

fn connect_raw(db_path: &Path) -> rusqlite::Result<Connection> {
    let conn = Connection::open(db_path)?;
    conn.busy_timeout(Duration::from_millis(DB_BUSY_TIMEOUT_MS))?;
    Ok(conn)
}

/// Get the .vidgallery folder path for a video root
pub fn get_gallery_path(video_root: &Path) -> PathBuf {
    video_root.join(GALLERY_FOLDER)
}

/// Scoped access to the metadata store.
///
/// Holds only the database path. Every operation opens its own short-lived
/// connection, so the store is freely shareable across threads.
#[derive(Debug, Clone)]
pub struct Store {
    db_path: PathBuf,
}

impl Store {
    /// Create (if needed) and migrate the database, then return a handle to it.
    pub fn open(db_path: &Path) -> crate::error::Result<Self> {
        open_db(db_path)?;
        Ok(Self { db_path: db_path.to_path_buf() })
    }

    pub fn path(&self) -> &Path {
        &self.db_path
    }

    /// Open a short-lived connection.
    pub fn connect(&self) -> crate::error::Result<Connection> {
        Ok(connect_raw(&self.db_path)?)
    }

    /// Run `f` inside one transaction. Any error rolls every statement back.
    pub fn transaction<T, F>(&self, f: F) -> crate::error::Result<T>
    where
        F: FnOnce(&Transaction) -> crate::error::Result<T>,
    {
        let mut conn = self.connect()?;
        let tx = conn.transaction()?;
        let out = f(&tx)?;
        tx.commit()?;
        Ok(out)
    }
}
