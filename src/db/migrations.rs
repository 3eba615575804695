// Database migrations
// Migrations are forward-only. Never edit or delete a migration after it ships.
// Migration 1 uses IF NOT EXISTS so a database created by earlier gallery
// builds (same tables, no user_version) is adopted in place.

use rusqlite::Connection;
use anyhow::Result;

/// All migrations in order. Each migration is a SQL string.
const MIGRATIONS: &[&str] = &[
    // Migration 1: Core tables
    r#"
    CREATE TABLE IF NOT EXISTS videos (
        filename TEXT PRIMARY KEY,
        orientation TEXT,
        created_at TIMESTAMP DEFAULT CURRENT_TIMESTAMP,
        updated_at TIMESTAMP DEFAULT CURRENT_TIMESTAMP,
        banned INTEGER DEFAULT 0,
        views INTEGER DEFAULT 0,
        likes INTEGER DEFAULT 0,
        dislikes INTEGER DEFAULT 0,
        display_name TEXT,
        duration REAL DEFAULT 0,
        width INTEGER DEFAULT 0,
        height INTEGER DEFAULT 0
    );

    -- Append-only; rows survive video deletion
    CREATE TABLE IF NOT EXISTS video_history (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        session_id TEXT,
        filename TEXT,
        watched_at TIMESTAMP DEFAULT CURRENT_TIMESTAMP
    );

    -- Exists iff videos.banned = 1
    CREATE TABLE IF NOT EXISTS banned_videos (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        filename TEXT UNIQUE,
        banned_at TIMESTAMP DEFAULT CURRENT_TIMESTAMP,
        reason TEXT
    );

    CREATE TABLE IF NOT EXISTS admin_logs (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        action TEXT,
        details TEXT,
        performed_at TIMESTAMP DEFAULT CURRENT_TIMESTAMP
    );

    CREATE TABLE IF NOT EXISTS video_ratings (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        session_id TEXT,
        filename TEXT,
        rating INTEGER,
        rated_at TIMESTAMP DEFAULT CURRENT_TIMESTAMP,
        UNIQUE(session_id, filename)
    );
    "#,

    // Migration 2: Indexes for catalog and history queries
    r#"
    CREATE INDEX IF NOT EXISTS idx_videos_banned ON videos(banned);
    CREATE INDEX IF NOT EXISTS idx_videos_orientation ON videos(orientation);
    CREATE INDEX IF NOT EXISTS idx_history_session ON video_history(session_id, watched_at);
    CREATE INDEX IF NOT EXISTS idx_ratings_filename ON video_ratings(filename);
    "#,
];

/// Get current schema version from database
fn get_schema_version(conn: &Connection) -> Result<u32> {
    let version: u32 = conn.query_row(
        "PRAGMA user_version",
        [],
        |row| row.get(0)
    )?;
    Ok(version)
}

/// Run all pending migrations. Each migration and its version bump commit together.
pub fn run_migrations(conn: &Connection) -> Result<()> {
    let current_version = get_schema_version(conn)?;
    let target_version = MIGRATIONS.len() as u32;

    if current_version > target_version {
        anyhow::bail!(
            "Database schema version {} is newer than this build supports (max {}). Please upgrade vidgallery.",
            current_version,
            target_version
        );
    }

    if current_version == target_version {
        return Ok(());
    }

    for (i, migration) in MIGRATIONS.iter().enumerate() {
        let migration_version = (i + 1) as u32;
        if migration_version <= current_version {
            continue;
        }

        conn.execute_batch(&format!(
            "BEGIN;\n{}\nPRAGMA user_version = {};\nCOMMIT;",
            migration, migration_version
        ))?;

        log::info!("Applied migration {}", migration_version);
    }

    Ok(())
}
