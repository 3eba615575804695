// vidgallery CLI binary

use std::io::BufRead;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use clap::{Parser, Subcommand};
use anyhow::Result;
use tracing_subscriber::EnvFilter;

use vidgallery_lib::admin::{self, AdminToken};
use vidgallery_lib::catalog::{self, RateOutcome, SortKey, SortOrder, Vote};
use vidgallery_lib::constants::{DEFAULT_ADMIN_LOG_LIMIT, GALLERY_FOLDER};
use vidgallery_lib::db::schema::VideoSummary;
use vidgallery_lib::ingest::{self, OrientationChoice};
use vidgallery_lib::jobs;
use vidgallery_lib::scan::{self, ScanReport};
use vidgallery_lib::{Gallery, GalleryConfig, Orientation, SessionId};

#[derive(Parser)]
#[command(name = "vidgallery")]
#[command(about = "vidgallery - a video gallery for one folder of videos", long_about = None)]
#[command(version)]
struct Cli {
    /// Config file (defaults to the per-user config file if present)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Video root (overrides config and environment)
    #[arg(short, long, global = true)]
    root: Option<PathBuf>,

    /// Debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create the gallery database for a video folder and scan it
    Init {
        /// Video folder
        path: PathBuf,
    },

    /// Reconcile the database with the video folder once
    Scan,

    /// Keep scanning in the background (Enter scans now, "q" quits)
    Watch {
        /// Seconds between scans (defaults to the configured interval)
        #[arg(long)]
        interval: Option<u64>,
    },

    /// List visible videos
    List {
        /// filename, created_at, views or likes
        #[arg(long, default_value = "filename")]
        sort: String,
        /// asc or desc
        #[arg(long, default_value = "asc")]
        order: String,
        /// Newest first, ignoring --sort/--order
        #[arg(long)]
        recent: bool,
    },

    /// Search visible videos by name
    Search {
        term: String,
    },

    /// List vertical videos
    Vertical,

    /// Pick a random vertical video
    Random {
        /// Video to skip
        #[arg(long)]
        exclude: Option<String>,
    },

    /// Gallery statistics
    Stats,

    /// Show one video record
    Show {
        filename: String,
    },

    /// Resolve a video to its file and MIME type
    Play {
        filename: String,
    },

    /// Record a view
    View {
        filename: String,
        /// Session id (a new one is generated if omitted)
        #[arg(short, long)]
        session: Option<String>,
    },

    /// Watch history of a session
    History {
        #[arg(short, long)]
        session: String,
        #[arg(long)]
        limit: Option<usize>,
    },

    /// Vertical video watched before the current one
    Previous {
        current: String,
        #[arg(short, long)]
        session: String,
    },

    /// Like or dislike a video
    Rate {
        filename: String,
        /// like or dislike
        vote: String,
        #[arg(short, long)]
        session: Option<String>,
    },

    /// Copy a video into the gallery
    Upload {
        /// File to import
        path: PathBuf,
        /// Name to store it under (defaults to the file's own name)
        #[arg(long)]
        name: Option<String>,
        /// auto, vertical, horizontal or square
        #[arg(long, default_value = "auto")]
        orientation: String,
    },

    /// Administrative operations
    Admin {
        /// Admin key (required when one is configured)
        #[arg(short, long)]
        key: Option<String>,

        #[command(subcommand)]
        command: AdminCommands,
    },
}

#[derive(Subcommand)]
enum AdminCommands {
    /// Hide a video from the gallery
    Ban {
        filename: String,
        #[arg(long, default_value = "")]
        reason: String,
    },
    /// Make a banned video visible again
    Unban { filename: String },
    /// Delete a video file and its record
    Delete { filename: String },
    /// Rename a video file and its record
    Rename { old: String, new: String },
    /// Override the detected orientation
    Reorient { filename: String, orientation: String },
    /// Re-classify every video
    Redetect,
    /// Re-classify every video, only fixing changed orientations
    Fix,
    /// Scan now
    Rescan,
    /// Show the admin log
    Logs {
        #[arg(long, default_value_t = DEFAULT_ADMIN_LOG_LIMIT)]
        limit: i64,
    },
    /// Clear the admin log
    ClearLogs,
    /// All videos, banned included
    Videos,
    /// Banned videos with reasons
    Banned,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let mut config = GalleryConfig::load(cli.config.as_deref())?;
    if let Some(root) = cli.root {
        config.video_root = root;
    }

    match cli.command {
        Commands::Init { path } => cmd_init(config, path),
        Commands::Scan => cmd_scan(&open(config)?),
        Commands::Watch { interval } => cmd_watch(open(config)?, interval),
        Commands::List { sort, order, recent } => cmd_list(&open(config)?, &sort, &order, recent),
        Commands::Search { term } => {
            let gallery = open(config)?;
            print_summaries(&catalog::search_active(&gallery, &term)?);
            Ok(())
        }
        Commands::Vertical => {
            for filename in catalog::list_vertical_active(&open(config)?)? {
                println!("{}", filename);
            }
            Ok(())
        }
        Commands::Random { exclude } => {
            match catalog::random_vertical(&open(config)?, exclude.as_deref())? {
                Some(filename) => println!("{}", filename),
                None => println!("No vertical videos."),
            }
            Ok(())
        }
        Commands::Stats => cmd_stats(&open(config)?),
        Commands::Show { filename } => cmd_show(&open(config)?, &filename),
        Commands::Play { filename } => {
            let playback = catalog::resolve_playback(&open(config)?, &filename)?;
            println!("Path:        {}", playback.path.display());
            println!("MIME type:   {}", playback.mime_type);
            println!("Orientation: {}", playback.orientation);
            Ok(())
        }
        Commands::View { filename, session } => cmd_view(&open(config)?, &filename, session),
        Commands::History { session, limit } => cmd_history(open(config)?, &session, limit),
        Commands::Previous { current, session } => {
            let gallery = open(config)?;
            match catalog::previous_vertical(&gallery, &SessionId::from_raw(session), &current)? {
                Some(filename) => println!("{}", filename),
                None => println!("No vertical videos."),
            }
            Ok(())
        }
        Commands::Rate { filename, vote, session } => cmd_rate(&open(config)?, &filename, &vote, session),
        Commands::Upload { path, name, orientation } => cmd_upload(&open(config)?, path, name, &orientation),
        Commands::Admin { key, command } => cmd_admin(&open(config)?, key, command),
    }
}

fn init_logging(verbose: bool) {
    let default = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn open(config: GalleryConfig) -> Result<Gallery> {
    Ok(Gallery::open(config)?)
}

fn session_or_new(session: Option<String>) -> SessionId {
    match session {
        Some(raw) => SessionId::from_raw(raw),
        None => {
            let id = SessionId::generate();
            println!("Session: {}", id);
            id
        }
    }
}

fn cmd_init(mut config: GalleryConfig, path: PathBuf) -> Result<()> {
    let root = path.canonicalize().unwrap_or(path);
    config.video_root = root.clone();

    let db_path = config.resolved_db_path();
    if db_path.exists() {
        anyhow::bail!("Gallery already exists at {}", db_path.display());
    }

    let gallery = Gallery::open(config)?;
    let report = scan::scan(&gallery)?;

    println!("Initialized gallery at {}", root.display());
    println!("  {}/ - Database", GALLERY_FOLDER);
    println!("  {} videos found", report.added.len());
    Ok(())
}

fn cmd_scan(gallery: &Gallery) -> Result<()> {
    let report = scan::scan(gallery)?;
    print_report(&report);
    Ok(())
}

fn print_report(report: &ScanReport) {
    let took = report.finished_at - report.started_at;
    println!("Scan complete in {} ms:", took.num_milliseconds());
    println!("  Added:    {}", report.added.len());
    println!("  Updated:  {}", report.updated.len());
    println!("  Removed:  {}", report.removed.len());
    for f in &report.added {
        println!("  + {}", f);
    }
    for f in &report.removed {
        println!("  - {}", f);
    }
}

fn cmd_watch(gallery: Gallery, interval: Option<u64>) -> Result<()> {
    let secs = interval.unwrap_or(gallery.config().scan_interval_secs).max(1);
    let handle = jobs::spawn_scanner(Arc::new(gallery), Duration::from_secs(secs))?;

    println!("Scanning every {}s. Press Enter to scan now, q to quit.", secs);
    for line in std::io::stdin().lock().lines() {
        let line = line?;
        if line.trim().eq_ignore_ascii_case("q") {
            break;
        }
        handle.trigger();
    }

    println!("Stopping after {} scans...", handle.completed_scans());
    handle.shutdown();
    Ok(())
}

fn cmd_list(gallery: &Gallery, sort: &str, order: &str, recent: bool) -> Result<()> {
    let videos = if recent {
        catalog::recent_active(gallery)?
    } else {
        catalog::list_active(gallery, SortKey::parse(sort), SortOrder::parse(order))?
    };

    if videos.is_empty() {
        println!("No videos found. Put videos into {} and run 'vidgallery scan'.",
            gallery.video_root().display());
        return Ok(());
    }

    print_summaries(&videos);
    Ok(())
}

fn print_summaries(videos: &[VideoSummary]) {
    println!("{:>10}  {:<40}  {}", "Orient.", "Filename", "Title");
    println!("{}", "-".repeat(80));
    for video in videos {
        println!("{:>10}  {:<40}  {}",
            video.orientation.as_str(),
            truncate(&video.filename, 40),
            video.display_name
        );
    }
    println!();
    println!("{} videos", videos.len());
}

fn cmd_stats(gallery: &Gallery) -> Result<()> {
    let stats = catalog::stats(gallery)?;

    println!("Videos:      {}", stats.total_videos);
    println!("  Banned:      {}", stats.banned_videos);
    println!("  Vertical:    {}", stats.vertical_videos);
    println!("  Horizontal:  {}", stats.horizontal_videos);
    println!("  Square:      {}", stats.square_videos);
    println!("  Unknown:     {}", stats.unknown_videos);
    println!("Views:       {}", stats.total_views);
    println!("Likes:       {} / Dislikes: {}", stats.total_likes, stats.total_dislikes);
    println!("Duration:    {:.2} h", stats.total_duration_hours);

    if !stats.popular_videos.is_empty() {
        println!();
        println!("Most viewed:");
        for (filename, views) in &stats.popular_videos {
            println!("  {:>6}  {}", views, filename);
        }
    }
    Ok(())
}

fn cmd_show(gallery: &Gallery, filename: &str) -> Result<()> {
    let video = catalog::get_video(gallery, filename)?;

    println!("{}", video.filename);
    println!();
    println!("Title:       {}", video.display_name);
    println!("Orientation: {}", video.orientation);
    if video.width > 0 && video.height > 0 {
        println!("Resolution:  {}x{}", video.width, video.height);
    }
    if video.duration > 0.0 {
        println!("Duration:    {}", format_duration(video.duration));
    }
    println!("Views:       {}", video.views);
    println!("Likes:       {} / Dislikes: {}", video.likes, video.dislikes);
    println!("Added:       {}", video.created_at);
    if video.banned {
        println!("Status:      banned");
    }
    Ok(())
}

fn cmd_view(gallery: &Gallery, filename: &str, session: Option<String>) -> Result<()> {
    let session = session_or_new(session);
    let video = catalog::record_view(gallery, &session, filename)?;
    println!("Watching {} ({} views)", video.display_name, video.views);
    Ok(())
}

fn cmd_history(gallery: Gallery, session: &str, limit: Option<usize>) -> Result<()> {
    let limit = limit.unwrap_or(gallery.config().history_limit);
    let history = catalog::watch_history(&gallery, &SessionId::from_raw(session), limit)?;

    if history.is_empty() {
        println!("No history for session {}.", session);
        return Ok(());
    }

    println!("{:>20}  {}", "Watched", "Filename");
    println!("{}", "-".repeat(60));
    for entry in history {
        println!("{:>20}  {}", entry.watched_at, entry.filename);
    }
    Ok(())
}

fn cmd_rate(gallery: &Gallery, filename: &str, vote: &str, session: Option<String>) -> Result<()> {
    let vote = match vote.to_lowercase().as_str() {
        "like" | "up" => Vote::Like,
        "dislike" | "down" => Vote::Dislike,
        other => anyhow::bail!("Unknown vote '{}': use like or dislike", other),
    };
    let session = session_or_new(session);

    match catalog::rate(gallery, &session, filename, vote)? {
        RateOutcome::Recorded => println!("Recorded {:?} for {}", vote, filename),
        RateOutcome::AlreadyRated(previous) => {
            println!("Already rated {} ({:?}); vote unchanged", filename, previous)
        }
    }
    Ok(())
}

fn cmd_upload(gallery: &Gallery, path: PathBuf, name: Option<String>, orientation: &str) -> Result<()> {
    let choice: OrientationChoice = orientation.parse()?;
    let name = match name {
        Some(n) => n,
        None => path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .ok_or_else(|| anyhow::anyhow!("No file name in {}", path.display()))?,
    };

    let imported = ingest::import_video(gallery, &path, &name, choice)?;
    println!("Uploaded {} as {}", imported.display_name, imported.filename);
    println!("  Orientation: {}", imported.info.orientation);
    if imported.info.width > 0 {
        println!("  Resolution:  {}x{}", imported.info.width, imported.info.height);
    }
    Ok(())
}

fn cmd_admin(gallery: &Gallery, key: Option<String>, command: AdminCommands) -> Result<()> {
    // One-shot session: the key check gates the command, only the command is audited
    let session = SessionId::generate();
    let token: AdminToken = gallery.authority().grant(&session, key.as_deref())?;

    match command {
        AdminCommands::Ban { filename, reason } => {
            admin::ban(gallery, &token, &filename, &reason)?;
            println!("Banned {}", filename);
        }
        AdminCommands::Unban { filename } => {
            admin::unban(gallery, &token, &filename)?;
            println!("Unbanned {}", filename);
        }
        AdminCommands::Delete { filename } => {
            admin::delete(gallery, &token, &filename)?;
            println!("Deleted {}", filename);
        }
        AdminCommands::Rename { old, new } => {
            let new = admin::rename(gallery, &token, &old, &new)?;
            println!("Renamed {} -> {}", old, new);
        }
        AdminCommands::Reorient { filename, orientation } => {
            let orientation: Orientation = orientation.parse()?;
            admin::force_reorientation(gallery, &token, &filename, orientation)?;
            println!("{} is now {}", filename, orientation);
        }
        AdminCommands::Redetect => {
            let report = admin::redetect_all(gallery, &token)?;
            println!("Examined {}, updated {}", report.examined, report.updated.len());
        }
        AdminCommands::Fix => {
            let report = admin::fix_orientations(gallery, &token)?;
            println!("Examined {}, fixed {}", report.examined, report.updated.len());
            for f in &report.updated {
                println!("  {}", f);
            }
        }
        AdminCommands::Rescan => print_report(&admin::rescan(gallery, &token)?),
        AdminCommands::Logs { limit } => {
            let logs = admin::admin_logs(gallery, &token, limit)?;
            println!("{:>20}  {:<22}  {}", "When", "Action", "Details");
            println!("{}", "-".repeat(80));
            for entry in logs {
                println!("{:>20}  {:<22}  {}", entry.performed_at, entry.action, entry.details);
            }
        }
        AdminCommands::ClearLogs => {
            let n = admin::clear_logs(gallery, &token)?;
            println!("Cleared {} log entries", n);
        }
        AdminCommands::Videos => {
            let videos = catalog::list_all(gallery)?;
            println!("{:>10}  {:>6}  {:>6}  {:>8}  {}", "Orient.", "Views", "Banned", "Duration", "Filename");
            println!("{}", "-".repeat(80));
            for v in videos {
                println!("{:>10}  {:>6}  {:>6}  {:>8}  {}",
                    v.orientation.as_str(),
                    v.views,
                    if v.banned { "yes" } else { "" },
                    format_duration(v.duration),
                    v.filename
                );
            }
        }
        AdminCommands::Banned => {
            let banned = catalog::list_banned(gallery)?;
            if banned.is_empty() {
                println!("No banned videos.");
            }
            for b in banned {
                println!("{}  {}  ({} views) {}", b.banned_at, b.filename, b.views, b.reason);
            }
        }
    }

    Ok(())
}

fn format_duration(seconds: f64) -> String {
    let total_seconds = seconds.max(0.0).round() as i64;
    let hours = total_seconds / 3600;
    let minutes = (total_seconds % 3600) / 60;
    let seconds = total_seconds % 60;

    if hours > 0 {
        format!("{}:{:02}:{:02}", hours, minutes, seconds)
    } else {
        format!("{}:{:02}", minutes, seconds)
    }
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() > max {
        let head: String = s.chars().take(max - 3).collect();
        format!("{}...", head)
    } else {
        s.to_string()
    }
}
