// Upload import scenarios

use super::*;
use crate::catalog;
use crate::gallery::testing::{test_gallery, touch, FakeProbe};
use tempfile::TempDir;

fn upload_source(dir: &TempDir, name: &str) -> PathBuf {
    let path = dir.path().join(name);
    std::fs::write(&path, b"uploaded bytes").unwrap();
    path
}

#[test]
fn test_auto_orientation_from_first_tier() {
    let probe = FakeProbe::default();
    probe.set("clip.mp4", 1080, 1920, 12.0);
    let (_tmp, gallery) = test_gallery(&probe);
    let incoming = TempDir::new().unwrap();

    let imported = import_video(
        &gallery,
        &upload_source(&incoming, "upload.tmp"),
        "clip.mp4",
        OrientationChoice::Auto,
    )
    .unwrap();

    assert_eq!(imported.filename, "clip.mp4");
    assert!(imported.path.exists());

    let video = catalog::get_video(&gallery, "clip.mp4").unwrap();
    assert_eq!(video.orientation, Orientation::Vertical);
    assert_eq!((video.width, video.height), (1080, 1920));
    assert_eq!(video.views, 0);
    assert!(!video.banned);

    let conn = gallery.store().connect().unwrap();
    let logs = schema::list_admin_logs(&conn, 10).unwrap();
    assert_eq!(logs.len(), 1);
    assert_eq!(logs[0].action, ACTION_UPLOAD);
    assert!(logs[0].details.contains("clip.mp4"));
}

#[test]
fn test_manual_orientation_keeps_measurements() {
    let probe = FakeProbe::default();
    probe.set("clip.mp4", 1920, 1080, 5.0);
    let (_tmp, gallery) = test_gallery(&probe);
    let incoming = TempDir::new().unwrap();

    let choice: OrientationChoice = "vertical".parse().unwrap();
    import_video(&gallery, &upload_source(&incoming, "a"), "clip.mp4", choice).unwrap();

    let video = catalog::get_video(&gallery, "clip.mp4").unwrap();
    assert_eq!(video.orientation, Orientation::Vertical);
    assert_eq!((video.width, video.height), (1920, 1080));
}

#[test]
fn test_name_collision_gets_suffix_and_keeps_display_name() {
    let probe = FakeProbe::default();
    let (_tmp, gallery) = test_gallery(&probe);
    touch(&gallery, "Мой клип.mp4");
    let incoming = TempDir::new().unwrap();

    let imported = import_video(
        &gallery,
        &upload_source(&incoming, "x"),
        "Мой клип.mp4",
        OrientationChoice::Auto,
    )
    .unwrap();

    assert_eq!(imported.filename, "Мой клип_1.mp4");
    assert_eq!(imported.display_name, "Мой клип.mp4");
    // Nothing measured it
    assert_eq!(imported.info, VideoInfo::unknown());
}

#[test]
fn test_stale_row_is_replaced() {
    let probe = FakeProbe::default();
    probe.set("clip.mp4", 1920, 1080, 5.0);
    let (_tmp, gallery) = test_gallery(&probe);

    // Record left behind after the file vanished from disk
    let conn = gallery.store().connect().unwrap();
    schema::insert_video_if_absent(&conn, &NewVideo {
        filename: "clip.mp4".into(),
        display_name: "old".into(),
        info: VideoInfo::unknown(),
    })
    .unwrap();
    schema::increment_views(&conn, "clip.mp4").unwrap();
    schema::ban_video_rows(&conn, "clip.mp4", "old ban").unwrap();

    let incoming = TempDir::new().unwrap();
    import_video(&gallery, &upload_source(&incoming, "x"), "clip.mp4", OrientationChoice::Auto).unwrap();

    let video = catalog::get_video(&gallery, "clip.mp4").unwrap();
    assert_eq!(video.display_name, "clip.mp4");
    assert_eq!(video.views, 0);
    assert!(!video.banned);
    assert_eq!(schema::get_ban_reason(&conn, "clip.mp4").unwrap(), None);
}

#[test]
fn test_disallowed_extension_is_rejected() {
    let probe = FakeProbe::default();
    let (_tmp, gallery) = test_gallery(&probe);
    let incoming = TempDir::new().unwrap();
    let source = upload_source(&incoming, "x");

    for name in ["notes.txt", "noext", ""] {
        let err = import_video(&gallery, &source, name, OrientationChoice::Auto).unwrap_err();
        assert!(matches!(err, GalleryError::Validation(_)), "{}: {:?}", name, err);
    }
    assert!(std::fs::read_dir(gallery.video_root())
        .unwrap()
        .filter_map(|e| e.ok())
        .all(|e| e.path().is_dir()));
}

#[test]
fn test_choice_parsing() {
    assert_eq!("AUTO".parse::<OrientationChoice>().unwrap(), OrientationChoice::Auto);
    assert_eq!(
        "square".parse::<OrientationChoice>().unwrap(),
        OrientationChoice::Fixed(Orientation::Square)
    );
    assert!("unknown".parse::<OrientationChoice>().is_err());
    assert!("sideways".parse::<OrientationChoice>().is_err());
}
