// Background scanner -- reconciles the video root on a fixed interval.
//
// The thread scans once at startup, then waits for either the interval to
// elapse or a command from its handle. A failed or panicking scan is logged
// and the loop carries on with the next interval.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::mpsc::{self, RecvTimeoutError, Sender};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;

use crate::error::Result;
use crate::gallery::Gallery;
use crate::scan;

enum ScannerCommand {
    ScanNow,
    Shutdown,
}

/// Owner's handle on the scanner thread. Dropping it stops the thread.
pub struct ScannerHandle {
    tx: Sender<ScannerCommand>,
    completed: Arc<AtomicUsize>,
    thread: Option<JoinHandle<()>>,
}

impl ScannerHandle {
    /// Ask for a scan ahead of schedule. Returns false if the thread is gone.
    pub fn trigger(&self) -> bool {
        self.tx.send(ScannerCommand::ScanNow).is_ok()
    }

    /// Number of scan cycles run so far, failed ones included.
    pub fn completed_scans(&self) -> usize {
        self.completed.load(Ordering::SeqCst)
    }

    /// Stop the thread and wait for an in-flight scan to finish.
    pub fn shutdown(mut self) {
        self.stop();
    }

    fn stop(&mut self) {
        let _ = self.tx.send(ScannerCommand::Shutdown);
        if let Some(thread) = self.thread.take() {
            if thread.join().is_err() {
                log::error!("Scanner thread terminated abnormally");
            }
        }
    }
}

impl Drop for ScannerHandle {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Spawn the background scanner thread.
pub fn spawn_scanner(gallery: Arc<Gallery>, interval: Duration) -> Result<ScannerHandle> {
    let (tx, rx) = mpsc::channel();
    let completed = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&completed);

    let thread = std::thread::Builder::new()
        .name("gallery-scanner".into())
        .spawn(move || {
            log::info!("Scanner started, interval {}s", interval.as_secs());
            loop {
                run_scan_cycle(&gallery);
                counter.fetch_add(1, Ordering::SeqCst);

                match rx.recv_timeout(interval) {
                    Ok(ScannerCommand::ScanNow) | Err(RecvTimeoutError::Timeout) => continue,
                    Ok(ScannerCommand::Shutdown) | Err(RecvTimeoutError::Disconnected) => break,
                }
            }
            log::info!("Scanner stopped");
        })?;

    Ok(ScannerHandle {
        tx,
        completed,
        thread: Some(thread),
    })
}

fn run_scan_cycle(gallery: &Gallery) {
    // Catch panics so the thread never dies
    let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| scan::scan(gallery)));

    match result {
        Ok(Ok(report)) if !report.is_noop() => {
            log::info!(
                "Background scan: {} added, {} updated, {} removed",
                report.added.len(),
                report.updated.len(),
                report.removed.len()
            );
        }
        Ok(Ok(_)) => log::debug!("Background scan: no changes"),
        Ok(Err(e)) => log::error!("Background scan failed: {}", e),
        Err(_) => log::error!("Background scan panicked (recovered)"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Instant;
    use crate::gallery::testing::{test_gallery, touch, FakeProbe};
    use crate::db::schema;

    fn wait_for(mut done: impl FnMut() -> bool) -> bool {
        let deadline = Instant::now() + Duration::from_secs(10);
        while Instant::now() < deadline {
            if done() {
                return true;
            }
            std::thread::sleep(Duration::from_millis(20));
        }
        false
    }

    fn stored(gallery: &Gallery) -> usize {
        let conn = gallery.store().connect().unwrap();
        schema::list_filenames(&conn).unwrap().len()
    }

    #[test]
    fn test_scans_on_start_and_on_trigger() {
        let probe = FakeProbe::default();
        let (_tmp, gallery) = test_gallery(&probe);
        touch(&gallery, "first.mp4");
        let gallery = Arc::new(gallery);

        let handle = spawn_scanner(Arc::clone(&gallery), Duration::from_secs(3600)).unwrap();
        assert!(wait_for(|| handle.completed_scans() >= 1));
        assert_eq!(stored(&gallery), 1);

        touch(&gallery, "second.mp4");
        assert!(handle.trigger());
        assert!(wait_for(|| handle.completed_scans() >= 2));
        assert_eq!(stored(&gallery), 2);

        handle.shutdown();
    }

    #[test]
    fn test_failing_scan_keeps_thread_alive() {
        let probe = FakeProbe::default();
        let (_tmp, gallery) = test_gallery(&probe);
        std::fs::remove_dir_all(gallery.video_root()).unwrap();
        let gallery = Arc::new(gallery);

        let handle = spawn_scanner(Arc::clone(&gallery), Duration::from_millis(10)).unwrap();
        assert!(wait_for(|| handle.completed_scans() >= 3));

        std::fs::create_dir_all(gallery.video_root()).unwrap();
        touch(&gallery, "back.mp4");
        assert!(wait_for(|| stored(&gallery) == 1));
        drop(handle);
    }
}
