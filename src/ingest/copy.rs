// File copy into the video root

use std::fs;
use std::path::Path;

use crate::error::{GalleryError, Result};

/// Copy `source` to `dest`, sync it and check the sizes match.
/// A failed copy leaves nothing behind at `dest`.
pub fn copy_with_verify(source: &Path, dest: &Path) -> Result<u64> {
    let copied = match fs::copy(source, dest) {
        Ok(n) => n,
        Err(e) => {
            let _ = fs::remove_file(dest);
            return Err(e.into());
        }
    };

    fs::File::open(dest)?.sync_all()?;

    let source_size = fs::metadata(source)?.len();
    let dest_size = fs::metadata(dest)?.len();

    if source_size != dest_size || copied != source_size {
        let _ = fs::remove_file(dest);
        return Err(GalleryError::io_failure(format!(
            "Verification failed: size mismatch ({} vs {})",
            source_size, dest_size
        )));
    }

    Ok(dest_size)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_copy_verifies_size() {
        let dir = tempfile::tempdir().unwrap();
        let src = dir.path().join("in.mp4");
        let dst = dir.path().join("out.mp4");
        fs::write(&src, b"some video bytes").unwrap();

        assert_eq!(copy_with_verify(&src, &dst).unwrap(), 16);
        assert_eq!(fs::read(&dst).unwrap(), b"some video bytes");
    }

    #[test]
    fn test_missing_source_leaves_no_file() {
        let dir = tempfile::tempdir().unwrap();
        let dst = dir.path().join("out.mp4");
        assert!(copy_with_verify(&dir.path().join("nope.mp4"), &dst).is_err());
        assert!(!dst.exists());
    }
}
