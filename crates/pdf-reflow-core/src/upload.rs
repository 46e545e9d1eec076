//! Temporary on-disk home for an uploaded document.

use std::io::Write;
use std::path::Path;

use tempfile::NamedTempFile;
use tracing::debug;

use crate::error::Result;

/// An uploaded file written to a uniquely named temporary path.
///
/// The file is deleted by [`UploadSlot::release`] or, failing that, when
/// the slot is dropped.
#[derive(Debug)]
pub struct UploadSlot {
    file: NamedTempFile,
}

impl UploadSlot {
    /// Write `bytes` to a fresh file under `dir`, creating `dir` if needed.
    pub fn create(dir: &Path, request_id: &str, bytes: &[u8]) -> Result<Self> {
        std::fs::create_dir_all(dir)?;

        let mut file = tempfile::Builder::new()
            .prefix(&format!("upload-{request_id}-"))
            .suffix(".pdf")
            .tempfile_in(dir)?;
        file.write_all(bytes)?;
        file.flush()?;

        debug!("Stored {} bytes at {}", bytes.len(), file.path().display());
        Ok(Self { file })
    }

    pub fn path(&self) -> &Path {
        self.file.path()
    }

    /// Delete the file now, reporting any failure.
    pub fn release(self) -> Result<()> {
        let path = self.file.path().to_path_buf();
        self.file.close()?;
        debug!("Removed upload {}", path.display());
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn entries(dir: &Path) -> usize {
        std::fs::read_dir(dir).unwrap().count()
    }

    #[test]
    fn test_release_deletes_file() {
        let dir = tempfile::tempdir().unwrap();
        let slot = UploadSlot::create(dir.path(), "req", b"%PDF-1.5").unwrap();
        assert_eq!(std::fs::read(slot.path()).unwrap(), b"%PDF-1.5");

        slot.release().unwrap();
        assert_eq!(entries(dir.path()), 0);
    }

    #[test]
    fn test_drop_deletes_file() {
        let dir = tempfile::tempdir().unwrap();
        {
            let _slot = UploadSlot::create(dir.path(), "req", b"data").unwrap();
            assert_eq!(entries(dir.path()), 1);
        }
        assert_eq!(entries(dir.path()), 0);
    }

    #[test]
    fn test_concurrent_slots_are_distinct() {
        let dir = tempfile::tempdir().unwrap();
        let a = UploadSlot::create(dir.path(), "same", b"a").unwrap();
        let b = UploadSlot::create(dir.path(), "same", b"b").unwrap();
        assert_ne!(a.path(), b.path());
    }

    #[test]
    fn test_creates_missing_directory() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("uploads").join("pdf");
        let slot = UploadSlot::create(&nested, "req", b"x").unwrap();
        assert!(slot.path().starts_with(&nested));
    }
}
