//! Flat-file blob storage for box photos.
//!
//! The core never inspects image bytes; it only moves opaque blobs in and
//! out of the uploads directory, keyed by an identifier the caller owns.

use std::io::ErrorKind;
use std::path::PathBuf;

use crate::codes::BoxId;

pub trait StorageManager: Send + Sync {
    fn write(&self, ident: &str, data: &[u8]) -> std::io::Result<()>;
    fn read(&self, ident: &str) -> std::io::Result<Vec<u8>>;
    fn exists(&self, ident: &str) -> bool;
    /// Idempotent: deleting a missing blob is not an error.
    fn delete(&self, ident: &str) -> std::io::Result<()>;
}

#[derive(Clone)]
pub struct BackendLocal {
    base_dir: PathBuf,
}

impl BackendLocal {
    pub fn new(storage_dir: impl Into<PathBuf>) -> std::io::Result<Self> {
        let base_dir = storage_dir.into();
        std::fs::create_dir_all(&base_dir)?;
        Ok(BackendLocal { base_dir })
    }
}

impl StorageManager for BackendLocal {
    fn exists(&self, ident: &str) -> bool {
        std::fs::metadata(self.base_dir.join(ident)).is_ok()
    }

    fn read(&self, ident: &str) -> std::io::Result<Vec<u8>> {
        std::fs::read(self.base_dir.join(ident))
    }

    fn write(&self, ident: &str, data: &[u8]) -> std::io::Result<()> {
        // temp file + rename so readers never observe a half-written blob
        let temp_path = self.base_dir.join(format!("{}-{ident}", BoxId::new()));
        std::fs::write(&temp_path, data)?;
        std::fs::rename(&temp_path, self.base_dir.join(ident))
    }

    fn delete(&self, ident: &str) -> std::io::Result<()> {
        match std::fs::remove_file(self.base_dir.join(ident)) {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(()),
            Err(err) => Err(err),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_write_read_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let store = BackendLocal::new(dir.path()).unwrap();

        store.write("photo-1", b"jpeg bytes").unwrap();
        assert!(store.exists("photo-1"));
        assert_eq!(store.read("photo-1").unwrap(), b"jpeg bytes");
    }

    #[test]
    fn test_delete_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let store = BackendLocal::new(dir.path()).unwrap();

        store.write("photo-1", b"x").unwrap();
        store.delete("photo-1").unwrap();
        assert!(!store.exists("photo-1"));

        // second delete must not error
        store.delete("photo-1").unwrap();
    }

    #[test]
    fn test_write_replaces_existing() {
        let dir = tempfile::tempdir().unwrap();
        let store = BackendLocal::new(dir.path()).unwrap();

        store.write("photo-1", b"old").unwrap();
        store.write("photo-1", b"new").unwrap();
        assert_eq!(store.read("photo-1").unwrap(), b"new");
    }
}
