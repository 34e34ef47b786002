//! Filesystem collaborators: whole-file reads and writes, directory
//! creation, and the directory-backed item store.

use crate::exceptions::{FlashError, Result};
use crate::firmware::paths::resolve_item_path;
use log::trace;
use std::fs;
use std::path::{Path, PathBuf};

/// Read a whole regular file
pub fn read_file(path: &Path) -> Result<Vec<u8>> {
    let metadata = fs::metadata(path).map_err(|e| FlashError::io_at(path, e))?;
    if !metadata.is_file() {
        return Err(FlashError::io_at(
            path,
            std::io::Error::new(std::io::ErrorKind::InvalidInput, "not a regular file"),
        ));
    }

    let data = fs::read(path).map_err(|e| FlashError::io_at(path, e))?;
    trace!("Read {} bytes from {:?}", data.len(), path);
    Ok(data)
}

/// Write a whole file, creating parent directories as needed
pub fn write_file(path: &Path, data: &[u8]) -> Result<()> {
    if let Some(parent) = path.parent() {
        ensure_dir(parent)?;
    }
    fs::write(path, data).map_err(|e| FlashError::io_at(path, e))?;
    trace!("Wrote {} bytes to {:?}", data.len(), path);
    Ok(())
}

/// Create a directory and its parents if missing
pub fn ensure_dir(path: &Path) -> Result<()> {
    if path.as_os_str().is_empty() || path.is_dir() {
        return Ok(());
    }
    fs::create_dir_all(path).map_err(|e| FlashError::io_at(path, e))
}

/// Where item payloads live while staged
pub trait ItemStore {
    /// Read the payload of an item (`partition:relative_path`)
    fn read_item(&self, item: &str) -> Result<Vec<u8>>;

    /// Store the payload of an item
    fn write_item(&self, item: &str, data: &[u8]) -> Result<()>;
}

/// Item store rooted at a directory; items live at `root/<relative_path>`
#[derive(Debug, Clone)]
pub struct DirStore {
    root: PathBuf,
}

impl DirStore {
    /// Store rooted at `root`
    pub fn new(root: impl Into<PathBuf>) -> Self {
        DirStore { root: root.into() }
    }

    /// Items directory
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Path of a file directly under the root (staging lists)
    pub fn file(&self, name: &str) -> PathBuf {
        self.root.join(name)
    }

    /// File backing an item identifier
    pub fn item_path(&self, item: &str) -> Result<PathBuf> {
        resolve_item_path(&self.root, item)
    }
}

impl ItemStore for DirStore {
    fn read_item(&self, item: &str) -> Result<Vec<u8>> {
        read_file(&self.item_path(item)?)
    }

    fn write_item(&self, item: &str, data: &[u8]) -> Result<()> {
        write_file(&self.item_path(item)?, data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_dir_store_round_trip() {
        let temp_dir = TempDir::new().unwrap();
        let store = DirStore::new(temp_dir.path());

        store.write_item("update:boot/boot.img", b"BOOT").unwrap();
        assert!(temp_dir.path().join("boot/boot.img").is_file());
        assert_eq!(store.read_item("update:boot/boot.img").unwrap(), b"BOOT");
    }

    #[test]
    fn test_read_missing_file() {
        let temp_dir = TempDir::new().unwrap();
        let err = read_file(&temp_dir.path().join("missing")).unwrap_err();
        assert!(matches!(err, FlashError::IoAt { .. }));
    }

    #[test]
    fn test_read_directory_rejected() {
        let temp_dir = TempDir::new().unwrap();
        let err = read_file(temp_dir.path()).unwrap_err();
        assert!(err.to_string().contains("not a regular file"));
    }

    #[test]
    fn test_store_rejects_escape() {
        let temp_dir = TempDir::new().unwrap();
        let store = DirStore::new(temp_dir.path().join("items"));
        assert!(store.write_item("update:../outside.img", b"x").is_err());
        assert!(!temp_dir.path().join("outside.img").exists());
    }
}
