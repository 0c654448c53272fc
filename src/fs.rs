use anyhow::{Context, Result};
use std::path::Path;

/// Storage used by the catalog writer.
///
/// The writer only needs to create directories, read a file if it exists,
/// write a file, and hold an exclusive lock on a catalog file for the length
/// of one read-merge-write cycle.
pub trait FileSystem: Send + Sync {
    /// Guard released on drop
    type Lock;

    /// Read file contents as a string
    fn read_to_string(&self, path: &Path) -> Result<String>;

    /// Write string contents to a file
    fn write(&self, path: &Path, contents: &str) -> Result<()>;

    /// Check if a path exists
    fn exists(&self, path: &Path) -> bool;

    /// Create a directory and all parent directories
    fn create_dir_all(&self, path: &Path) -> Result<()>;

    /// Take an exclusive lock on `path`, creating an empty file if needed
    fn lock(&self, path: &Path) -> Result<Self::Lock>;
}

/// Real file system implementation using std::fs and advisory file locks
#[derive(Debug, Default, Clone)]
pub struct RealFileSystem;

impl FileSystem for RealFileSystem {
    type Lock = std::fs::File;

    fn read_to_string(&self, path: &Path) -> Result<String> {
        Ok(std::fs::read_to_string(path)?)
    }

    fn write(&self, path: &Path, contents: &str) -> Result<()> {
        Ok(std::fs::write(path, contents)?)
    }

    fn exists(&self, path: &Path) -> bool {
        path.exists()
    }

    fn create_dir_all(&self, path: &Path) -> Result<()> {
        Ok(std::fs::create_dir_all(path)?)
    }

    fn lock(&self, path: &Path) -> Result<Self::Lock> {
        use fs2::FileExt;

        let file = std::fs::OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(path)
            .with_context(|| format!("Failed to open for locking: {}", path.display()))?;
        file.lock_exclusive()
            .with_context(|| format!("Failed to lock: {}", path.display()))?;
        // Unlocked when the handle is closed
        Ok(file)
    }
}
