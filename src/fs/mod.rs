// src/fs/mod.rs

use std::fmt::Debug;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

pub mod mock;

/// What a discovered path turned out to be.
///
/// Symbolic links are resolved one level: a link to a file is a `File`, a link
/// to a directory is `Other` so the walkers never follow it into a cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryKind {
    File,
    Dir,
    Other,
}

/// Abstract filesystem interface used by discovery and the worker pool.
pub trait FileSystem: Send + Sync + Debug {
    /// Return the entries of a directory as full paths.
    fn read_dir(&self, path: &Path) -> io::Result<Vec<PathBuf>>;

    fn stat(&self, path: &Path) -> io::Result<EntryKind>;

    fn create_dir_all(&self, path: &Path) -> io::Result<()>;

    fn exists(&self, path: &Path) -> bool;
}

/// Implementation that uses `std::fs`.
#[derive(Debug, Clone, Default)]
pub struct RealFileSystem;

impl FileSystem for RealFileSystem {
    fn read_dir(&self, path: &Path) -> io::Result<Vec<PathBuf>> {
        let mut entries = Vec::new();
        for entry in fs::read_dir(path)? {
            entries.push(entry?.path());
        }
        entries.sort();
        Ok(entries)
    }

    fn stat(&self, path: &Path) -> io::Result<EntryKind> {
        let meta = fs::symlink_metadata(path)?;
        let file_type = meta.file_type();

        if file_type.is_dir() {
            return Ok(EntryKind::Dir);
        }
        if file_type.is_file() {
            return Ok(EntryKind::File);
        }
        if file_type.is_symlink() {
            return match fs::metadata(path) {
                Ok(target) if target.is_file() => Ok(EntryKind::File),
                Ok(_) => Ok(EntryKind::Other),
                // Dangling link.
                Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(EntryKind::Other),
                Err(e) => Err(e),
            };
        }
        Ok(EntryKind::Other)
    }

    fn create_dir_all(&self, path: &Path) -> io::Result<()> {
        fs::create_dir_all(path)
    }

    fn exists(&self, path: &Path) -> bool {
        path.exists()
    }
}
