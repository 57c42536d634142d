// src/fs/mock.rs

use super::{EntryKind, FileSystem};
use std::collections::{BTreeMap, HashSet};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum MockEntry {
    File,
    Dir,
}

#[derive(Debug, Default)]
struct MockState {
    entries: BTreeMap<PathBuf, MockEntry>,
    unreadable: HashSet<PathBuf>,
    unstatable: HashSet<PathBuf>,
    read_only: HashSet<PathBuf>,
    created_dirs: Vec<PathBuf>,
}

/// In-memory filesystem with failure injection, for exercising the error
/// paths of discovery and the worker pool without touching permissions.
///
/// Parent directories are created implicitly by [`MockFileSystem::add_file`]
/// and [`MockFileSystem::add_dir`].
#[derive(Debug, Clone, Default)]
pub struct MockFileSystem {
    state: Arc<Mutex<MockState>>,
}

impl MockFileSystem {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, MockState> {
        // A panic while holding the lock only happens inside a failing test.
        self.state.lock().unwrap_or_else(|p| p.into_inner())
    }

    pub fn add_file(&self, path: impl AsRef<Path>) {
        let path = path.as_ref();
        let mut state = self.lock();
        ensure_parents(&mut state.entries, path);
        state.entries.insert(path.to_path_buf(), MockEntry::File);
    }

    pub fn add_dir(&self, path: impl AsRef<Path>) {
        let path = path.as_ref();
        let mut state = self.lock();
        ensure_parents(&mut state.entries, path);
        state.entries.insert(path.to_path_buf(), MockEntry::Dir);
    }

    /// Make `read_dir` on this directory fail with `PermissionDenied`.
    pub fn deny_read_dir(&self, path: impl AsRef<Path>) {
        self.lock().unreadable.insert(path.as_ref().to_path_buf());
    }

    /// Make `stat` on this path fail with `PermissionDenied`.
    pub fn deny_stat(&self, path: impl AsRef<Path>) {
        self.lock().unstatable.insert(path.as_ref().to_path_buf());
    }

    /// Make `create_dir_all` fail for this directory and anything below it.
    pub fn deny_create_dir(&self, path: impl AsRef<Path>) {
        self.lock().read_only.insert(path.as_ref().to_path_buf());
    }

    /// Directories created through `create_dir_all`, in call order.
    pub fn created_dirs(&self) -> Vec<PathBuf> {
        self.lock().created_dirs.clone()
    }

    pub fn is_dir(&self, path: impl AsRef<Path>) -> bool {
        matches!(self.lock().entries.get(path.as_ref()), Some(MockEntry::Dir))
    }
}

fn ensure_parents(entries: &mut BTreeMap<PathBuf, MockEntry>, path: &Path) {
    let mut parent = path.parent();
    while let Some(dir) = parent {
        if dir.as_os_str().is_empty() {
            break;
        }
        entries.entry(dir.to_path_buf()).or_insert(MockEntry::Dir);
        parent = dir.parent();
    }
}

fn denied(path: &Path) -> io::Error {
    io::Error::new(
        io::ErrorKind::PermissionDenied,
        format!("permission denied: {}", path.display()),
    )
}

fn not_found(path: &Path) -> io::Error {
    io::Error::new(
        io::ErrorKind::NotFound,
        format!("not found: {}", path.display()),
    )
}

impl FileSystem for MockFileSystem {
    fn read_dir(&self, path: &Path) -> io::Result<Vec<PathBuf>> {
        let state = self.lock();
        if state.unreadable.contains(path) {
            return Err(denied(path));
        }
        match state.entries.get(path) {
            Some(MockEntry::Dir) => Ok(state
                .entries
                .keys()
                .filter(|p| p.parent() == Some(path))
                .cloned()
                .collect()),
            Some(MockEntry::File) => Err(io::Error::new(
                io::ErrorKind::Other,
                format!("not a directory: {}", path.display()),
            )),
            None => Err(not_found(path)),
        }
    }

    fn stat(&self, path: &Path) -> io::Result<EntryKind> {
        let state = self.lock();
        if state.unstatable.contains(path) {
            return Err(denied(path));
        }
        match state.entries.get(path) {
            Some(MockEntry::Dir) => Ok(EntryKind::Dir),
            Some(MockEntry::File) => Ok(EntryKind::File),
            None => Err(not_found(path)),
        }
    }

    fn create_dir_all(&self, path: &Path) -> io::Result<()> {
        let mut state = self.lock();
        if state.read_only.iter().any(|ro| path.starts_with(ro)) {
            return Err(denied(path));
        }
        if let Some(MockEntry::File) = state.entries.get(path) {
            return Err(io::Error::new(
                io::ErrorKind::AlreadyExists,
                format!("file exists: {}", path.display()),
            ));
        }
        ensure_parents(&mut state.entries, path);
        state.entries.insert(path.to_path_buf(), MockEntry::Dir);
        state.created_dirs.push(path.to_path_buf());
        Ok(())
    }

    fn exists(&self, path: &Path) -> bool {
        self.lock().entries.contains_key(path)
    }
}
