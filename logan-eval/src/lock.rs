//! System-wide exclusion for experiment runs.
//!
//! Only one harness may run at a time. [`ExperimentLock`] holds an exclusive
//! advisory lock on a lock file for as long as the guard lives. The kernel
//! releases it when the holder exits, so a crashed run never blocks the next
//! one. The holder's pid is written into the file for diagnostics only.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs::{self, File, TryLockError};
use std::io::{Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// File name of the default lock in the system temp directory.
pub const DEFAULT_LOCK_FILE: &str = "log_analyzer_eval.lock";

/// Attempts before giving up when the lock file keeps being replaced.
const MAX_OPEN_ATTEMPTS: usize = 8;

/// Default lock location: `$TMPDIR/log_analyzer_eval.lock`.
pub fn default_lock_path() -> PathBuf {
    std::env::temp_dir().join(DEFAULT_LOCK_FILE)
}

/// Contents of the lock file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LockHolder {
    pub pid: u32,
    pub acquired_at: DateTime<Utc>,
}

/// Errors from acquiring the experiment lock.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum LockError {
    /// Another process holds the lock
    #[error("another experiment is already running (lock: {}{})", .path.display(), describe(.holder))]
    Contention {
        path: PathBuf,
        holder: Option<LockHolder>,
    },

    /// The lock file could not be created or locked
    #[error("Failed to access lock file {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

fn describe(holder: &Option<LockHolder>) -> String {
    match holder {
        Some(h) => format!(", held by pid {} since {}", h.pid, h.acquired_at.to_rfc3339()),
        None => String::new(),
    }
}

/// Guard for the experiment lock.
///
/// Dropping it removes the lock file and then releases the advisory lock.
#[derive(Debug)]
pub struct ExperimentLock {
    path: PathBuf,
    file: File,
    holder: LockHolder,
}

impl ExperimentLock {
    /// Acquire the lock at `path`, failing fast if it is held.
    ///
    /// # Errors
    ///
    /// - `LockError::Contention` if another process holds the lock
    /// - `LockError::Io` if the file cannot be opened, locked or written
    pub fn acquire(path: impl Into<PathBuf>) -> Result<Self, LockError> {
        let path = path.into();
        let io_err = |source| LockError::Io {
            path: path.clone(),
            source,
        };

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(io_err)?;
        }

        for _ in 0..MAX_OPEN_ATTEMPTS {
            let file = fs::OpenOptions::new()
                .read(true)
                .write(true)
                .create(true)
                .truncate(false)
                .open(&path)
                .map_err(io_err)?;

            match file.try_lock() {
                Ok(()) => {}
                Err(TryLockError::WouldBlock) => {
                    return Err(LockError::Contention {
                        holder: read_holder(&path),
                        path,
                    });
                }
                Err(TryLockError::Error(source)) => return Err(io_err(source)),
            }

            // The previous holder may have unlinked the file between our open
            // and our lock; that inode is no longer the lock.
            if !same_file(&file, &path) {
                log::debug!("Lock file {} was replaced, retrying", path.display());
                continue;
            }

            let holder = LockHolder {
                pid: std::process::id(),
                acquired_at: Utc::now(),
            };
            write_holder(&file, &holder).map_err(io_err)?;
            log::debug!("Acquired experiment lock {}", path.display());
            return Ok(Self { path, file, holder });
        }

        Err(LockError::Contention {
            holder: read_holder(&path),
            path,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn holder(&self) -> &LockHolder {
        &self.holder
    }
}

impl Drop for ExperimentLock {
    fn drop(&mut self) {
        // Still locked here, so the path names our file or something
        // created outside the lock protocol.
        if !same_file(&self.file, &self.path) {
            log::warn!("Lock file {} no longer belongs to this run", self.path.display());
            return;
        }
        match fs::remove_file(&self.path) {
            Ok(()) => log::debug!("Released experiment lock {}", self.path.display()),
            Err(e) => log::warn!(
                "Failed to remove lock file {}: {}",
                self.path.display(),
                e
            ),
        }
    }
}

fn write_holder(mut file: &File, holder: &LockHolder) -> std::io::Result<()> {
    let payload = serde_json::to_string(holder)
        .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
    file.set_len(0)?;
    file.seek(SeekFrom::Start(0))?;
    file.write_all(payload.as_bytes())?;
    file.sync_all()
}

/// Read the holder recorded in an existing lock file.
///
/// `None` when the file is empty (still being written) or unreadable.
fn read_holder(path: &Path) -> Option<LockHolder> {
    let content = fs::read_to_string(path).ok()?;
    serde_json::from_str(content.trim()).ok()
}

/// Whether `path` still refers to the open `file`.
#[cfg(unix)]
fn same_file(file: &File, path: &Path) -> bool {
    use std::os::unix::fs::MetadataExt;
    match (file.metadata(), fs::metadata(path)) {
        (Ok(open), Ok(on_disk)) => open.dev() == on_disk.dev() && open.ino() == on_disk.ino(),
        _ => false,
    }
}

#[cfg(not(unix))]
fn same_file(_file: &File, path: &Path) -> bool {
    path.exists()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Barrier};
    use tempfile::TempDir;

    fn leftover_holder() -> String {
        serde_json::to_string(&LockHolder {
            pid: 4_194_304 + 17,
            acquired_at: Utc::now(),
        })
        .unwrap()
    }

    #[test]
    fn test_acquire_writes_holder_and_drop_removes() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("eval.lock");

        let lock = ExperimentLock::acquire(&path).unwrap();
        let holder = read_holder(&path).unwrap();
        assert_eq!(holder.pid, std::process::id());
        assert_eq!(&holder, lock.holder());

        drop(lock);
        assert!(!path.exists());
    }

    #[test]
    fn test_second_acquire_is_contention() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("eval.lock");

        let _first = ExperimentLock::acquire(&path).unwrap();
        let err = ExperimentLock::acquire(&path).unwrap_err();

        assert!(matches!(err, LockError::Contention { holder: Some(_), .. }));
        assert!(err
            .to_string()
            .contains("another experiment is already running"));
        // The holder's file is untouched by the failed attempt.
        assert!(path.exists());
        assert_eq!(read_holder(&path).unwrap().pid, std::process::id());
    }

    #[test]
    fn test_lock_reusable_after_release() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("eval.lock");

        drop(ExperimentLock::acquire(&path).unwrap());
        assert!(ExperimentLock::acquire(&path).is_ok());
    }

    #[test]
    fn test_leftover_file_without_lock_is_reused() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("eval.lock");
        // A crashed run leaves its file behind but not its lock.
        fs::write(&path, leftover_holder()).unwrap();

        let lock = ExperimentLock::acquire(&path).unwrap();
        assert_eq!(lock.holder().pid, std::process::id());
        assert_eq!(read_holder(&path).as_ref(), Some(lock.holder()));
    }

    #[test]
    fn test_empty_leftover_file_is_reused() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("eval.lock");
        fs::write(&path, "").unwrap();

        assert!(ExperimentLock::acquire(&path).is_ok());
    }

    #[test]
    fn test_concurrent_acquire_over_leftover_has_one_winner() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("eval.lock");
        let leftover = leftover_holder();

        for _ in 0..200 {
            fs::write(&path, &leftover).unwrap();
            let barrier = Arc::new(Barrier::new(2));
            let handles: Vec<_> = (0..2)
                .map(|_| {
                    let barrier = barrier.clone();
                    let path = path.clone();
                    std::thread::spawn(move || {
                        barrier.wait();
                        let lock = ExperimentLock::acquire(&path);
                        // Keep the guard alive until both threads have tried.
                        barrier.wait();
                        lock.is_ok()
                    })
                })
                .collect();

            let winners = handles
                .into_iter()
                .map(|h| h.join().unwrap())
                .filter(|won| *won)
                .count();
            assert_eq!(winners, 1);
        }
    }

    #[cfg(unix)]
    #[test]
    fn test_drop_leaves_replaced_file_alone() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("eval.lock");
        let lock = ExperimentLock::acquire(&path).unwrap();

        fs::remove_file(&path).unwrap();
        fs::write(&path, "someone else").unwrap();
        drop(lock);

        assert_eq!(fs::read_to_string(&path).unwrap(), "someone else");
    }

    #[test]
    fn test_creates_parent_directories() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested/locks/eval.lock");
        let lock = ExperimentLock::acquire(&path).unwrap();
        assert!(lock.path().exists());
    }

    #[test]
    fn test_default_lock_path_in_temp_dir() {
        let path = default_lock_path();
        assert!(path.starts_with(std::env::temp_dir()));
        assert!(path.ends_with(DEFAULT_LOCK_FILE));
    }
}
