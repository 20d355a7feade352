//! Exclusive lock files.

use std::fs::{self, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::thread;
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

use tracing::{debug, warn};

use crate::error::{StorageError, StorageResult};

const POLL_INTERVAL: Duration = Duration::from_millis(25);

/// A lock file held for the lifetime of the value.
///
/// The file is created with `create_new`, so only one holder can exist.
/// It holds `<pid> <unix millis>` and is removed on drop.
#[derive(Debug)]
pub struct FileLock {
    path: PathBuf,
}

impl FileLock {
    /// Acquires the lock, polling until `timeout` elapses.
    ///
    /// A lock whose timestamp is older than `stale_after` was left behind by
    /// a process that never released it. It is removed and acquisition is
    /// retried.
    ///
    /// # Errors
    ///
    /// `StorageError::LockTimeout` if another live holder keeps the lock.
    pub fn acquire(
        path: impl Into<PathBuf>,
        timeout: Duration,
        stale_after: Duration,
    ) -> StorageResult<Self> {
        let path = path.into();
        let started = Instant::now();

        loop {
            match OpenOptions::new().write(true).create_new(true).open(&path) {
                Ok(mut file) => {
                    let stamp = unix_millis(SystemTime::now());
                    let _ = writeln!(file, "{} {stamp}", std::process::id());
                    debug!(path = %path.display(), "Acquired lock");
                    return Ok(Self { path });
                }
                Err(e) if e.kind() == ErrorKind::AlreadyExists => {
                    if let Some(age) = lock_age(&path) {
                        if age >= stale_after {
                            warn!(
                                path = %path.display(),
                                age_ms = age.as_millis(),
                                "Breaking stale lock"
                            );
                            match fs::remove_file(&path) {
                                Ok(()) => continue,
                                Err(e) if e.kind() == ErrorKind::NotFound => continue,
                                Err(e) => return Err(e.into()),
                            }
                        }
                    }
                    if started.elapsed() >= timeout {
                        return Err(StorageError::LockTimeout {
                            path,
                            waited_ms: started.elapsed().as_millis(),
                        });
                    }
                    thread::sleep(POLL_INTERVAL);
                }
                Err(e) => return Err(e.into()),
            }
        }
    }

    /// Path of the lock file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

fn unix_millis(time: SystemTime) -> u128 {
    time.duration_since(UNIX_EPOCH).map_or(0, |d| d.as_millis())
}

/// Age of an existing lock, from its recorded timestamp or else its mtime.
/// `None` when the file vanished or its age cannot be told.
fn lock_age(path: &Path) -> Option<Duration> {
    let contents = fs::read_to_string(path).ok()?;
    let now = unix_millis(SystemTime::now());
    let recorded = contents
        .split_whitespace()
        .nth(1)
        .and_then(|ms| ms.parse::<u128>().ok());
    match recorded {
        Some(ms) => {
            let age = now.saturating_sub(ms);
            Some(Duration::from_millis(u64::try_from(age).unwrap_or(u64::MAX)))
        }
        None => {
            // A holder may not have written its line yet.
            let modified = fs::metadata(path).ok()?.modified().ok()?;
            SystemTime::now().duration_since(modified).ok()
        }
    }
}

impl Drop for FileLock {
    fn drop(&mut self) {
        if let Err(e) = fs::remove_file(&self.path) {
            warn!(path = %self.path.display(), error = %e, "Failed to remove lock file");
        }
    }
}
