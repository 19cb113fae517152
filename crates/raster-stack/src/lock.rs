//! Advisory single-writer lock for band-stack files.
//!
//! A writer creates `<stack>.lock` exclusively before rewriting the stack
//! and removes it when done. Readers never take the lock; the atomic rename
//! in the GeoTIFF writer keeps them from seeing partial files.

use std::ffi::OsString;
use std::fs::{self, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::thread;
use std::time::{Duration, Instant};

use tracing::{debug, warn};

use crate::error::{Result, StackError};

const POLL_INTERVAL: Duration = Duration::from_millis(50);

/// A held lock on one band-stack file. Released on drop.
#[derive(Debug)]
pub struct StackLock {
    target: PathBuf,
    lock_path: PathBuf,
}

impl StackLock {
    /// Acquire the lock for `target`, polling for up to `wait`.
    ///
    /// A zero `wait` makes a single attempt.
    pub fn acquire(target: impl AsRef<Path>, wait: Duration) -> Result<Self> {
        let target = target.as_ref().to_path_buf();
        let lock_path = lock_path(&target);
        let deadline = Instant::now() + wait;

        loop {
            match OpenOptions::new()
                .write(true)
                .create_new(true)
                .open(&lock_path)
            {
                Ok(mut file) => {
                    let stamp = format!(
                        "{} {}\n",
                        std::process::id(),
                        chrono::Utc::now().to_rfc3339()
                    );
                    if let Err(e) = file.write_all(stamp.as_bytes()) {
                        warn!(error = %e, lock = %lock_path.display(), "Could not write lock owner");
                    }
                    debug!(lock = %lock_path.display(), "Acquired stack lock");
                    return Ok(Self { target, lock_path });
                }
                Err(e) if e.kind() == ErrorKind::AlreadyExists => {
                    if Instant::now() >= deadline {
                        return Err(StackError::ConcurrentWriteConflict(target));
                    }
                    thread::sleep(POLL_INTERVAL);
                }
                Err(e) => return Err(e.into()),
            }
        }
    }

    /// The stack file this lock guards.
    pub fn target(&self) -> &Path {
        &self.target
    }

    pub fn lock_path(&self) -> &Path {
        &self.lock_path
    }
}

impl Drop for StackLock {
    fn drop(&mut self) {
        if let Err(e) = fs::remove_file(&self.lock_path) {
            warn!(error = %e, lock = %self.lock_path.display(), "Failed to release stack lock");
        }
    }
}

/// `<target>.lock`, next to the stack file.
pub fn lock_path(target: &Path) -> PathBuf {
    let mut name = OsString::from(target.as_os_str());
    name.push(".lock");
    PathBuf::from(name)
}
