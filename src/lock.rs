//! Write Lock: the single `flock`-equivalent serializing commit, pack, and
//! revprop mutation (spec.md §4.9).
//!
//! Grounded on `fs2::FileExt::try_lock_exclusive` as used in `robt.rs`'s
//! `purge_file` (open, non-blocking try-lock, unlock on drop), generalized
//! here into a blocking-with-timeout acquire since a writer needs to wait
//! for the lock rather than skip the file when it is held.

use std::{fs, thread, time::Duration};

use fs2::FileExt;

use crate::{layout::Layout, util::files, Result};

/// Poll interval while waiting for the lock (spec.md mentions no specific
/// value; `robt`'s `purger` thread polls its retry queue every second, so
/// this uses the same cadence scaled down for a foreground wait).
const POLL_INTERVAL: Duration = Duration::from_millis(50);

pub struct WriteLock {
    file: fs::File,
}

impl WriteLock {
    /// Acquire the repository's write lock, blocking up to `timeout`.
    /// Readers never call this — they take no lock at all (spec.md §4.9).
    pub fn acquire(layout: &Layout, timeout: Duration) -> Result<WriteLock> {
        let path = layout.write_lock();
        let file = files::open_file_a(&crate::layout::to_os_string(&path)).or_else(|_| {
            files::create_file_a(&crate::layout::to_os_string(&path))
        })?;

        let deadline = std::time::Instant::now() + timeout;
        loop {
            match file.try_lock_exclusive() {
                Ok(()) => return Ok(WriteLock { file }),
                Err(_) if std::time::Instant::now() < deadline => {
                    thread::sleep(POLL_INTERVAL);
                }
                Err(err) => return err_at!(LockTimeout, msg: "write-lock: {} after {:?}: {}", path.display(), timeout, err),
            }
        }
    }
}

impl Drop for WriteLock {
    fn drop(&mut self) {
        if let Err(err) = self.file.unlock() {
            log::warn!("failed to release write lock: {}", err);
        }
    }
}

#[cfg(test)]
#[path = "lock_test.rs"]
mod lock_test;
