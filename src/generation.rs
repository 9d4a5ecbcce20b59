//! Generation Tracker: the revprop-cache invalidation counter (spec.md
//! §4.8).
//!
//! The source keeps this counter in a named shared-memory segment so every
//! process sharing a repository observes the same value without going to
//! disk. A single-process rewrite has no equivalent primitive to reach for
//! (no other example in the pack models cross-process shared memory), so
//! [GenerationTracker] holds the counter in an in-process [AtomicU64] and
//! treats `db/revprop-generation` purely as the durable seed/backup — one
//! process's view does not race another's the way the source's shared
//! segment does. Noted as an open-question resolution in `DESIGN.md`.

use std::{
    sync::atomic::{AtomicU64, Ordering::SeqCst},
    time::{Duration, SystemTime, UNIX_EPOCH},
};

use crate::{layout::Layout, util::files, Result};

/// Writer recovers a stale odd generation after this many seconds
/// (spec.md §4.8 "apr_time_now + 10 seconds").
pub const RECOVERY_TIMEOUT_SECS: u64 = 10;

pub struct GenerationTracker {
    path: std::path::PathBuf,
    counter: AtomicU64,
    /// Unix-epoch seconds after which an odd counter is considered stale.
    /// Zero means no write is in progress.
    deadline: AtomicU64,
}

fn now_secs() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or(Duration::from_secs(0))
        .as_secs()
}

impl GenerationTracker {
    /// Seed the atomic from `db/revprop-generation`, defaulting to 0 if the
    /// file is absent (fresh repository).
    pub fn open(layout: &Layout) -> Result<GenerationTracker> {
        let path = layout.revprop_generation();
        let counter = if path.exists() {
            let buf = files::read_file(&crate::layout::to_os_string(&path))?;
            let text = std::str::from_utf8(&buf).map_err(|e| crate::Error::FailConvert(e.to_string()))?;
            err_at!(FailConvert, text.trim().parse::<u64>())?
        } else {
            0
        };
        Ok(GenerationTracker {
            path,
            counter: AtomicU64::new(counter),
            deadline: AtomicU64::new(0),
        })
    }

    /// Fast-path read: the value readers compare cached revprops against.
    pub fn current(&self) -> u64 {
        self.counter.load(SeqCst)
    }

    pub fn is_write_in_progress(&self) -> bool {
        self.current() % 2 == 1
    }

    fn persist(&self, value: u64) -> Result<()> {
        files::write_atomic(&crate::layout::to_os_string(&self.path), value.to_string().as_bytes())
    }

    /// Begin a revprop mutation: bump to the next odd value and persist
    /// it, returning a guard whose [WriteGuard::commit] bumps to the next
    /// even value. Dropping the guard without committing leaves the
    /// generation odd, exactly mirroring the source's crash window.
    pub fn begin_write(&self) -> Result<WriteGuard<'_>> {
        let next = self.counter.load(SeqCst) + 1;
        debug_assert!(next % 2 == 1);
        self.counter.store(next, SeqCst);
        self.deadline.store(now_secs() + RECOVERY_TIMEOUT_SECS, SeqCst);
        self.persist(next)?;
        Ok(WriteGuard { tracker: self, done: false })
    }

    /// Called by the write-lock holder when it observes an odd generation:
    /// if the recovery timeout has elapsed, assume the writer that started
    /// it died and bump to the next even value (spec.md §4.8).
    pub fn recover_if_stale(&self) -> Result<bool> {
        if !self.is_write_in_progress() {
            return Ok(false);
        }
        let deadline = self.deadline.load(SeqCst);
        if deadline != 0 && now_secs() < deadline {
            return Ok(false);
        }
        let next = self.counter.load(SeqCst) + 1;
        self.counter.store(next, SeqCst);
        self.deadline.store(0, SeqCst);
        self.persist(next)?;
        Ok(true)
    }
}

/// Held for the duration of a revprop mutation under the write lock.
pub struct WriteGuard<'a> {
    tracker: &'a GenerationTracker,
    done: bool,
}

impl<'a> WriteGuard<'a> {
    /// Bump to the next even value and persist it, completing the write.
    pub fn commit(mut self) -> Result<()> {
        let next = self.tracker.counter.load(SeqCst) + 1;
        debug_assert!(next % 2 == 0);
        self.tracker.counter.store(next, SeqCst);
        self.tracker.deadline.store(0, SeqCst);
        self.tracker.persist(next)?;
        self.done = true;
        Ok(())
    }
}

impl<'a> Drop for WriteGuard<'a> {
    fn drop(&mut self) {
        if !self.done {
            log::warn!("revprop write guard dropped without commit; generation left odd");
        }
    }
}

#[cfg(test)]
#[path = "generation_test.rs"]
mod generation_test;
