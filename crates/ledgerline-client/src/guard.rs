//! Submission guard: one in-flight action per UI element.
//!
//! A [`SubmissionLock`] belongs to a form or button. While an action guarded
//! by the lock is running, further invocations are dropped (not queued) and
//! return `None`. The lock is released when the action settles, whether it
//! succeeded, returned an error, panicked or was dropped.
//!
//! ```rust,ignore
//! let save_button = SubmissionLock::new();
//!
//! let outcome = with_single_flight(Some(&save_button), || async {
//!     client.post_json("/api/todo", &draft).await
//! })
//! .await;
//!
//! match outcome {
//!     None => {} // double click, ignored
//!     Some(Ok(todo)) => render(todo),
//!     Some(Err(err)) => re_enable_form(err),
//! }
//! ```

use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use dashmap::DashMap;
use tracing::debug;

/// Lock flag attached to a single UI element.
///
/// Clones share the same flag, so a cloned handle guards the same element.
#[derive(Debug, Clone, Default)]
pub struct SubmissionLock {
    locked: Arc<AtomicBool>,
}

impl SubmissionLock {
    pub fn new() -> Self {
        Self::default()
    }

    /// True while a guarded action is running.
    pub fn is_locked(&self) -> bool {
        self.locked.load(Ordering::Acquire)
    }

    fn try_acquire(&self) -> Option<LockRelease<'_>> {
        self.locked
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| LockRelease { lock: self })
    }

    /// Runs `action` unless another guarded action is already running.
    ///
    /// Returns `None` without calling `action` when the lock is held.
    pub async fn run<F, Fut>(&self, action: F) -> Option<Fut::Output>
    where
        F: FnOnce() -> Fut,
        Fut: Future,
    {
        let Some(_release) = self.try_acquire() else {
            debug!("submission already in flight, dropping duplicate");
            return None;
        };
        Some(action().await)
    }
}

/// Clears the lock flag on drop.
struct LockRelease<'a> {
    lock: &'a SubmissionLock,
}

impl Drop for LockRelease<'_> {
    fn drop(&mut self) {
        self.lock.locked.store(false, Ordering::Release);
    }
}

/// Runs `action` guarded by `lock`.
///
/// Without a lock the action always runs. With a lock, a second call made
/// while the first is still running returns `None` and never calls its
/// action.
pub async fn with_single_flight<F, Fut>(lock: Option<&SubmissionLock>, action: F) -> Option<Fut::Output>
where
    F: FnOnce() -> Fut,
    Fut: Future,
{
    match lock {
        Some(lock) => lock.run(action).await,
        None => Some(action().await),
    }
}

/// Submission locks looked up by element id.
#[derive(Debug, Default)]
pub struct SubmissionLocks {
    locks: DashMap<String, SubmissionLock>,
}

impl SubmissionLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the lock for `element_id`, creating it on first use.
    pub fn lock_for(&self, element_id: &str) -> SubmissionLock {
        self.locks
            .entry(element_id.to_string())
            .or_default()
            .clone()
    }

    /// Forgets the lock for an element that no longer exists.
    pub fn remove(&self, element_id: &str) {
        self.locks.remove(element_id);
    }

    /// Number of elements with a lock.
    pub fn element_count(&self) -> usize {
        self.locks.len()
    }
}
