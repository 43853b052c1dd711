//! Reentrancy guard
//!
//! Marks a vault as being mutated and records which thread does it. External venue
//! and swap calls run while the mark is set, so a call that finds the mark owned by
//! its own thread is a reentrant call coming back through one of them.
//!
//! ```plain
//!              ┌──────────┐
//!         ┌────► Unlocked │◄─────┐
//!         │    └──────────┘      │
//!         │         │            │
//!   ReentrantCall  try_lock    GuardToken dropped
//!   (same thread)   │            │
//!         │         ▼            │
//!         │    ┌─────────┐       │
//!         └────┤ Locked  ├───────┘
//!              └─────────┘
//! ```

use std::{
    sync::{Mutex, MutexGuard, PoisonError},
    thread::{self, ThreadId},
};

use crate::utils::error::{VaultError, VaultResult};

/// Lock state
#[derive(Clone, Debug, Default)]
pub struct Lock {
    /// Current lock state
    pub is_locked: bool,
    /// Thread that holds the lock
    pub holder: Option<ThreadId>,
    /// Timestamp in seconds of the last acquisition
    pub last_locked_at: Option<u64>,
}

impl Lock {
    /// Acquires the lock for the current thread.
    ///
    /// # Returns
    /// * `Ok(())` - Lock successfully acquired
    /// * `Err(VaultError::ReentrantCall)` - Lock is already held
    pub fn try_lock(&mut self, now: u64) -> VaultResult<()> {
        if self.is_locked {
            return Err(VaultError::ReentrantCall);
        }
        self.is_locked = true;
        self.holder = Some(thread::current().id());
        self.last_locked_at = Some(now);
        Ok(())
    }

    /// Releases the lock.
    pub fn unlock(&mut self) -> &mut Self {
        self.is_locked = false;
        self.holder = None;
        self
    }

    /// Returns `true` if the lock is held by the calling thread
    pub fn is_held_by_current_thread(&self) -> bool {
        self.is_locked && self.holder == Some(thread::current().id())
    }
}

/// Thread-safe wrapper around `Lock`
#[derive(Debug, Default)]
pub struct ReentrancyGuard {
    lock: Mutex<Lock>,
}

impl ReentrancyGuard {
    fn state(&self) -> MutexGuard<'_, Lock> {
        // The lock state is plain data, it stays consistent even if a holder panicked.
        self.lock.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Fails with `ReentrantCall` if the calling thread is inside a guarded section
    pub fn check(&self) -> VaultResult<()> {
        if self.state().is_held_by_current_thread() {
            return Err(VaultError::ReentrantCall);
        }
        Ok(())
    }

    /// Enters a guarded section. The section ends when the token is dropped.
    pub fn enter(&self, now: u64) -> VaultResult<GuardToken<'_>> {
        self.state().try_lock(now)?;
        Ok(GuardToken { guard: self })
    }

    pub fn is_locked(&self) -> bool {
        self.state().is_locked
    }

    /// Timestamp of the acquisition of the lock currently held, if any
    pub fn locked_since(&self) -> Option<u64> {
        let state = self.state();
        if state.is_locked {
            state.last_locked_at
        } else {
            None
        }
    }
}

/// Releases the guard on drop, on every exit path
pub struct GuardToken<'a> {
    guard: &'a ReentrancyGuard,
}

impl Drop for GuardToken<'_> {
    fn drop(&mut self) {
        self.guard.state().unlock();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn test_lock_state_transitions() {
        let mut lock = Lock::default();
        lock.try_lock(10).unwrap();
        assert!(lock.is_held_by_current_thread());
        assert_eq!(lock.last_locked_at, Some(10));
        assert_eq!(lock.try_lock(11), Err(VaultError::ReentrantCall));

        lock.unlock();
        assert!(!lock.is_locked);
        assert!(lock.try_lock(12).is_ok());
    }

    #[test]
    fn test_token_releases_on_drop() {
        let guard = ReentrancyGuard::default();
        {
            let _token = guard.enter(5).unwrap();
            assert!(guard.is_locked());
            assert_eq!(guard.locked_since(), Some(5));
            assert_eq!(guard.check(), Err(VaultError::ReentrantCall));
            assert!(guard.enter(6).is_err());
        }
        assert!(!guard.is_locked());
        assert!(guard.check().is_ok());
        assert_eq!(guard.locked_since(), None);
    }

    #[test]
    fn test_other_threads_are_not_reentrant() {
        let guard = Arc::new(ReentrancyGuard::default());
        let _token = guard.enter(1).unwrap();

        let other = guard.clone();
        let checked = thread::spawn(move || other.check()).join().unwrap();
        assert!(checked.is_ok(), "Another thread waits, it does not re-enter");
    }

    #[test]
    fn test_token_releases_on_error_path() {
        fn guarded(guard: &ReentrancyGuard) -> VaultResult<()> {
            let _token = guard.enter(1)?;
            Err(VaultError::VenueRejected("boom".to_string()))
        }
        let guard = ReentrancyGuard::default();
        assert!(guarded(&guard).is_err());
        assert!(!guard.is_locked());
    }
}
