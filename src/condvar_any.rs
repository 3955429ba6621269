//! Interrupt-aware condition variable for arbitrary lock types.
//!
//! [`InterruptibleCondvarAny`] offers the same wait surface as
//! [`crate::condvar::InterruptibleCondvar`] but accepts any caller lock that
//! implements [`Lockable`]. It cannot block on the caller's lock directly, so
//! each blocking step runs a two-phase protocol: acquire the condition
//! variable's own internal mutex, release the caller's lock, block on the
//! internal mutex/condvar pair, then reacquire the caller's lock on the way
//! out.
//!
//! The internal pair is held behind an `Arc` and every wait entry point
//! clones it into a local before the first blocking step. The usual
//! condition-variable contract allows the owner to drop the object as soon as
//! all waiters have been *notified*, before they have *returned*; the local
//! strong reference keeps the internals alive until each in-flight wait is
//! done. The token registry holds the same `Arc`, so an interrupt sweep
//! racing teardown never touches freed state either.
//!
//! `notify_one`/`notify_all` take the internal mutex before notifying, and
//! the interrupt-aware waits re-check the token's flag under that mutex
//! before blocking. A signal can therefore never fall between the flag check
//! and the park: the signaler cannot acquire the internal mutex until the
//! waiter is enqueued behind it.

use std::sync::Arc;
use std::time::{Duration, Instant};

use lock_api::{RawMutex, RawRwLock};
use parking_lot::{Condvar, Mutex, WaitTimeoutResult};

use crate::error::Interrupted;
use crate::thread;
use crate::token::InterruptToken;
use crate::waiter::{InterruptWaiter, RegistrationGuard};

/// A lock that can be released around a closure and reacquired afterwards.
///
/// Implemented for the `lock_api` guard types, which covers `parking_lot`
/// mutexes and rwlocks as well as any other lock built on the same raw
/// traits.
pub trait Lockable {
    /// Releases the lock for the duration of `f`, reacquiring it before
    /// returning.
    fn unlocked<F, R>(&mut self, f: F) -> R
    where
        F: FnOnce() -> R;
}

impl<Raw: RawMutex, T: ?Sized> Lockable for lock_api::MutexGuard<'_, Raw, T> {
    fn unlocked<F, R>(&mut self, f: F) -> R
    where
        F: FnOnce() -> R,
    {
        lock_api::MutexGuard::unlocked(self, f)
    }
}

impl<Raw: RawRwLock, T: ?Sized> Lockable for lock_api::RwLockReadGuard<'_, Raw, T> {
    fn unlocked<F, R>(&mut self, f: F) -> R
    where
        F: FnOnce() -> R,
    {
        lock_api::RwLockReadGuard::unlocked(self, f)
    }
}

impl<Raw: RawRwLock, T: ?Sized> Lockable for lock_api::RwLockWriteGuard<'_, Raw, T> {
    fn unlocked<F, R>(&mut self, f: F) -> R
    where
        F: FnOnce() -> R,
    {
        lock_api::RwLockWriteGuard::unlocked(self, f)
    }
}

/// The internal mutex/condvar pair, shared so that in-flight waits and the
/// token registry can outlive the owning [`InterruptibleCondvarAny`].
#[derive(Debug, Default)]
struct WaitInternals {
    lock: Mutex<()>,
    cv: Condvar,
}

impl InterruptWaiter for WaitInternals {
    fn notify_interrupt(&self) {
        let _guard = self.lock.lock();
        self.cv.notify_all();
    }
}

/// A condition variable for arbitrary [`Lockable`] caller locks, with the
/// same interrupt-aware wait families as the bound-lock variant.
///
/// Conditions are `FnMut() -> bool` closures (the caller's lock type is
/// opaque here, so conditions capture whatever state they guard) with
/// `wait_while` polarity: the wait keeps blocking while the condition returns
/// `true`.
#[derive(Debug, Default)]
pub struct InterruptibleCondvarAny {
    internals: Arc<WaitInternals>,
}

impl InterruptibleCondvarAny {
    /// Creates a new condition variable.
    #[must_use]
    pub fn new() -> Self {
        Self {
            internals: Arc::new(WaitInternals::default()),
        }
    }

    fn waiter_handle(internals: &Arc<WaitInternals>) -> Arc<dyn InterruptWaiter> {
        Arc::clone(internals) as Arc<dyn InterruptWaiter>
    }

    /// Wakes one blocked thread, returning whether one was woken.
    pub fn notify_one(&self) -> bool {
        let _guard = self.internals.lock.lock();
        self.internals.cv.notify_one()
    }

    /// Wakes every blocked thread, returning how many were woken.
    pub fn notify_all(&self) -> usize {
        let _guard = self.internals.lock.lock();
        self.internals.cv.notify_all()
    }

    /// Blocks until notified, releasing `lock` while blocked.
    pub fn wait<L: Lockable>(&self, lock: &mut L) {
        let internals = Arc::clone(&self.internals);
        let mut internal_guard = internals.lock.lock();
        lock.unlocked(|| {
            internals.cv.wait(&mut internal_guard);
            // Release the internal mutex before the caller's lock is
            // retaken; entering waits acquire in the opposite order.
            drop(internal_guard);
        });
    }

    /// Blocks until notified or `deadline` passes.
    pub fn wait_until<L: Lockable>(&self, lock: &mut L, deadline: Instant) -> WaitTimeoutResult {
        let internals = Arc::clone(&self.internals);
        let mut internal_guard = internals.lock.lock();
        lock.unlocked(|| {
            let result = internals.cv.wait_until(&mut internal_guard, deadline);
            drop(internal_guard);
            result
        })
    }

    /// Blocks until notified or `timeout` elapses.
    pub fn wait_for<L: Lockable>(&self, lock: &mut L, timeout: Duration) -> WaitTimeoutResult {
        self.wait_until(lock, Instant::now() + timeout)
    }

    /// Blocks until `cond` returns false.
    pub fn wait_while<L: Lockable, F>(&self, lock: &mut L, mut cond: F)
    where
        F: FnMut() -> bool,
    {
        while cond() {
            self.wait(lock);
        }
    }

    /// Blocks until `cond` returns false or `deadline` passes. Returns
    /// whether the condition cleared.
    pub fn wait_while_until<L: Lockable, F>(
        &self,
        lock: &mut L,
        mut cond: F,
        deadline: Instant,
    ) -> bool
    where
        F: FnMut() -> bool,
    {
        loop {
            if !cond() {
                return true;
            }
            if Instant::now() >= deadline {
                return false;
            }
            self.wait_until(lock, deadline);
        }
    }

    /// Blocks until `cond` returns false or `timeout` elapses. Returns
    /// whether the condition cleared.
    pub fn wait_while_for<L: Lockable, F>(&self, lock: &mut L, cond: F, timeout: Duration) -> bool
    where
        F: FnMut() -> bool,
    {
        self.wait_while_until(lock, cond, Instant::now() + timeout)
    }

    // ---- fallible family (ambient token) ----

    /// Blocks until notified; fails if the ambient token is interrupted.
    pub fn wait_or_interrupt<L: Lockable>(&self, lock: &mut L) -> Result<(), Interrupted> {
        let token = thread::current_token();
        let internals = Arc::clone(&self.internals);
        let (_registration, interrupted) =
            RegistrationGuard::new(&token, Self::waiter_handle(&internals));
        if interrupted {
            return Err(Interrupted);
        }
        {
            let mut internal_guard = internals.lock.lock();
            if token.is_interrupted() {
                return Err(Interrupted);
            }
            lock.unlocked(|| {
                internals.cv.wait(&mut internal_guard);
                drop(internal_guard);
            });
        }
        if token.is_interrupted() {
            return Err(Interrupted);
        }
        Ok(())
    }

    /// Blocks until `cond` returns false; fails if the ambient token is
    /// interrupted first.
    pub fn wait_while_or_interrupt<L: Lockable, F>(
        &self,
        lock: &mut L,
        mut cond: F,
    ) -> Result<(), Interrupted>
    where
        F: FnMut() -> bool,
    {
        let token = thread::current_token();
        let internals = Arc::clone(&self.internals);
        let (_registration, _) = RegistrationGuard::new(&token, Self::waiter_handle(&internals));
        while cond() {
            let mut internal_guard = internals.lock.lock();
            if token.is_interrupted() {
                return Err(Interrupted);
            }
            lock.unlocked(|| {
                internals.cv.wait(&mut internal_guard);
                drop(internal_guard);
            });
        }
        Ok(())
    }

    /// Blocks until `cond` returns false or `deadline` passes; fails if the
    /// ambient token is interrupted first. On success, reports whether the
    /// condition cleared.
    pub fn wait_while_until_or_interrupt<L: Lockable, F>(
        &self,
        lock: &mut L,
        mut cond: F,
        deadline: Instant,
    ) -> Result<bool, Interrupted>
    where
        F: FnMut() -> bool,
    {
        let token = thread::current_token();
        if token.is_interrupted() {
            return Err(Interrupted);
        }
        let internals = Arc::clone(&self.internals);
        let (_registration, _) = RegistrationGuard::new(&token, Self::waiter_handle(&internals));
        while cond() && Instant::now() < deadline {
            let mut internal_guard = internals.lock.lock();
            if token.is_interrupted() {
                return Err(Interrupted);
            }
            lock.unlocked(|| {
                internals.cv.wait_until(&mut internal_guard, deadline);
                drop(internal_guard);
            });
        }
        Ok(!cond())
    }

    /// [`wait_while_until_or_interrupt`](Self::wait_while_until_or_interrupt)
    /// with the deadline computed from `timeout` exactly once at entry.
    pub fn wait_while_for_or_interrupt<L: Lockable, F>(
        &self,
        lock: &mut L,
        cond: F,
        timeout: Duration,
    ) -> Result<bool, Interrupted>
    where
        F: FnMut() -> bool,
    {
        self.wait_while_until_or_interrupt(lock, cond, Instant::now() + timeout)
    }

    // ---- non-fallible family (explicit token) ----

    /// Blocks until `cond` returns false or `token` is interrupted.
    ///
    /// Returns whether the condition cleared. If the token is already
    /// interrupted on entry, the condition is evaluated once and the call
    /// returns without blocking.
    #[must_use]
    pub fn wait_while_interruptible<L: Lockable, F>(
        &self,
        lock: &mut L,
        mut cond: F,
        token: &InterruptToken,
    ) -> bool
    where
        F: FnMut() -> bool,
    {
        if token.is_interrupted() {
            return !cond();
        }
        let internals = Arc::clone(&self.internals);
        let (_registration, _) = RegistrationGuard::new(token, Self::waiter_handle(&internals));
        while cond() {
            let mut internal_guard = internals.lock.lock();
            if token.is_interrupted() {
                break;
            }
            lock.unlocked(|| {
                internals.cv.wait(&mut internal_guard);
                drop(internal_guard);
            });
        }
        !cond()
    }

    /// Blocks until `cond` returns false, `token` is interrupted, or
    /// `deadline` passes. Returns whether the condition cleared.
    #[must_use]
    pub fn wait_while_until_interruptible<L: Lockable, F>(
        &self,
        lock: &mut L,
        mut cond: F,
        deadline: Instant,
        token: &InterruptToken,
    ) -> bool
    where
        F: FnMut() -> bool,
    {
        if token.is_interrupted() {
            return !cond();
        }
        let internals = Arc::clone(&self.internals);
        let (_registration, _) = RegistrationGuard::new(token, Self::waiter_handle(&internals));
        while cond() && Instant::now() < deadline {
            let mut internal_guard = internals.lock.lock();
            if token.is_interrupted() {
                break;
            }
            lock.unlocked(|| {
                internals.cv.wait_until(&mut internal_guard, deadline);
                drop(internal_guard);
            });
        }
        !cond()
    }

    /// [`wait_while_until_interruptible`](Self::wait_while_until_interruptible)
    /// with the deadline computed from `timeout` exactly once at entry.
    #[must_use]
    pub fn wait_while_for_interruptible<L: Lockable, F>(
        &self,
        lock: &mut L,
        cond: F,
        timeout: Duration,
        token: &InterruptToken,
    ) -> bool
    where
        F: FnMut() -> bool,
    {
        self.wait_while_until_interruptible(lock, cond, Instant::now() + timeout, token)
    }
}
