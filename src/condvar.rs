//! Interrupt-aware condition variable bound to [`parking_lot::Mutex`].
//!
//! [`InterruptibleCondvar`] wraps the native condition variable and adds two
//! wait families on top of the plain forwards:
//!
//! - the **fallible** family (`*_or_interrupt`) consults the ambient token
//!   from [`crate::thread`] and returns [`Err(Interrupted)`](Interrupted)
//!   when it fires;
//! - the **non-fallible** family (`*_interruptible`) takes an explicit
//!   [`InterruptToken`] and reports interruption through its `bool` result.
//!
//! Conditions follow the native `wait_while` polarity: the wait keeps
//! blocking while the condition returns `true`. Bool results report whether
//! the condition cleared (`true`) as opposed to the wait ending on interrupt
//! or deadline with the condition still held (`false`).
//!
//! Every interrupt-aware wait registers this condition variable with the
//! token for the duration of the call and re-checks the flag after
//! registering, so a signal racing the wait's entry is observed before the
//! first block.

use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::{Condvar, MutexGuard, WaitTimeoutResult};

use crate::error::Interrupted;
use crate::thread;
use crate::token::InterruptToken;
use crate::waiter::{InterruptWaiter, RegistrationGuard};

impl InterruptWaiter for Condvar {
    fn notify_interrupt(&self) {
        self.notify_all();
    }
}

/// A condition variable whose waits can be ended by an [`InterruptToken`].
///
/// All waits on one instance must use guards of the same mutex, as with the
/// native condition variable.
#[derive(Debug, Default)]
pub struct InterruptibleCondvar {
    cv: Arc<Condvar>,
}

impl InterruptibleCondvar {
    /// Creates a new condition variable.
    #[must_use]
    pub fn new() -> Self {
        Self {
            cv: Arc::new(Condvar::new()),
        }
    }

    fn waiter_handle(&self) -> Arc<dyn InterruptWaiter> {
        Arc::clone(&self.cv) as Arc<dyn InterruptWaiter>
    }

    /// Wakes one blocked thread, returning whether one was woken.
    pub fn notify_one(&self) -> bool {
        self.cv.notify_one()
    }

    /// Wakes every blocked thread, returning how many were woken.
    pub fn notify_all(&self) -> usize {
        self.cv.notify_all()
    }

    /// Blocks until notified.
    pub fn wait<T: ?Sized>(&self, guard: &mut MutexGuard<'_, T>) {
        self.cv.wait(guard);
    }

    /// Blocks until `cond` returns false.
    pub fn wait_while<T: ?Sized, F>(&self, guard: &mut MutexGuard<'_, T>, cond: F)
    where
        F: FnMut(&mut T) -> bool,
    {
        self.cv.wait_while(guard, cond);
    }

    /// Blocks until notified or `deadline` passes.
    pub fn wait_until<T: ?Sized>(
        &self,
        guard: &mut MutexGuard<'_, T>,
        deadline: Instant,
    ) -> WaitTimeoutResult {
        self.cv.wait_until(guard, deadline)
    }

    /// Blocks until notified or `timeout` elapses.
    pub fn wait_for<T: ?Sized>(
        &self,
        guard: &mut MutexGuard<'_, T>,
        timeout: Duration,
    ) -> WaitTimeoutResult {
        self.cv.wait_for(guard, timeout)
    }

    /// Blocks until `cond` returns false or `deadline` passes.
    pub fn wait_while_until<T: ?Sized, F>(
        &self,
        guard: &mut MutexGuard<'_, T>,
        cond: F,
        deadline: Instant,
    ) -> WaitTimeoutResult
    where
        F: FnMut(&mut T) -> bool,
    {
        self.cv.wait_while_until(guard, cond, deadline)
    }

    /// Blocks until `cond` returns false or `timeout` elapses.
    pub fn wait_while_for<T: ?Sized, F>(
        &self,
        guard: &mut MutexGuard<'_, T>,
        cond: F,
        timeout: Duration,
    ) -> WaitTimeoutResult
    where
        F: FnMut(&mut T) -> bool,
    {
        self.cv.wait_while_for(guard, cond, timeout)
    }

    // ---- fallible family (ambient token) ----

    /// Blocks until notified; fails if the ambient token is interrupted.
    ///
    /// The interrupt is checked before blocking and again on wakeup, so a
    /// signal raised before the call fails fast and one raised mid-wait ends
    /// it.
    pub fn wait_or_interrupt<T: ?Sized>(
        &self,
        guard: &mut MutexGuard<'_, T>,
    ) -> Result<(), Interrupted> {
        let token = thread::current_token();
        let (_registration, interrupted) = RegistrationGuard::new(&token, self.waiter_handle());
        if interrupted {
            return Err(Interrupted);
        }
        self.cv.wait(guard);
        if token.is_interrupted() {
            return Err(Interrupted);
        }
        Ok(())
    }

    /// Blocks until `cond` returns false; fails if the ambient token is
    /// interrupted first.
    pub fn wait_while_or_interrupt<T: ?Sized, F>(
        &self,
        guard: &mut MutexGuard<'_, T>,
        mut cond: F,
    ) -> Result<(), Interrupted>
    where
        F: FnMut(&mut T) -> bool,
    {
        let token = thread::current_token();
        let (_registration, _) = RegistrationGuard::new(&token, self.waiter_handle());
        while cond(&mut *guard) {
            if token.is_interrupted() {
                return Err(Interrupted);
            }
            self.cv
                .wait_while(guard, |data| cond(data) && !token.is_interrupted());
        }
        Ok(())
    }

    /// Blocks until `cond` returns false or `deadline` passes; fails if the
    /// ambient token is interrupted first.
    ///
    /// On success, reports whether the condition cleared (`false` means the
    /// deadline passed with the condition still held).
    pub fn wait_while_until_or_interrupt<T: ?Sized, F>(
        &self,
        guard: &mut MutexGuard<'_, T>,
        mut cond: F,
        deadline: Instant,
    ) -> Result<bool, Interrupted>
    where
        F: FnMut(&mut T) -> bool,
    {
        // Check before registering: a pre-set interrupt must fail even if
        // the deadline has already passed.
        let token = thread::current_token();
        if token.is_interrupted() {
            return Err(Interrupted);
        }
        let (_registration, _) = RegistrationGuard::new(&token, self.waiter_handle());
        while cond(&mut *guard) && Instant::now() < deadline {
            if token.is_interrupted() {
                return Err(Interrupted);
            }
            self.cv.wait_while_until(
                guard,
                |data| cond(data) && !token.is_interrupted(),
                deadline,
            );
        }
        Ok(!cond(&mut *guard))
    }

    /// [`wait_while_until_or_interrupt`](Self::wait_while_until_or_interrupt)
    /// with the deadline computed from `timeout` exactly once at entry.
    pub fn wait_while_for_or_interrupt<T: ?Sized, F>(
        &self,
        guard: &mut MutexGuard<'_, T>,
        cond: F,
        timeout: Duration,
    ) -> Result<bool, Interrupted>
    where
        F: FnMut(&mut T) -> bool,
    {
        self.wait_while_until_or_interrupt(guard, cond, Instant::now() + timeout)
    }

    // ---- non-fallible family (explicit token) ----

    /// Blocks until `cond` returns false or `token` is interrupted.
    ///
    /// Returns whether the condition cleared. If the token is already
    /// interrupted on entry, the condition is evaluated once and the call
    /// returns without blocking.
    #[must_use]
    pub fn wait_while_interruptible<T: ?Sized, F>(
        &self,
        guard: &mut MutexGuard<'_, T>,
        mut cond: F,
        token: &InterruptToken,
    ) -> bool
    where
        F: FnMut(&mut T) -> bool,
    {
        if token.is_interrupted() {
            return !cond(&mut *guard);
        }
        let (_registration, interrupted) = RegistrationGuard::new(token, self.waiter_handle());
        if interrupted {
            return !cond(&mut *guard);
        }
        while cond(&mut *guard) && !token.is_interrupted() {
            self.cv
                .wait_while(guard, |data| cond(data) && !token.is_interrupted());
        }
        !cond(&mut *guard)
    }

    /// Blocks until `cond` returns false, `token` is interrupted, or
    /// `deadline` passes. Returns whether the condition cleared.
    #[must_use]
    pub fn wait_while_until_interruptible<T: ?Sized, F>(
        &self,
        guard: &mut MutexGuard<'_, T>,
        mut cond: F,
        deadline: Instant,
        token: &InterruptToken,
    ) -> bool
    where
        F: FnMut(&mut T) -> bool,
    {
        let (_registration, interrupted) = RegistrationGuard::new(token, self.waiter_handle());
        if interrupted {
            return !cond(&mut *guard);
        }
        while cond(&mut *guard) && !token.is_interrupted() && Instant::now() < deadline {
            self.cv.wait_while_until(
                guard,
                |data| cond(data) && !token.is_interrupted(),
                deadline,
            );
        }
        !cond(&mut *guard)
    }

    /// [`wait_while_until_interruptible`](Self::wait_while_until_interruptible)
    /// with the deadline computed from `timeout` exactly once at entry.
    #[must_use]
    pub fn wait_while_for_interruptible<T: ?Sized, F>(
        &self,
        guard: &mut MutexGuard<'_, T>,
        cond: F,
        timeout: Duration,
        token: &InterruptToken,
    ) -> bool
    where
        F: FnMut(&mut T) -> bool,
    {
        self.wait_while_until_interruptible(guard, cond, Instant::now() + timeout, token)
    }
}
