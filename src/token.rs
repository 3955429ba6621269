//! Shareable interrupt tokens.
//!
//! An [`InterruptToken`] is a cheap, clonable handle onto one logical
//! cancellation signal. All clones observe the same monotonic `interrupted`
//! flag, and any clone may raise it. While a thread is blocked in one of the
//! interrupt-aware condition-variable waits, the condition variable is
//! registered with the token so that [`InterruptToken::interrupt`] can wake
//! it immediately instead of leaving it parked until its next timeout.
//!
//! The flag is one-way: once interrupted, a token lineage stays interrupted.
//! A token constructed with `new(false)` (or [`InterruptToken::never`]) is
//! *invalid*: it never reports interruption and signaling it is a no-op.
//!
//! # Example
//!
//! ```
//! use stopsync::InterruptToken;
//!
//! let token = InterruptToken::new(true);
//! let worker = token.clone();
//!
//! assert!(!worker.is_interrupted());
//! assert!(!token.interrupt());          // first signal: previous value was false
//! assert!(worker.is_interrupted());
//! assert!(token.interrupt());           // later signals are no-ops
//! ```

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use smallvec::SmallVec;

use crate::waiter::InterruptWaiter;

/// State shared by every clone of one token lineage.
struct TokenState {
    /// One-way interrupted flag.
    interrupted: AtomicBool,
    /// Currently registered waiters, in registration order. Duplicates are
    /// permitted; unregistration removes at most the first matching entry.
    waiters: Mutex<SmallVec<[Arc<dyn InterruptWaiter>; 4]>>,
}

/// A shareable handle onto one cancellation signal.
///
/// Clones are O(1) and all refer to the same underlying state. Two tokens
/// compare equal when they share that state, or when both are invalid.
#[derive(Clone, Default)]
pub struct InterruptToken {
    state: Option<Arc<TokenState>>,
}

impl InterruptToken {
    /// Creates a token.
    ///
    /// With `interruptible == true` the token carries fresh shared state with
    /// the flag cleared. With `false` the token is invalid: it never becomes
    /// interrupted and [`interrupt`](Self::interrupt) on it does nothing.
    #[must_use]
    pub fn new(interruptible: bool) -> Self {
        if interruptible {
            Self {
                state: Some(Arc::new(TokenState {
                    interrupted: AtomicBool::new(false),
                    waiters: Mutex::new(SmallVec::new()),
                })),
            }
        } else {
            Self::never()
        }
    }

    /// An interrupt-capable token; shorthand for `new(true)`.
    #[must_use]
    pub fn interruptible() -> Self {
        Self::new(true)
    }

    /// The invalid, never-interruptible token.
    #[must_use]
    pub const fn never() -> Self {
        Self { state: None }
    }

    /// Whether this token can ever report interruption.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.state.is_some()
    }

    /// Lock-free read of the interrupted flag. Always false for an invalid
    /// token.
    #[must_use]
    pub fn is_interrupted(&self) -> bool {
        self.state
            .as_ref()
            .is_some_and(|state| state.interrupted.load(Ordering::Acquire))
    }

    /// Raises the interrupt signal, returning the flag's *previous* value.
    ///
    /// The first caller to observe `false` performs the one and only
    /// notification sweep: every waiter registered at the moment of the
    /// atomic exchange is woken. Later calls (and calls on an invalid token)
    /// return without touching the registry, so duplicate signals never
    /// produce duplicate wakeups.
    pub fn interrupt(&self) -> bool {
        let Some(state) = &self.state else {
            return false;
        };
        let was_interrupted = state.interrupted.swap(true, Ordering::AcqRel);
        if !was_interrupted {
            let waiters = state.waiters.lock();
            log::trace!(
                target: "stopsync",
                "interrupt raised, waking {} registered waiter(s)",
                waiters.len()
            );
            for waiter in waiters.iter() {
                waiter.notify_interrupt();
            }
        }
        was_interrupted
    }

    /// Number of currently registered waiters. Zero for an invalid token.
    #[must_use]
    pub fn waiter_count(&self) -> usize {
        self.state
            .as_ref()
            .map_or(0, |state| state.waiters.lock().len())
    }

    /// Inserts a waiter handle into the registry and reports whether the
    /// token was already interrupted once the entry was visible.
    ///
    /// A signal that lands before the insert is reported through the return
    /// value; a signal that lands after it finds the entry in the registry.
    /// Either way the caller re-checks before blocking, which closes the
    /// lost-wakeup window.
    pub(crate) fn register_waiter(&self, waiter: Arc<dyn InterruptWaiter>) -> bool {
        match &self.state {
            Some(state) => {
                state.waiters.lock().push(waiter);
                state.interrupted.load(Ordering::Acquire)
            }
            None => false,
        }
    }

    /// Removes the first registry entry referring to the same waiter, if any.
    ///
    /// At most one entry is removed per call, so concurrent waits that each
    /// registered the same handle unwind one registration apiece.
    pub(crate) fn unregister_waiter(&self, waiter: &Arc<dyn InterruptWaiter>) {
        if let Some(state) = &self.state {
            let mut waiters = state.waiters.lock();
            if let Some(position) = waiters.iter().position(|entry| Arc::ptr_eq(entry, waiter)) {
                waiters.remove(position);
            }
        }
    }
}

impl PartialEq for InterruptToken {
    fn eq(&self, other: &Self) -> bool {
        match (&self.state, &other.state) {
            (Some(a), Some(b)) => Arc::ptr_eq(a, b),
            (None, None) => true,
            _ => false,
        }
    }
}

impl Eq for InterruptToken {}

impl fmt::Debug for InterruptToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InterruptToken")
            .field("valid", &self.is_valid())
            .field("interrupted", &self.is_interrupted())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::init_test_logging;
    use std::sync::atomic::AtomicUsize;
    use std::thread;

    struct CountingWaiter {
        notified: AtomicUsize,
    }

    impl InterruptWaiter for CountingWaiter {
        fn notify_interrupt(&self) {
            self.notified.fetch_add(1, Ordering::SeqCst);
        }
    }

    fn counting_waiter() -> Arc<CountingWaiter> {
        Arc::new(CountingWaiter {
            notified: AtomicUsize::new(0),
        })
    }

    fn init_test(name: &str) {
        init_test_logging();
        crate::test_phase!(name);
    }

    #[test]
    fn interrupt_returns_previous_value() {
        init_test("interrupt_returns_previous_value");
        let token = InterruptToken::new(true);

        let first = token.interrupt();
        crate::assert_with_log!(!first, "first interrupt sees false", false, first);

        let second = token.interrupt();
        crate::assert_with_log!(second, "second interrupt sees true", true, second);
        assert!(token.is_interrupted());
        crate::test_complete!("interrupt_returns_previous_value");
    }

    #[test]
    fn flag_is_monotonic_across_clones() {
        init_test("flag_is_monotonic_across_clones");
        let token = InterruptToken::interruptible();
        let clone = token.clone();

        assert!(!clone.is_interrupted());
        token.interrupt();
        assert!(clone.is_interrupted());
        assert!(token.is_interrupted());
        crate::test_complete!("flag_is_monotonic_across_clones");
    }

    #[test]
    fn invalid_token_is_neutral() {
        init_test("invalid_token_is_neutral");
        let token = InterruptToken::never();

        assert!(!token.is_valid());
        assert!(!token.is_interrupted());
        let previous = token.interrupt();
        crate::assert_with_log!(!previous, "interrupt on invalid is no-op", false, previous);
        assert!(!token.is_interrupted());
        assert_eq!(token.waiter_count(), 0);
        crate::test_complete!("invalid_token_is_neutral");
    }

    #[test]
    fn new_false_is_invalid() {
        init_test("new_false_is_invalid");
        let token = InterruptToken::new(false);
        assert!(!token.is_valid());
        assert_eq!(token, InterruptToken::never());
        crate::test_complete!("new_false_is_invalid");
    }

    #[test]
    fn equality_follows_shared_state() {
        init_test("equality_follows_shared_state");
        let a = InterruptToken::new(true);
        let b = a.clone();
        let c = InterruptToken::new(true);

        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_ne!(a, InterruptToken::never());
        assert_eq!(InterruptToken::never(), InterruptToken::never());
        assert_eq!(InterruptToken::default(), InterruptToken::never());
        crate::test_complete!("equality_follows_shared_state");
    }

    #[test]
    fn sweep_visits_every_registered_waiter_once() {
        init_test("sweep_visits_every_registered_waiter_once");
        let token = InterruptToken::new(true);
        let first = counting_waiter();
        let second = counting_waiter();

        assert!(!token.register_waiter(first.clone()));
        assert!(!token.register_waiter(second.clone()));
        assert_eq!(token.waiter_count(), 2);

        token.interrupt();
        token.interrupt();
        token.interrupt();

        assert_eq!(first.notified.load(Ordering::SeqCst), 1);
        assert_eq!(second.notified.load(Ordering::SeqCst), 1);
        crate::test_complete!("sweep_visits_every_registered_waiter_once");
    }

    #[test]
    fn registration_after_interrupt_reports_flag() {
        init_test("registration_after_interrupt_reports_flag");
        let token = InterruptToken::new(true);
        token.interrupt();

        let waiter = counting_waiter();
        let already = token.register_waiter(waiter.clone());
        crate::assert_with_log!(already, "flag visible after insert", true, already);

        // The sweep already ran; a late registrant is not notified again.
        assert_eq!(waiter.notified.load(Ordering::SeqCst), 0);
        crate::test_complete!("registration_after_interrupt_reports_flag");
    }

    #[test]
    fn unregister_removes_first_match_only() {
        init_test("unregister_removes_first_match_only");
        let token = InterruptToken::new(true);
        let waiter = counting_waiter();
        let handle: Arc<dyn InterruptWaiter> = waiter.clone();

        token.register_waiter(Arc::clone(&handle));
        token.register_waiter(Arc::clone(&handle));
        assert_eq!(token.waiter_count(), 2);

        token.unregister_waiter(&handle);
        assert_eq!(token.waiter_count(), 1);
        token.unregister_waiter(&handle);
        assert_eq!(token.waiter_count(), 0);

        // Removing from an empty registry is harmless.
        token.unregister_waiter(&handle);
        assert_eq!(token.waiter_count(), 0);
        crate::test_complete!("unregister_removes_first_match_only");
    }

    #[test]
    fn concurrent_interrupts_elect_one_winner() {
        init_test("concurrent_interrupts_elect_one_winner");
        let token = InterruptToken::new(true);
        let winners = Arc::new(AtomicUsize::new(0));

        let mut handles = Vec::new();
        for _ in 0..8 {
            let token = token.clone();
            let winners = Arc::clone(&winners);
            handles.push(thread::spawn(move || {
                if !token.interrupt() {
                    winners.fetch_add(1, Ordering::SeqCst);
                }
            }));
        }
        for handle in handles {
            handle.join().expect("interrupter panicked");
        }

        let count = winners.load(Ordering::SeqCst);
        crate::assert_with_log!(count == 1, "exactly one winner", 1usize, count);
        crate::test_complete!("concurrent_interrupts_elect_one_winner");
    }

    #[test]
    fn debug_output_names_the_state() {
        init_test("debug_output_names_the_state");
        let token = InterruptToken::new(true);
        let rendered = format!("{token:?}");
        assert!(rendered.contains("valid: true"), "{rendered}");
        assert!(rendered.contains("interrupted: false"), "{rendered}");
        crate::test_complete!("debug_output_names_the_state");
    }
}
