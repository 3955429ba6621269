//! The waiter-notification contract between tokens and condition variables.
//!
//! A token never sees a full condition-variable type; it only holds opaque
//! handles to "something that can be woken". This keeps the dependency
//! between the two one-directional: condition variables know about tokens,
//! tokens know about [`InterruptWaiter`].

use std::sync::Arc;

use crate::token::InterruptToken;

/// Minimal capability a registered waiter exposes to the interrupt sweep.
///
/// Implementations must be safe to call from any thread, including while the
/// token's registry lock is held; `notify_interrupt` must therefore never
/// block on anything that can wait on the registry in turn.
pub(crate) trait InterruptWaiter: Send + Sync {
    /// Wakes every thread currently blocked on this waiter.
    fn notify_interrupt(&self);
}

/// Scoped registration of one waiter handle with one token.
///
/// Registration happens in [`RegistrationGuard::new`], unregistration in
/// `Drop`. Every exit path of a wait call (normal return, early return,
/// `?`-propagation) therefore removes exactly the entry it added.
pub(crate) struct RegistrationGuard<'t> {
    token: &'t InterruptToken,
    waiter: Arc<dyn InterruptWaiter>,
}

impl<'t> RegistrationGuard<'t> {
    /// Registers `waiter` with `token` for the lifetime of the guard.
    ///
    /// The returned flag reports whether the token was already interrupted
    /// once the entry was visible to the sweep; callers use it to avoid
    /// blocking after a signal that raced the registration.
    pub(crate) fn new(
        token: &'t InterruptToken,
        waiter: Arc<dyn InterruptWaiter>,
    ) -> (Self, bool) {
        let interrupted = token.register_waiter(Arc::clone(&waiter));
        (Self { token, waiter }, interrupted)
    }
}

impl Drop for RegistrationGuard<'_> {
    fn drop(&mut self) {
        self.token.unregister_waiter(&self.waiter);
    }
}
