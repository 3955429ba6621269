//! The ambient per-thread interrupt token.
//!
//! The fallible wait family (`*_or_interrupt`) does not take a token
//! argument; it consults the token installed for the current thread. A
//! thread-launching wrapper installs the worker's token with
//! [`set_current_token`] (or [`token_scope`]) right after spawning; code that
//! never installs one sees the invalid token and is never interrupted.

use std::cell::RefCell;

use crate::error::Interrupted;
use crate::token::InterruptToken;

thread_local! {
    static AMBIENT: RefCell<InterruptToken> = const { RefCell::new(InterruptToken::never()) };
}

/// A clone of the current thread's ambient token.
///
/// The invalid token if none has been installed.
#[must_use]
pub fn current_token() -> InterruptToken {
    AMBIENT.with(|ambient| ambient.borrow().clone())
}

/// Installs `token` as this thread's ambient token, returning the previous
/// one.
pub fn set_current_token(token: InterruptToken) -> InterruptToken {
    AMBIENT.with(|ambient| std::mem::replace(&mut *ambient.borrow_mut(), token))
}

/// Whether the current thread's ambient token has been interrupted.
#[must_use]
pub fn is_interrupted() -> bool {
    AMBIENT.with(|ambient| ambient.borrow().is_interrupted())
}

/// Returns `Err(Interrupted)` if the ambient token has been interrupted.
///
/// The cooperative polling point: long-running loops call this between units
/// of work and propagate with `?`.
pub fn check_interrupted() -> Result<(), Interrupted> {
    if is_interrupted() {
        Err(Interrupted)
    } else {
        Ok(())
    }
}

/// Installs a token for a lexical scope, restoring the previous one on drop.
#[must_use = "dropping the scope immediately reinstalls the previous token"]
#[derive(Debug)]
pub struct TokenScope {
    previous: Option<InterruptToken>,
}

/// Installs `token` until the returned [`TokenScope`] is dropped.
pub fn token_scope(token: InterruptToken) -> TokenScope {
    TokenScope {
        previous: Some(set_current_token(token)),
    }
}

/// Runs `f` with `token` installed as the ambient token.
pub fn with_token<R>(token: InterruptToken, f: impl FnOnce() -> R) -> R {
    let _scope = token_scope(token);
    f()
}

impl Drop for TokenScope {
    fn drop(&mut self) {
        if let Some(previous) = self.previous.take() {
            let _ = set_current_token(previous);
        }
    }
}
