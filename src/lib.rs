//! Cooperative interruption primitives for OS threads.
//!
//! `stopsync` provides a shareable [`InterruptToken`] that any thread can
//! signal, and condition variables whose waits end promptly when the token is
//! interrupted instead of sleeping on to their next notify or timeout.
//! Cancellation is cooperative throughout: signaling a token sets a one-way
//! flag and wakes registered waiters; it is the waiting code's own loop that
//! decides to stop.
//!
//! # Pieces
//!
//! - [`InterruptToken`]: clonable handle onto one cancellation signal;
//!   `interrupt()` reports whether the caller was first.
//! - [`InterruptibleCondvar`]: interrupt-aware waits bound to
//!   `parking_lot::Mutex` guards.
//! - [`InterruptibleCondvarAny`]: the same contract for arbitrary
//!   [`Lockable`] caller locks, safe against teardown racing an in-flight
//!   wait.
//! - [`thread`]: the ambient per-thread token consumed by the
//!   `*_or_interrupt` wait family, installed by whatever launches the worker.
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use parking_lot::Mutex;
//! use stopsync::{InterruptToken, InterruptibleCondvar};
//!
//! struct Shared {
//!     queue_open: Mutex<bool>,
//!     cv: InterruptibleCondvar,
//! }
//!
//! let shared = Arc::new(Shared {
//!     queue_open: Mutex::new(false),
//!     cv: InterruptibleCondvar::new(),
//! });
//! let token = InterruptToken::new(true);
//!
//! let worker = {
//!     let shared = Arc::clone(&shared);
//!     let token = token.clone();
//!     std::thread::spawn(move || {
//!         let mut open = shared.queue_open.lock();
//!         // Blocks until the queue opens or the token is interrupted.
//!         shared.cv.wait_while_interruptible(&mut open, |open| !*open, &token)
//!     })
//! };
//!
//! token.interrupt();
//! assert!(!worker.join().unwrap()); // ended by interruption, not by data
//! ```

#![warn(missing_docs)]

pub mod condvar;
pub mod condvar_any;
pub mod error;
pub mod test_utils;
pub mod thread;
pub mod token;

mod waiter;

pub use condvar::InterruptibleCondvar;
pub use condvar_any::{InterruptibleCondvarAny, Lockable};
pub use error::Interrupted;
pub use token::InterruptToken;
