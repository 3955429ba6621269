//! Property tests for the interrupt-token algebra: signal idempotence,
//! equality over clones, invalid-token neutrality, and registration symmetry
//! across interrupt-aware waits.

mod common;

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use parking_lot::Mutex;
use proptest::prelude::*;
use stopsync::{InterruptToken, InterruptibleCondvar};

proptest! {
    #![proptest_config(common::test_proptest_config())]

    #[test]
    fn exactly_one_sequential_interrupt_observes_false(calls in 1usize..16) {
        common::init_test_logging();
        let token = InterruptToken::new(true);

        let mut first_signals = 0;
        for _ in 0..calls {
            if !token.interrupt() {
                first_signals += 1;
            }
        }
        prop_assert_eq!(first_signals, 1);
        prop_assert!(token.is_interrupted());
    }

    #[test]
    fn exactly_one_concurrent_interrupt_observes_false(threads in 2usize..8) {
        common::init_test_logging();
        let token = InterruptToken::new(true);
        let winners = Arc::new(AtomicUsize::new(0));

        let handles: Vec<_> = (0..threads)
            .map(|_| {
                let token = token.clone();
                let winners = Arc::clone(&winners);
                thread::spawn(move || {
                    if !token.interrupt() {
                        winners.fetch_add(1, Ordering::SeqCst);
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().expect("interrupter panicked");
        }

        prop_assert_eq!(winners.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn clones_stay_equal_and_share_the_flag(interrupt in any::<bool>()) {
        common::init_test_logging();
        let token = InterruptToken::new(true);
        let clone = token.clone();

        prop_assert_eq!(&token, &clone);
        if interrupt {
            token.interrupt();
        }
        prop_assert_eq!(&token, &clone);
        prop_assert_eq!(clone.is_interrupted(), interrupt);
    }

    #[test]
    fn distinct_lineages_never_compare_equal(interrupt_first in any::<bool>()) {
        common::init_test_logging();
        let first = InterruptToken::new(true);
        let second = InterruptToken::new(true);

        if interrupt_first {
            first.interrupt();
        }
        prop_assert_ne!(&first, &second);
        // Signaling one lineage is invisible to the other.
        prop_assert!(!second.is_interrupted());
    }

    #[test]
    fn invalid_tokens_are_equal_and_inert(calls in 0usize..8) {
        common::init_test_logging();
        let invalid = InterruptToken::new(false);

        prop_assert_eq!(&invalid, &InterruptToken::never());
        prop_assert_ne!(&invalid, &InterruptToken::new(true));
        for _ in 0..calls {
            prop_assert!(!invalid.interrupt());
        }
        prop_assert!(!invalid.is_interrupted());
        prop_assert_eq!(invalid.waiter_count(), 0);
    }

    #[test]
    fn registry_returns_to_baseline_after_timed_waits(waits in 1usize..4) {
        common::init_test_logging();
        let token = InterruptToken::new(true);
        let cv = InterruptibleCondvar::new();
        let data = Mutex::new(());

        for _ in 0..waits {
            let mut guard = data.lock();
            let cleared = cv.wait_while_for_interruptible(
                &mut guard,
                |_| true,
                Duration::from_millis(1),
                &token,
            );
            prop_assert!(!cleared);
            prop_assert_eq!(token.waiter_count(), 0);
        }
    }
}
