//! Flush Property Tests
//!
//! Property-based checks of ordering, consecutive dedupe and nesting.

use std::cell::RefCell;
use std::convert::Infallible;

use deferral_core::Deferrer;
use proptest::prelude::*;

/// Reference model of consecutive dedupe: keep an entry unless it equals
/// the entry kept just before it.
fn collapse_runs(calls: &[u8]) -> Vec<u8> {
    let mut kept: Vec<u8> = Vec::new();
    for call in calls {
        if kept.last() != Some(call) {
            kept.push(*call);
        }
    }
    kept
}

fn flush(calls: &[u8], dedupe: bool) -> Vec<u8> {
    let deferrer = Deferrer::with_dedupe(dedupe);
    let log = RefCell::new(Vec::new());

    deferrer.defer();
    for call in calls {
        assert!(deferrer.enqueue_or_run(*call, |_| ()).is_none());
    }
    assert!(log.borrow().is_empty());

    deferrer
        .resume(|call: u8| -> Result<(), Infallible> {
            log.borrow_mut().push(call);
            Ok(())
        })
        .unwrap();
    assert_eq!(deferrer.pending_len(), 0);

    log.into_inner()
}

proptest! {
    #[test]
    fn prop_flush_replays_every_call_in_order(
        calls in proptest::collection::vec(0u8..4, 0..40)
    ) {
        prop_assert_eq!(flush(&calls, false), calls);
    }

    #[test]
    fn prop_dedupe_collapses_consecutive_runs_only(
        calls in proptest::collection::vec(0u8..3, 0..40)
    ) {
        let flushed = flush(&calls, true);

        prop_assert_eq!(&flushed, &collapse_runs(&calls));
        prop_assert!(flushed.windows(2).all(|pair| pair[0] != pair[1]));
    }

    #[test]
    fn prop_only_outermost_resume_flushes(
        depth in 1usize..6,
        calls in proptest::collection::vec(any::<u8>(), 1..10)
    ) {
        let deferrer = Deferrer::new();
        let executed = RefCell::new(0usize);
        let count = |_call: u8| -> Result<(), Infallible> {
            *executed.borrow_mut() += 1;
            Ok(())
        };

        for _ in 0..depth {
            deferrer.defer();
        }
        for call in &calls {
            deferrer.enqueue_or_run(*call, |_| ());
        }
        for remaining in (1..depth).rev() {
            let outcome = deferrer.resume(count).unwrap();
            prop_assert_eq!(outcome.executed(), 0);
            prop_assert_eq!(deferrer.depth(), remaining);
            prop_assert_eq!(*executed.borrow(), 0);
        }

        let outcome = deferrer.resume(count).unwrap();
        prop_assert_eq!(outcome.executed(), calls.len());
        prop_assert_eq!(*executed.borrow(), calls.len());
        prop_assert!(deferrer.resume(count).unwrap_err().is_precondition());
    }

    #[test]
    fn prop_failure_abandons_tail_and_clears_queue(
        calls in proptest::collection::vec(0u8..10, 1..30),
        fail_at in 0usize..30
    ) {
        let fail_at = fail_at % calls.len();
        let deferrer = Deferrer::new();
        let log = RefCell::new(Vec::new());

        deferrer.defer();
        for call in &calls {
            deferrer.enqueue_or_run(*call, |_| ());
        }

        let mut position = 0usize;
        let err = deferrer
            .resume(|call: u8| -> Result<(), String> {
                if position == fail_at {
                    return Err("refused".to_string());
                }
                position += 1;
                log.borrow_mut().push(call);
                Ok(())
            })
            .unwrap_err();

        prop_assert_eq!(err.call_error(), Some(&"refused".to_string()));
        let logged = log.borrow().clone();
        prop_assert_eq!(logged.as_slice(), &calls[..fail_at]);
        prop_assert_eq!(deferrer.pending_len(), 0);
        prop_assert_eq!(deferrer.depth(), 0);
    }
}
