//! The deferral queue
//!
//! A `Deferrer` either runs a guarded call immediately or, while deferral is
//! active, records it so that a batch of calls can be replayed once the
//! outermost deferral unwinds.
//!
//! ## Flush contract
//!
//! When `resume()` brings the depth back to zero:
//! - the pending queue is taken out, so it is empty whatever happens next
//! - with dedupe enabled, each run of consecutive equal calls collapses to
//!   its first entry (`A, A, B` flushes as `A, B`; `A, B, A` is unchanged)
//! - calls are dispatched strictly in enqueue order
//! - the first failing call aborts the flush; later calls are abandoned and
//!   never replayed

use std::cell::{Cell, RefCell};
use std::fmt;
use std::time::Instant;

use deferral_core_types::schema::{OP_FLUSH, OP_RESUME};
use deferral_core_types::BatchId;

use crate::config::DeferrerConfig;
use crate::errors::DeferralError;
use crate::scope::DeferralScope;
use crate::{log_op_end, log_op_error, log_op_start};

/// Replays queued call records during a flush
///
/// Implemented for any `FnMut(C) -> Result<(), E>` closure, and for
/// [`Dispatcher`](crate::Dispatcher) which routes calls back to a
/// [`Deferred`](crate::Deferred) owner.
pub trait Dispatch<C> {
    type Error: fmt::Display;

    fn dispatch(&mut self, call: C) -> Result<(), Self::Error>;
}

impl<C, E, F> Dispatch<C> for F
where
    E: fmt::Display,
    F: FnMut(C) -> Result<(), E>,
{
    type Error = E;

    fn dispatch(&mut self, call: C) -> Result<(), E> {
        self(call)
    }
}

/// Result of a successful `resume()`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlushOutcome {
    /// An enclosing deferral is still active; nothing was flushed
    Nested { depth: usize },
    /// The queue was flushed
    Flushed {
        /// Calls dispatched
        executed: usize,
        /// Calls dropped by consecutive dedupe
        collapsed: usize,
    },
}

impl FlushOutcome {
    /// Number of calls dispatched by this resume
    pub fn executed(&self) -> usize {
        match self {
            FlushOutcome::Nested { .. } => 0,
            FlushOutcome::Flushed { executed, .. } => *executed,
        }
    }

    pub fn is_flushed(&self) -> bool {
        matches!(self, FlushOutcome::Flushed { .. })
    }
}

/// Deferred-execution queue of comparable call records
///
/// `C` is an explicit record of a guarded operation: an identifier plus its
/// argument values. Two records that compare equal are duplicates for the
/// purpose of consecutive dedupe.
///
/// The queue uses `Cell`/`RefCell` so that an owner can hold it and keep
/// calling its own guarded `&self` methods while a [`DeferralScope`] is
/// open. It is not `Sync`; sharing across threads needs external locking.
///
/// # Example
///
/// ```
/// use deferral_core::Deferrer;
/// use std::cell::RefCell;
///
/// let log = RefCell::new(Vec::new());
/// let deferrer = Deferrer::with_dedupe(true);
///
/// deferrer.defer();
/// for call in ["a", "a", "b", "a"] {
///     assert!(deferrer.enqueue_or_run(call, |c| log.borrow_mut().push(c)).is_none());
/// }
/// assert!(log.borrow().is_empty());
///
/// deferrer
///     .resume(|c| -> Result<(), std::fmt::Error> {
///         log.borrow_mut().push(c);
///         Ok(())
///     })
///     .unwrap();
/// assert_eq!(*log.borrow(), vec!["a", "b", "a"]);
/// ```
#[derive(Debug)]
pub struct Deferrer<C> {
    depth: Cell<usize>,
    pending: RefCell<Vec<C>>,
    dedupe: Cell<bool>,
}

impl<C> Default for Deferrer<C> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C> Deferrer<C> {
    /// Create a queue with dedupe disabled
    pub fn new() -> Self {
        Self::with_dedupe(false)
    }

    pub fn with_dedupe(dedupe: bool) -> Self {
        Self {
            depth: Cell::new(0),
            pending: RefCell::new(Vec::new()),
            dedupe: Cell::new(dedupe),
        }
    }

    pub fn from_config(config: &DeferrerConfig) -> Self {
        Self::with_dedupe(config.dedupe)
    }

    /// Number of active nested deferrals
    pub fn depth(&self) -> usize {
        self.depth.get()
    }

    pub fn is_deferred(&self) -> bool {
        self.depth.get() > 0
    }

    /// Number of calls waiting for the next flush
    pub fn pending_len(&self) -> usize {
        self.pending.borrow().len()
    }

    pub fn dedupe(&self) -> bool {
        self.dedupe.get()
    }

    /// Toggle consecutive dedupe; takes effect at the next flush
    pub fn set_dedupe(&self, dedupe: bool) {
        self.dedupe.set(dedupe);
    }

    /// Open a deferral level
    pub fn defer(&self) {
        let depth = self.depth.get().saturating_add(1);
        self.depth.set(depth);
        tracing::trace!(depth, "deferral opened");
    }

    /// Queue `call` while deferred, otherwise run it now
    ///
    /// Returns `Some` with the result of `run` when the call ran immediately
    /// and `None` when it was queued. Callers must not rely on a value while
    /// deferral is active.
    pub fn enqueue_or_run<R, F>(&self, call: C, run: F) -> Option<R>
    where
        F: FnOnce(C) -> R,
    {
        if self.is_deferred() {
            let mut pending = self.pending.borrow_mut();
            pending.push(call);
            tracing::trace!(depth = self.depth.get(), queued = pending.len(), "call deferred");
            None
        } else {
            Some(run(call))
        }
    }
}

impl<C: PartialEq> Deferrer<C> {
    /// Close a deferral level, flushing the queue if it was the outermost
    ///
    /// # Errors
    ///
    /// - [`DeferralError::NotDeferred`] if no deferral is active. Nothing is
    ///   flushed and the state is unchanged.
    /// - [`DeferralError::CallFailed`] if a queued call fails. The queue is
    ///   already cleared and the calls after the failing one are dropped.
    pub fn resume<D>(&self, dispatch: D) -> Result<FlushOutcome, DeferralError<D::Error>>
    where
        D: Dispatch<C>,
    {
        let depth = self.depth.get();
        if depth == 0 {
            let err = DeferralError::NotDeferred;
            log_op_error!(OP_RESUME, err, duration_ms = 0u64);
            return Err(err);
        }

        let depth = depth - 1;
        self.depth.set(depth);
        if depth > 0 {
            tracing::trace!(depth, "nested deferral closed");
            return Ok(FlushOutcome::Nested { depth });
        }

        let outcome = self.flush(dispatch);
        // Anything queued re-entrantly by a dispatched call is discarded too.
        self.pending.borrow_mut().clear();
        outcome
    }

    /// Open a deferral level that closes when the returned scope ends
    ///
    /// `dispatch` replays the queue if this scope is the outermost one.
    ///
    /// Close the scope with [`DeferralScope::finish`] to get the flush
    /// result. A scope left by early return, `?`, or a panic is resumed by
    /// `Drop`, which can only log a failing queued call. Use
    /// [`Deferred::deferred`](crate::Deferred::deferred) to wrap a body and
    /// have flush errors returned.
    pub fn scope<D>(&self, dispatch: D) -> DeferralScope<'_, C, D>
    where
        D: Dispatch<C>,
    {
        DeferralScope::enter(self, dispatch)
    }

    fn flush<D>(&self, mut dispatch: D) -> Result<FlushOutcome, DeferralError<D::Error>>
    where
        D: Dispatch<C>,
    {
        let mut batch = self.pending.take();
        let queued = batch.len();
        if self.dedupe.get() {
            batch.dedup();
        }
        let collapsed = queued - batch.len();
        let total = batch.len();

        let batch_id = BatchId::new();
        let started = Instant::now();
        log_op_start!(
            OP_FLUSH,
            batch_id = %batch_id,
            queued = queued,
            collapsed = collapsed,
        );

        for (position, call) in batch.into_iter().enumerate() {
            if let Err(source) = dispatch.dispatch(call) {
                let err = DeferralError::CallFailed {
                    position,
                    abandoned: total - position - 1,
                    source,
                };
                log_op_error!(
                    OP_FLUSH,
                    err,
                    duration_ms = elapsed_ms(started),
                    batch_id = %batch_id,
                    position = position,
                );
                return Err(err);
            }
        }

        log_op_end!(
            OP_FLUSH,
            duration_ms = elapsed_ms(started),
            batch_id = %batch_id,
            executed = total,
        );
        Ok(FlushOutcome::Flushed {
            executed: total,
            collapsed,
        })
    }
}

fn elapsed_ms(started: Instant) -> u64 {
    u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX)
}
