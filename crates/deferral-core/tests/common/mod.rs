use std::cell::Cell;
use std::convert::Infallible;

use deferral_core::{Deferred, Deferrer};

/// Guarded operations of `Tally`
#[derive(Debug, Clone, PartialEq)]
pub enum TallyCall {
    DoIt,
    Add(u32),
}

/// Owner with a single counter and a deferral queue guarding it
#[derive(Default)]
pub struct Tally {
    pub deferrer: Deferrer<TallyCall>,
    pub times_done: Cell<u32>,
}

impl Tally {
    #[allow(dead_code)]
    pub fn new() -> Self {
        Self::default()
    }

    #[allow(dead_code)]
    pub fn doit(&self) {
        self.guarded(TallyCall::DoIt);
    }

    /// Returns the new total when run immediately, `None` when queued
    #[allow(dead_code)]
    pub fn add(&self, n: u32) -> Option<u32> {
        self.deferrer.enqueue_or_run(TallyCall::Add(n), |call| {
            let _ = self.dispatch(call);
            self.times_done.get()
        })
    }
}

impl Deferred for Tally {
    type Call = TallyCall;
    type Error = Infallible;

    fn deferrer(&self) -> &Deferrer<TallyCall> {
        &self.deferrer
    }

    fn dispatch(&self, call: TallyCall) -> Result<(), Infallible> {
        let by = match call {
            TallyCall::DoIt => 1,
            TallyCall::Add(n) => n,
        };
        self.times_done.set(self.times_done.get() + by);
        Ok(())
    }
}
