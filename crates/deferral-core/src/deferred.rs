//! Owner-side guarding
//!
//! An owner holds a [`Deferrer`] and implements [`Deferred`] to say how a
//! queued call record is carried out. Each guarded method then builds its
//! record and hands it to [`Deferred::guarded`], or calls
//! [`Deferrer::enqueue_or_run`] directly when it needs the immediate return
//! value.
//!
//! # Example
//!
//! ```
//! use deferral_core::{Deferred, Deferrer};
//! use std::cell::Cell;
//! use std::convert::Infallible;
//!
//! #[derive(Debug, PartialEq)]
//! enum Op {
//!     Redraw,
//! }
//!
//! struct Widget {
//!     deferrer: Deferrer<Op>,
//!     redraws: Cell<u32>,
//! }
//!
//! impl Deferred for Widget {
//!     type Call = Op;
//!     type Error = Infallible;
//!
//!     fn deferrer(&self) -> &Deferrer<Op> {
//!         &self.deferrer
//!     }
//!
//!     fn dispatch(&self, call: Op) -> Result<(), Infallible> {
//!         match call {
//!             Op::Redraw => self.redraws.set(self.redraws.get() + 1),
//!         }
//!         Ok(())
//!     }
//! }
//!
//! let widget = Widget {
//!     deferrer: Deferrer::with_dedupe(true),
//!     redraws: Cell::new(0),
//! };
//!
//! widget
//!     .deferred(|| {
//!         widget.guarded(Op::Redraw);
//!         widget.guarded(Op::Redraw);
//!     })
//!     .unwrap();
//! assert_eq!(widget.redraws.get(), 1);
//! ```

use std::fmt;

use crate::deferrer::{Deferrer, Dispatch, FlushOutcome};
use crate::errors::DeferralError;
use crate::scope::DeferralScope;

/// An object whose guarded operations can be deferred
pub trait Deferred {
    /// Comparable record of one guarded operation and its arguments
    type Call: PartialEq;
    type Error: fmt::Display;

    /// The queue guarding this owner
    fn deferrer(&self) -> &Deferrer<Self::Call>;

    /// Carry out a guarded operation now
    fn dispatch(&self, call: Self::Call) -> Result<(), Self::Error>;

    /// Run `call` now, or queue it while deferral is active
    ///
    /// Returns `None` when the call was queued.
    fn guarded(&self, call: Self::Call) -> Option<Result<(), Self::Error>> {
        self.deferrer()
            .enqueue_or_run(call, |call| self.dispatch(call))
    }

    fn defer(&self) {
        self.deferrer().defer();
    }

    /// Close a deferral level, replaying queued calls through `dispatch`
    ///
    /// # Errors
    ///
    /// See [`Deferrer::resume`].
    fn resume(&self) -> Result<FlushOutcome, DeferralError<Self::Error>> {
        self.deferrer().resume(Dispatcher(self))
    }

    /// Open a deferral level bound to this owner
    fn deferral(&self) -> DeferralScope<'_, Self::Call, Dispatcher<'_, Self>> {
        self.deferrer().scope(Dispatcher(self))
    }

    /// Run `body` with deferral active, then flush
    ///
    /// The flush happens even if `body` panics. If `body` returns a
    /// `Result`, calls it queued before failing are still flushed and its
    /// error is handed back inside `Ok`.
    ///
    /// # Errors
    ///
    /// Returns the flush error if a queued call fails; it takes precedence
    /// over the value produced by `body`.
    fn deferred<T, F>(&self, body: F) -> Result<T, DeferralError<Self::Error>>
    where
        F: FnOnce() -> T,
    {
        let scope = self.deferral();
        let value = body();
        scope.finish()?;
        Ok(value)
    }
}

/// Routes queued calls back to a [`Deferred`] owner
pub struct Dispatcher<'a, T: ?Sized>(&'a T);

impl<'a, T: ?Sized> Dispatcher<'a, T> {
    pub fn new(owner: &'a T) -> Self {
        Self(owner)
    }
}

impl<T> Dispatch<T::Call> for Dispatcher<'_, T>
where
    T: Deferred + ?Sized,
{
    type Error = T::Error;

    fn dispatch(&mut self, call: T::Call) -> Result<(), T::Error> {
        Deferred::dispatch(self.0, call)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;

    #[derive(Debug, Clone, PartialEq)]
    enum Edit {
        Insert(String),
        Clear,
    }

    #[derive(Default)]
    struct Document {
        deferrer: Deferrer<Edit>,
        lines: RefCell<Vec<String>>,
    }

    impl Deferred for Document {
        type Call = Edit;
        type Error = String;

        fn deferrer(&self) -> &Deferrer<Edit> {
            &self.deferrer
        }

        fn dispatch(&self, call: Edit) -> Result<(), String> {
            match call {
                Edit::Insert(line) if line.is_empty() => Err("empty line".to_string()),
                Edit::Insert(line) => {
                    self.lines.borrow_mut().push(line);
                    Ok(())
                }
                Edit::Clear => {
                    self.lines.borrow_mut().clear();
                    Ok(())
                }
            }
        }
    }

    impl Document {
        fn insert(&self, line: &str) {
            self.guarded(Edit::Insert(line.to_string()));
        }

        fn clear(&self) {
            self.guarded(Edit::Clear);
        }
    }

    #[test]
    fn test_guarded_runs_immediately_when_idle() {
        let doc = Document::default();
        assert_eq!(doc.guarded(Edit::Insert("a".into())), Some(Ok(())));
        assert_eq!(*doc.lines.borrow(), vec!["a"]);
    }

    #[test]
    fn test_defer_resume_replays_in_order() {
        let doc = Document::default();
        doc.defer();
        doc.insert("a");
        doc.clear();
        doc.insert("b");
        assert!(doc.lines.borrow().is_empty());

        let outcome = doc.resume().unwrap();

        assert_eq!(outcome.executed(), 3);
        assert_eq!(*doc.lines.borrow(), vec!["b"]);
    }

    #[test]
    fn test_deferral_scope_finish_reports_call_error() {
        let doc = Document::default();
        let scope = doc.deferral();
        doc.insert("a");
        doc.insert("");
        doc.insert("c");

        let err = scope.finish().unwrap_err();

        assert_eq!(
            err,
            DeferralError::CallFailed {
                position: 1,
                abandoned: 1,
                source: "empty line".to_string()
            }
        );
        assert_eq!(*doc.lines.borrow(), vec!["a"]);
    }

    #[test]
    fn test_deferred_returns_body_value() {
        let doc = Document::default();
        let value = doc
            .deferred(|| {
                doc.insert("x");
                doc.lines.borrow().len()
            })
            .unwrap();
        assert_eq!(value, 0);
        assert_eq!(*doc.lines.borrow(), vec!["x"]);
    }

    #[test]
    fn test_resume_on_owner_without_defer() {
        let doc = Document::default();
        assert!(doc.resume().unwrap_err().is_precondition());
    }

    #[test]
    fn test_dispatcher_routes_to_owner() {
        let doc = Document::default();
        let mut dispatcher = Dispatcher::new(&doc);
        dispatcher.dispatch(Edit::Insert("z".into())).unwrap();
        assert_eq!(*doc.lines.borrow(), vec!["z"]);
    }
}
