//! Scoped deferral
//!
//! A `DeferralScope` opens a deferral level on creation and closes it when
//! it ends, so `defer()`/`resume()` stay balanced on every exit path.

use deferral_core_types::schema::OP_SCOPE_DROP;

use crate::deferrer::{Deferrer, Dispatch, FlushOutcome};
use crate::errors::{DeferralError, ExError};

/// Guard for one deferral level
///
/// Prefer [`finish`](DeferralScope::finish), which returns the flush result.
/// If the scope is dropped instead (early return, `?`, or a panic unwinding
/// through the body), `Drop` still resumes and flushes; a flush failure at
/// that point cannot be returned and is logged at error level.
///
/// A queued call that panics while the scope is being dropped during another
/// panic aborts the process.
#[must_use = "dropping the scope immediately resumes the deferral"]
pub struct DeferralScope<'a, C, D>
where
    C: PartialEq,
    D: Dispatch<C>,
{
    deferrer: &'a Deferrer<C>,
    dispatch: Option<D>,
}

impl<'a, C, D> DeferralScope<'a, C, D>
where
    C: PartialEq,
    D: Dispatch<C>,
{
    pub(crate) fn enter(deferrer: &'a Deferrer<C>, dispatch: D) -> Self {
        deferrer.defer();
        Self {
            deferrer,
            dispatch: Some(dispatch),
        }
    }

    pub fn deferrer(&self) -> &'a Deferrer<C> {
        self.deferrer
    }

    /// Close the scope, flushing if it was the outermost deferral
    ///
    /// # Errors
    ///
    /// Returns [`DeferralError::CallFailed`] if a queued call fails during
    /// the flush.
    pub fn finish(mut self) -> Result<FlushOutcome, DeferralError<D::Error>> {
        // `dispatch` is set in `enter` and only taken here or in `Drop`,
        // both of which consume the scope.
        let Some(dispatch) = self.dispatch.take() else {
            unreachable!("deferral scope finished twice");
        };
        self.deferrer.resume(dispatch)
    }
}

impl<C, D> Drop for DeferralScope<'_, C, D>
where
    C: PartialEq,
    D: Dispatch<C>,
{
    fn drop(&mut self) {
        let Some(dispatch) = self.dispatch.take() else {
            return;
        };
        if let Err(err) = self.deferrer.resume(dispatch) {
            let ex_err = ExError::from(&err);
            tracing::error!(
                op = OP_SCOPE_DROP,
                err.code = ex_err.code(),
                error = %ex_err,
                "flush on scope exit failed"
            );
        }
    }
}
