//! Deferral core - batching of guarded method calls
//!
//! This crate provides a deferred-execution queue for side-effecting
//! operations:
//! - `Deferrer`: runs guarded calls immediately, or queues them while a
//!   deferral is active and replays them in order once it fully unwinds
//! - Consecutive dedupe of equal queued calls at flush time
//! - `DeferralScope`: guard that keeps defer/resume balanced on every exit path
//! - `Deferred`: the owner-side seam for guarded methods
//! - Structured error and logging facilities
//!
//! The queue is single-threaded by contract and holds no locks.

pub mod config;
pub mod deferred;
pub mod deferrer;
pub mod errors;
pub mod logging_facility;
pub mod scope;

pub use deferral_core_types::schema;

// Re-export commonly used types
pub use config::DeferrerConfig;
pub use deferred::{Deferred, Dispatcher};
pub use deferrer::{Deferrer, Dispatch, FlushOutcome};
pub use errors::{ConfigError, DeferralError, ExError, ExErrorKind};
pub use scope::DeferralScope;
