//! Canonical schema constants for structured logging and events
//!
//! These constants ensure consistency across all logging and error reporting.

// Canonical field keys for structured logging
pub const FIELD_COMPONENT: &str = "component";
pub const FIELD_OP: &str = "op";
pub const FIELD_EVENT: &str = "event";
pub const FIELD_DURATION_MS: &str = "duration_ms";
pub const FIELD_BATCH_ID: &str = "batch_id";

// Queue state
pub const FIELD_DEPTH: &str = "depth";
pub const FIELD_QUEUED: &str = "queued";
pub const FIELD_EXECUTED: &str = "executed";
pub const FIELD_COLLAPSED: &str = "collapsed";
pub const FIELD_ABANDONED: &str = "abandoned";
pub const FIELD_POSITION: &str = "position";

// Error fields
pub const FIELD_ERR_KIND: &str = "err.kind";
pub const FIELD_ERR_CODE: &str = "err.code";

// Canonical event names
pub const EVENT_START: &str = "start";
pub const EVENT_END: &str = "end";
pub const EVENT_END_ERROR: &str = "end_error";

// Canonical operation names
pub const OP_RESUME: &str = "deferrer.resume";
pub const OP_FLUSH: &str = "deferrer.flush";
pub const OP_SCOPE_DROP: &str = "deferrer.scope_drop";
