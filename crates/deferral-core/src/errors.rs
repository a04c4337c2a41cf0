use thiserror::Error;

// ========== Error Facility ==========

/// Canonical error kind taxonomy
///
/// Each kind maps to a stable error code that can be used for programmatic
/// error handling, testing and log assertions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExErrorKind {
    /// `resume()` was called without a matching `defer()`
    PreconditionViolation,
    /// A queued call failed while the queue was being flushed
    CallFailed,
    /// Deferrer configuration could not be parsed
    InvalidConfig,
}

impl ExErrorKind {
    /// Get the stable error code for this kind
    pub fn code(&self) -> &'static str {
        match self {
            ExErrorKind::PreconditionViolation => "ERR_PRECONDITION_VIOLATION",
            ExErrorKind::CallFailed => "ERR_CALL_FAILED",
            ExErrorKind::InvalidConfig => "ERR_INVALID_CONFIG",
        }
    }
}

/// Canonical structured error type
///
/// A flattened, classification-first view of any error raised by this
/// crate. Typed errors convert into it for logging and external reporting.
#[derive(Debug, Clone)]
pub struct ExError {
    kind: ExErrorKind,
    op: Option<String>,
    message: String,
    position: Option<usize>,
    abandoned: Option<usize>,
}

impl ExError {
    /// Create a new error with the specified kind
    pub fn new(kind: ExErrorKind) -> Self {
        Self {
            kind,
            op: None,
            message: String::new(),
            position: None,
            abandoned: None,
        }
    }

    /// Add operation context
    pub fn with_op(mut self, op: impl Into<String>) -> Self {
        self.op = Some(op.into());
        self
    }

    /// Add custom message
    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = message.into();
        self
    }

    /// Add the batch position of the failing call
    pub fn with_position(mut self, position: usize) -> Self {
        self.position = Some(position);
        self
    }

    /// Add the number of calls abandoned after a failure
    pub fn with_abandoned(mut self, abandoned: usize) -> Self {
        self.abandoned = Some(abandoned);
        self
    }

    pub fn kind(&self) -> ExErrorKind {
        self.kind
    }

    /// Get the stable error code
    pub fn code(&self) -> &'static str {
        self.kind.code()
    }

    pub fn op(&self) -> Option<&str> {
        self.op.as_deref()
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn position(&self) -> Option<usize> {
        self.position
    }

    pub fn abandoned(&self) -> Option<usize> {
        self.abandoned
    }
}

impl std::fmt::Display for ExError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}]", self.code())?;
        if let Some(op) = &self.op {
            write!(f, " in operation '{}'", op)?;
        }
        if !self.message.is_empty() {
            write!(f, ": {}", self.message)?;
        }
        if let Some(position) = self.position {
            write!(f, " (position: {})", position)?;
        }
        if let Some(abandoned) = self.abandoned {
            write!(f, " (abandoned: {})", abandoned)?;
        }
        Ok(())
    }
}

impl std::error::Error for ExError {}

// ========== End Error Facility ==========

/// Errors raised by `resume()` and scope exit
///
/// `E` is the error type of the dispatch function that replays queued calls.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum DeferralError<E> {
    /// `resume()` was called with no active deferral
    #[error("resume called without a matching defer")]
    NotDeferred,

    /// A queued call failed during flush; later calls in the batch were not run
    #[error("queued call at position {position} failed; {abandoned} later call(s) abandoned")]
    CallFailed {
        position: usize,
        abandoned: usize,
        #[source]
        source: E,
    },
}

impl<E> DeferralError<E> {
    /// True for the resume-without-defer programmer error
    pub fn is_precondition(&self) -> bool {
        matches!(self, DeferralError::NotDeferred)
    }

    /// The error returned by the failing queued call, if any
    pub fn call_error(&self) -> Option<&E> {
        match self {
            DeferralError::NotDeferred => None,
            DeferralError::CallFailed { source, .. } => Some(source),
        }
    }

    pub fn into_call_error(self) -> Option<E> {
        match self {
            DeferralError::NotDeferred => None,
            DeferralError::CallFailed { source, .. } => Some(source),
        }
    }
}

impl<E: std::fmt::Display> From<&DeferralError<E>> for ExError {
    fn from(err: &DeferralError<E>) -> Self {
        match err {
            DeferralError::NotDeferred => ExError::new(ExErrorKind::PreconditionViolation)
                .with_op("resume")
                .with_message("resume called without a matching defer"),

            DeferralError::CallFailed {
                position,
                abandoned,
                source,
            } => ExError::new(ExErrorKind::CallFailed)
                .with_op("flush")
                .with_message(source.to_string())
                .with_position(*position)
                .with_abandoned(*abandoned),
        }
    }
}

/// Errors raised while loading a `DeferrerConfig`
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigError {
    #[error("invalid deferrer config: {message}")]
    Invalid { message: String },
}

impl From<serde_json::Error> for ConfigError {
    fn from(err: serde_json::Error) -> Self {
        ConfigError::Invalid {
            message: err.to_string(),
        }
    }
}

impl From<&ConfigError> for ExError {
    fn from(err: &ConfigError) -> Self {
        match err {
            ConfigError::Invalid { message } => ExError::new(ExErrorKind::InvalidConfig)
                .with_op("load_config")
                .with_message(message.clone()),
        }
    }
}
