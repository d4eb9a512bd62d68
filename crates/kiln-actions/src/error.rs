//! Error types for the action framework
//!
//! Every failure raised by an action is an [`ActionError`] carrying one of
//! three classifications. The classification, not the message, decides what
//! the sequencer does next:
//!
//! - [`ErrorKind::Validation`]: malformed arguments, raised before any side effect
//! - [`ErrorKind::Retryable`]: transient failure, the action may be attempted again
//! - [`ErrorKind::Fatal`]: the build cannot safely continue
//!
//! Registry lookups fail with [`RegistryError`] instead: an unknown action
//! type is a defect in the build definition, not a failure of any action.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use thiserror::Error;

/// Boxed error used for chained causes
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Classification of an action failure
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// Malformed input arguments; never retried
    Validation,
    /// Transient condition; retried up to the configured limit
    Retryable,
    /// Unrecoverable; aborts the whole sequence
    Fatal,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorKind::Validation => write!(f, "validation"),
            ErrorKind::Retryable => write!(f, "retryable"),
            ErrorKind::Fatal => write!(f, "fatal"),
        }
    }
}

/// Error type for action validation and execution
#[derive(Debug, Error)]
#[error("{kind} error: {message}")]
pub struct ActionError {
    kind: ErrorKind,
    message: String,
    action: Option<String>,
    #[source]
    source: Option<BoxError>,
}

impl ActionError {
    fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            action: None,
            source: None,
        }
    }

    /// Malformed arguments (wrong arity, wrong type, out of range)
    pub fn validation(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Validation, message)
    }

    /// Transient failure worth another attempt
    pub fn retryable(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Retryable, message)
    }

    /// Unrecoverable failure
    pub fn fatal(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Fatal, message)
    }

    /// Attach the underlying cause
    pub fn with_source<E>(mut self, source: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        self.source = Some(Box::new(source));
        self
    }

    /// Stamp the originating action identifier, keeping an existing one
    pub fn for_action(mut self, action: impl Into<String>) -> Self {
        if self.action.is_none() {
            self.action = Some(action.into());
        }
        self
    }

    /// Reclassify a retryable error as fatal once its retry budget is spent
    pub fn escalate(mut self) -> Self {
        if self.kind == ErrorKind::Retryable {
            self.kind = ErrorKind::Fatal;
        }
        self
    }

    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    /// Identifier of the action that raised this error, once known
    pub fn action(&self) -> Option<&str> {
        self.action.as_deref()
    }

    pub fn is_validation(&self) -> bool {
        self.kind == ErrorKind::Validation
    }

    pub fn is_retryable(&self) -> bool {
        self.kind == ErrorKind::Retryable
    }

    pub fn is_fatal(&self) -> bool {
        self.kind == ErrorKind::Fatal
    }
}

impl From<std::io::Error> for ActionError {
    fn from(err: std::io::Error) -> Self {
        ActionError::fatal(format!("I/O error: {}", err)).with_source(err)
    }
}

impl From<serde_json::Error> for ActionError {
    fn from(err: serde_json::Error) -> Self {
        ActionError::validation(format!("malformed value: {}", err)).with_source(err)
    }
}

impl From<ContextError> for ActionError {
    fn from(err: ContextError) -> Self {
        ActionError::fatal(err.to_string()).with_source(err)
    }
}

/// Result type for action operations
pub type Result<T> = std::result::Result<T, ActionError>;

/// Error type for action registration and lookup
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum RegistryError {
    /// The same action type was registered twice
    #[error("action type already registered: {0}")]
    Duplicate(String),

    /// The build definition names an action type nobody registered
    #[error("unknown action type: {0}")]
    UnknownAction(String),
}

/// Error type for build context mutations
#[derive(Debug, Clone, Error, PartialEq)]
pub enum ContextError {
    /// A fact may be added once; a different value for the same key is refused
    #[error("fact '{key}' is already set to {existing}, refusing to overwrite with {attempted}")]
    FactConflict {
        key: String,
        existing: Value,
        attempted: Value,
    },

    /// A configuration key exists but does not hold a nested section
    #[error("configuration key '{0}' is not a section")]
    NotASection(String),
}
