//! Error types for build sequencing
//!
//! This module provides error types for sequence failures, build definition
//! loading and checkpoint persistence.

use kiln_actions::{ActionError, RegistryError};
use std::path::PathBuf;
use thiserror::Error;

/// Error type for a sequence run
///
/// Every variant tied to an action carries its position in the build
/// definition and its type identifier.
#[derive(Debug, Error)]
pub enum SequenceError {
    /// An action type is not registered; nothing was run
    #[error("action {index} ({action}): {source}")]
    Registry {
        index: usize,
        action: String,
        #[source]
        source: RegistryError,
    },

    /// An action rejected its arguments; it was never run
    #[error("action {index} ({action}) is invalid: {source}")]
    Validation {
        index: usize,
        action: String,
        #[source]
        source: ActionError,
    },

    /// An action failed, directly or after exhausting its retries
    #[error("action {index} ({action}) failed after {attempts} attempt(s): {source}")]
    Fatal {
        index: usize,
        action: String,
        attempts: u32,
        #[source]
        source: ActionError,
    },

    /// The resumed context does not belong to this build definition
    #[error("checkpoint does not match build definition at action {index}: expected {expected}, found {found}")]
    CheckpointMismatch {
        index: usize,
        expected: String,
        found: String,
    },

    /// Checkpoint persistence failed
    #[error("checkpoint error: {0}")]
    Checkpoint(#[from] CheckpointError),
}

impl SequenceError {
    /// Position of the offending action, if the error concerns one
    pub fn index(&self) -> Option<usize> {
        match self {
            SequenceError::Registry { index, .. }
            | SequenceError::Validation { index, .. }
            | SequenceError::Fatal { index, .. }
            | SequenceError::CheckpointMismatch { index, .. } => Some(*index),
            SequenceError::Checkpoint(_) => None,
        }
    }

    /// Type identifier of the offending action, if the error concerns one
    pub fn action(&self) -> Option<&str> {
        match self {
            SequenceError::Registry { action, .. }
            | SequenceError::Validation { action, .. }
            | SequenceError::Fatal { action, .. } => Some(action),
            SequenceError::CheckpointMismatch { expected, .. } => Some(expected),
            SequenceError::Checkpoint(_) => None,
        }
    }
}

/// Result type for sequence operations
pub type Result<T> = std::result::Result<T, SequenceError>;

/// Error type for loading build definitions
#[derive(Debug, Error)]
pub enum DefinitionError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid YAML build definition: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("invalid JSON build definition: {0}")]
    Json(#[from] serde_json::Error),
}

/// Error type for checkpoint persistence
#[derive(Debug, Error)]
pub enum CheckpointError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = SequenceError::Fatal {
            index: 0,
            action: "disk.SetSize".to_string(),
            attempts: 1,
            source: ActionError::fatal("disk not found: sda"),
        };
        assert_eq!(
            err.to_string(),
            "action 0 (disk.SetSize) failed after 1 attempt(s): fatal error: disk not found: sda"
        );

        let err = SequenceError::Registry {
            index: 2,
            action: "disk.Explode".to_string(),
            source: RegistryError::UnknownAction("disk.Explode".to_string()),
        };
        assert_eq!(
            err.to_string(),
            "action 2 (disk.Explode): unknown action type: disk.Explode"
        );
    }

    #[test]
    fn test_error_accessors() {
        let err = SequenceError::Validation {
            index: 3,
            action: "files.MkDir".to_string(),
            source: ActionError::validation("missing argument 0"),
        };
        assert_eq!(err.index(), Some(3));
        assert_eq!(err.action(), Some("files.MkDir"));

        let err = SequenceError::Checkpoint(CheckpointError::Io(std::io::Error::new(
            std::io::ErrorKind::Other,
            "disk full",
        )));
        assert_eq!(err.index(), None);
        assert_eq!(err.action(), None);
    }

    #[test]
    fn test_error_source_chain() {
        use std::error::Error as _;

        let err = SequenceError::Fatal {
            index: 0,
            action: "files.Get".to_string(),
            attempts: 4,
            source: ActionError::fatal("mirror unreachable"),
        };
        let source = err.source().unwrap();
        assert_eq!(source.to_string(), "fatal error: mirror unreachable");
    }
}
