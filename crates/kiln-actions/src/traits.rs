//! Action trait definition
//!
//! This module defines the core Action trait that every build step
//! implements, plus a few trivial actions used to exercise the sequencer.

use crate::context::BuildContext;
use crate::error::{ActionError, ErrorKind, Result};
use crate::retry::RetryPolicy;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

/// What the sequencer should do after a successful `run()`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Outcome {
    /// Proceed with the next action
    Continue,

    /// Stop here; the machine must restart before the build can go on
    Restart {
        reason: String,
        /// Grace period the host should allow before restarting
        timeout: Duration,
        /// Run this action again after the restart instead of skipping it
        retry_on_restart: bool,
    },
}

/// Core trait for build actions
///
/// An action is built from its positional arguments by a registry
/// constructor, validated, then run once (or again after a retryable
/// failure) against the shared [`BuildContext`]. Construction must not have
/// side effects; anything touching the machine goes through a provider the
/// constructor captured.
///
/// # Example
///
/// ```ignore
/// use kiln_actions::{Action, ActionArgs, BuildContext, Outcome, Result};
/// use async_trait::async_trait;
///
/// struct SetHostname(ActionArgs);
///
/// #[async_trait]
/// impl Action for SetHostname {
///     fn name(&self) -> &str {
///         "network.SetHostname"
///     }
///
///     fn description(&self) -> &str {
///         "Records the hostname the machine will be given"
///     }
///
///     fn validate(&self, _ctx: &BuildContext) -> Result<()> {
///         self.0.expect_arity(1, 1)?;
///         self.0.string(0).map(|_| ())
///     }
///
///     async fn run(&self, ctx: &mut BuildContext) -> Result<Outcome> {
///         ctx.add_fact("hostname", self.0.string(0)?)?;
///         Ok(Outcome::Continue)
///     }
/// }
/// ```
#[async_trait]
pub trait Action: Send + Sync {
    /// Action type identifier, as registered
    fn name(&self) -> &str;

    /// Human-readable description of the action
    fn description(&self) -> &str;

    /// Check argument shape and types
    ///
    /// Must not touch the machine or mutate the context. Failures should be
    /// [`ErrorKind::Validation`] errors.
    fn validate(&self, ctx: &BuildContext) -> Result<()> {
        let _ = ctx;
        Ok(())
    }

    /// Perform the build step
    async fn run(&self, ctx: &mut BuildContext) -> Result<Outcome>;

    /// Retry policy overriding the sequencer default
    fn retry_policy(&self) -> Option<RetryPolicy> {
        None
    }
}

/// A no-op action for testing
pub struct NoopAction {
    name: String,
}

impl NoopAction {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

#[async_trait]
impl Action for NoopAction {
    fn name(&self) -> &str {
        &self.name
    }

    fn description(&self) -> &str {
        "A no-op action for testing"
    }

    async fn run(&self, _ctx: &mut BuildContext) -> Result<Outcome> {
        Ok(Outcome::Continue)
    }
}

/// An action that always fails with the given classification
pub struct FailingAction {
    name: String,
    kind: ErrorKind,
    error_message: String,
}

impl FailingAction {
    pub fn new(name: impl Into<String>, kind: ErrorKind, error_message: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind,
            error_message: error_message.into(),
        }
    }

    fn error(&self) -> ActionError {
        match self.kind {
            ErrorKind::Validation => ActionError::validation(self.error_message.clone()),
            ErrorKind::Retryable => ActionError::retryable(self.error_message.clone()),
            ErrorKind::Fatal => ActionError::fatal(self.error_message.clone()),
        }
    }
}

#[async_trait]
impl Action for FailingAction {
    fn name(&self) -> &str {
        &self.name
    }

    fn description(&self) -> &str {
        "An action that always fails (for testing)"
    }

    fn validate(&self, _ctx: &BuildContext) -> Result<()> {
        match self.kind {
            ErrorKind::Validation => Err(self.error()),
            _ => Ok(()),
        }
    }

    async fn run(&self, _ctx: &mut BuildContext) -> Result<Outcome> {
        Err(self.error())
    }
}

/// An action that fails with a retryable error a fixed number of times,
/// then succeeds (for testing retries)
pub struct FlakyAction {
    name: String,
    failures: u32,
    attempts: AtomicU32,
}

impl FlakyAction {
    pub fn new(name: impl Into<String>, failures: u32) -> Self {
        Self {
            name: name.into(),
            failures,
            attempts: AtomicU32::new(0),
        }
    }

    /// Number of `run()` calls so far
    pub fn attempts(&self) -> u32 {
        self.attempts.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Action for FlakyAction {
    fn name(&self) -> &str {
        &self.name
    }

    fn description(&self) -> &str {
        "An action that fails transiently before succeeding (for testing)"
    }

    async fn run(&self, _ctx: &mut BuildContext) -> Result<Outcome> {
        let attempt = self.attempts.fetch_add(1, Ordering::SeqCst) + 1;
        if attempt <= self.failures {
            return Err(ActionError::retryable(format!(
                "transient failure {} of {}",
                attempt, self.failures
            )));
        }
        Ok(Outcome::Continue)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_noop_action() {
        let action = NoopAction::new("test-noop");
        let mut ctx = BuildContext::new();

        assert_eq!(action.name(), "test-noop");
        assert!(action.validate(&ctx).is_ok());
        assert_eq!(action.run(&mut ctx).await.unwrap(), Outcome::Continue);
    }

    #[tokio::test]
    async fn test_failing_action() {
        let action = FailingAction::new("test-fail", ErrorKind::Fatal, "Something went wrong");
        let mut ctx = BuildContext::new();

        assert!(action.validate(&ctx).is_ok());
        let err = action.run(&mut ctx).await.unwrap_err();
        assert!(err.is_fatal());
        assert!(err.to_string().contains("Something went wrong"));
    }

    #[test]
    fn test_failing_action_validation_kind() {
        let action = FailingAction::new("test-invalid", ErrorKind::Validation, "bad args");
        let err = action.validate(&BuildContext::new()).unwrap_err();
        assert!(err.is_validation());
    }

    #[tokio::test]
    async fn test_flaky_action() {
        let action = FlakyAction::new("flaky", 2);
        let mut ctx = BuildContext::new();

        assert!(action.run(&mut ctx).await.unwrap_err().is_retryable());
        assert!(action.run(&mut ctx).await.unwrap_err().is_retryable());
        assert_eq!(action.run(&mut ctx).await.unwrap(), Outcome::Continue);
        assert_eq!(action.attempts(), 3);
    }

    #[test]
    fn test_action_trait_defaults() {
        let action = NoopAction::new("test");

        assert!(action.validate(&BuildContext::new()).is_ok());
        assert_eq!(action.retry_policy(), None);
        assert_eq!(action.description(), "A no-op action for testing");
    }
}
