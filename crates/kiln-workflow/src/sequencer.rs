//! Sequential build execution
//!
//! The [`ActionSequencer`] turns an [`ActionList`] into action instances,
//! validates them and runs them one at a time against the shared
//! [`BuildContext`]. The first fatal failure stops the run; nothing after it
//! is started and nothing before it is rolled back.

use crate::checkpoint::CheckpointStore;
use crate::definition::ActionList;
use crate::error::{Result, SequenceError};
use kiln_actions::{
    Action, ActionArgs, ActionError, ActionRegistry, BuildContext, CompletionRecord, ErrorKind,
    Outcome, RetryPolicy,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::broadcast;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

/// Sequencer settings
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SequencerConfig {
    /// Retry policy for actions that do not supply their own
    pub retry: RetryPolicy,

    /// Validate every action before running the first one
    pub preflight: bool,
}

impl Default for SequencerConfig {
    fn default() -> Self {
        Self {
            retry: RetryPolicy::default(),
            preflight: true,
        }
    }
}

/// Event emitted during a sequence run
#[derive(Debug, Clone, PartialEq)]
pub enum SequenceEvent {
    /// Run started; `skipped` actions were already completed by an earlier run
    Started {
        build_id: Uuid,
        total: usize,
        skipped: usize,
    },
    /// An attempt at an action is starting
    ActionStarted {
        index: usize,
        action: String,
        attempt: u32,
    },
    /// An attempt failed with a retryable error and will be repeated
    ActionRetrying {
        index: usize,
        action: String,
        attempt: u32,
        delay: Duration,
        error: String,
    },
    /// Action completed
    ActionCompleted {
        index: usize,
        action: String,
        attempts: u32,
    },
    /// Action failed; the run stops
    ActionFailed {
        index: usize,
        action: String,
        error: String,
    },
    /// Action asked for a machine restart; the run stops
    RestartRequested {
        index: usize,
        action: String,
        reason: String,
    },
    /// Run finished, successfully or not
    Finished { build_id: Uuid, success: bool },
}

/// How a run that did not fail ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunStatus {
    /// Every action completed
    Completed,

    /// An action requested a restart; resume after the restart to continue
    RestartRequired {
        index: usize,
        action: String,
        reason: String,
        timeout: Duration,
        retry_on_restart: bool,
    },
}

/// Result of a sequence run that did not fail
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunSummary {
    pub status: RunStatus,

    /// Actions run to completion in this run
    pub executed: usize,

    /// Actions skipped because an earlier run had completed them
    pub skipped: usize,

    /// Actions in the build definition
    pub total: usize,

    pub duration: Duration,
}

impl RunSummary {
    pub fn is_complete(&self) -> bool {
        self.status == RunStatus::Completed
    }
}

/// Sequential action executor
///
/// Orchestrates a build by:
/// 1. Resolving every record through the registry
/// 2. Validating the actions (all up front, or each before it runs)
/// 3. Running each action in order, retrying retryable failures
/// 4. Recording completions in the context and checkpointing it
/// 5. Reporting progress via events
pub struct ActionSequencer {
    registry: ActionRegistry,

    config: SequencerConfig,

    /// Optional persistence for resuming after a restart
    checkpoints: Option<Arc<dyn CheckpointStore>>,

    event_sender: broadcast::Sender<SequenceEvent>,
}

impl ActionSequencer {
    pub fn new(registry: ActionRegistry, config: SequencerConfig) -> Self {
        let (event_sender, _) = broadcast::channel(1024);
        Self {
            registry,
            config,
            checkpoints: None,
            event_sender,
        }
    }

    /// Persist the context after every completed action
    pub fn with_checkpoints(mut self, store: Arc<dyn CheckpointStore>) -> Self {
        self.checkpoints = Some(store);
        self
    }

    pub fn registry(&self) -> &ActionRegistry {
        &self.registry
    }

    pub fn config(&self) -> &SequencerConfig {
        &self.config
    }

    /// Subscribe to sequence events
    pub fn subscribe(&self) -> broadcast::Receiver<SequenceEvent> {
        self.event_sender.subscribe()
    }

    fn emit(&self, event: SequenceEvent) {
        let _ = self.event_sender.send(event);
    }

    /// Resolve and validate every action without running anything
    pub fn validate(&self, list: &ActionList, ctx: &BuildContext) -> Result<()> {
        let actions = self.resolve_all(list, ctx)?;
        for (index, action) in actions.iter().enumerate() {
            validate_action(index, action.as_ref(), ctx)?;
        }
        Ok(())
    }

    /// Run the build definition against the context
    ///
    /// Actions already recorded in the context's completion log are skipped,
    /// which is how a run resumes from a checkpoint.
    pub async fn run(&self, list: &ActionList, ctx: &mut BuildContext) -> Result<RunSummary> {
        let started = Instant::now();
        let build_id = ctx.build_id();
        let total = list.len();

        let skipped = check_resume_point(list, ctx)?;
        let actions = self.resolve_all(list, ctx)?;

        if self.config.preflight {
            for (index, action) in actions.iter().enumerate().skip(skipped) {
                validate_action(index, action.as_ref(), ctx)?;
            }
        }

        info!(build_id = %build_id, total, skipped, "Starting build");
        self.emit(SequenceEvent::Started {
            build_id,
            total,
            skipped,
        });

        let result = self.run_from(list, &actions, skipped, ctx).await;

        let success = matches!(result, Ok(RunStatus::Completed));
        self.emit(SequenceEvent::Finished { build_id, success });

        let status = result?;
        if status == RunStatus::Completed {
            if let Some(store) = &self.checkpoints {
                store.clear().await?;
            }
        }

        let summary = RunSummary {
            executed: ctx.log().len() - skipped,
            status,
            skipped,
            total,
            duration: started.elapsed(),
        };
        info!(
            build_id = %build_id,
            executed = summary.executed,
            complete = summary.is_complete(),
            duration_ms = summary.duration.as_millis() as u64,
            "Build finished"
        );
        Ok(summary)
    }

    fn resolve_all(&self, list: &ActionList, ctx: &BuildContext) -> Result<Vec<Box<dyn Action>>> {
        list.iter()
            .enumerate()
            .map(|(index, spec)| {
                self.registry
                    .resolve(&spec.action_type, spec.args.clone(), ctx)
                    .map_err(|source| {
                        error!(index, action = %spec.action_type, error = %source, "Cannot resolve action");
                        SequenceError::Registry {
                            index,
                            action: spec.action_type.clone(),
                            source,
                        }
                    })
            })
            .collect()
    }

    async fn run_from(
        &self,
        list: &ActionList,
        actions: &[Box<dyn Action>],
        start: usize,
        ctx: &mut BuildContext,
    ) -> Result<RunStatus> {
        for (index, action) in actions.iter().enumerate().skip(start) {
            let action = action.as_ref();
            let name = action.name().to_string();
            let args = list.get(index).map(|spec| spec.args.clone()).unwrap_or_default();

            if !self.config.preflight {
                validate_action(index, action, ctx)?;
            }

            let action_started = Instant::now();
            let (outcome, attempts) = match self.run_with_retry(index, action, ctx).await {
                Ok(done) => done,
                Err(e) => {
                    error!(index, action = %name, error = %e, "Action failed");
                    self.emit(SequenceEvent::ActionFailed {
                        index,
                        action: name,
                        error: e.to_string(),
                    });
                    return Err(e);
                }
            };

            match outcome {
                Outcome::Continue => {
                    ctx.record_completion(
                        CompletionRecord::new(index, &name, attempts, action_started.elapsed())
                            .with_args(args),
                    );
                    self.checkpoint(ctx).await?;
                    info!(index, action = %name, attempts, "Action completed");
                    self.emit(SequenceEvent::ActionCompleted {
                        index,
                        action: name,
                        attempts,
                    });
                }
                Outcome::Restart {
                    reason,
                    timeout,
                    retry_on_restart,
                } => {
                    if !retry_on_restart {
                        ctx.record_completion(
                            CompletionRecord::new(index, &name, attempts, action_started.elapsed())
                                .with_args(args),
                        );
                    }
                    self.checkpoint(ctx).await?;
                    info!(
                        index,
                        action = %name,
                        reason = %reason,
                        retry_on_restart,
                        "Restart requested, stopping build"
                    );
                    self.emit(SequenceEvent::RestartRequested {
                        index,
                        action: name.clone(),
                        reason: reason.clone(),
                    });
                    return Ok(RunStatus::RestartRequired {
                        index,
                        action: name,
                        reason,
                        timeout,
                        retry_on_restart,
                    });
                }
            }
        }

        Ok(RunStatus::Completed)
    }

    /// Run one action, reattempting retryable failures
    ///
    /// Returns the outcome and the number of attempts it took.
    async fn run_with_retry(
        &self,
        index: usize,
        action: &dyn Action,
        ctx: &mut BuildContext,
    ) -> Result<(Outcome, u32)> {
        let name = action.name();
        let policy = action.retry_policy().unwrap_or(self.config.retry);
        let mut attempt = 1;

        loop {
            debug!(index, action = %name, attempt, "Running action");
            self.emit(SequenceEvent::ActionStarted {
                index,
                action: name.to_string(),
                attempt,
            });

            let err = match action.run(ctx).await {
                Ok(outcome) => return Ok((outcome, attempt)),
                Err(e) => e.for_action(name),
            };

            match err.kind() {
                ErrorKind::Validation => {
                    return Err(SequenceError::Validation {
                        index,
                        action: name.to_string(),
                        source: err,
                    });
                }
                ErrorKind::Retryable if policy.allows_retry(attempt) => {
                    let delay = policy.delay_for(attempt);
                    warn!(
                        index,
                        action = %name,
                        attempt,
                        max_retries = policy.max_retries,
                        delay_ms = delay.as_millis() as u64,
                        error = %err,
                        "Retryable failure, retrying"
                    );
                    self.emit(SequenceEvent::ActionRetrying {
                        index,
                        action: name.to_string(),
                        attempt,
                        delay,
                        error: err.to_string(),
                    });
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                ErrorKind::Retryable => {
                    return Err(fatal(index, name, attempt, err.escalate()));
                }
                ErrorKind::Fatal => {
                    return Err(fatal(index, name, attempt, err));
                }
            }
        }
    }

    async fn checkpoint(&self, ctx: &BuildContext) -> Result<()> {
        if let Some(store) = &self.checkpoints {
            store.save(ctx).await?;
        }
        Ok(())
    }
}

fn fatal(index: usize, action: &str, attempts: u32, source: ActionError) -> SequenceError {
    SequenceError::Fatal {
        index,
        action: action.to_string(),
        attempts,
        source,
    }
}

fn validate_action(index: usize, action: &dyn Action, ctx: &BuildContext) -> Result<()> {
    action.validate(ctx).map_err(|e| {
        let name = action.name();
        error!(index, action = %name, error = %e, "Action failed validation");
        SequenceError::Validation {
            index,
            action: name.to_string(),
            source: e.for_action(name),
        }
    })
}

/// Number of leading actions the context has already completed
///
/// The completion log must be a prefix of the definition, in order and with
/// the same arguments.
fn check_resume_point(list: &ActionList, ctx: &BuildContext) -> Result<usize> {
    let log = ctx.log();
    for (position, record) in log.iter().enumerate() {
        let Some(spec) = list.get(position) else {
            return Err(SequenceError::CheckpointMismatch {
                index: position,
                expected: "<end of definition>".to_string(),
                found: record.action.clone(),
            });
        };
        if record.index != position || record.action != spec.action_type {
            return Err(SequenceError::CheckpointMismatch {
                index: position,
                expected: spec.action_type.clone(),
                found: record.action.clone(),
            });
        }
        if record.args != spec.args {
            return Err(SequenceError::CheckpointMismatch {
                index: position,
                expected: describe(&spec.action_type, &spec.args),
                found: describe(&record.action, &record.args),
            });
        }
    }
    if !log.is_empty() {
        info!(completed = log.len(), "Resuming build from checkpoint");
    }
    Ok(log.len())
}

/// `disk.SetSize [100]`
fn describe(action: &str, args: &ActionArgs) -> String {
    format!(
        "{} {}",
        action,
        serde_json::to_string(args).unwrap_or_default()
    )
}
