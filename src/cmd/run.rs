use clap::Args;
use color_eyre::eyre::{Report, Result, WrapErr};
use kiln_actions::BuildContext;
use kiln_workflow::{
    ActionSequencer, CheckpointStore, FileCheckpointStore, RunStatus, SequenceEvent,
};
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use tokio::sync::broadcast::error::RecvError;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

use super::{EXIT_BUILD_FAILED, EXIT_RESTART};
use crate::config::KilnConfig;

#[derive(Args, Debug)]
pub struct RunArgs {
    /// Build definition (YAML, or JSON when the file ends in .json)
    pub definition: PathBuf,

    /// Continue the build from the checkpoint left by an earlier run
    #[arg(long)]
    pub resume: bool,

    /// Checkpoint file (overrides the config file)
    #[arg(long)]
    pub checkpoint: Option<PathBuf>,

    /// Retries for retryable failures (overrides the config file)
    #[arg(long)]
    pub max_retries: Option<u32>,
}

/// Run a build definition to completion, failure or a restart request
pub async fn run_build(args: RunArgs, config: &KilnConfig) -> Result<ExitCode> {
    let list = super::load_definition(&args.definition)?;

    let mut sequencer_config = config.sequencer_config();
    if let Some(max_retries) = args.max_retries {
        sequencer_config.retry.max_retries = max_retries;
    }

    let checkpoint_path = args
        .checkpoint
        .clone()
        .unwrap_or_else(|| config.checkpoint.path.clone());
    let store = Arc::new(FileCheckpointStore::new(&checkpoint_path));

    let mut ctx = if args.resume {
        match store
            .load()
            .await
            .wrap_err_with(|| format!("Failed to load checkpoint {}", checkpoint_path.display()))?
        {
            Some(ctx) => {
                info!(
                    build_id = %ctx.build_id(),
                    completed = ctx.log().len(),
                    "Resuming from checkpoint"
                );
                ctx
            }
            None => {
                warn!(path = %checkpoint_path.display(), "No checkpoint found, starting a fresh build");
                BuildContext::new().with_config(config.config.clone())
            }
        }
    } else {
        store
            .clear()
            .await
            .wrap_err("Failed to discard previous checkpoint")?;
        BuildContext::new().with_config(config.config.clone())
    };

    let sequencer = ActionSequencer::new(super::registry(config)?, sequencer_config)
        .with_checkpoints(store);

    let total = list.len();
    let mut events = sequencer.subscribe();
    let progress = tokio::spawn(async move {
        loop {
            match events.recv().await {
                Ok(event) => print_progress(&event, total),
                Err(RecvError::Lagged(_)) => continue,
                Err(RecvError::Closed) => break,
            }
        }
    });

    let result = sequencer.run(&list, &mut ctx).await;

    // Dropping the sequencer closes the event channel and ends the printer
    drop(sequencer);
    finish_progress(progress).await;

    match result {
        Ok(summary) => match summary.status {
            RunStatus::Completed => {
                println!(
                    "Build complete: {} action(s) run, {} skipped, in {:.1?}",
                    summary.executed, summary.skipped, summary.duration
                );
                Ok(ExitCode::SUCCESS)
            }
            RunStatus::RestartRequired {
                index,
                action,
                reason,
                timeout,
                retry_on_restart,
            } => {
                println!(
                    "Restart requested by action {} ({}): {}",
                    index, action, reason
                );
                println!("Restart within {}s, then run again with --resume", timeout.as_secs());
                if retry_on_restart {
                    println!("Action {} will run again after the restart", index);
                }
                println!("Checkpoint: {}", checkpoint_path.display());
                Ok(ExitCode::from(EXIT_RESTART))
            }
        },
        Err(e) => {
            error!(index = ?e.index(), action = ?e.action(), "Build failed");
            eprintln!("{:?}", Report::new(e).wrap_err("Build failed"));
            Ok(ExitCode::from(EXIT_BUILD_FAILED))
        }
    }
}

/// Wait for the progress printer; its failure never changes the build result
async fn finish_progress(progress: JoinHandle<()>) -> bool {
    match progress.await {
        Ok(()) => true,
        Err(e) => {
            warn!(error = %e, "Progress printer failed");
            false
        }
    }
}

fn print_progress(event: &SequenceEvent, total: usize) {
    match event {
        SequenceEvent::Started { skipped, .. } if *skipped > 0 => {
            println!("Skipping {} completed action(s)", skipped);
        }
        SequenceEvent::ActionStarted {
            index,
            action,
            attempt: 1,
        } => {
            println!("[{}/{}] {}", index + 1, total, action);
        }
        SequenceEvent::ActionRetrying {
            action,
            attempt,
            delay,
            error,
            ..
        } => {
            println!(
                "      {} attempt {} failed, retrying in {:.1?}: {}",
                action, attempt, delay, error
            );
        }
        _ => {}
    }
}
