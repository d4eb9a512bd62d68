use clap::Args;
use color_eyre::eyre::{Report, Result};
use kiln_actions::BuildContext;
use kiln_workflow::ActionSequencer;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::error;

use super::EXIT_BUILD_FAILED;
use crate::config::KilnConfig;

#[derive(Args, Debug)]
pub struct ValidateArgs {
    /// Build definition (YAML, or JSON when the file ends in .json)
    pub definition: PathBuf,
}

/// Resolve and validate a build definition without running any action
pub async fn validate_definition(args: ValidateArgs, config: &KilnConfig) -> Result<ExitCode> {
    let list = super::load_definition(&args.definition)?;
    let sequencer = ActionSequencer::new(super::registry(config)?, config.sequencer_config());
    let ctx = BuildContext::new().with_config(config.config.clone());

    match sequencer.validate(&list, &ctx) {
        Ok(()) => {
            println!(
                "{}: {} action(s) valid",
                args.definition.display(),
                list.len()
            );
            Ok(ExitCode::SUCCESS)
        }
        Err(e) => {
            error!(index = ?e.index(), action = ?e.action(), "Build definition is invalid");
            eprintln!("{:?}", Report::new(e).wrap_err("Build definition is invalid"));
            Ok(ExitCode::from(EXIT_BUILD_FAILED))
        }
    }
}
