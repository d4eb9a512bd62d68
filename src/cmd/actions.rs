use clap::Args;
use color_eyre::eyre::Result;
use kiln_actions::{ActionArgs, BuildContext};
use std::process::ExitCode;

use crate::config::KilnConfig;

#[derive(Args, Debug)]
pub struct ActionsArgs {}

/// Print every registered action type with its description
pub async fn list_actions(_args: ActionsArgs, config: &KilnConfig) -> Result<ExitCode> {
    let registry = super::registry(config)?;
    let ctx = BuildContext::new();

    let names = registry.names();
    let width = names.iter().map(|n| n.len()).max().unwrap_or(0);
    for name in names {
        let action = registry.resolve(name, ActionArgs::default(), &ctx)?;
        println!("{:<width$}  {}", name, action.description(), width = width);
    }
    Ok(ExitCode::SUCCESS)
}
