//! Subcommand implementations

pub mod actions;
pub mod run;
pub mod validate;

use color_eyre::eyre::{Result, WrapErr};
use kiln_actions::{create_registry_with_actions, ActionRegistry};
use kiln_workflow::ActionList;
use std::path::Path;

use crate::config::KilnConfig;

/// A build action failed, was invalid or could not be resolved
pub const EXIT_BUILD_FAILED: u8 = 1;

/// Bad invocation, configuration or build definition
pub const EXIT_USAGE: u8 = 2;

/// The build stopped to let the machine restart
pub const EXIT_RESTART: u8 = 3;

fn load_definition(path: &Path) -> Result<ActionList> {
    ActionList::from_path(path)
        .wrap_err_with(|| format!("Failed to load build definition {}", path.display()))
}

fn registry(config: &KilnConfig) -> Result<ActionRegistry> {
    let providers = config.providers()?;
    create_registry_with_actions(&providers).wrap_err("Failed to register built-in actions")
}
