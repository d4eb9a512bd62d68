//! Built-in action implementations
//!
//! # Available Actions
//!
//! - `disk.SetSize` - settle the install disk size
//! - `files.MkDir` - create a directory
//! - `files.Write` - write a text file
//! - `files.Get` - download files
//! - `system.Sleep` - pause the build
//! - `system.Reboot` - stop and request a restart
//! - `config.Set` - override a configuration value

mod config;
mod disk;
mod files;
mod system;

pub use config::SetConfig;
pub use disk::SetDiskSize;
pub use files::{GetFiles, MakeDir, WriteFile, CACHE_DIR_KEY};
pub use system::{Reboot, Sleep};

use crate::error::RegistryError;
use crate::providers::Providers;
use crate::registry::ActionRegistry;
use crate::traits::Action;

/// Register all built-in actions, wiring in the given providers
pub fn register_builtin(
    registry: &mut ActionRegistry,
    providers: &Providers,
) -> Result<(), RegistryError> {
    let disk = providers.disk.clone();
    registry.register(SetDiskSize::NAME, move |args, _ctx| {
        Box::new(SetDiskSize::new(args, disk.clone())) as Box<dyn Action>
    })?;

    let files = providers.files.clone();
    registry.register(MakeDir::NAME, move |args, _ctx| {
        Box::new(MakeDir::new(args, files.clone())) as Box<dyn Action>
    })?;

    let files = providers.files.clone();
    registry.register(WriteFile::NAME, move |args, _ctx| {
        Box::new(WriteFile::new(args, files.clone())) as Box<dyn Action>
    })?;

    let network = providers.network.clone();
    let files = providers.files.clone();
    registry.register(GetFiles::NAME, move |args, ctx| {
        Box::new(GetFiles::new(args, network.clone(), files.clone(), ctx)) as Box<dyn Action>
    })?;

    registry.register(Sleep::NAME, |args, _ctx| Box::new(Sleep::new(args)) as Box<dyn Action>)?;
    registry.register(Reboot::NAME, |args, _ctx| Box::new(Reboot::new(args)) as Box<dyn Action>)?;
    registry.register(SetConfig::NAME, |args, _ctx| {
        Box::new(SetConfig::new(args)) as Box<dyn Action>
    })?;

    Ok(())
}

/// Create a registry with all built-in actions pre-registered
pub fn create_registry_with_actions(providers: &Providers) -> Result<ActionRegistry, RegistryError> {
    let mut registry = ActionRegistry::new();
    register_builtin(&mut registry, providers)?;
    Ok(registry)
}
