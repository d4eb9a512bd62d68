//! Provider seams for machine-facing operations
//!
//! Actions never touch disks, files or the network directly. They call one
//! of these narrow capability traits, captured when the action is
//! constructed, so tests can substitute a fake and the action stays a thin
//! coordinator.
//!
//! - [`DiskProvider`] - settle the install disk size
//! - [`FileProvider`] - create directories and write files
//! - [`NetworkProvider`] - download remote files

mod disk;
mod files;
mod network;

pub use disk::{DiskError, DiskProvider, SizeSpec, SysfsDiskProvider};
pub use files::{FileProvider, LocalFileProvider};
pub use network::{HttpNetworkProvider, NetworkError, NetworkProvider};

use std::sync::Arc;

/// The set of providers handed to built-in action constructors
#[derive(Clone)]
pub struct Providers {
    pub disk: Arc<dyn DiskProvider>,
    pub files: Arc<dyn FileProvider>,
    pub network: Arc<dyn NetworkProvider>,
}

impl Providers {
    pub fn new(
        disk: Arc<dyn DiskProvider>,
        files: Arc<dyn FileProvider>,
        network: Arc<dyn NetworkProvider>,
    ) -> Self {
        Self {
            disk,
            files,
            network,
        }
    }
}

impl std::fmt::Debug for Providers {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Providers").finish_non_exhaustive()
    }
}
