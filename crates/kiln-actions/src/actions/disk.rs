//! Disk size action
//!
//! Settles the size of the install disk and records it as the `disk_size`
//! fact for later actions (partition layout, image selection).

use crate::args::ActionArgs;
use crate::context::BuildContext;
use crate::error::{ActionError, Result};
use crate::providers::{DiskProvider, SizeSpec};
use crate::traits::{Action, Outcome};
use async_trait::async_trait;
use std::sync::Arc;
use tracing::info;

/// Write the disk size
///
/// Arguments:
/// - `[]` - use the full detected capacity
/// - `[size_gb]` - use exactly `size_gb` gigabytes
pub struct SetDiskSize {
    args: ActionArgs,
    disk: Arc<dyn DiskProvider>,
}

impl SetDiskSize {
    pub const NAME: &'static str = "disk.SetSize";

    /// Fact key the settled size is recorded under, in gigabytes
    pub const FACT: &'static str = "disk_size";

    pub fn new(args: ActionArgs, disk: Arc<dyn DiskProvider>) -> Self {
        Self { args, disk }
    }

    fn size_spec(&self) -> Result<SizeSpec> {
        match self.args.optional_u64(0)? {
            None => Ok(SizeSpec::Detect),
            Some(0) => Err(ActionError::validation(
                "disk size must be greater than zero",
            )),
            Some(gb) => Ok(SizeSpec::Gigabytes(gb)),
        }
    }
}

#[async_trait]
impl Action for SetDiskSize {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn description(&self) -> &str {
        "Settle the install disk size and record it as a build fact"
    }

    fn validate(&self, _ctx: &BuildContext) -> Result<()> {
        self.args.expect_arity(0, 1)?;
        self.size_spec().map(|_| ())
    }

    async fn run(&self, ctx: &mut BuildContext) -> Result<Outcome> {
        let spec = self.size_spec()?;
        let size = self.disk.set_disk_space(spec).await?;
        ctx.add_fact(Self::FACT, size)?;

        info!(size_gb = size, "Disk size written");
        Ok(Outcome::Continue)
    }
}
