//! System control actions

use crate::args::ActionArgs;
use crate::context::BuildContext;
use crate::error::Result;
use crate::traits::{Action, Outcome};
use async_trait::async_trait;
use std::time::Duration;
use tracing::info;

/// Default grace period before a requested restart
const DEFAULT_RESTART_TIMEOUT: Duration = Duration::from_secs(10);

/// Pause the build: `system.Sleep [seconds, reason?]`
pub struct Sleep {
    args: ActionArgs,
}

impl Sleep {
    pub const NAME: &'static str = "system.Sleep";

    pub fn new(args: ActionArgs) -> Self {
        Self { args }
    }
}

#[async_trait]
impl Action for Sleep {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn description(&self) -> &str {
        "Pause the build for a number of seconds"
    }

    fn validate(&self, _ctx: &BuildContext) -> Result<()> {
        self.args.expect_arity(1, 2)?;
        self.args.u64(0)?;
        self.args.optional_string(1)?;
        Ok(())
    }

    async fn run(&self, _ctx: &mut BuildContext) -> Result<Outcome> {
        let seconds = self.args.u64(0)?;
        let reason = self.args.optional_string(1)?.unwrap_or("no reason given");
        info!(seconds, reason, "Sleeping");
        tokio::time::sleep(Duration::from_secs(seconds)).await;
        Ok(Outcome::Continue)
    }
}

/// Ask for a machine restart:
/// `system.Reboot [timeout_secs?, reason?, retry_on_restart?]`
///
/// The action itself does not restart anything; it ends the run with
/// [`Outcome::Restart`] and leaves the restart to whoever launched the build.
pub struct Reboot {
    args: ActionArgs,
}

impl Reboot {
    pub const NAME: &'static str = "system.Reboot";

    pub fn new(args: ActionArgs) -> Self {
        Self { args }
    }
}

#[async_trait]
impl Action for Reboot {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn description(&self) -> &str {
        "Stop the build and request a machine restart"
    }

    fn validate(&self, _ctx: &BuildContext) -> Result<()> {
        self.args.expect_arity(0, 3)?;
        self.args.optional_u64(0)?;
        self.args.optional_string(1)?;
        self.args.optional_bool(2)?;
        Ok(())
    }

    async fn run(&self, _ctx: &mut BuildContext) -> Result<Outcome> {
        let timeout = self
            .args
            .optional_u64(0)?
            .map(Duration::from_secs)
            .unwrap_or(DEFAULT_RESTART_TIMEOUT);
        let reason = self
            .args
            .optional_string(1)?
            .unwrap_or("restart requested by build")
            .to_string();
        let retry_on_restart = self.args.optional_bool(2)?.unwrap_or(false);

        info!(reason = %reason, timeout_secs = timeout.as_secs(), "Restart requested");
        Ok(Outcome::Restart {
            reason,
            timeout,
            retry_on_restart,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, Value};

    fn args(values: Value) -> ActionArgs {
        serde_json::from_value(values).unwrap()
    }

    #[tokio::test]
    async fn test_sleep() {
        let action = Sleep::new(args(json!([0, "settle"])));
        let mut ctx = BuildContext::new();

        assert!(action.validate(&ctx).is_ok());
        assert_eq!(action.run(&mut ctx).await.unwrap(), Outcome::Continue);
    }

    #[test]
    fn test_sleep_validation() {
        let ctx = BuildContext::new();
        assert!(Sleep::new(args(json!([]))).validate(&ctx).is_err());
        assert!(Sleep::new(args(json!(["ten"]))).validate(&ctx).is_err());
        assert!(Sleep::new(args(json!([1, 2]))).validate(&ctx).is_err());
    }

    #[tokio::test]
    async fn test_reboot_defaults() {
        let action = Reboot::new(ActionArgs::default());
        let outcome = action.run(&mut BuildContext::new()).await.unwrap();

        assert_eq!(
            outcome,
            Outcome::Restart {
                reason: "restart requested by build".to_string(),
                timeout: DEFAULT_RESTART_TIMEOUT,
                retry_on_restart: false,
            }
        );
    }

    #[tokio::test]
    async fn test_reboot_with_arguments() {
        let action = Reboot::new(args(json!([30, "apply drivers", true])));
        assert!(action.validate(&BuildContext::new()).is_ok());

        let outcome = action.run(&mut BuildContext::new()).await.unwrap();
        assert_eq!(
            outcome,
            Outcome::Restart {
                reason: "apply drivers".to_string(),
                timeout: Duration::from_secs(30),
                retry_on_restart: true,
            }
        );
    }

    #[test]
    fn test_reboot_validation() {
        let ctx = BuildContext::new();
        assert!(Reboot::new(args(json!(["soon"]))).validate(&ctx).is_err());
        assert!(Reboot::new(args(json!([10, "x", "yes"]))).validate(&ctx).is_err());
    }
}
