//! Configuration override action
//!
//! `config.Set [key, value]` overrides a configuration value for the rest of
//! the build. A dotted key (`image.channel`) writes into a nested section.

use crate::args::ActionArgs;
use crate::context::BuildContext;
use crate::error::{ActionError, Result};
use crate::traits::{Action, Outcome};
use async_trait::async_trait;
use tracing::info;

pub struct SetConfig {
    args: ActionArgs,
}

impl SetConfig {
    pub const NAME: &'static str = "config.Set";

    pub fn new(args: ActionArgs) -> Self {
        Self { args }
    }

    fn key(&self) -> Result<&str> {
        let key = self.args.string(0)?;
        if key.is_empty() || key.split('.').any(str::is_empty) {
            return Err(ActionError::validation(format!(
                "invalid configuration key '{}'",
                key
            )));
        }
        Ok(key)
    }
}

#[async_trait]
impl Action for SetConfig {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn description(&self) -> &str {
        "Override a configuration value for the remaining actions"
    }

    fn validate(&self, _ctx: &BuildContext) -> Result<()> {
        self.args.expect_arity(2, 2)?;
        self.key().map(|_| ())
    }

    async fn run(&self, ctx: &mut BuildContext) -> Result<Outcome> {
        let key = self.key()?;
        let value = self.args.get(1).cloned().unwrap_or_default();

        match key.rsplit_once('.') {
            None => {
                ctx.set_config(key, value);
            }
            Some((section_path, field)) => {
                let mut parts = section_path.split('.');
                let first = parts.next().unwrap_or(section_path);
                let mut section = ctx.config_section_mut(first)?;
                for part in parts {
                    section = section
                        .entry(part.to_string())
                        .or_insert_with(|| serde_json::Value::Object(Default::default()))
                        .as_object_mut()
                        .ok_or_else(|| {
                            ActionError::fatal(format!("configuration key '{}' is not a section", part))
                        })?;
                }
                section.insert(field.to_string(), value);
            }
        }

        info!(key = %key, "Configuration overridden");
        Ok(Outcome::Continue)
    }
}
