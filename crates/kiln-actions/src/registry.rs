//! Action registry
//!
//! This module provides the ActionRegistry which maps declarative action
//! type names to constructors, so build definitions can name actions as
//! plain strings.

use crate::args::ActionArgs;
use crate::context::BuildContext;
use crate::error::RegistryError;
use crate::traits::Action;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

/// Builds an action instance from its arguments
///
/// Constructors receive the build context read-only and must not have side
/// effects. Providers an action needs are captured by the closure.
pub type ActionConstructor = Arc<dyn Fn(ActionArgs, &BuildContext) -> Box<dyn Action> + Send + Sync>;

/// Registry of action constructors by type name
///
/// # Example
///
/// ```ignore
/// use kiln_actions::{ActionRegistry, NoopAction};
///
/// let mut registry = ActionRegistry::new();
/// registry.register("noop", |_args, _ctx| Box::new(NoopAction::new("noop")))?;
///
/// let action = registry.resolve("noop", ActionArgs::default(), &ctx)?;
/// ```
#[derive(Default)]
pub struct ActionRegistry {
    constructors: HashMap<String, ActionConstructor>,
}

impl ActionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a constructor under `name`
    ///
    /// Registering the same name twice is a configuration bug and fails with
    /// [`RegistryError::Duplicate`]; the first registration is kept.
    pub fn register<F>(&mut self, name: impl Into<String>, constructor: F) -> Result<(), RegistryError>
    where
        F: Fn(ActionArgs, &BuildContext) -> Box<dyn Action> + Send + Sync + 'static,
    {
        let name = name.into();
        if self.constructors.contains_key(&name) {
            return Err(RegistryError::Duplicate(name));
        }
        debug!(action = %name, "Registered action type");
        self.constructors.insert(name, Arc::new(constructor));
        Ok(())
    }

    /// Build an action instance for `name`
    pub fn resolve(
        &self,
        name: &str,
        args: ActionArgs,
        ctx: &BuildContext,
    ) -> Result<Box<dyn Action>, RegistryError> {
        let constructor = self
            .constructors
            .get(name)
            .ok_or_else(|| RegistryError::UnknownAction(name.to_string()))?;
        Ok(constructor(args, ctx))
    }

    /// Check if an action type is registered
    pub fn contains(&self, name: &str) -> bool {
        self.constructors.contains_key(name)
    }

    /// Registered action type names, sorted
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.constructors.keys().map(|s| s.as_str()).collect();
        names.sort_unstable();
        names
    }

    pub fn len(&self) -> usize {
        self.constructors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.constructors.is_empty()
    }
}

impl std::fmt::Debug for ActionRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ActionRegistry")
            .field("actions", &self.names())
            .finish()
    }
}
