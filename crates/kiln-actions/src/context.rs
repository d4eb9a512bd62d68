//! Build context and completion records
//!
//! A [`BuildContext`] describes the machine being built. One instance lives for
//! the whole run and is lent to every action in turn: shared for `validate()`,
//! exclusive for `run()`. Facts only grow, configuration may be overridden
//! explicitly, and the completion log is append-only.

use crate::args::ActionArgs;
use crate::error::ContextError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::time::Duration;
use uuid::Uuid;

/// Shared, mutable state for one build run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BuildContext {
    /// Identifier of this build, stable across checkpoint and resume
    build_id: Uuid,

    /// Facts discovered while building (disk size, hostname, ...)
    #[serde(default)]
    facts: BTreeMap<String, Value>,

    /// Configuration injected before the run, overridable by actions
    #[serde(default)]
    config: BTreeMap<String, Value>,

    /// Completed actions in execution order
    #[serde(default)]
    log: Vec<CompletionRecord>,
}

impl Default for BuildContext {
    fn default() -> Self {
        Self::new()
    }
}

impl BuildContext {
    /// Create an empty context with a fresh build id
    pub fn new() -> Self {
        Self {
            build_id: Uuid::new_v4(),
            facts: BTreeMap::new(),
            config: BTreeMap::new(),
            log: Vec::new(),
        }
    }

    /// Replace the configuration wholesale (before the run starts)
    pub fn with_config(mut self, config: BTreeMap<String, Value>) -> Self {
        self.config = config;
        self
    }

    /// Add a single configuration value
    pub fn with_config_value(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.config.insert(key.into(), value.into());
        self
    }

    pub fn build_id(&self) -> Uuid {
        self.build_id
    }

    /// Get a fact by key
    pub fn fact(&self, key: &str) -> Option<&Value> {
        self.facts.get(key)
    }

    pub fn facts(&self) -> &BTreeMap<String, Value> {
        &self.facts
    }

    /// Record a discovered fact
    ///
    /// Re-adding the same value is a no-op. A different value for an existing
    /// key is refused with [`ContextError::FactConflict`].
    pub fn add_fact(
        &mut self,
        key: impl Into<String>,
        value: impl Into<Value>,
    ) -> Result<(), ContextError> {
        let key = key.into();
        let value = value.into();
        match self.facts.get(&key) {
            Some(existing) if *existing == value => Ok(()),
            Some(existing) => Err(ContextError::FactConflict {
                key,
                existing: existing.clone(),
                attempted: value,
            }),
            None => {
                self.facts.insert(key, value);
                Ok(())
            }
        }
    }

    /// Get a top-level configuration value
    pub fn config(&self, key: &str) -> Option<&Value> {
        self.config.get(key)
    }

    pub fn config_values(&self) -> &BTreeMap<String, Value> {
        &self.config
    }

    /// Explicitly override a configuration value, returning the previous one
    pub fn set_config(&mut self, key: impl Into<String>, value: impl Into<Value>) -> Option<Value> {
        self.config.insert(key.into(), value.into())
    }

    /// Resolve a dotted path such as `image.channel` through nested sections
    pub fn config_path(&self, path: &str) -> Option<&Value> {
        let mut parts = path.split('.');
        let mut current = self.config.get(parts.next()?)?;
        for part in parts {
            current = current.as_object()?.get(part)?;
        }
        Some(current)
    }

    /// Read a nested configuration section
    pub fn config_section(&self, name: &str) -> Option<&Map<String, Value>> {
        self.config.get(name).and_then(Value::as_object)
    }

    /// Mutable access to a nested configuration section, creating it if absent
    pub fn config_section_mut(&mut self, name: &str) -> Result<&mut Map<String, Value>, ContextError> {
        self.config
            .entry(name.to_string())
            .or_insert_with(|| Value::Object(Map::new()))
            .as_object_mut()
            .ok_or_else(|| ContextError::NotASection(name.to_string()))
    }

    /// Completed actions, oldest first
    pub fn log(&self) -> &[CompletionRecord] {
        &self.log
    }

    /// Append a completion record
    pub fn record_completion(&mut self, record: CompletionRecord) {
        self.log.push(record);
    }

    /// Names of completed actions in order
    pub fn completed_actions(&self) -> impl Iterator<Item = &str> {
        self.log.iter().map(|r| r.action.as_str())
    }
}

/// One successfully completed action
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompletionRecord {
    /// Position of the action in the build definition
    pub index: usize,

    /// Action type identifier
    pub action: String,

    /// Arguments the action ran with
    #[serde(default)]
    pub args: ActionArgs,

    /// Number of `run()` calls it took, including the successful one
    pub attempts: u32,

    /// Wall-clock completion time
    pub completed_at: DateTime<Utc>,

    /// Time spent across all attempts
    pub duration_ms: u64,
}

impl CompletionRecord {
    pub fn new(index: usize, action: impl Into<String>, attempts: u32, duration: Duration) -> Self {
        Self {
            index,
            action: action.into(),
            args: ActionArgs::default(),
            attempts,
            completed_at: Utc::now(),
            duration_ms: u64::try_from(duration.as_millis()).unwrap_or(u64::MAX),
        }
    }

    pub fn with_args(mut self, args: ActionArgs) -> Self {
        self.args = args;
        self
    }
}
