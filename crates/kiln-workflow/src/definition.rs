//! Declarative build definitions
//!
//! A build definition is an ordered list of action records. Two record
//! spellings are accepted and mean the same thing:
//!
//! ```yaml
//! actions:
//!   - type: disk.SetSize
//!     args: [100]
//!   - files.MkDir: ["/var/lib/kiln"]   # compact form
//! ```
//!
//! The top level may also be a bare list of records. Order is execution
//! order; the same action type may appear any number of times.

use crate::error::DefinitionError;
use kiln_actions::ActionArgs;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

/// One action record: a type identifier plus positional arguments
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawSpec")]
pub struct ActionSpec {
    #[serde(rename = "type")]
    pub action_type: String,

    #[serde(default)]
    pub args: ActionArgs,
}

impl ActionSpec {
    pub fn new(action_type: impl Into<String>, args: impl Into<ActionArgs>) -> Self {
        Self {
            action_type: action_type.into(),
            args: args.into(),
        }
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawSpec {
    Explicit(ExplicitSpec),
    Compact(BTreeMap<String, ActionArgs>),
}

/// `{type, args}`; any other key (a misspelled `args`) is an error rather
/// than silently dropped arguments
#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct ExplicitSpec {
    #[serde(rename = "type")]
    action_type: String,
    #[serde(default)]
    args: ActionArgs,
}

impl TryFrom<RawSpec> for ActionSpec {
    type Error = String;

    fn try_from(raw: RawSpec) -> Result<Self, Self::Error> {
        match raw {
            RawSpec::Explicit(ExplicitSpec { action_type, args }) => Ok(Self { action_type, args }),
            RawSpec::Compact(map) => {
                if map.len() != 1 {
                    return Err(format!(
                        "compact action record must have exactly one key, found {}",
                        map.len()
                    ));
                }
                let (action_type, args) = map
                    .into_iter()
                    .next()
                    .ok_or_else(|| "empty action record".to_string())?;
                Ok(Self { action_type, args })
            }
        }
    }
}

/// Ordered list of action records
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(from = "RawList")]
pub struct ActionList {
    actions: Vec<ActionSpec>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawList {
    Wrapped { actions: Vec<ActionSpec> },
    Bare(Vec<ActionSpec>),
}

impl From<RawList> for ActionList {
    fn from(raw: RawList) -> Self {
        match raw {
            RawList::Wrapped { actions } | RawList::Bare(actions) => Self { actions },
        }
    }
}

impl ActionList {
    pub fn new(actions: Vec<ActionSpec>) -> Self {
        Self { actions }
    }

    /// Append an action record
    pub fn with_action(mut self, action_type: impl Into<String>, args: impl Into<ActionArgs>) -> Self {
        self.actions.push(ActionSpec::new(action_type, args));
        self
    }

    pub fn from_yaml_str(yaml: &str) -> Result<Self, DefinitionError> {
        Ok(serde_yaml::from_str(yaml)?)
    }

    pub fn from_json_str(json: &str) -> Result<Self, DefinitionError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Load a definition file; `.json` files are parsed as JSON, anything
    /// else as YAML
    pub fn from_path(path: &Path) -> Result<Self, DefinitionError> {
        let contents = std::fs::read_to_string(path).map_err(|source| DefinitionError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        match path.extension().and_then(|e| e.to_str()) {
            Some("json") => Self::from_json_str(&contents),
            _ => Self::from_yaml_str(&contents),
        }
    }

    pub fn len(&self) -> usize {
        self.actions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&ActionSpec> {
        self.actions.get(index)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, ActionSpec> {
        self.actions.iter()
    }

    pub fn specs(&self) -> &[ActionSpec] {
        &self.actions
    }
}

impl<'a> IntoIterator for &'a ActionList {
    type Item = &'a ActionSpec;
    type IntoIter = std::slice::Iter<'a, ActionSpec>;

    fn into_iter(self) -> Self::IntoIter {
        self.actions.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::io::Write;

    #[test]
    fn test_explicit_records() {
        let list = ActionList::from_yaml_str(
            r#"
actions:
  - type: disk.SetSize
    args: [100]
  - type: system.Reboot
"#,
        )
        .unwrap();

        assert_eq!(list.len(), 2);
        assert_eq!(list.get(0).unwrap(), &ActionSpec::new("disk.SetSize", vec![json!(100)]));
        assert!(list.get(1).unwrap().args.is_empty());
    }

    #[test]
    fn test_compact_and_explicit_are_equivalent() {
        let compact = ActionList::from_yaml_str(
            r#"
- files.Get: [["https://mirror.example/boot.wim", "/tmp/boot.wim"]]
- system.Sleep: 30
"#,
        )
        .unwrap();
        let explicit = ActionList::from_yaml_str(
            r#"
- type: files.Get
  args: [["https://mirror.example/boot.wim", "/tmp/boot.wim"]]
- type: system.Sleep
  args: [30]
"#,
        )
        .unwrap();

        assert_eq!(compact, explicit);
    }

    #[test]
    fn test_duplicates_preserved_in_order() {
        let list = ActionList::from_json_str(
            r#"[{"type": "system.Sleep", "args": [1]}, {"type": "system.Sleep", "args": [1]}]"#,
        )
        .unwrap();
        assert_eq!(list.len(), 2);
        assert_eq!(list.get(0), list.get(1));
    }

    #[test]
    fn test_compact_record_with_two_keys_rejected() {
        let result = ActionList::from_yaml_str(
            r#"
- disk.SetSize: [100]
  system.Sleep: [5]
"#,
        );
        assert!(matches!(result, Err(DefinitionError::Yaml(_))));
    }

    #[test]
    fn test_misspelled_args_key_rejected() {
        let result = ActionList::from_yaml_str("- type: disk.SetSize\n  arg: [100]\n");
        assert!(matches!(result, Err(DefinitionError::Yaml(_))));

        let result = ActionList::from_json_str(r#"[{"type": "disk.SetSize", "argz": [100]}]"#);
        assert!(matches!(result, Err(DefinitionError::Json(_))));
    }

    #[test]
    fn test_builder() {
        let list = ActionList::default()
            .with_action("disk.SetSize", vec![json!(100)])
            .with_action("system.Reboot", Vec::new());
        let types: Vec<_> = list.iter().map(|s| s.action_type.as_str()).collect();
        assert_eq!(types, vec!["disk.SetSize", "system.Reboot"]);
    }

    #[test]
    fn test_from_path_by_extension() {
        let dir = tempfile::tempdir().unwrap();

        let json_path = dir.path().join("build.json");
        std::fs::File::create(&json_path)
            .unwrap()
            .write_all(br#"{"actions": [{"type": "disk.SetSize", "args": [100]}]}"#)
            .unwrap();
        assert_eq!(ActionList::from_path(&json_path).unwrap().len(), 1);

        let yaml_path = dir.path().join("build.yaml");
        std::fs::write(&yaml_path, "- disk.SetSize: [100]\n").unwrap();
        assert_eq!(ActionList::from_path(&yaml_path).unwrap().len(), 1);

        let missing = dir.path().join("missing.yaml");
        assert!(matches!(
            ActionList::from_path(&missing),
            Err(DefinitionError::Read { .. })
        ));
    }
}
