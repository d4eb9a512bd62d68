//! `kiln.yaml` configuration
//!
//! Every field has a default, so an empty or absent file is a valid
//! configuration. Command-line flags are applied on top by the subcommands.

use color_eyre::eyre::{Result, WrapErr};
use kiln_actions::{
    HttpNetworkProvider, LocalFileProvider, Providers, RetryPolicy, SysfsDiskProvider,
};
use kiln_workflow::SequencerConfig;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

const DEFAULT_CHECKPOINT: &str = "/var/lib/kiln/checkpoint.json";
const DEFAULT_SYS_BLOCK: &str = "/sys/block";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct KilnConfig {
    pub sequencer: SequencerSection,
    pub checkpoint: CheckpointSection,
    pub http: HttpSection,
    pub disk: DiskSection,
    pub files: FilesSection,

    /// Initial configuration values handed to the build context
    pub config: BTreeMap<String, serde_json::Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SequencerSection {
    pub max_retries: u32,
    pub backoff_ms: u64,
    pub exponential_backoff: bool,
    pub preflight: bool,
}

impl Default for SequencerSection {
    fn default() -> Self {
        let retry = RetryPolicy::default();
        Self {
            max_retries: retry.max_retries,
            backoff_ms: retry.backoff.as_millis() as u64,
            exponential_backoff: retry.exponential,
            preflight: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CheckpointSection {
    pub path: PathBuf,
}

impl Default for CheckpointSection {
    fn default() -> Self {
        Self {
            path: PathBuf::from(DEFAULT_CHECKPOINT),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct HttpSection {
    pub timeout_secs: u64,
}

impl Default for HttpSection {
    fn default() -> Self {
        Self { timeout_secs: 300 }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DiskSection {
    /// Install disk; detected when unset
    pub device: Option<String>,
    pub sys_block: PathBuf,
}

impl Default for DiskSection {
    fn default() -> Self {
        Self {
            device: None,
            sys_block: PathBuf::from(DEFAULT_SYS_BLOCK),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FilesSection {
    /// Write files beneath this directory instead of the running system
    pub root: Option<PathBuf>,
}

impl KilnConfig {
    /// Load the configuration file, or the defaults when no path is given
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let Some(path) = path else {
            return Ok(Self::default());
        };
        let contents = std::fs::read_to_string(path)
            .wrap_err_with(|| format!("Failed to read config file {}", path.display()))?;
        Self::from_yaml_str(&contents)
            .wrap_err_with(|| format!("Invalid config file {}", path.display()))
    }

    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        // An empty document deserializes as null rather than an empty map
        if yaml.trim().is_empty() {
            return Ok(Self::default());
        }
        Ok(serde_yaml::from_str(yaml)?)
    }

    pub fn sequencer_config(&self) -> SequencerConfig {
        let mut retry = RetryPolicy::new(self.sequencer.max_retries)
            .with_backoff(Duration::from_millis(self.sequencer.backoff_ms));
        if self.sequencer.exponential_backoff {
            retry = retry.exponential();
        }
        SequencerConfig {
            retry,
            preflight: self.sequencer.preflight,
        }
    }

    /// Build the machine-facing providers the built-in actions use
    pub fn providers(&self) -> Result<Providers> {
        let mut disk = SysfsDiskProvider::new(&self.disk.sys_block);
        if let Some(device) = &self.disk.device {
            disk = disk.with_device(device);
        }

        let mut files = LocalFileProvider::new();
        if let Some(root) = &self.files.root {
            files = files.with_root(root);
        }

        let network = HttpNetworkProvider::new(Duration::from_secs(self.http.timeout_secs))
            .wrap_err("Failed to create HTTP client")?;

        Ok(Providers::new(
            Arc::new(disk),
            Arc::new(files),
            Arc::new(network),
        ))
    }
}
