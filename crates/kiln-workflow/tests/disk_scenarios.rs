//! End-to-end build runs over the built-in actions with fake machine
//! providers

use async_trait::async_trait;
use kiln_actions::{
    create_registry_with_actions, BuildContext, DiskError, DiskProvider, HttpNetworkProvider,
    LocalFileProvider, Providers, RetryPolicy, SizeSpec,
};
use kiln_workflow::{
    ActionList, ActionSequencer, FileCheckpointStore, CheckpointStore, RunStatus, SequenceError,
    SequencerConfig,
};
use serde_json::json;
use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Disk provider that answers with a fixed result and records requests
struct FakeDisk {
    result: fn(SizeSpec) -> Result<u64, DiskError>,
    requests: Mutex<Vec<SizeSpec>>,
}

impl FakeDisk {
    fn new(result: fn(SizeSpec) -> Result<u64, DiskError>) -> Arc<Self> {
        Arc::new(Self {
            result,
            requests: Mutex::new(Vec::new()),
        })
    }

    fn requests(&self) -> Vec<SizeSpec> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl DiskProvider for FakeDisk {
    async fn set_disk_space(&self, size: SizeSpec) -> Result<u64, DiskError> {
        self.requests.lock().unwrap().push(size);
        (self.result)(size)
    }
}

fn working_disk(size: SizeSpec) -> Result<u64, DiskError> {
    match size {
        SizeSpec::Gigabytes(gb) => Ok(gb),
        SizeSpec::Detect => Ok(256),
    }
}

fn missing_disk(_size: SizeSpec) -> Result<u64, DiskError> {
    Err(DiskError::NotFound("sda".to_string()))
}

fn sequencer(disk: Arc<FakeDisk>, root: &Path) -> ActionSequencer {
    let providers = Providers::new(
        disk,
        Arc::new(LocalFileProvider::new().with_root(root)),
        Arc::new(HttpNetworkProvider::new(Duration::from_secs(5)).unwrap()),
    );
    let registry = create_registry_with_actions(&providers).unwrap();
    ActionSequencer::new(
        registry,
        SequencerConfig {
            retry: RetryPolicy::new(2).with_backoff(Duration::ZERO),
            preflight: true,
        },
    )
}

#[tokio::test]
async fn set_disk_size_records_fact() {
    let dir = tempfile::tempdir().unwrap();
    let disk = FakeDisk::new(working_disk);
    let seq = sequencer(disk.clone(), dir.path());
    let list = ActionList::from_json_str(r#"[{"type": "disk.SetSize", "args": [100]}]"#).unwrap();
    let mut ctx = BuildContext::new();

    let summary = seq.run(&list, &mut ctx).await.unwrap();

    assert!(summary.is_complete());
    assert_eq!(ctx.completed_actions().collect::<Vec<_>>(), vec!["disk.SetSize"]);
    assert_eq!(ctx.fact("disk_size"), Some(&json!(100)));
    assert_eq!(disk.requests(), vec![SizeSpec::Gigabytes(100)]);
}

#[tokio::test]
async fn set_disk_size_failure_is_reported_against_the_action() {
    let dir = tempfile::tempdir().unwrap();
    let disk = FakeDisk::new(missing_disk);
    let seq = sequencer(disk.clone(), dir.path());
    let list = ActionList::from_yaml_str("- type: disk.SetSize\n  args: [100]\n").unwrap();
    let mut ctx = BuildContext::new();

    let err = seq.run(&list, &mut ctx).await.unwrap_err();

    assert_eq!(err.index(), Some(0));
    assert_eq!(err.action(), Some("disk.SetSize"));
    assert!(matches!(err, SequenceError::Fatal { attempts: 1, .. }));
    assert!(err.to_string().contains("disk not found: sda"));
    assert!(ctx.log().is_empty());
    assert!(ctx.fact("disk_size").is_none());
}

#[tokio::test]
async fn unknown_action_aborts_before_anything_runs() {
    let dir = tempfile::tempdir().unwrap();
    let disk = FakeDisk::new(working_disk);
    let seq = sequencer(disk.clone(), dir.path());
    let list = ActionList::from_yaml_str(
        r#"
actions:
  - disk.SetSize: [100]
  - files.MkDir: ["/data"]
  - disk.Explode: []
"#,
    )
    .unwrap();
    let mut ctx = BuildContext::new();

    let err = seq.run(&list, &mut ctx).await.unwrap_err();

    assert!(matches!(err, SequenceError::Registry { index: 2, .. }));
    assert!(disk.requests().is_empty());
    assert!(!dir.path().join("data").exists());
    assert!(ctx.log().is_empty());
}

#[tokio::test]
async fn mixed_build_with_restart_resumes_from_file_checkpoint() {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path().join("target");
    let checkpoint_path = dir.path().join("kiln-state.json");
    let disk = FakeDisk::new(working_disk);
    let store = Arc::new(FileCheckpointStore::new(&checkpoint_path));
    let seq = sequencer(disk.clone(), &root).with_checkpoints(store.clone());

    let list = ActionList::from_yaml_str(
        r#"
- disk.SetSize: []
- config.Set: ["image.channel", "beta"]
- files.MkDir: ["/etc/kiln"]
- system.Reboot: [0, "apply partition table"]
- files.Write: ["/etc/kiln/channel", "beta"]
"#,
    )
    .unwrap();
    let mut ctx = BuildContext::new().with_config_value("image", json!({"channel": "stable"}));

    let summary = seq.run(&list, &mut ctx).await.unwrap();
    assert_eq!(
        summary.status,
        RunStatus::RestartRequired {
            index: 3,
            action: "system.Reboot".to_string(),
            reason: "apply partition table".to_string(),
            timeout: Duration::ZERO,
            retry_on_restart: false,
        }
    );
    assert!(root.join("etc/kiln").is_dir());
    assert!(!root.join("etc/kiln/channel").exists());

    // A new process picks the build up from the checkpoint file
    let mut resumed = store.load().await.unwrap().unwrap();
    assert_eq!(resumed.fact("disk_size"), Some(&json!(256)));
    assert_eq!(resumed.config_path("image.channel"), Some(&json!("beta")));

    let summary = seq.run(&list, &mut resumed).await.unwrap();
    assert!(summary.is_complete());
    assert_eq!(summary.skipped, 4);
    assert_eq!(summary.executed, 1);
    assert_eq!(
        std::fs::read_to_string(root.join("etc/kiln/channel")).unwrap(),
        "beta"
    );
    assert_eq!(disk.requests(), vec![SizeSpec::Detect]);
    assert!(!checkpoint_path.exists());
}
