//! Checkpoint persistence
//!
//! The sequencer saves the build context after every completed action so a
//! build interrupted by a restart can resume where it stopped. The context's
//! completion log doubles as the resume cursor.

use crate::error::CheckpointError;
use async_trait::async_trait;
use kiln_actions::BuildContext;
use std::path::{Path, PathBuf};
use tokio::sync::RwLock;
use tracing::debug;

/// Result type for checkpoint operations
pub type Result<T> = std::result::Result<T, CheckpointError>;

/// Trait for build checkpoint persistence
#[async_trait]
pub trait CheckpointStore: Send + Sync {
    /// Load the saved context, if any
    async fn load(&self) -> Result<Option<BuildContext>>;

    /// Replace the saved context
    async fn save(&self, ctx: &BuildContext) -> Result<()>;

    /// Forget the saved context
    async fn clear(&self) -> Result<()>;
}

/// In-memory checkpoint store for testing
#[derive(Debug, Default)]
pub struct MemoryCheckpointStore {
    saved: RwLock<Option<BuildContext>>,
    saves: std::sync::atomic::AtomicUsize,
}

impl MemoryCheckpointStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of times `save` has been called
    pub fn save_count(&self) -> usize {
        self.saves.load(std::sync::atomic::Ordering::SeqCst)
    }
}

#[async_trait]
impl CheckpointStore for MemoryCheckpointStore {
    async fn load(&self) -> Result<Option<BuildContext>> {
        Ok(self.saved.read().await.clone())
    }

    async fn save(&self, ctx: &BuildContext) -> Result<()> {
        *self.saved.write().await = Some(ctx.clone());
        self.saves.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
        Ok(())
    }

    async fn clear(&self) -> Result<()> {
        *self.saved.write().await = None;
        Ok(())
    }
}

/// Checkpoint store backed by a JSON file
///
/// Writes go to a sibling temporary file which is then renamed over the
/// checkpoint, so a crash mid-write leaves the previous checkpoint intact.
#[derive(Debug, Clone)]
pub struct FileCheckpointStore {
    path: PathBuf,
}

impl FileCheckpointStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_else(|| "checkpoint".into());
        name.push(".tmp");
        self.path.with_file_name(name)
    }
}

#[async_trait]
impl CheckpointStore for FileCheckpointStore {
    async fn load(&self) -> Result<Option<BuildContext>> {
        match tokio::fs::read(&self.path).await {
            Ok(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    async fn save(&self, ctx: &BuildContext) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await?;
            }
        }

        let bytes = serde_json::to_vec_pretty(ctx)?;
        let temp = self.temp_path();
        tokio::fs::write(&temp, bytes).await?;
        tokio::fs::rename(&temp, &self.path).await?;

        debug!(path = %self.path.display(), completed = ctx.log().len(), "Checkpoint saved");
        Ok(())
    }

    async fn clear(&self) -> Result<()> {
        match tokio::fs::remove_file(&self.path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}
