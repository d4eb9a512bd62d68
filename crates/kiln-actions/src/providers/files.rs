//! Filesystem operations provider

use async_trait::async_trait;
use std::io;
use std::path::{Component, Path, PathBuf};
use tokio::fs;
use tracing::debug;

/// Capability to create directories and write files on the target
#[async_trait]
pub trait FileProvider: Send + Sync {
    /// Create a directory and any missing parents
    async fn create_dir(&self, path: &Path) -> io::Result<()>;

    /// Write `contents` to `path`, creating parent directories
    async fn write_file(&self, path: &Path, contents: &[u8]) -> io::Result<()>;

    /// Where `path` on the target lives on the local filesystem
    ///
    /// Providers that write somewhere other than the running system map the
    /// path here so collaborators writing directly (downloads) land in the
    /// same place.
    fn target_path(&self, path: &Path) -> io::Result<PathBuf> {
        Ok(path.to_path_buf())
    }
}

/// File provider operating on the local filesystem
///
/// With a root set, every path is resolved beneath it, the way files are
/// written into a mounted target image rather than the running system.
#[derive(Debug, Clone, Default)]
pub struct LocalFileProvider {
    root: Option<PathBuf>,
}

impl LocalFileProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.root = Some(root.into());
        self
    }

    /// Map a target path onto the local filesystem
    pub fn resolve(&self, path: &Path) -> io::Result<PathBuf> {
        let Some(root) = &self.root else {
            return Ok(path.to_path_buf());
        };

        let mut resolved = root.clone();
        for component in path.components() {
            match component {
                Component::Normal(part) => resolved.push(part),
                Component::RootDir | Component::Prefix(_) | Component::CurDir => {}
                Component::ParentDir => {
                    return Err(io::Error::new(
                        io::ErrorKind::InvalidInput,
                        format!("path escapes target root: {}", path.display()),
                    ))
                }
            }
        }
        Ok(resolved)
    }
}

#[async_trait]
impl FileProvider for LocalFileProvider {
    fn target_path(&self, path: &Path) -> io::Result<PathBuf> {
        self.resolve(path)
    }

    async fn create_dir(&self, path: &Path) -> io::Result<()> {
        let target = self.resolve(path)?;
        debug!(path = %target.display(), "Creating directory");
        fs::create_dir_all(&target).await
    }

    async fn write_file(&self, path: &Path, contents: &[u8]) -> io::Result<()> {
        let target = self.resolve(path)?;
        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent).await?;
        }
        debug!(path = %target.display(), bytes = contents.len(), "Writing file");
        fs::write(&target, contents).await
    }
}
