//! File actions
//!
//! - `files.MkDir [path]` - create a directory
//! - `files.Write [path, contents]` - write a text file
//! - `files.Get [[url, dest], ...]` - download files; relative destinations
//!   land under the `cache_dir` configuration value, and every destination
//!   is mapped onto the target the same way file writes are

use crate::args::ActionArgs;
use crate::context::BuildContext;
use crate::error::{ActionError, Result};
use crate::providers::{FileProvider, NetworkProvider};
use crate::traits::{Action, Outcome};
use async_trait::async_trait;
use serde_json::Value;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::info;

/// Configuration key holding the default download directory
pub const CACHE_DIR_KEY: &str = "cache_dir";

/// Create a directory (and parents)
pub struct MakeDir {
    args: ActionArgs,
    files: Arc<dyn FileProvider>,
}

impl MakeDir {
    pub const NAME: &'static str = "files.MkDir";

    pub fn new(args: ActionArgs, files: Arc<dyn FileProvider>) -> Self {
        Self { args, files }
    }
}

#[async_trait]
impl Action for MakeDir {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn description(&self) -> &str {
        "Create a directory on the target"
    }

    fn validate(&self, _ctx: &BuildContext) -> Result<()> {
        self.args.expect_arity(1, 1)?;
        non_empty_path(self.args.string(0)?).map(|_| ())
    }

    async fn run(&self, _ctx: &mut BuildContext) -> Result<Outcome> {
        let path = non_empty_path(self.args.string(0)?)?;
        self.files.create_dir(path).await?;
        info!(path = %path.display(), "Directory created");
        Ok(Outcome::Continue)
    }
}

/// Write text content to a file
pub struct WriteFile {
    args: ActionArgs,
    files: Arc<dyn FileProvider>,
}

impl WriteFile {
    pub const NAME: &'static str = "files.Write";

    pub fn new(args: ActionArgs, files: Arc<dyn FileProvider>) -> Self {
        Self { args, files }
    }
}

#[async_trait]
impl Action for WriteFile {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn description(&self) -> &str {
        "Write content to a file on the target"
    }

    fn validate(&self, _ctx: &BuildContext) -> Result<()> {
        self.args.expect_arity(2, 2)?;
        non_empty_path(self.args.string(0)?)?;
        self.args.string(1)?;
        Ok(())
    }

    async fn run(&self, _ctx: &mut BuildContext) -> Result<Outcome> {
        let path = non_empty_path(self.args.string(0)?)?;
        let contents = self.args.string(1)?;
        self.files.write_file(path, contents.as_bytes()).await?;
        info!(path = %path.display(), bytes = contents.len(), "File written");
        Ok(Outcome::Continue)
    }
}

/// Download one or more files
pub struct GetFiles {
    args: ActionArgs,
    network: Arc<dyn NetworkProvider>,
    files: Arc<dyn FileProvider>,
    cache_dir: Option<PathBuf>,
}

impl GetFiles {
    pub const NAME: &'static str = "files.Get";

    /// `cache_dir` is read from the context at construction time
    pub fn new(
        args: ActionArgs,
        network: Arc<dyn NetworkProvider>,
        files: Arc<dyn FileProvider>,
        ctx: &BuildContext,
    ) -> Self {
        let cache_dir = ctx
            .config(CACHE_DIR_KEY)
            .and_then(Value::as_str)
            .map(PathBuf::from);
        Self {
            args,
            network,
            files,
            cache_dir,
        }
    }

    fn transfers(&self) -> Result<Vec<(&str, PathBuf)>> {
        if self.args.is_empty() {
            return Err(ActionError::validation("expected at least one [url, dest] pair"));
        }

        self.args
            .iter()
            .enumerate()
            .map(|(i, entry)| {
                let pair = entry.as_array().filter(|p| p.len() == 2).ok_or_else(|| {
                    ActionError::validation(format!("argument {}: expected [url, dest] pair", i))
                })?;
                let (url, dest) = match (pair[0].as_str(), pair[1].as_str()) {
                    (Some(url), Some(dest)) => (url, dest),
                    _ => {
                        return Err(ActionError::validation(format!(
                            "argument {}: url and dest must be strings",
                            i
                        )))
                    }
                };
                if !(url.starts_with("http://") || url.starts_with("https://")) {
                    return Err(ActionError::validation(format!(
                        "argument {}: unsupported url scheme in {}",
                        i, url
                    )));
                }
                Ok((url, self.destination(non_empty_path(dest)?)?))
            })
            .collect()
    }

    fn destination(&self, dest: &Path) -> Result<PathBuf> {
        if dest.is_absolute() {
            return Ok(dest.to_path_buf());
        }
        match &self.cache_dir {
            Some(dir) => Ok(dir.join(dest)),
            None => Err(ActionError::validation(format!(
                "relative destination {} needs a '{}' configuration value",
                dest.display(),
                CACHE_DIR_KEY
            ))),
        }
    }
}

#[async_trait]
impl Action for GetFiles {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn description(&self) -> &str {
        "Download files to the target"
    }

    fn validate(&self, _ctx: &BuildContext) -> Result<()> {
        self.transfers().map(|_| ())
    }

    async fn run(&self, _ctx: &mut BuildContext) -> Result<Outcome> {
        for (url, dest) in self.transfers()? {
            let dest = self.files.target_path(&dest)?;
            let bytes = self.network.download(url, &dest).await?;
            info!(url = %url, dest = %dest.display(), bytes, "Fetched file");
        }
        Ok(Outcome::Continue)
    }
}

fn non_empty_path(raw: &str) -> Result<&Path> {
    if raw.trim().is_empty() {
        return Err(ActionError::validation("path must not be empty"));
    }
    Ok(Path::new(raw))
}
