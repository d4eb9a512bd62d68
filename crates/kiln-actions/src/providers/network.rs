//! Network download provider

use crate::error::ActionError;
use async_trait::async_trait;
use std::path::Path;
use std::time::Duration;
use thiserror::Error;
use tokio::io::AsyncWriteExt;
use tracing::{debug, info};

/// Error type for network operations
#[derive(Debug, Error)]
pub enum NetworkError {
    #[error("request to {0} timed out")]
    Timeout(String),

    #[error("could not connect to {0}")]
    Connect(String),

    #[error("{url} answered HTTP {status}")]
    Status { url: String, status: u16 },

    #[error("request failed: {0}")]
    Request(String),

    #[error("I/O error while saving download: {0}")]
    Io(#[from] std::io::Error),
}

impl NetworkError {
    /// Timeouts, refused connections and server-side errors are worth retrying
    pub fn is_transient(&self) -> bool {
        match self {
            NetworkError::Timeout(_) | NetworkError::Connect(_) => true,
            NetworkError::Status { status, .. } => *status >= 500 || *status == 429,
            NetworkError::Request(_) | NetworkError::Io(_) => false,
        }
    }
}

impl From<NetworkError> for ActionError {
    fn from(err: NetworkError) -> Self {
        let message = err.to_string();
        if err.is_transient() {
            ActionError::retryable(message).with_source(err)
        } else {
            ActionError::fatal(message).with_source(err)
        }
    }
}

/// Capability to fetch remote files
#[async_trait]
pub trait NetworkProvider: Send + Sync {
    /// Download `url` to `dest`, returning the number of bytes written
    async fn download(&self, url: &str, dest: &Path) -> Result<u64, NetworkError>;
}

/// HTTP(S) download provider
#[derive(Debug, Clone)]
pub struct HttpNetworkProvider {
    client: reqwest::Client,
}

impl HttpNetworkProvider {
    /// Build a client whose requests give up after `timeout`
    pub fn new(timeout: Duration) -> Result<Self, NetworkError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| NetworkError::Request(e.to_string()))?;
        Ok(Self { client })
    }

    fn classify(url: &str, err: reqwest::Error) -> NetworkError {
        if err.is_timeout() {
            NetworkError::Timeout(url.to_string())
        } else if err.is_connect() {
            NetworkError::Connect(url.to_string())
        } else if let Some(status) = err.status() {
            NetworkError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            }
        } else {
            NetworkError::Request(err.to_string())
        }
    }
}

#[async_trait]
impl NetworkProvider for HttpNetworkProvider {
    async fn download(&self, url: &str, dest: &Path) -> Result<u64, NetworkError> {
        debug!(url = %url, dest = %dest.display(), "Starting download");

        let mut response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| Self::classify(url, e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(NetworkError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        if let Some(parent) = dest.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let mut file = tokio::fs::File::create(dest).await?;
        let mut written = 0u64;
        while let Some(chunk) = response
            .chunk()
            .await
            .map_err(|e| Self::classify(url, e))?
        {
            file.write_all(&chunk).await?;
            written += chunk.len() as u64;
        }
        file.flush().await?;

        info!(url = %url, dest = %dest.display(), bytes = written, "Download complete");
        Ok(written)
    }
}
