//! Disk operations provider
//!
//! The sysfs implementation sizes disks from `/sys/block/<dev>/size`, which
//! the kernel reports in 512-byte sectors.

use crate::error::ActionError;
use async_trait::async_trait;
use std::path::PathBuf;
use thiserror::Error;
use tracing::{debug, info};

const SECTOR_SIZE: u64 = 512;
const BYTES_PER_GB: u64 = 1024 * 1024 * 1024;

/// Device name prefixes treated as physical disks
const DISK_PREFIXES: &[&str] = &["sd", "nvme", "vd", "xvd", "hd"];

/// Requested disk size
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SizeSpec {
    /// Use the full capacity of the disk
    Detect,
    /// Use exactly this many gigabytes
    Gigabytes(u64),
}

/// Error type for disk operations
#[derive(Debug, Error)]
pub enum DiskError {
    #[error("disk not found: {0}")]
    NotFound(String),

    /// Device is temporarily held by another process
    #[error("disk busy: {0}")]
    Busy(String),

    #[error("invalid size: {0}")]
    InvalidSize(String),

    #[error("disk I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl DiskError {
    pub fn is_transient(&self) -> bool {
        matches!(self, DiskError::Busy(_))
    }
}

impl From<DiskError> for ActionError {
    fn from(err: DiskError) -> Self {
        let message = err.to_string();
        if err.is_transient() {
            ActionError::retryable(message).with_source(err)
        } else {
            ActionError::fatal(message).with_source(err)
        }
    }
}

/// Capability to size the install disk
#[async_trait]
pub trait DiskProvider: Send + Sync {
    /// Settle the disk size for this build, returning it in gigabytes
    async fn set_disk_space(&self, size: SizeSpec) -> Result<u64, DiskError>;
}

/// Disk provider backed by sysfs
#[derive(Debug, Clone)]
pub struct SysfsDiskProvider {
    sys_block: PathBuf,
    device: Option<String>,
}

impl Default for SysfsDiskProvider {
    fn default() -> Self {
        Self::new("/sys/block")
    }
}

impl SysfsDiskProvider {
    pub fn new(sys_block: impl Into<PathBuf>) -> Self {
        Self {
            sys_block: sys_block.into(),
            device: None,
        }
    }

    /// Pin the device (e.g. `nvme0n1`) instead of picking the first disk
    pub fn with_device(mut self, device: impl Into<String>) -> Self {
        self.device = Some(device.into());
        self
    }

    async fn pick_device(&self) -> Result<String, DiskError> {
        if let Some(device) = &self.device {
            return Ok(device.trim_start_matches("/dev/").to_string());
        }

        let mut entries = tokio::fs::read_dir(&self.sys_block).await?;
        let mut candidates = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            let name = entry.file_name().to_string_lossy().to_string();
            if DISK_PREFIXES.iter().any(|p| name.starts_with(p)) {
                candidates.push(name);
            }
        }
        candidates.sort();
        candidates
            .into_iter()
            .next()
            .ok_or_else(|| DiskError::NotFound(self.sys_block.display().to_string()))
    }

    async fn capacity_gb(&self, device: &str) -> Result<u64, DiskError> {
        let size_path = self.sys_block.join(device).join("size");
        let raw = match tokio::fs::read_to_string(&size_path).await {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(DiskError::NotFound(device.to_string()))
            }
            Err(e) => return Err(e.into()),
        };
        let sectors: u64 = raw.trim().parse().map_err(|_| {
            DiskError::InvalidSize(format!("unreadable sector count in {}", size_path.display()))
        })?;
        Ok(sectors.saturating_mul(SECTOR_SIZE) / BYTES_PER_GB)
    }
}

#[async_trait]
impl DiskProvider for SysfsDiskProvider {
    async fn set_disk_space(&self, size: SizeSpec) -> Result<u64, DiskError> {
        let device = self.pick_device().await?;
        let capacity = self.capacity_gb(&device).await?;
        debug!(device = %device, capacity_gb = capacity, "Probed disk capacity");

        let size = match size {
            SizeSpec::Detect => capacity,
            SizeSpec::Gigabytes(requested) if requested > capacity => {
                return Err(DiskError::InvalidSize(format!(
                    "{} GB requested but {} holds only {} GB",
                    requested, device, capacity
                )))
            }
            SizeSpec::Gigabytes(requested) => requested,
        };

        info!(device = %device, size_gb = size, "Disk size settled");
        Ok(size)
    }
}
