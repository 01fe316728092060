use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::StorageError;

/// Key under which the counter is stored
pub const USAGE_KEY: &str = "pdf_upload_count";

/// Persisted usage counter capability
pub trait UsageStore: Send + Sync {
    /// Current count; an absent counter reads as zero.
    fn read(&self) -> Result<u64, StorageError>;

    fn write(&self, value: u64) -> Result<(), StorageError>;
}

/// On-disk layout of the usage file
#[derive(Debug, Serialize, Deserialize)]
struct UsageRecord {
    #[serde(rename = "pdf_upload_count")]
    count: u64,
    #[serde(default)]
    updated_at: Option<DateTime<Utc>>,
}

/// Counter kept in a small JSON file
pub struct FileUsageStore {
    path: PathBuf,
}

impl FileUsageStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl UsageStore for FileUsageStore {
    fn read(&self) -> Result<u64, StorageError> {
        let raw = match fs::read(&self.path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(0),
            Err(e) => return Err(e.into()),
        };

        let record: UsageRecord = serde_json::from_slice(&raw)?;
        Ok(record.count)
    }

    fn write(&self, value: u64) -> Result<(), StorageError> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }

        let record = UsageRecord {
            count: value,
            updated_at: Some(Utc::now()),
        };
        fs::write(&self.path, serde_json::to_vec_pretty(&record)?)?;

        debug!("Stored {}={} in {}", USAGE_KEY, value, self.path.display());
        Ok(())
    }
}

/// Process-local counter, for tests and throwaway sessions
#[derive(Debug, Default)]
pub struct MemoryUsageStore {
    count: AtomicU64,
}

impl MemoryUsageStore {
    pub fn new(initial: u64) -> Self {
        Self {
            count: AtomicU64::new(initial),
        }
    }
}

impl UsageStore for MemoryUsageStore {
    fn read(&self) -> Result<u64, StorageError> {
        Ok(self.count.load(Ordering::SeqCst))
    }

    fn write(&self, value: u64) -> Result<(), StorageError> {
        self.count.store(value, Ordering::SeqCst);
        Ok(())
    }
}

impl<T: UsageStore + ?Sized> UsageStore for std::sync::Arc<T> {
    fn read(&self) -> Result<u64, StorageError> {
        (**self).read()
    }

    fn write(&self, value: u64) -> Result<(), StorageError> {
        (**self).write(value)
    }
}
