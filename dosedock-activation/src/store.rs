//! Persisted settings record.
//!
//! The activation flag is one sentinel value in a single-record settings
//! file. The store enforces single-writer discipline over the record so
//! read-then-clear sequences cannot lose updates under concurrent quick
//! validations.

use crate::error::{ActivationError, ActivationResult};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tokio::sync::Mutex;
use tracing::debug;

/// The sentinel stored when this install is activated. Anything else in
/// the field, including values from older releases, counts as not set.
pub const ACTIVATION_SENTINEL: &str = "dosedock-activated-v2";

/// Abstract settings record.
#[async_trait]
pub trait SettingsStore: Send + Sync {
    /// Reads the raw activation field.
    async fn activation_flag(&self) -> ActivationResult<Option<String>>;

    /// Writes the activation field.
    async fn set_activation_flag(&self, value: &str) -> ActivationResult<()>;

    /// Clears the activation field.
    async fn clear_activation_flag(&self) -> ActivationResult<()>;

    /// Returns true when the field holds the current sentinel.
    async fn is_activated(&self) -> ActivationResult<bool> {
        Ok(self.activation_flag().await?.as_deref() == Some(ACTIVATION_SENTINEL))
    }
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct SettingsRecord {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    activation: Option<String>,
}

/// JSON-file-backed settings record in the platform data directory.
pub struct FileSettingsStore {
    path: PathBuf,
    lock: Mutex<()>,
}

impl FileSettingsStore {
    /// Store backed by an explicit file path.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    /// Store at the default platform location, honoring a configured
    /// data-directory override.
    pub fn at_default_location(data_dir_override: Option<&Path>) -> ActivationResult<Self> {
        let dir = match data_dir_override {
            Some(dir) => dir.to_path_buf(),
            None => dirs::data_dir()
                .ok_or_else(|| ActivationError::Store("no platform data directory".to_string()))?
                .join("DoseDock"),
        };
        Ok(Self::new(dir.join("settings.json")))
    }

    /// The file this store reads and writes.
    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn read_record(&self) -> ActivationResult<SettingsRecord> {
        match tokio::fs::read_to_string(&self.path).await {
            Ok(raw) => serde_json::from_str(&raw)
                .map_err(|e| ActivationError::Store(format!("corrupt settings record: {e}"))),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(SettingsRecord::default()),
            Err(e) => Err(ActivationError::Store(e.to_string())),
        }
    }

    async fn write_record(&self, record: &SettingsRecord) -> ActivationResult<()> {
        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| ActivationError::Store(e.to_string()))?;
        }
        let raw = serde_json::to_string_pretty(record)?;
        tokio::fs::write(&self.path, raw)
            .await
            .map_err(|e| ActivationError::Store(e.to_string()))
    }
}

#[async_trait]
impl SettingsStore for FileSettingsStore {
    async fn activation_flag(&self) -> ActivationResult<Option<String>> {
        let _guard = self.lock.lock().await;
        Ok(self.read_record().await?.activation)
    }

    async fn set_activation_flag(&self, value: &str) -> ActivationResult<()> {
        let _guard = self.lock.lock().await;
        let mut record = self.read_record().await?;
        record.activation = Some(value.to_string());
        self.write_record(&record).await?;
        debug!(path = %self.path.display(), "activation flag persisted");
        Ok(())
    }

    async fn clear_activation_flag(&self) -> ActivationResult<()> {
        let _guard = self.lock.lock().await;
        let mut record = self.read_record().await?;
        if record.activation.take().is_some() {
            self.write_record(&record).await?;
            debug!(path = %self.path.display(), "activation flag cleared");
        }
        Ok(())
    }
}

/// In-memory settings record for tests and previews.
#[derive(Default)]
pub struct MemorySettingsStore {
    flag: Mutex<Option<String>>,
}

impl MemorySettingsStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// A store with the activation sentinel already present.
    pub fn activated() -> Self {
        Self {
            flag: Mutex::new(Some(ACTIVATION_SENTINEL.to_string())),
        }
    }
}

#[async_trait]
impl SettingsStore for MemorySettingsStore {
    async fn activation_flag(&self) -> ActivationResult<Option<String>> {
        Ok(self.flag.lock().await.clone())
    }

    async fn set_activation_flag(&self, value: &str) -> ActivationResult<()> {
        *self.flag.lock().await = Some(value.to_string());
        Ok(())
    }

    async fn clear_activation_flag(&self) -> ActivationResult<()> {
        *self.flag.lock().await = None;
        Ok(())
    }
}
