use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::fs;
use tokio::sync::Mutex;
use tracing::debug;
use uuid::Uuid;

use super::RecordStore;
use crate::{FileRecord, RegistryError, Result};

/// Record store backed by one pretty-printed JSON array on disk.
pub struct JsonFileStore {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl JsonFileStore {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_owned(),
            write_lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn scratch_path(&self) -> PathBuf {
        let file_name = self
            .path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "records".to_string());
        self.path
            .with_file_name(format!(".{}.{}.tmp", file_name, Uuid::new_v4()))
    }

    async fn replace(&self, contents: &[u8]) -> std::io::Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).await?;
            }
        }

        let scratch = self.scratch_path();
        if let Err(e) = fs::write(&scratch, contents).await {
            let _ = fs::remove_file(&scratch).await;
            return Err(e);
        }
        if let Err(e) = fs::rename(&scratch, &self.path).await {
            let _ = fs::remove_file(&scratch).await;
            return Err(e);
        }
        Ok(())
    }
}

#[async_trait]
impl RecordStore for JsonFileStore {
    async fn load_all(&self) -> Result<Vec<FileRecord>> {
        let contents = match fs::read_to_string(&self.path).await {
            Ok(contents) => contents,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        serde_json::from_str(&contents).map_err(|e| {
            RegistryError::CorruptStore(format!("{}: {}", self.path.display(), e))
        })
    }

    async fn save_all(&self, records: &[FileRecord]) -> Result<()> {
        let json = serde_json::to_string_pretty(records)
            .map_err(|e| RegistryError::StoreWriteFailed(e.to_string()))?;

        self.replace(json.as_bytes()).await.map_err(|e| {
            RegistryError::StoreWriteFailed(format!("{}: {}", self.path.display(), e))
        })?;

        debug!(path = %self.path.display(), records = records.len(), "Saved record store");
        Ok(())
    }

    fn write_lock(&self) -> &Mutex<()> {
        &self.write_lock
    }
}
