use async_trait::async_trait;
use tokio::sync::{Mutex, RwLock};

use super::RecordStore;
use crate::{FileRecord, Result};

/// In-process record store.
#[derive(Default)]
pub struct MemoryStore {
    records: RwLock<Vec<FileRecord>>,
    write_lock: Mutex<()>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_records(records: Vec<FileRecord>) -> Self {
        Self {
            records: RwLock::new(records),
            write_lock: Mutex::new(()),
        }
    }
}

#[async_trait]
impl RecordStore for MemoryStore {
    async fn load_all(&self) -> Result<Vec<FileRecord>> {
        Ok(self.records.read().await.clone())
    }

    async fn save_all(&self, records: &[FileRecord]) -> Result<()> {
        *self.records.write().await = records.to_vec();
        Ok(())
    }

    fn write_lock(&self) -> &Mutex<()> {
        &self.write_lock
    }
}
