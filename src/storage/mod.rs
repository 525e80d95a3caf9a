use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::{FileRecord, Result};

pub mod json;
pub mod memory;
pub mod staging;

pub use json::JsonFileStore;
pub use memory::MemoryStore;
pub use staging::StagedFile;

/// Durable list of file records, always read and rewritten as a whole snapshot.
///
/// `append` and `update_by_id` hold the store's write lock across their
/// read-modify-write cycle, so concurrent mutations are applied one after the
/// other. `save_all` does not take the lock; calling it while a mutation is in
/// flight can still overwrite that mutation.
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Reads the snapshot. A missing snapshot is an empty list.
    async fn load_all(&self) -> Result<Vec<FileRecord>>;

    /// Replaces the snapshot with `records`.
    async fn save_all(&self, records: &[FileRecord]) -> Result<()>;

    /// Lock serializing read-modify-write cycles.
    fn write_lock(&self) -> &Mutex<()>;

    async fn append(&self, record: FileRecord) -> Result<()> {
        let _guard = self.write_lock().lock().await;
        let mut records = self.load_all().await?;
        records.push(record);
        self.save_all(&records).await
    }

    /// Applies `updater` to every record whose id equals `id` and saves the
    /// snapshot, even when nothing matched. Returns the number of records updated.
    async fn update_by_id(
        &self,
        id: &str,
        updater: &(dyn for<'r> Fn(&'r mut FileRecord) + Send + Sync),
    ) -> Result<usize> {
        let _guard = self.write_lock().lock().await;
        let mut records = self.load_all().await?;
        let mut updated = 0;
        for record in records.iter_mut().filter(|r| r.id == id) {
            updater(record);
            updated += 1;
        }
        self.save_all(&records).await?;
        Ok(updated)
    }
}
