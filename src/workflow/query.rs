use super::AppContext;
use crate::{FileRecord, Result};

impl AppContext {
    pub async fn list_all(&self) -> Result<Vec<FileRecord>> {
        self.store.load_all().await
    }

    /// Records whose access list contains exactly `email`.
    pub async fn list_for_email(&self, email: &str) -> Result<Vec<FileRecord>> {
        let mut records = self.store.load_all().await?;
        records.retain(|record| record.has_access(email));
        Ok(records)
    }
}
