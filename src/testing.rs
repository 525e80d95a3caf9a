//! Test doubles for the provider and the record store.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use bytes::Bytes;
use tokio::sync::Mutex as AsyncMutex;

use crate::drive::{CloudStorage, DriveError, DriveResult, NewFile, StoredFile};
use crate::storage::{MemoryStore, RecordStore};
use crate::{FileRecord, RegistryError, Result};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreatedFile {
    pub metadata: NewFile,
    pub content: Vec<u8>,
    pub mime_type: String,
}

/// Scripted provider that records every call it receives.
#[derive(Default)]
pub struct FakeCloud {
    response: StoredFile,
    upload_error: Option<String>,
    grant_error: Option<String>,
    created: Mutex<Vec<CreatedFile>>,
    grants: Mutex<Vec<(String, String)>>,
}

impl FakeCloud {
    /// Provider that answers uploads with the given id and link.
    pub fn returning(id: &str, web_view_link: Option<&str>) -> Self {
        Self {
            response: StoredFile {
                id: Some(id.to_string()),
                name: None,
                web_view_link: web_view_link.map(str::to_string),
            },
            ..Self::default()
        }
    }

    pub fn with_response(mut self, response: StoredFile) -> Self {
        self.response = response;
        self
    }

    pub fn failing_uploads(mut self, message: &str) -> Self {
        self.upload_error = Some(message.to_string());
        self
    }

    pub fn failing_grants(mut self, message: &str) -> Self {
        self.grant_error = Some(message.to_string());
        self
    }

    pub fn created(&self) -> Vec<CreatedFile> {
        self.created.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    pub fn grants(&self) -> Vec<(String, String)> {
        self.grants.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }
}

#[async_trait]
impl CloudStorage for FakeCloud {
    async fn create_file(
        &self,
        metadata: &NewFile,
        content: Bytes,
        mime_type: &str,
    ) -> DriveResult<StoredFile> {
        self.created.lock().unwrap_or_else(|e| e.into_inner()).push(CreatedFile {
            metadata: metadata.clone(),
            content: content.to_vec(),
            mime_type: mime_type.to_string(),
        });
        if let Some(message) = &self.upload_error {
            return Err(DriveError::Api { status: 403, message: message.clone() });
        }
        let mut response = self.response.clone();
        if response.name.is_none() {
            response.name = Some(metadata.name.clone());
        }
        Ok(response)
    }

    async fn grant_access(&self, file_id: &str, email: &str) -> DriveResult<()> {
        self.grants
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push((file_id.to_string(), email.to_string()));
        match &self.grant_error {
            Some(message) => Err(DriveError::Api { status: 404, message: message.clone() }),
            None => Ok(()),
        }
    }
}

/// Memory store whose writes can be switched to fail.
#[derive(Default)]
pub struct FlakyStore {
    inner: MemoryStore,
    fail_writes: AtomicBool,
}

impl FlakyStore {
    pub fn with_records(records: Vec<FileRecord>) -> Self {
        Self {
            inner: MemoryStore::with_records(records),
            fail_writes: AtomicBool::new(false),
        }
    }

    pub fn fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }
}

#[async_trait]
impl RecordStore for FlakyStore {
    async fn load_all(&self) -> Result<Vec<FileRecord>> {
        self.inner.load_all().await
    }

    async fn save_all(&self, records: &[FileRecord]) -> Result<()> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(RegistryError::StoreWriteFailed("disk full".to_string()));
        }
        self.inner.save_all(records).await
    }

    fn write_lock(&self) -> &AsyncMutex<()> {
        self.inner.write_lock()
    }
}
