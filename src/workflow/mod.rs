//! Upload, access-grant and query workflows over an explicit [`AppContext`].

use std::sync::Arc;

use crate::config::AppConfig;
use crate::diagnostics::{DiagnosticsSink, TracingSink};
use crate::drive::{CloudStorage, GoogleDrive, ServiceAccountAuth};
use crate::storage::{JsonFileStore, RecordStore};
use crate::Result;

mod grant;
mod query;
mod upload;

pub use grant::{GrantOutcome, GrantRequest};
pub use upload::{derive_stored_name, UploadOutcome, UploadRequest};

/// Everything a workflow needs, built once and shared by reference.
#[derive(Clone)]
pub struct AppContext {
    pub config: AppConfig,
    pub cloud: Arc<dyn CloudStorage>,
    pub store: Arc<dyn RecordStore>,
    pub diagnostics: Arc<dyn DiagnosticsSink>,
}

impl AppContext {
    pub fn new(
        config: AppConfig,
        cloud: Arc<dyn CloudStorage>,
        store: Arc<dyn RecordStore>,
    ) -> Self {
        Self {
            config,
            cloud,
            store,
            diagnostics: Arc::new(TracingSink),
        }
    }

    pub fn with_diagnostics(mut self, diagnostics: Arc<dyn DiagnosticsSink>) -> Self {
        self.diagnostics = diagnostics;
        self
    }

    /// Production wiring: service-account Drive client and JSON file store.
    pub async fn from_config(config: AppConfig) -> Result<Self> {
        let scopes = vec![config.drive_scope.clone()];
        let auth = ServiceAccountAuth::from_file(&config.credentials_path, scopes).await?;
        let drive = GoogleDrive::with_endpoints(
            Arc::new(auth),
            &config.drive_api_url,
            &config.drive_upload_url,
        )?;
        let store = JsonFileStore::new(&config.store_path);
        Ok(Self::new(config, Arc::new(drive), Arc::new(store)))
    }
}

/// Trimmed-empty strings count as absent.
fn present(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}
