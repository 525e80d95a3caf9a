//! Cloud storage seam and its Google Drive implementation.

use async_trait::async_trait;
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub mod auth;
mod google;

pub use auth::{AccessToken, ServiceAccountAuth, StaticToken, TokenSource};
pub use google::{GoogleDrive, DEFAULT_API_URL, DEFAULT_UPLOAD_URL};

#[derive(Error, Debug)]
pub enum DriveError {
    #[error("Invalid credentials: {0}")]
    Credentials(String),
    #[error("Authentication failed: {0}")]
    Auth(String),
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),
    /// The provider answered with an error status; `message` is its own text.
    #[error("{message}")]
    Api { status: u16, message: String },
    #[error("Unexpected response from provider: {0}")]
    InvalidResponse(String),
}

pub type DriveResult<T> = std::result::Result<T, DriveError>;

/// Metadata submitted alongside the file content.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NewFile {
    pub name: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub parents: Vec<String>,
}

impl NewFile {
    pub fn in_folder(name: impl Into<String>, folder_id: &str) -> Self {
        let parents = if folder_id.is_empty() {
            Vec::new()
        } else {
            vec![folder_id.to_string()]
        };
        Self { name: name.into(), parents }
    }
}

/// What the provider reports about a created file. Every field may be missing.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredFile {
    pub id: Option<String>,
    pub name: Option<String>,
    pub web_view_link: Option<String>,
}

#[async_trait]
pub trait CloudStorage: Send + Sync {
    async fn create_file(
        &self,
        metadata: &NewFile,
        content: Bytes,
        mime_type: &str,
    ) -> DriveResult<StoredFile>;

    /// Gives `email` reader access to `file_id` without sending a notification.
    async fn grant_access(&self, file_id: &str, email: &str) -> DriveResult<()>;
}
