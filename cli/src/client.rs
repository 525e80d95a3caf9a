//! Talks to the registry server: upload a file, then grant access to it.

use std::path::{Path, PathBuf};

use drive_registry::{FileRecord, FileTypeDetector};
use reqwest::multipart::{Form, Part};
use reqwest::{Client, Response, Url};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;
use tracing::{error, info};

pub const MISSING_FIELDS: &str = "Name, email and file are required.";
pub const MISSING_FILE_ID: &str = "File ID missing after upload.";

#[derive(Error, Debug)]
pub enum ClientError {
    #[error("{0}")]
    InvalidRequest(String),
    #[error("{0}")]
    UploadFailed(String),
    #[error("{0}")]
    GrantFailed(String),
    #[error("Failed to read {path}: {source}")]
    Read { path: PathBuf, source: std::io::Error },
    #[error("Invalid server URL: {0}")]
    InvalidUrl(String),
    #[error("Request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("PDF error: {0}")]
    Pdf(String),
}

pub type Result<T> = std::result::Result<T, ClientError>;

/// A local file ready to be sent.
#[derive(Debug, Clone)]
pub struct UploadFile {
    pub file_name: String,
    pub content: Vec<u8>,
    pub mime_type: String,
}

impl UploadFile {
    pub async fn read(path: &Path) -> Result<Self> {
        let content = tokio::fs::read(path).await.map_err(|source| ClientError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let mime_type = FileTypeDetector::resolve(None, &content);
        Ok(Self {
            file_name,
            content,
            mime_type,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadedFile {
    pub file_id: String,
    pub file_name: String,
    pub web_view_link: String,
}

/// Upload response as sent by either generation of the server.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UploadResponseBody {
    id: Option<String>,
    file_id: Option<String>,
    name: Option<String>,
    file_name: Option<String>,
    web_view_link: Option<String>,
}

impl UploadResponseBody {
    /// Resolves field aliases. Precedence: `id` over `fileId`, `name` over
    /// `fileName`. Empty strings count as absent.
    fn normalize(self) -> Result<UploadedFile> {
        fn first(a: Option<String>, b: Option<String>) -> Option<String> {
            a.filter(|v| !v.is_empty()).or(b.filter(|v| !v.is_empty()))
        }

        let file_id = first(self.id, self.file_id)
            .ok_or_else(|| ClientError::UploadFailed(MISSING_FILE_ID.to_string()))?;
        Ok(UploadedFile {
            file_id,
            file_name: first(self.name, self.file_name).unwrap_or_default(),
            web_view_link: self.web_view_link.unwrap_or_default(),
        })
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GrantBody<'a> {
    file_id: &'a str,
    email: &'a str,
}

/// Error text from a failed response: the `error` field of a JSON body, the
/// raw body when it is not JSON, else `fallback`.
async fn failure_message(response: Response, fallback: &str) -> String {
    let text = response.text().await.unwrap_or_default();
    match serde_json::from_str::<Value>(&text) {
        Ok(body) => body
            .get("error")
            .and_then(Value::as_str)
            .filter(|m| !m.is_empty())
            .unwrap_or(fallback)
            .to_string(),
        Err(_) if !text.trim().is_empty() => text,
        Err(_) => fallback.to_string(),
    }
}

pub struct RegistryClient {
    http: Client,
    base_url: Url,
}

impl RegistryClient {
    pub fn new(base_url: &str) -> Result<Self> {
        let base_url = Url::parse(base_url)
            .map_err(|e| ClientError::InvalidUrl(format!("{}: {}", base_url, e)))?;
        Ok(Self {
            http: Client::new(),
            base_url,
        })
    }

    fn url(&self, segments: &[&str]) -> Result<Url> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| ClientError::InvalidUrl(self.base_url.to_string()))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    /// Uploads `file`, then grants `email` access to it. Any failure aborts
    /// the whole operation.
    pub async fn upload_and_grant(
        &self,
        file: &UploadFile,
        name: &str,
        email: &str,
        desired_file_name: Option<&str>,
    ) -> Result<UploadedFile> {
        let result = self.try_upload_and_grant(file, name, email, desired_file_name).await;
        if let Err(e) = &result {
            error!(error = %e, file = %file.file_name, "Upload and grant failed");
        }
        result
    }

    async fn try_upload_and_grant(
        &self,
        file: &UploadFile,
        name: &str,
        email: &str,
        desired_file_name: Option<&str>,
    ) -> Result<UploadedFile> {
        if file.content.is_empty() || name.trim().is_empty() || email.trim().is_empty() {
            return Err(ClientError::InvalidRequest(MISSING_FIELDS.to_string()));
        }

        let part = Part::bytes(file.content.clone())
            .file_name(file.file_name.clone())
            .mime_str(&file.mime_type)?;
        let mut form = Form::new()
            .part("file", part)
            .text("name", name.to_string())
            .text("email", email.to_string());
        if let Some(desired) = desired_file_name.filter(|d| !d.is_empty()) {
            form = form.text("desiredFileName", desired.to_string());
        }

        let response = self.http.post(self.url(&["upload"])?).multipart(form).send().await?;
        if !response.status().is_success() {
            return Err(ClientError::UploadFailed(failure_message(response, "Upload failed").await));
        }
        let body: UploadResponseBody = response
            .json()
            .await
            .map_err(|e| ClientError::UploadFailed(format!("Unreadable upload response: {}", e)))?;
        let uploaded = body.normalize()?;
        info!(file_id = %uploaded.file_id, name = %uploaded.file_name, "Uploaded");

        self.grant(&uploaded.file_id, email).await?;
        Ok(uploaded)
    }

    pub async fn grant(&self, file_id: &str, email: &str) -> Result<String> {
        let response = self
            .http
            .post(self.url(&["grant-access"])?)
            .json(&GrantBody { file_id, email })
            .send()
            .await?;
        if !response.status().is_success() {
            let message = failure_message(response, "Grant access failed").await;
            return Err(ClientError::GrantFailed(message));
        }

        let body: Value = response.json().await.unwrap_or(Value::Null);
        let message = body
            .get("message")
            .and_then(Value::as_str)
            .map(str::to_string)
            .unwrap_or_else(|| format!("Access granted to {}", email));
        info!(%file_id, %email, "Access granted");
        Ok(message)
    }

    pub async fn list(&self, email: Option<&str>) -> Result<Vec<FileRecord>> {
        let url = match email {
            Some(email) => self.url(&["files-for-email", email])?,
            None => self.url(&["files"])?,
        };
        let response = self.http.get(url).send().await?.error_for_status()?;
        Ok(response.json().await?)
    }
}
