use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use reqwest::{Client, Response, Url};
use serde::Serialize;
use tracing::{debug, info};
use uuid::Uuid;

use super::{CloudStorage, DriveError, DriveResult, NewFile, StoredFile, TokenSource};

pub const DEFAULT_API_URL: &str = "https://www.googleapis.com";
pub const DEFAULT_UPLOAD_URL: &str = "https://www.googleapis.com";

const CREATE_FIELDS: &str = "id,name,webViewLink";

/// Drive v3 client covering the two calls the registry needs.
pub struct GoogleDrive {
    http: Client,
    auth: Arc<dyn TokenSource>,
    api_url: Url,
    upload_url: Url,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct PermissionRequest<'a> {
    role: &'a str,
    #[serde(rename = "type")]
    permission_type: &'a str,
    email_address: &'a str,
}

impl GoogleDrive {
    pub fn new(auth: Arc<dyn TokenSource>) -> DriveResult<Self> {
        Self::with_endpoints(auth, DEFAULT_API_URL, DEFAULT_UPLOAD_URL)
    }

    pub fn with_endpoints(
        auth: Arc<dyn TokenSource>,
        api_url: &str,
        upload_url: &str,
    ) -> DriveResult<Self> {
        Ok(Self {
            http: Client::new(),
            auth,
            api_url: parse_base(api_url)?,
            upload_url: parse_base(upload_url)?,
        })
    }

    fn endpoint(base: &Url, segments: &[&str]) -> DriveResult<Url> {
        let mut url = base.clone();
        url.path_segments_mut()
            .map_err(|_| DriveError::InvalidResponse(format!("{} cannot be a base URL", base)))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    async fn authorization(&self) -> DriveResult<String> {
        Ok(self.auth.access_token().await?.authorization_header())
    }
}

#[async_trait]
impl CloudStorage for GoogleDrive {
    async fn create_file(
        &self,
        metadata: &NewFile,
        content: Bytes,
        mime_type: &str,
    ) -> DriveResult<StoredFile> {
        let url = Self::endpoint(&self.upload_url, &["upload", "drive", "v3", "files"])?;
        let metadata_json = serde_json::to_vec(metadata)
            .map_err(|e| DriveError::InvalidResponse(format!("failed to encode metadata: {}", e)))?;
        let boundary = format!("drive_registry_{}", Uuid::new_v4().simple());
        let body = multipart_related(&boundary, &metadata_json, &content, mime_type);

        debug!(name = %metadata.name, size = content.len(), mime_type, "Uploading file to Drive");

        let response = self
            .http
            .post(url)
            .query(&[("uploadType", "multipart"), ("fields", CREATE_FIELDS)])
            .header(reqwest::header::AUTHORIZATION, self.authorization().await?)
            .header(
                reqwest::header::CONTENT_TYPE,
                format!("multipart/related; boundary={}", boundary),
            )
            .body(body)
            .send()
            .await?;

        let stored: StoredFile = check(response)
            .await?
            .json()
            .await
            .map_err(|e| DriveError::InvalidResponse(e.to_string()))?;

        info!(id = ?stored.id, name = ?stored.name, "Drive file created");
        Ok(stored)
    }

    async fn grant_access(&self, file_id: &str, email: &str) -> DriveResult<()> {
        let url = Self::endpoint(&self.api_url, &["drive", "v3", "files", file_id, "permissions"])?;

        let response = self
            .http
            .post(url)
            .query(&[("sendNotificationEmail", "false"), ("fields", "id")])
            .header(reqwest::header::AUTHORIZATION, self.authorization().await?)
            .json(&PermissionRequest {
                role: "reader",
                permission_type: "user",
                email_address: email,
            })
            .send()
            .await?;

        check(response).await?;
        info!(file_id, email, "Drive permission created");
        Ok(())
    }
}

fn parse_base(url: &str) -> DriveResult<Url> {
    Url::parse(url)
        .map_err(|e| DriveError::InvalidResponse(format!("invalid endpoint {}: {}", url, e)))
}

/// Passes successful responses through and turns the rest into `DriveError::Api`.
async fn check(response: Response) -> DriveResult<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(DriveError::Api {
        status: status.as_u16(),
        message: error_message(&body)
            .unwrap_or_else(|| format!("Drive request failed with status {}", status)),
    })
}

/// Pulls the human readable message out of a Google error body.
fn error_message(body: &str) -> Option<String> {
    let value: serde_json::Value = serde_json::from_str(body).ok()?;
    let error = value.get("error")?;
    error
        .get("message")
        .and_then(|m| m.as_str())
        .or_else(|| value.get("error_description").and_then(|m| m.as_str()))
        .or_else(|| error.as_str())
        .map(str::to_string)
}

/// Builds a `multipart/related` body: JSON metadata part, then the content part.
fn multipart_related(boundary: &str, metadata: &[u8], content: &[u8], mime_type: &str) -> Vec<u8> {
    let mut body = Vec::with_capacity(metadata.len() + content.len() + 256);
    body.extend_from_slice(format!("--{}\r\n", boundary).as_bytes());
    body.extend_from_slice(b"Content-Type: application/json; charset=UTF-8\r\n\r\n");
    body.extend_from_slice(metadata);
    body.extend_from_slice(format!("\r\n--{}\r\n", boundary).as_bytes());
    body.extend_from_slice(format!("Content-Type: {}\r\n\r\n", mime_type).as_bytes());
    body.extend_from_slice(content);
    body.extend_from_slice(format!("\r\n--{}--", boundary).as_bytes());
    body
}
