use bytes::Bytes;
use serde::Serialize;
use tracing::info;

use super::{present, AppContext};
use crate::diagnostics::Diagnostic;
use crate::drive::NewFile;
use crate::storage::StagedFile;
use crate::{fallback_view_link, FileRecord, FileTypeDetector, RegistryError, Result};

pub const MISSING_FILE_ID: &str = "File ID missing after upload.";

#[derive(Debug, Default)]
pub struct UploadRequest {
    pub uploader_name: Option<String>,
    /// Required, but only used by the follow-up grant; it is not recorded here.
    pub uploader_email: Option<String>,
    pub file: Option<StagedFile>,
    pub desired_name: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadOutcome {
    pub file_id: String,
    pub file_name: String,
    pub web_view_link: String,
}

/// Name the file is stored under: the desired name verbatim if given, else the
/// uploader name with whitespace runs collapsed to `_` plus `extension`.
pub fn derive_stored_name(
    uploader_name: &str,
    extension: &str,
    desired_name: Option<&str>,
) -> String {
    if let Some(desired) = desired_name.filter(|d| !d.is_empty()) {
        return desired.to_string();
    }

    let mut name = String::with_capacity(uploader_name.len() + extension.len());
    let mut in_whitespace = false;
    for c in uploader_name.chars() {
        if c.is_whitespace() {
            if !in_whitespace {
                name.push('_');
            }
            in_whitespace = true;
        } else {
            name.push(c);
            in_whitespace = false;
        }
    }
    name.push_str(extension);
    name
}

impl AppContext {
    /// Forwards a staged upload to the provider and records it.
    ///
    /// The staged file is removed on every path out of this function.
    pub async fn upload(&self, request: UploadRequest) -> Result<UploadOutcome> {
        let uploader_name = present(request.uploader_name);
        let uploader_email = present(request.uploader_email);
        let desired_name = present(request.desired_name);

        let mut missing = Vec::new();
        if uploader_name.is_none() {
            missing.push("name");
        }
        if uploader_email.is_none() {
            missing.push("email");
        }
        let content = match &request.file {
            Some(staged) => staged.read().await?,
            None => Vec::new(),
        };
        if content.is_empty() {
            missing.push("file");
        }

        let (Some(uploader_name), Some(staged)) = (uploader_name, request.file) else {
            return Err(RegistryError::missing_fields(&missing));
        };
        if !missing.is_empty() {
            return Err(RegistryError::missing_fields(&missing));
        }

        let stored_name =
            derive_stored_name(&uploader_name, staged.extension(), desired_name.as_deref());
        let mime_type = FileTypeDetector::resolve(staged.content_type(), &content);
        let metadata = NewFile::in_folder(stored_name.clone(), &self.config.folder_id);

        let result = self.cloud.create_file(&metadata, Bytes::from(content), &mime_type).await;
        self.release(staged);

        let stored = result.map_err(|e| {
            self.diagnostics.report(Diagnostic::ProviderRejected {
                operation: "upload",
                reason: e.to_string(),
            });
            RegistryError::UploadFailed(e.to_string())
        })?;

        let file_id = match stored.id.filter(|id| !id.is_empty()) {
            Some(id) => id,
            None => return Err(RegistryError::UploadFailed(MISSING_FILE_ID.to_string())),
        };
        let file_name = stored.name.unwrap_or(stored_name);
        let record = FileRecord::new(
            file_id.clone(),
            file_name.clone(),
            stored.web_view_link.clone(),
        );

        if let Err(e) = self.store.append(record).await {
            self.diagnostics.report(Diagnostic::RegistryAppendFailed {
                file_id: file_id.clone(),
                name: file_name.clone(),
                reason: e.to_string(),
            });
        }

        info!(%file_id, name = %file_name, mime_type = %mime_type, "Upload complete");

        let web_view_link = stored.web_view_link.unwrap_or_else(|| fallback_view_link(&file_id));
        Ok(UploadOutcome {
            file_id,
            file_name,
            web_view_link,
        })
    }

    fn release(&self, staged: StagedFile) {
        let path = staged.path().to_path_buf();
        if let Err(e) = staged.discard() {
            self.diagnostics.report(Diagnostic::StagingCleanupFailed {
                path,
                reason: e.to_string(),
            });
        }
    }
}
