use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::drive::{DEFAULT_API_URL, DEFAULT_UPLOAD_URL};

pub const DRIVE_SCOPE: &str = "https://www.googleapis.com/auth/drive";

/// Settings for the registry and its Drive connection.
///
/// Every field has a default, so a partial configuration source is enough.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Drive folder new files are created in. Empty means the account's root.
    pub folder_id: String,
    pub credentials_path: PathBuf,
    pub drive_scope: String,
    pub store_path: PathBuf,
    /// Where uploads are staged before being forwarded.
    pub staging_dir: PathBuf,
    pub drive_api_url: String,
    pub drive_upload_url: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            folder_id: String::new(),
            credentials_path: PathBuf::from("./service-account.json"),
            drive_scope: DRIVE_SCOPE.to_string(),
            store_path: PathBuf::from("./files.json"),
            staging_dir: PathBuf::from("./uploads"),
            drive_api_url: DEFAULT_API_URL.to_string(),
            drive_upload_url: DEFAULT_UPLOAD_URL.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_source_keeps_defaults() {
        let config: AppConfig =
            serde_json::from_str(r#"{"folder_id": "abc", "store_path": "/tmp/r.json"}"#).unwrap();
        assert_eq!(config.folder_id, "abc");
        assert_eq!(config.store_path, PathBuf::from("/tmp/r.json"));
        assert_eq!(config.staging_dir, PathBuf::from("./uploads"));
        assert_eq!(config.drive_scope, DRIVE_SCOPE);
    }
}
