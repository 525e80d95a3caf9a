use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

/// Viewer URL used when the provider does not return a `webViewLink`.
pub fn fallback_view_link(id: &str) -> String {
    format!("https://drive.google.com/file/d/{}/view", id)
}

/// One registry entry per successfully uploaded file.
///
/// Keys written by other tools are carried in `extra` so that rewriting the
/// snapshot keeps them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "StoredRecord", into = "StoredRecord")]
pub struct FileRecord {
    pub id: String,
    pub name: String,
    pub web_view_link: Option<String>,
    pub access_emails: Vec<String>,
    pub extra: Map<String, Value>,
    /// `webViewLink` was present as an explicit `null`.
    null_link: bool,
}

/// On-disk shape of a record.
#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StoredRecord {
    id: String,
    name: String,
    #[serde(
        default,
        deserialize_with = "present_or_null",
        skip_serializing_if = "Option::is_none"
    )]
    web_view_link: Option<Option<String>>,
    #[serde(default, deserialize_with = "null_as_empty")]
    access_emails: Vec<String>,
    #[serde(flatten)]
    extra: Map<String, Value>,
}

fn present_or_null<'de, D>(deserializer: D) -> Result<Option<Option<String>>, D::Error>
where
    D: Deserializer<'de>,
{
    Option::<String>::deserialize(deserializer).map(Some)
}

fn null_as_empty<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<Vec<String>>::deserialize(deserializer)?.unwrap_or_default())
}

impl From<StoredRecord> for FileRecord {
    fn from(stored: StoredRecord) -> Self {
        Self {
            id: stored.id,
            name: stored.name,
            null_link: matches!(stored.web_view_link, Some(None)),
            web_view_link: stored.web_view_link.flatten(),
            access_emails: stored.access_emails,
            extra: stored.extra,
        }
    }
}

impl From<FileRecord> for StoredRecord {
    fn from(record: FileRecord) -> Self {
        let web_view_link = match record.web_view_link {
            Some(link) => Some(Some(link)),
            None if record.null_link => Some(None),
            None => None,
        };
        Self {
            id: record.id,
            name: record.name,
            web_view_link,
            access_emails: record.access_emails,
            extra: record.extra,
        }
    }
}

impl FileRecord {
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        web_view_link: Option<String>,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            web_view_link,
            access_emails: Vec::new(),
            extra: Map::new(),
            null_link: false,
        }
    }

    /// The stored link, or the deterministic Drive viewer URL for this id.
    pub fn view_link(&self) -> String {
        self.web_view_link
            .clone()
            .unwrap_or_else(|| fallback_view_link(&self.id))
    }

    /// Adds `email` unless it is already present. Returns whether it was added.
    pub fn grant(&mut self, email: &str) -> bool {
        if self.has_access(email) {
            return false;
        }
        self.access_emails.push(email.to_string());
        true
    }

    pub fn has_access(&self, email: &str) -> bool {
        self.access_emails.iter().any(|e| e == email)
    }
}
