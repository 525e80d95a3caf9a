use std::path::{Path, PathBuf};

use tempfile::TempPath;
use tokio::fs;
use uuid::Uuid;

use crate::Result;

/// Local copy of an uploaded file, deleted when dropped or discarded.
#[derive(Debug)]
pub struct StagedFile {
    path: TempPath,
    original_name: Option<String>,
    content_type: Option<String>,
}

impl StagedFile {
    /// Reserves a fresh path inside `dir` for an incoming upload. Whatever ends
    /// up at that path is removed together with the returned value.
    pub async fn reserve(
        dir: &Path,
        original_name: Option<String>,
        content_type: Option<String>,
    ) -> Result<Self> {
        fs::create_dir_all(dir).await?;
        let path = dir.join(Uuid::new_v4().simple().to_string());
        Self::adopt(path, original_name, content_type)
    }

    /// Writes `content` to a new staged file inside `dir`.
    pub async fn write_new(
        dir: &Path,
        content: &[u8],
        original_name: Option<String>,
        content_type: Option<String>,
    ) -> Result<Self> {
        let staged = Self::reserve(dir, original_name, content_type).await?;
        fs::write(staged.path(), content).await?;
        Ok(staged)
    }

    /// Takes ownership of an existing file at `path`.
    pub fn adopt(
        path: PathBuf,
        original_name: Option<String>,
        content_type: Option<String>,
    ) -> Result<Self> {
        Ok(Self {
            path: TempPath::try_from_path(path)?,
            original_name,
            content_type,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn original_name(&self) -> Option<&str> {
        self.original_name.as_deref()
    }

    pub fn content_type(&self) -> Option<&str> {
        self.content_type.as_deref()
    }

    /// Extension of the original file name, dot included; empty if there is none.
    pub fn extension(&self) -> &str {
        self.original_name().map(file_extension).unwrap_or("")
    }

    pub async fn read(&self) -> Result<Vec<u8>> {
        Ok(fs::read(self.path()).await?)
    }

    /// Deletes the staged file now, reporting failures instead of hiding them.
    pub fn discard(self) -> std::io::Result<()> {
        match self.path.close() {
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            other => other,
        }
    }
}

/// Text from the last `.` of `name`, dot included.
pub fn file_extension(name: &str) -> &str {
    name.rfind('.').map(|idx| &name[idx..]).unwrap_or("")
}
