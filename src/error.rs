use thiserror::Error;

use crate::drive::DriveError;

#[derive(Error, Debug)]
pub enum RegistryError {
    #[error("{0}")]
    InvalidRequest(String),
    #[error("{0}")]
    UploadFailed(String),
    #[error("{0}")]
    GrantFailed(String),
    #[error(
        "Access granted to {email} on file {file_id}, but the registry was not updated: {reason}"
    )]
    GrantPartialFailure {
        file_id: String,
        email: String,
        reason: String,
    },
    #[error("Record store is corrupt: {0}")]
    CorruptStore(String),
    #[error("Failed to write record store: {0}")]
    StoreWriteFailed(String),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Drive error: {0}")]
    Drive(#[from] DriveError),
}

impl RegistryError {
    /// Builds an `InvalidRequest` naming every missing field.
    pub fn missing_fields(fields: &[&str]) -> Self {
        let verb = if fields.len() == 1 { "is" } else { "are" };
        RegistryError::InvalidRequest(format!("{} {} required.", fields.join(", "), verb))
    }

    pub fn is_client_error(&self) -> bool {
        matches!(self, RegistryError::InvalidRequest(_))
    }
}

pub type Result<T> = std::result::Result<T, RegistryError>;
