use serde::Serialize;
use tracing::{debug, info};

use super::{present, AppContext};
use crate::diagnostics::Diagnostic;
use crate::{FileRecord, RegistryError, Result};

#[derive(Debug, Clone, Default)]
pub struct GrantRequest {
    pub file_id: Option<String>,
    pub email: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GrantOutcome {
    pub message: String,
}

impl AppContext {
    /// Grants reader access on the provider, then records the email locally.
    pub async fn grant_access(&self, request: GrantRequest) -> Result<GrantOutcome> {
        let (file_id, email) = match (present(request.file_id), present(request.email)) {
            (Some(file_id), Some(email)) => (file_id, email),
            (file_id, email) => {
                let mut missing = Vec::new();
                if file_id.is_none() {
                    missing.push("fileId");
                }
                if email.is_none() {
                    missing.push("email");
                }
                return Err(RegistryError::missing_fields(&missing));
            }
        };

        if let Err(e) = self.cloud.grant_access(&file_id, &email).await {
            self.diagnostics.report(Diagnostic::ProviderRejected {
                operation: "grant-access",
                reason: e.to_string(),
            });
            return Err(RegistryError::GrantFailed(e.to_string()));
        }

        let add_email = |record: &mut FileRecord| {
            record.grant(&email);
        };
        match self.store.update_by_id(&file_id, &add_email).await {
            Ok(0) => debug!(%file_id, "Granted access on a file the registry does not know"),
            Ok(_) => {}
            Err(e) => {
                self.diagnostics.report(Diagnostic::RegistryGrantFailed {
                    file_id: file_id.clone(),
                    email: email.clone(),
                    reason: e.to_string(),
                });
                return Err(RegistryError::GrantPartialFailure {
                    file_id,
                    email,
                    reason: e.to_string(),
                });
            }
        }

        info!(%file_id, %email, "Access granted");
        Ok(GrantOutcome {
            message: format!("Access granted to {}", email),
        })
    }
}
