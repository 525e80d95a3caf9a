//! Operator-visible failure events.
//!
//! Workflows report failures that would otherwise only reach the caller, or
//! that the caller never sees at all (a registry left behind the provider).

use std::path::PathBuf;
use std::sync::Mutex;

use tracing::{error, warn};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Diagnostic {
    /// The provider stored the file but the registry append failed.
    RegistryAppendFailed { file_id: String, name: String, reason: String },
    /// The provider granted access but the registry update failed.
    RegistryGrantFailed { file_id: String, email: String, reason: String },
    ProviderRejected { operation: &'static str, reason: String },
    StagingCleanupFailed { path: PathBuf, reason: String },
}

pub trait DiagnosticsSink: Send + Sync {
    fn report(&self, diagnostic: Diagnostic);
}

/// Emits every diagnostic as a `tracing` event.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

impl DiagnosticsSink for TracingSink {
    fn report(&self, diagnostic: Diagnostic) {
        match diagnostic {
            Diagnostic::RegistryAppendFailed { file_id, name, reason } => {
                error!(%file_id, %name, %reason, "File uploaded but not recorded in the registry");
            }
            Diagnostic::RegistryGrantFailed { file_id, email, reason } => {
                error!(
                    %file_id,
                    %email,
                    %reason,
                    "Access granted but not recorded in the registry"
                );
            }
            Diagnostic::ProviderRejected { operation, reason } => {
                warn!(operation, %reason, "Drive rejected the request");
            }
            Diagnostic::StagingCleanupFailed { path, reason } => {
                warn!(path = %path.display(), %reason, "Failed to remove staged upload");
            }
        }
    }
}

/// Keeps diagnostics in memory so they can be inspected.
#[derive(Debug, Default)]
pub struct MemorySink {
    events: Mutex<Vec<Diagnostic>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<Diagnostic> {
        self.events.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }
}

impl DiagnosticsSink for MemorySink {
    fn report(&self, diagnostic: Diagnostic) {
        self.events.lock().unwrap_or_else(|e| e.into_inner()).push(diagnostic);
    }
}
