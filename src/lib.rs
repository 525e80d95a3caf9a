pub mod config;
pub mod diagnostics;
pub mod drive;
pub mod error;
pub mod storage;
pub mod workflow;

#[cfg(any(test, feature = "testing"))]
pub mod testing;

mod types;

pub use config::AppConfig;
pub use error::{RegistryError, Result};
pub use types::*;
pub use workflow::AppContext;
