mod file;
mod record;

pub use file::{FileTypeDetector, FALLBACK_MIME, PDF_MIME};
pub use record::{fallback_view_link, FileRecord};
