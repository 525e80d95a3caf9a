pub const PDF_MIME: &str = "application/pdf";
pub const FALLBACK_MIME: &str = "application/octet-stream";

pub struct FileTypeDetector;

impl FileTypeDetector {
    /// Sniffs the MIME type from the leading bytes.
    pub fn detect(data: &[u8]) -> Option<&'static str> {
        infer::get(data).map(|kind| kind.mime_type())
    }

    pub fn is_pdf(data: &[u8]) -> bool {
        Self::detect(data) == Some(PDF_MIME)
    }

    /// Picks the MIME type sent to the provider: the declared type when it is
    /// specific, then the sniffed type, then `application/octet-stream`.
    pub fn resolve(declared: Option<&str>, data: &[u8]) -> String {
        match declared.map(str::trim) {
            Some(mime) if !mime.is_empty() && mime != FALLBACK_MIME => mime.to_string(),
            _ => Self::detect(data).unwrap_or(FALLBACK_MIME).to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PDF_HEADER: &[u8] = b"%PDF-1.7\n%\xe2\xe3\xcf\xd3\n";

    #[test]
    fn declared_type_wins() {
        assert_eq!(FileTypeDetector::resolve(Some("application/pdf"), b"hello"), "application/pdf");
    }

    #[test]
    fn generic_declared_type_is_sniffed() {
        assert_eq!(FileTypeDetector::resolve(Some(FALLBACK_MIME), PDF_HEADER), PDF_MIME);
        assert_eq!(FileTypeDetector::resolve(None, PDF_HEADER), PDF_MIME);
        assert!(FileTypeDetector::is_pdf(PDF_HEADER));
    }

    #[test]
    fn unknown_content_falls_back() {
        assert_eq!(FileTypeDetector::resolve(None, b"plain words"), FALLBACK_MIME);
    }
}
