use std::panic::{self, AssertUnwindSafe};

use crate::client::{ClientError, Result};

pub trait TextExtractor {
    /// Text of each page, in page order.
    fn extract_pages(&self, bytes: &[u8]) -> Result<Vec<String>>;
}

/// Extractor backed by `pdf-extract`.
pub struct PdfTextExtractor;

impl TextExtractor for PdfTextExtractor {
    fn extract_pages(&self, bytes: &[u8]) -> Result<Vec<String>> {
        // pdf-extract panics on some malformed documents
        let extracted = panic::catch_unwind(AssertUnwindSafe(|| {
            pdf_extract::extract_text_from_mem_by_pages(bytes)
        }));
        match extracted {
            Ok(Ok(pages)) => Ok(pages),
            Ok(Err(e)) => Err(ClientError::Pdf(e.to_string())),
            Err(_) => Err(ClientError::Pdf("document could not be parsed".to_string())),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PdfStats {
    pub pages: usize,
    pub words: usize,
}

/// Words across all pages: page texts joined by a space, split on whitespace runs.
pub fn count_words(pages: &[String]) -> usize {
    pages.join(" ").split_whitespace().count()
}

pub fn analyze(extractor: &dyn TextExtractor, bytes: &[u8]) -> Result<PdfStats> {
    let pages = extractor.extract_pages(bytes)?;
    Ok(PdfStats {
        pages: pages.len(),
        words: count_words(&pages),
    })
}
