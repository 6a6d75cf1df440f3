use std::path::PathBuf;

use pdfium_render::prelude::{Pdfium, PdfiumError};

const PDF_MAGIC: &[u8] = b"%PDF-";

/// Turns an uploaded document into plain text.
pub trait TextExtractor: Send + Sync {
    fn extract(&self, bytes: &[u8]) -> Result<String, ExtractionError>;
}

/// Text extraction for text-based PDFs through the Pdfium runtime.
pub struct PdfiumExtractor {
    library_path: Option<PathBuf>,
}

impl PdfiumExtractor {
    /// `library_path` is the directory holding the Pdfium shared library;
    /// `None` falls back to the system library search path.
    pub fn new(library_path: Option<PathBuf>) -> Self {
        Self { library_path }
    }

    fn load(&self) -> Result<Pdfium, ExtractionError> {
        let bindings = match &self.library_path {
            Some(dir) => {
                Pdfium::bind_to_library(Pdfium::pdfium_platform_library_name_at_path(dir))
            }
            None => Pdfium::bind_to_system_library(),
        }
        .map_err(ExtractionError::Runtime)?;
        Ok(Pdfium::new(bindings))
    }
}

impl TextExtractor for PdfiumExtractor {
    fn extract(&self, bytes: &[u8]) -> Result<String, ExtractionError> {
        if !bytes.starts_with(PDF_MAGIC) {
            return Err(ExtractionError::NotPdf);
        }

        let pdfium = self.load()?;
        let document = pdfium
            .load_pdf_from_byte_slice(bytes, None)
            .map_err(ExtractionError::Open)?;

        let mut pages = Vec::new();
        for (page_index, page) in document.pages().iter().enumerate() {
            let text = page
                .text()
                .map_err(|source| ExtractionError::Page { page_index, source })?
                .all();
            let text = text.trim();
            if !text.is_empty() {
                pages.push(text.to_string());
            }
        }

        let full_text = pages.join("\n\n");
        if full_text.trim().is_empty() {
            return Err(ExtractionError::NoText);
        }
        Ok(full_text)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ExtractionError {
    #[error("File is not a PDF document")]
    NotPdf,

    #[error("Failed to load Pdfium runtime: {0}")]
    Runtime(#[source] PdfiumError),

    #[error("Could not open PDF: {0}")]
    Open(#[source] PdfiumError),

    #[error("Could not read text of page {page_index}: {source}")]
    Page {
        page_index: usize,
        #[source]
        source: PdfiumError,
    },

    #[error(
        "No text could be extracted from this PDF. It may be a scanned image; only text-based PDFs are supported."
    )]
    NoText,
}
