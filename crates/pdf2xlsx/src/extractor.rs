use crate::error::DocumentError;
use crate::model::PageExtraction;
use crate::pdf_reader::PdfSource;
use crate::table_detect::detect_tables_in_page;

/// Source of per-page tables.
///
/// A page without tables is reported as an empty `tables` vector, never as
/// an error. Errors are reserved for a document that cannot be read.
pub trait TableExtractor {
    fn page_count(&self) -> u32;

    /// Extracts tables and full text for a 1-based page number.
    fn extract_page(&self, page_number: u32) -> Result<PageExtraction, DocumentError>;
}

/// Text-layout table detection over a PDF loaded with `lopdf`.
pub struct PdfTableExtractor {
    source: PdfSource,
    min_cols: usize,
}

impl PdfTableExtractor {
    /// Opens the document; every fatal document problem surfaces here.
    pub fn from_bytes(input_pdf: &[u8], min_cols: usize) -> Result<Self, DocumentError> {
        let source = PdfSource::load(input_pdf)?;
        tracing::debug!(pages = source.page_count(), "loaded PDF document");
        Ok(Self { source, min_cols })
    }
}

impl TableExtractor for PdfTableExtractor {
    fn page_count(&self) -> u32 {
        self.source.page_count()
    }

    fn extract_page(&self, page_number: u32) -> Result<PageExtraction, DocumentError> {
        let text = self.source.page_text(page_number)?;
        let tables = detect_tables_in_page(page_number, &text, self.min_cols);
        Ok(PageExtraction { tables, text })
    }
}
