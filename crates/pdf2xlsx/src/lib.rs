mod error;
mod extractor;
mod filename;
mod merge;
mod model;
mod naming;
mod options;
mod pdf_reader;
mod table_detect;
mod table_parse;
mod xlsx_out;

use chrono::NaiveDateTime;

pub use error::{ConversionError, DocumentError, SinkError};
pub use extractor::{PdfTableExtractor, TableExtractor};
pub use filename::{FilenameTemplate, file_stem};
pub use merge::{merge_page_tables, normalize_table};
pub use model::{
    ConversionOutcome, ConvertedWorkbook, NormalizedTable, PageExtraction, PageProgress,
    PageResult, RawCell, RawTable,
};
pub use naming::{Direction, SheetName, sheet_name_for_page};
pub use options::{ConvertOptions, PageSelection};
pub use xlsx_out::{SpreadsheetSink, XLSX_MIME_TYPE, XlsxSink};

/// Turns one page's extraction into a named, merged grid. Pages without
/// tables produce nothing.
#[must_use]
pub fn build_page_result(
    page_number: u32,
    extraction: &PageExtraction,
    directional_naming: bool,
) -> Option<PageResult> {
    if extraction.tables.is_empty() {
        return None;
    }

    Some(PageResult {
        page_number,
        sheet_name: sheet_name_for_page(page_number, &extraction.text, directional_naming),
        grid: merge_page_tables(&extraction.tables),
        table_count: extraction.tables.len(),
    })
}

/// PDF to XLSX conversion, one page at a time.
#[derive(Debug, Clone, Default)]
pub struct Converter {
    options: ConvertOptions,
}

impl Converter {
    #[must_use]
    pub fn new(options: ConvertOptions) -> Self {
        Self { options }
    }

    pub fn convert(&self, input_pdf: &[u8]) -> Result<ConversionOutcome, ConversionError> {
        self.convert_with_progress(input_pdf, |_| {})
    }

    pub fn convert_with_progress<P>(
        &self,
        input_pdf: &[u8],
        progress: P,
    ) -> Result<ConversionOutcome, ConversionError>
    where
        P: FnMut(PageProgress),
    {
        self.validate()?;
        let extractor = PdfTableExtractor::from_bytes(input_pdf, self.options.min_cols)?;
        self.run(&extractor, XlsxSink::new(), progress)
    }

    /// Drives `extractor` page by page into `sink`.
    ///
    /// The sink is consumed: it is finalized only when at least one sheet
    /// was written, and dropped unfinished on every other path.
    pub fn run<E, S, P>(
        &self,
        extractor: &E,
        mut sink: S,
        mut progress: P,
    ) -> Result<ConversionOutcome, ConversionError>
    where
        E: TableExtractor + ?Sized,
        S: SpreadsheetSink,
        P: FnMut(PageProgress),
    {
        self.validate()?;

        let selected = (1..=extractor.page_count())
            .filter(|page| {
                self.options
                    .pages
                    .as_ref()
                    .is_none_or(|selection| selection.contains(*page))
            })
            .collect::<Vec<_>>();
        if selected.is_empty() {
            return Err(ConversionError::NoPagesSelected);
        }
        let total = u32::try_from(selected.len()).unwrap_or(u32::MAX);

        let mut sheet_names = Vec::new();
        for (current, page_number) in (1..=total).zip(selected.iter().copied()) {
            let extraction = extractor.extract_page(page_number)?;
            match build_page_result(page_number, &extraction, self.options.directional_naming) {
                Some(result) => {
                    sink.append(&result.sheet_name, &result.grid)?;
                    tracing::debug!(
                        page = page_number,
                        tables = result.table_count,
                        rows = result.grid.row_count(),
                        sheet = %result.sheet_name,
                        "page converted"
                    );
                    sheet_names.push(result.sheet_name);
                }
                None => tracing::debug!(page = page_number, "no tables detected on page"),
            }

            progress(PageProgress {
                current,
                total,
                page_number,
            });
        }

        if sheet_names.is_empty() {
            tracing::info!(pages = total, "no tables found in document");
            return Ok(ConversionOutcome::NoTablesFound {
                pages_scanned: total,
            });
        }

        let bytes = sink.finalize()?;
        tracing::info!(
            pages = total,
            sheets = sheet_names.len(),
            bytes = bytes.len(),
            "conversion finished"
        );

        Ok(ConversionOutcome::Converted(ConvertedWorkbook {
            bytes,
            pages_converted: sheet_names.len(),
            sheet_names,
            pages_scanned: total,
        }))
    }

    /// File name offered for download, rendered from the configured template.
    #[must_use]
    pub fn download_file_name(&self, original_name: &str, at: NaiveDateTime) -> String {
        self.options.filename_template.render(original_name, at)
    }

    fn validate(&self) -> Result<(), ConversionError> {
        if self.options.min_cols < 2 {
            return Err(ConversionError::InvalidOption(
                "min_cols must be at least 2".to_string(),
            ));
        }
        Ok(())
    }
}
