use crate::naming::SheetName;

/// A cell as produced by an extractor: text, or no value at all.
pub type RawCell = Option<String>;

/// Grid of cells returned by a [`crate::TableExtractor`] for one detected table.
///
/// Rows may have different lengths.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct RawTable {
    pub rows: Vec<Vec<RawCell>>,
}

impl RawTable {
    #[must_use]
    pub fn new(rows: Vec<Vec<RawCell>>) -> Self {
        Self { rows }
    }

    /// Builds a table in which every cell carries text.
    #[must_use]
    pub fn from_text_rows(rows: Vec<Vec<String>>) -> Self {
        Self {
            rows: rows
                .into_iter()
                .map(|row| row.into_iter().map(Some).collect())
                .collect(),
        }
    }
}

/// Text-only grid. Shape is identical to the source [`RawTable`]s.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct NormalizedTable {
    pub rows: Vec<Vec<String>>,
}

impl NormalizedTable {
    #[must_use]
    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    /// Widest row; ragged grids are reported by their longest row.
    #[must_use]
    pub fn column_count(&self) -> usize {
        self.rows.iter().map(Vec::len).max().unwrap_or(0)
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// Everything an extractor reports for a single page.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct PageExtraction {
    pub tables: Vec<RawTable>,
    /// Full page text, used only for sheet naming heuristics.
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageResult {
    pub page_number: u32,
    pub sheet_name: SheetName,
    pub grid: NormalizedTable,
    pub table_count: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageProgress {
    /// 1-based position among the pages being visited.
    pub current: u32,
    pub total: u32,
    pub page_number: u32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConvertedWorkbook {
    pub bytes: Vec<u8>,
    pub sheet_names: Vec<SheetName>,
    pub pages_converted: usize,
    pub pages_scanned: u32,
}

/// Result of one conversion run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConversionOutcome {
    Converted(ConvertedWorkbook),
    /// No page produced a table. Typical for scanned or image-only PDFs.
    NoTablesFound { pages_scanned: u32 },
}

impl ConversionOutcome {
    #[must_use]
    pub fn pages_converted(&self) -> usize {
        match self {
            Self::Converted(workbook) => workbook.pages_converted,
            Self::NoTablesFound { .. } => 0,
        }
    }

    #[must_use]
    pub fn pages_scanned(&self) -> u32 {
        match self {
            Self::Converted(workbook) => workbook.pages_scanned,
            Self::NoTablesFound { pages_scanned } => *pages_scanned,
        }
    }

    /// The downloadable artifact, absent when nothing was converted.
    #[must_use]
    pub fn workbook(&self) -> Option<&ConvertedWorkbook> {
        match self {
            Self::Converted(workbook) => Some(workbook),
            Self::NoTablesFound { .. } => None,
        }
    }

    #[must_use]
    pub fn into_workbook(self) -> Option<ConvertedWorkbook> {
        match self {
            Self::Converted(workbook) => Some(workbook),
            Self::NoTablesFound { .. } => None,
        }
    }
}
