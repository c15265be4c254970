use std::io;

use thiserror::Error;

/// The source document could not be opened at all. Always fatal.
#[derive(Debug, Error)]
pub enum DocumentError {
    #[error("failed to load PDF: {0}")]
    Load(#[from] lopdf::Error),

    #[error("PDF is encrypted or password-protected")]
    Encrypted,

    #[error("PDF contains no pages")]
    NoPages,

    #[error("page {0} does not exist in this document")]
    PageOutOfRange(u32),
}

#[derive(Debug, Error)]
pub enum SinkError {
    #[error("sheet name '{0}' is already used in this workbook")]
    DuplicateSheetName(String),

    #[error("invalid sheet name '{name}': {reason}")]
    InvalidSheetName { name: String, reason: &'static str },

    #[error("sheet '{name}' has {rows} rows and {cols} columns, which exceeds the worksheet limits")]
    GridTooLarge {
        name: String,
        rows: usize,
        cols: usize,
    },

    #[error("cell {cell} on sheet '{name}' has {len} characters (limit is 32767)")]
    CellTooLong {
        name: String,
        cell: String,
        len: usize,
    },

    #[error("cannot finalize a workbook without sheets")]
    EmptyWorkbook,

    #[error("XLSX archive error: {0}")]
    Zip(#[from] zip::result::ZipError),

    #[error("XLSX markup error: {0}")]
    Xml(#[from] quick_xml::Error),

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

#[derive(Debug, Error)]
pub enum ConversionError {
    #[error(transparent)]
    Document(#[from] DocumentError),

    #[error("failed to write spreadsheet: {0}")]
    Sink(#[from] SinkError),

    #[error("invalid option: {0}")]
    InvalidOption(String),

    #[error("no pages available after applying selection")]
    NoPagesSelected,
}
