//! Append-only XLSX writer.
//!
//! Worksheets are streamed into the zip archive as they are appended; the
//! workbook-level parts that list the sheets are written by
//! [`SpreadsheetSink::finalize`]. All cells are inline strings.

use std::borrow::Cow;
use std::collections::HashSet;
use std::io::{Cursor, Write};

use quick_xml::Writer;
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

use crate::error::SinkError;
use crate::model::NormalizedTable;
use crate::naming::SheetName;

pub const XLSX_MIME_TYPE: &str =
    "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet";

pub const MAX_ROWS: usize = 1_048_576;
pub const MAX_COLS: usize = 16_384;
pub const MAX_CELL_CHARS: usize = 32_767;
pub const MAX_SHEET_NAME_CHARS: usize = 31;

const SPREADSHEET_NS: &str = "http://schemas.openxmlformats.org/spreadsheetml/2006/main";
const RELATIONSHIPS_NS: &str = "http://schemas.openxmlformats.org/officeDocument/2006/relationships";
const PACKAGE_RELATIONSHIPS_NS: &str =
    "http://schemas.openxmlformats.org/package/2006/relationships";
const CONTENT_TYPES_NS: &str = "http://schemas.openxmlformats.org/package/2006/content-types";

const REL_OFFICE_DOCUMENT: &str =
    "http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument";
const REL_EXTENDED_PROPERTIES: &str =
    "http://schemas.openxmlformats.org/officeDocument/2006/relationships/extended-properties";
const REL_WORKSHEET: &str =
    "http://schemas.openxmlformats.org/officeDocument/2006/relationships/worksheet";
const REL_STYLES: &str = "http://schemas.openxmlformats.org/officeDocument/2006/relationships/styles";

const CT_RELATIONSHIPS: &str = "application/vnd.openxmlformats-package.relationships+xml";
const CT_XML: &str = "application/xml";
const CT_WORKBOOK: &str =
    "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet.main+xml";
const CT_WORKSHEET: &str =
    "application/vnd.openxmlformats-officedocument.spreadsheetml.worksheet+xml";
const CT_STYLES: &str = "application/vnd.openxmlformats-officedocument.spreadsheetml.styles+xml";
const CT_EXTENDED_PROPERTIES: &str =
    "application/vnd.openxmlformats-officedocument.extended-properties+xml";

const STYLES_XML: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<styleSheet xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main"><fonts count="1"><font><sz val="11"/><name val="Calibri"/><family val="2"/></font></fonts><fills count="2"><fill><patternFill patternType="none"/></fill><fill><patternFill patternType="gray125"/></fill></fills><borders count="1"><border><left/><right/><top/><bottom/><diagonal/></border></borders><cellStyleXfs count="1"><xf numFmtId="0" fontId="0" fillId="0" borderId="0"/></cellStyleXfs><cellXfs count="1"><xf numFmtId="0" fontId="0" fillId="0" borderId="0" xfId="0"/></cellXfs><cellStyles count="1"><cellStyle name="Normal" xfId="0" builtinId="0"/></cellStyles></styleSheet>"#;

const APP_XML: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Properties xmlns="http://schemas.openxmlformats.org/officeDocument/2006/extended-properties"><Application>pdf2xlsx</Application></Properties>"#;

const FORBIDDEN_SHEET_NAME_CHARS: [char; 7] = ['[', ']', ':', '*', '?', '/', '\\'];

/// Write-only destination for named sheets.
///
/// `finalize` takes the sink by value, so it can only run once; dropping a
/// sink without finalizing discards everything appended to it.
pub trait SpreadsheetSink {
    fn append(&mut self, name: &SheetName, grid: &NormalizedTable) -> Result<(), SinkError>;

    fn finalize(self) -> Result<Vec<u8>, SinkError>;
}

type XmlWriter<'a> = Writer<&'a mut ZipWriter<Cursor<Vec<u8>>>>;

pub struct XlsxSink {
    zip: ZipWriter<Cursor<Vec<u8>>>,
    sheets: Vec<SheetName>,
    folded_names: HashSet<String>,
}

impl XlsxSink {
    #[must_use]
    pub fn new() -> Self {
        Self {
            zip: ZipWriter::new(Cursor::new(Vec::new())),
            sheets: Vec::new(),
            folded_names: HashSet::new(),
        }
    }

    #[must_use]
    pub fn sheet_names(&self) -> &[SheetName] {
        &self.sheets
    }

    fn file_options() -> SimpleFileOptions {
        SimpleFileOptions::default().compression_method(CompressionMethod::Deflated)
    }

    fn write_part<F>(&mut self, path: &str, write: F) -> Result<(), SinkError>
    where
        F: FnOnce(&mut XmlWriter<'_>) -> Result<(), SinkError>,
    {
        self.zip.start_file(path, Self::file_options())?;
        let mut writer = Writer::new(&mut self.zip);
        writer.write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), Some("yes"))))?;
        write(&mut writer)
    }

    fn write_static_part(&mut self, path: &str, content: &str) -> Result<(), SinkError> {
        self.zip.start_file(path, Self::file_options())?;
        self.zip.write_all(content.as_bytes())?;
        Ok(())
    }

    fn write_content_types(&mut self) -> Result<(), SinkError> {
        let sheet_count = self.sheets.len();
        self.write_part("[Content_Types].xml", |writer| {
            let mut types = BytesStart::new("Types");
            types.push_attribute(("xmlns", CONTENT_TYPES_NS));
            writer.write_event(Event::Start(types))?;

            for (extension, content_type) in [("rels", CT_RELATIONSHIPS), ("xml", CT_XML)] {
                let mut default = BytesStart::new("Default");
                default.push_attribute(("Extension", extension));
                default.push_attribute(("ContentType", content_type));
                writer.write_event(Event::Empty(default))?;
            }

            let mut overrides = vec![
                ("/xl/workbook.xml".to_string(), CT_WORKBOOK),
                ("/xl/styles.xml".to_string(), CT_STYLES),
                ("/docProps/app.xml".to_string(), CT_EXTENDED_PROPERTIES),
            ];
            overrides.extend(
                (1..=sheet_count)
                    .map(|index| (format!("/xl/worksheets/sheet{index}.xml"), CT_WORKSHEET)),
            );
            for (part, content_type) in &overrides {
                let mut element = BytesStart::new("Override");
                element.push_attribute(("PartName", part.as_str()));
                element.push_attribute(("ContentType", *content_type));
                writer.write_event(Event::Empty(element))?;
            }

            writer.write_event(Event::End(BytesEnd::new("Types")))?;
            Ok(())
        })
    }

    fn write_package_rels(&mut self) -> Result<(), SinkError> {
        self.write_part("_rels/.rels", |writer| {
            write_relationships(
                writer,
                &[
                    ("rId1", REL_OFFICE_DOCUMENT, "xl/workbook.xml"),
                    ("rId2", REL_EXTENDED_PROPERTIES, "docProps/app.xml"),
                ],
            )
        })
    }

    fn write_workbook(&mut self) -> Result<(), SinkError> {
        let sheets = self.sheets.clone();
        self.write_part("xl/workbook.xml", |writer| {
            let mut workbook = BytesStart::new("workbook");
            workbook.push_attribute(("xmlns", SPREADSHEET_NS));
            workbook.push_attribute(("xmlns:r", RELATIONSHIPS_NS));
            writer.write_event(Event::Start(workbook))?;
            writer.write_event(Event::Start(BytesStart::new("sheets")))?;

            for (index, name) in sheets.iter().enumerate() {
                let sheet_id = (index + 1).to_string();
                let rel_id = format!("rId{sheet_id}");
                let mut sheet = BytesStart::new("sheet");
                sheet.push_attribute(("name", name.as_str()));
                sheet.push_attribute(("sheetId", sheet_id.as_str()));
                sheet.push_attribute(("r:id", rel_id.as_str()));
                writer.write_event(Event::Empty(sheet))?;
            }

            writer.write_event(Event::End(BytesEnd::new("sheets")))?;
            writer.write_event(Event::End(BytesEnd::new("workbook")))?;
            Ok(())
        })
    }

    fn write_workbook_rels(&mut self) -> Result<(), SinkError> {
        let sheet_count = self.sheets.len();
        self.write_part("xl/_rels/workbook.xml.rels", |writer| {
            let mut relationships = (1..=sheet_count)
                .map(|index| {
                    (
                        format!("rId{index}"),
                        REL_WORKSHEET,
                        format!("worksheets/sheet{index}.xml"),
                    )
                })
                .collect::<Vec<_>>();
            relationships.push((
                format!("rId{}", sheet_count + 1),
                REL_STYLES,
                "styles.xml".to_string(),
            ));

            let borrowed = relationships
                .iter()
                .map(|(id, kind, target)| (id.as_str(), *kind, target.as_str()))
                .collect::<Vec<_>>();
            write_relationships(writer, &borrowed)
        })
    }
}

impl Default for XlsxSink {
    fn default() -> Self {
        Self::new()
    }
}

impl SpreadsheetSink for XlsxSink {
    fn append(&mut self, name: &SheetName, grid: &NormalizedTable) -> Result<(), SinkError> {
        validate_sheet_name(name)?;
        let folded = name.as_str().to_lowercase();
        if self.folded_names.contains(&folded) {
            return Err(SinkError::DuplicateSheetName(name.to_string()));
        }
        validate_grid(name, grid)?;

        let path = format!("xl/worksheets/sheet{}.xml", self.sheets.len() + 1);
        self.write_part(&path, |writer| write_worksheet(writer, grid))?;

        self.folded_names.insert(folded);
        self.sheets.push(name.clone());
        Ok(())
    }

    fn finalize(mut self) -> Result<Vec<u8>, SinkError> {
        if self.sheets.is_empty() {
            return Err(SinkError::EmptyWorkbook);
        }

        self.write_workbook()?;
        self.write_workbook_rels()?;
        self.write_static_part("xl/styles.xml", STYLES_XML)?;
        self.write_static_part("docProps/app.xml", APP_XML)?;
        self.write_package_rels()?;
        self.write_content_types()?;

        let cursor = self.zip.finish()?;
        Ok(cursor.into_inner())
    }
}

fn write_relationships(
    writer: &mut XmlWriter<'_>,
    relationships: &[(&str, &str, &str)],
) -> Result<(), SinkError> {
    let mut root = BytesStart::new("Relationships");
    root.push_attribute(("xmlns", PACKAGE_RELATIONSHIPS_NS));
    writer.write_event(Event::Start(root))?;

    for (id, kind, target) in relationships {
        let mut relationship = BytesStart::new("Relationship");
        relationship.push_attribute(("Id", *id));
        relationship.push_attribute(("Type", *kind));
        relationship.push_attribute(("Target", *target));
        writer.write_event(Event::Empty(relationship))?;
    }

    writer.write_event(Event::End(BytesEnd::new("Relationships")))?;
    Ok(())
}

fn write_worksheet(writer: &mut XmlWriter<'_>, grid: &NormalizedTable) -> Result<(), SinkError> {
    let mut worksheet = BytesStart::new("worksheet");
    worksheet.push_attribute(("xmlns", SPREADSHEET_NS));
    worksheet.push_attribute(("xmlns:r", RELATIONSHIPS_NS));
    writer.write_event(Event::Start(worksheet))?;

    let mut dimension = BytesStart::new("dimension");
    let extent = dimension_ref(grid);
    dimension.push_attribute(("ref", extent.as_str()));
    writer.write_event(Event::Empty(dimension))?;

    writer.write_event(Event::Start(BytesStart::new("sheetData")))?;
    for (row_index, row) in grid.rows.iter().enumerate() {
        if row.iter().all(String::is_empty) {
            continue;
        }

        let row_number = (row_index + 1).to_string();
        let mut row_element = BytesStart::new("row");
        row_element.push_attribute(("r", row_number.as_str()));
        writer.write_event(Event::Start(row_element))?;

        for (col_index, value) in row.iter().enumerate() {
            if value.is_empty() {
                continue;
            }
            write_inline_string_cell(writer, &cell_ref(row_index, col_index), value)?;
        }

        writer.write_event(Event::End(BytesEnd::new("row")))?;
    }
    writer.write_event(Event::End(BytesEnd::new("sheetData")))?;

    writer.write_event(Event::End(BytesEnd::new("worksheet")))?;
    Ok(())
}

fn write_inline_string_cell(
    writer: &mut XmlWriter<'_>,
    reference: &str,
    value: &str,
) -> Result<(), SinkError> {
    let mut cell = BytesStart::new("c");
    cell.push_attribute(("r", reference));
    cell.push_attribute(("t", "inlineStr"));
    writer.write_event(Event::Start(cell))?;
    writer.write_event(Event::Start(BytesStart::new("is")))?;

    let mut text = BytesStart::new("t");
    if value.starts_with(char::is_whitespace) || value.ends_with(char::is_whitespace) {
        text.push_attribute(("xml:space", "preserve"));
    }
    writer.write_event(Event::Start(text))?;
    let escaped = escape_cell_text(value);
    writer.write_event(Event::Text(BytesText::new(&escaped)))?;
    writer.write_event(Event::End(BytesEnd::new("t")))?;

    writer.write_event(Event::End(BytesEnd::new("is")))?;
    writer.write_event(Event::End(BytesEnd::new("c")))?;
    Ok(())
}

fn validate_sheet_name(name: &SheetName) -> Result<(), SinkError> {
    let invalid = |reason| SinkError::InvalidSheetName {
        name: name.to_string(),
        reason,
    };
    let value = name.as_str();

    if value.trim().is_empty() {
        return Err(invalid("name is empty"));
    }
    if value.encode_utf16().count() > MAX_SHEET_NAME_CHARS {
        return Err(invalid("name is longer than 31 characters"));
    }
    if value.contains(FORBIDDEN_SHEET_NAME_CHARS) {
        return Err(invalid("name contains one of [ ] : * ? / \\"));
    }
    if value.starts_with('\'') || value.ends_with('\'') {
        return Err(invalid("name starts or ends with an apostrophe"));
    }

    Ok(())
}

fn validate_grid(name: &SheetName, grid: &NormalizedTable) -> Result<(), SinkError> {
    let rows = grid.row_count();
    let cols = grid.column_count();
    if rows > MAX_ROWS || cols > MAX_COLS {
        return Err(SinkError::GridTooLarge {
            name: name.to_string(),
            rows,
            cols,
        });
    }

    for (row_index, row) in grid.rows.iter().enumerate() {
        for (col_index, value) in row.iter().enumerate() {
            let len = value.chars().count();
            if len > MAX_CELL_CHARS {
                return Err(SinkError::CellTooLong {
                    name: name.to_string(),
                    cell: cell_ref(row_index, col_index),
                    len,
                });
            }
        }
    }

    Ok(())
}

/// `A`, `B`, ..., `Z`, `AA`, ... for a 0-based column index.
pub(crate) fn column_name(index: usize) -> String {
    let mut letters = Vec::new();
    let mut remaining = index + 1;
    while remaining > 0 {
        let offset = (remaining - 1) % 26;
        letters.push(char::from(b'A' + u8::try_from(offset).unwrap_or(0)));
        remaining = (remaining - 1) / 26;
    }
    letters.iter().rev().collect()
}

pub(crate) fn cell_ref(row_index: usize, col_index: usize) -> String {
    format!("{}{}", column_name(col_index), row_index + 1)
}

fn dimension_ref(grid: &NormalizedTable) -> String {
    let rows = grid.row_count();
    let cols = grid.column_count();
    if rows == 0 || cols == 0 {
        return "A1".to_string();
    }
    format!("A1:{}", cell_ref(rows - 1, cols - 1))
}

fn is_xml_char(ch: char) -> bool {
    matches!(ch, '\t' | '\n' | '\r')
        || ('\u{20}'..='\u{D7FF}').contains(&ch)
        || ('\u{E000}'..='\u{FFFD}').contains(&ch)
        || ch >= '\u{10000}'
}

fn starts_with_escape_token(rest: &str) -> bool {
    let bytes = rest.as_bytes();
    bytes.len() >= 7
        && bytes[0] == b'_'
        && bytes[1] == b'x'
        && bytes[2..6].iter().all(u8::is_ascii_hexdigit)
        && bytes[6] == b'_'
}

/// Encodes characters XML 1.0 cannot carry as `_xHHHH_`. A literal
/// `_xHHHH_` already in the text gets its underscore escaped so readers do
/// not decode it.
pub(crate) fn escape_cell_text(value: &str) -> Cow<'_, str> {
    let needs_escape =
        !value.chars().all(is_xml_char) || (value.contains("_x") && has_escape_token(value));
    if !needs_escape {
        return Cow::Borrowed(value);
    }

    let mut out = String::with_capacity(value.len() + 8);
    for (offset, ch) in value.char_indices() {
        if ch == '_' && starts_with_escape_token(&value[offset..]) {
            out.push_str("_x005F_");
        } else if is_xml_char(ch) {
            out.push(ch);
        } else {
            out.push_str(&format!("_x{:04X}_", u32::from(ch)));
        }
    }
    Cow::Owned(out)
}

fn has_escape_token(value: &str) -> bool {
    value
        .match_indices('_')
        .any(|(offset, _)| starts_with_escape_token(&value[offset..]))
}
