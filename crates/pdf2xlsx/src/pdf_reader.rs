use std::collections::BTreeMap;
use std::panic::{self, AssertUnwindSafe};

use encoding_rs::{BIG5, UTF_16BE};
use lopdf::content::Content;
use lopdf::{Document, Object, ObjectId};

use crate::error::DocumentError;
use crate::table_parse::{soft_split_line_into_cells, split_line_into_cells};

/// Runs a text extractor that may panic on fonts or encodings it does not
/// support. A panic or an error drops the candidate.
#[cfg_attr(target_arch = "wasm32", allow(dead_code))]
fn guarded_extract<F, E>(extract: F) -> Option<String>
where
    F: FnOnce() -> Result<String, E>,
    E: std::fmt::Display,
{
    match panic::catch_unwind(AssertUnwindSafe(extract)) {
        Ok(Ok(text)) => Some(text),
        Ok(Err(error)) => {
            tracing::debug!(%error, "pdf-extract failed; using content stream text only");
            None
        }
        Err(_) => {
            tracing::warn!("pdf-extract panicked; using content stream text only");
            None
        }
    }
}

// Panics abort on wasm32, so the pdf-extract candidate is not attempted there.
#[cfg(not(target_arch = "wasm32"))]
fn whole_document_text(input_pdf: &[u8]) -> Option<String> {
    guarded_extract(|| pdf_extract::extract_text_from_mem(input_pdf))
}

#[cfg(target_arch = "wasm32")]
fn whole_document_text(_input_pdf: &[u8]) -> Option<String> {
    None
}

fn split_text_into_pages(raw_text: &str) -> Vec<String> {
    let mut pages = raw_text
        .split('\u{000C}')
        .map(str::to_string)
        .collect::<Vec<_>>();
    if pages.last().is_some_and(String::is_empty) {
        pages.pop();
    }
    pages
}

fn is_cjk(ch: char) -> bool {
    ('\u{4E00}'..='\u{9FFF}').contains(&ch) || ('\u{3400}'..='\u{4DBF}').contains(&ch)
}

/// Heuristic for mojibake: replacement characters, stray control codes, or
/// an implausible share of rare CJK extension-A ideographs.
fn looks_decoding_broken(text: &str) -> bool {
    if text.is_empty() {
        return false;
    }

    if text.contains("?Identity-H Unimplemented?") {
        return true;
    }

    let total = text.chars().count();
    let replacement = text.matches('\u{FFFD}').count();
    let control = text
        .chars()
        .filter(|ch| ch.is_control() && !matches!(ch, '\n' | '\r' | '\t'))
        .count();
    let cjk_count = text.chars().filter(|ch| is_cjk(*ch)).count();
    let ext_a_count = text
        .chars()
        .filter(|ch| ('\u{3400}'..='\u{4DBF}').contains(ch))
        .count();

    replacement * 8 > total
        || control * 5 > total
        || (cjk_count > 20 && ext_a_count * 4 > cjk_count)
}

fn decode_pdf_bytes(encoding: Option<&str>, bytes: &[u8]) -> String {
    let decoded = Document::decode_text(encoding, bytes);
    if !looks_decoding_broken(&decoded) {
        return decoded;
    }

    if bytes.starts_with(&[0xFE, 0xFF]) || bytes.starts_with(&[0xFF, 0xFE]) {
        let (utf16, had_errors) = UTF_16BE.decode_without_bom_handling(&bytes[2..]);
        if !had_errors && !utf16.is_empty() {
            return utf16.into_owned();
        }
    }

    if let Some(name) = encoding {
        let lower = name.to_ascii_lowercase();

        let wide = ["utf16", "ucs2", "identity-h", "unicode"];
        if wide.iter().any(|hint| lower.contains(hint)) {
            let (utf16, had_errors) = UTF_16BE.decode_without_bom_handling(bytes);
            if !had_errors && !utf16.is_empty() {
                return utf16.into_owned();
            }
        }

        let big5 = ["big5", "b5", "eten", "cns"];
        if big5.iter().any(|hint| lower.contains(hint)) {
            let (decoded, _, had_errors) = BIG5.decode(bytes);
            if !had_errors && !decoded.is_empty() {
                return decoded.into_owned();
            }
        }
    }

    String::from_utf8_lossy(bytes).into_owned()
}

/// Ranks candidate page texts: lines that split into cells weigh most,
/// broken decodes are heavily penalized.
fn extraction_quality_score(text: &str) -> i64 {
    if text.trim().is_empty() {
        return i64::MIN / 4;
    }

    let mut non_empty_lines = 0_i64;
    let mut multi_cell_lines = 0_i64;

    for line in text.lines().map(str::trim).filter(|line| !line.is_empty()) {
        non_empty_lines += 1;
        if split_line_into_cells(line).len() >= 2 || soft_split_line_into_cells(line).len() >= 3 {
            multi_cell_lines += 1;
        }
    }

    let broken_penalty = if looks_decoding_broken(text) { 800 } else { 0 };
    multi_cell_lines * 50 + non_empty_lines - broken_penalty
}

fn extract_text_from_page_content(document: &Document, page_id: ObjectId) -> Option<String> {
    fn collect_text(text: &mut String, encoding: Option<&str>, operands: &[Object]) {
        for operand in operands {
            match operand {
                Object::String(bytes, _) => {
                    text.push_str(&decode_pdf_bytes(encoding, bytes));
                }
                Object::Array(items) => {
                    collect_text(text, encoding, items);
                    text.push(' ');
                }
                // Large negative kerning in TJ arrays is a visual gap.
                Object::Integer(value) if *value < -100 => text.push(' '),
                _ => {}
            }
        }
    }

    let raw_content = document.get_page_content(page_id).ok()?;
    let content = Content::decode(&raw_content).ok()?;
    let encodings = document
        .get_page_fonts(page_id)
        .into_iter()
        .map(|(name, font)| (name, font.get_font_encoding()))
        .collect::<BTreeMap<Vec<u8>, &str>>();

    let mut lines = Vec::new();
    let mut current = String::new();
    let mut current_encoding = None;
    for operation in content.operations {
        match operation.operator.as_str() {
            "Tf" => {
                if let Some(font_name) = operation
                    .operands
                    .first()
                    .and_then(|operand| operand.as_name().ok())
                {
                    current_encoding = encodings.get(font_name).copied();
                }
            }
            "Tj" | "TJ" | "'" | "\"" => {
                collect_text(&mut current, current_encoding, &operation.operands);
            }
            "T*" | "Td" | "TD" | "ET" => {
                if !current.trim().is_empty() {
                    lines.push(std::mem::take(&mut current));
                }
            }
            _ => {}
        }
    }

    if !current.trim().is_empty() {
        lines.push(current);
    }

    if lines.is_empty() {
        None
    } else {
        Some(lines.join("\n"))
    }
}

/// A loaded PDF plus the whole-document text pass used as one of the
/// per-page text candidates.
pub(crate) struct PdfSource {
    document: Document,
    pages: BTreeMap<u32, ObjectId>,
    extracted_pages: Option<Vec<String>>,
}

impl PdfSource {
    pub(crate) fn load(input_pdf: &[u8]) -> Result<Self, DocumentError> {
        let document = Document::load_mem(input_pdf)?;
        if document.is_encrypted() {
            return Err(DocumentError::Encrypted);
        }

        let pages = document.get_pages();
        if pages.is_empty() {
            return Err(DocumentError::NoPages);
        }

        let extracted_pages = whole_document_text(input_pdf).and_then(|text| {
            let split = split_text_into_pages(&text);
            if split.len() == pages.len() {
                Some(split)
            } else {
                tracing::debug!(
                    expected = pages.len(),
                    found = split.len(),
                    "pdf-extract page split does not match the page tree"
                );
                None
            }
        });

        Ok(Self {
            document,
            pages,
            extracted_pages,
        })
    }

    pub(crate) fn page_count(&self) -> u32 {
        u32::try_from(self.pages.len()).unwrap_or(u32::MAX)
    }

    /// Best available text for a 1-based page number.
    pub(crate) fn page_text(&self, page_number: u32) -> Result<String, DocumentError> {
        let page_id = *self
            .pages
            .get(&page_number)
            .ok_or(DocumentError::PageOutOfRange(page_number))?;
        let index = self
            .pages
            .keys()
            .position(|number| *number == page_number)
            .unwrap_or_default();

        let mut candidates = Vec::new();
        if let Some(text) = self
            .extracted_pages
            .as_ref()
            .and_then(|pages| pages.get(index))
            .filter(|text| !text.trim().is_empty())
        {
            candidates.push(text.clone());
        }
        if let Some(text) = extract_text_from_page_content(&self.document, page_id) {
            candidates.push(text);
        }
        if let Some(text) = self
            .document
            .extract_text(&[page_number])
            .ok()
            .filter(|text| !text.trim().is_empty())
        {
            candidates.push(text);
        }

        Ok(candidates
            .into_iter()
            .max_by_key(|text| extraction_quality_score(text))
            .unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use crate::pdf_reader::{
        decode_pdf_bytes, extraction_quality_score, guarded_extract, looks_decoding_broken,
        split_text_into_pages,
    };

    #[test]
    fn panicking_extractor_drops_candidate() {
        let text = guarded_extract(|| -> Result<String, String> {
            panic!("unsupported font encoding")
        });
        assert_eq!(text, None);
    }

    #[test]
    fn failing_extractor_drops_candidate() {
        assert_eq!(guarded_extract(|| Err::<String, _>("bad xref")), None);
        assert_eq!(
            guarded_extract(|| Ok::<_, String>("A  B".to_string())),
            Some("A  B".to_string())
        );
    }

    #[test]
    fn splits_form_feed_delimited_pages() {
        let pages = split_text_into_pages("p1\u{000C}p2\u{000C}");
        assert_eq!(pages, vec!["p1", "p2"]);
    }

    #[test]
    fn decodes_big5_when_encoding_hint_is_present() {
        let (bytes, _, had_errors) = encoding_rs::BIG5.encode("南下");
        assert!(!had_errors);
        let decoded = decode_pdf_bytes(Some("ETen-B5-H"), &bytes);
        assert_eq!(decoded, "南下");
    }

    #[test]
    fn flags_replacement_heavy_text_as_broken() {
        assert!(looks_decoding_broken("\u{FFFD}\u{FFFD}ab"));
        assert!(!looks_decoding_broken("Taipei  06:30"));
    }

    #[test]
    fn tabular_text_outscores_prose() {
        let table = "Station  Dep  Arr\nTaipei  06:30  07:15";
        let prose = "Introduction\nSchedule";
        assert!(extraction_quality_score(table) > extraction_quality_score(prose));
        assert_eq!(extraction_quality_score("   "), i64::MIN / 4);
    }
}
