use crate::model::RawTable;
use crate::table_parse::{
    looks_like_sentence, modal_width, soft_split_line_into_cells, split_line_into_cells,
};

pub(crate) const LOW_CONFIDENCE_THRESHOLD: f32 = 0.60;

/// Column consistency of a candidate table in `0.0..=1.0`.
pub(crate) fn table_confidence(rows: &[Vec<String>]) -> f32 {
    if rows.len() < 2 {
        return 0.0;
    }

    let modal = modal_width(rows);
    if modal == 0 {
        return 0.0;
    }

    let consistent =
        rows.iter().filter(|row| row.len() == modal).count() as f32 / rows.len() as f32;
    let max_width = rows.iter().map(Vec::len).max().unwrap_or(modal);
    let min_width = rows.iter().map(Vec::len).min().unwrap_or(modal);
    let uniformity = if max_width == 0 {
        0.0
    } else {
        1.0 - ((max_width - min_width) as f32 / max_width as f32)
    };

    (consistent * 0.75 + uniformity * 0.25).clamp(0.0, 1.0)
}

fn row_cells(line: &str, min_cols: usize) -> Option<Vec<String>> {
    let cells = split_line_into_cells(line);
    if cells.len() >= min_cols {
        return Some(cells);
    }

    let soft_cells = soft_split_line_into_cells(line);
    let has_numeric = soft_cells
        .iter()
        .any(|cell| cell.chars().any(|ch| ch.is_ascii_digit()));
    if soft_cells.len() >= min_cols
        && !looks_like_sentence(line)
        && (has_numeric || soft_cells.len() <= 6)
    {
        return Some(soft_cells);
    }

    None
}

/// Finds tables in one page's text. Consecutive row-like lines form a
/// table; any other line ends it. Single-row runs are discarded.
pub(crate) fn detect_tables_in_page(
    page_number: u32,
    text: &str,
    min_cols: usize,
) -> Vec<RawTable> {
    let mut tables = Vec::new();
    let mut current_rows: Vec<Vec<String>> = Vec::new();

    let flush_current = |rows: &mut Vec<Vec<String>>, tables: &mut Vec<RawTable>| {
        if rows.len() < 2 {
            rows.clear();
            return;
        }

        let confidence = table_confidence(rows);
        if confidence < LOW_CONFIDENCE_THRESHOLD {
            tracing::warn!(
                page = page_number,
                rows = rows.len(),
                confidence,
                "table confidence is low; exporting in best-effort mode"
            );
        }
        tables.push(RawTable::from_text_rows(std::mem::take(rows)));
    };

    for line in text.lines() {
        match row_cells(line, min_cols) {
            Some(cells) => current_rows.push(cells),
            None => flush_current(&mut current_rows, &mut tables),
        }
    }
    flush_current(&mut current_rows, &mut tables);

    tables
}
