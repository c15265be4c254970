use crate::model::{NormalizedTable, RawTable};

/// Coerces every cell to text. Missing values become empty strings; row
/// lengths are left as they are.
#[must_use]
pub fn normalize_table(table: &RawTable) -> NormalizedTable {
    let rows = table
        .rows
        .iter()
        .map(|row| {
            row.iter()
                .map(|cell| cell.clone().unwrap_or_default())
                .collect::<Vec<_>>()
        })
        .collect();

    NormalizedTable { rows }
}

/// Stacks a page's tables into one grid, in the order the extractor
/// returned them.
#[must_use]
pub fn merge_page_tables(tables: &[RawTable]) -> NormalizedTable {
    let total_rows = tables.iter().map(|table| table.rows.len()).sum();
    let mut rows = Vec::with_capacity(total_rows);
    for table in tables {
        rows.extend(normalize_table(table).rows);
    }

    NormalizedTable { rows }
}

#[cfg(test)]
mod tests {
    use crate::merge::{merge_page_tables, normalize_table};
    use crate::model::RawTable;

    fn text_row(cells: &[&str]) -> Vec<Option<String>> {
        cells.iter().map(|cell| Some((*cell).to_string())).collect()
    }

    #[test]
    fn missing_values_become_empty_strings() {
        let table = RawTable::new(vec![
            vec![Some("a".to_string()), None, Some("None".to_string())],
            vec![None, None],
        ]);

        let normalized = normalize_table(&table);
        assert_eq!(normalized.rows[0], vec!["a", "", "None"]);
        assert_eq!(normalized.rows[1], vec!["", ""]);
    }

    #[test]
    fn keeps_ragged_rows_unchanged() {
        let table = RawTable::new(vec![
            text_row(&["a"]),
            text_row(&["b", "c", "d"]),
            Vec::new(),
        ]);

        let normalized = normalize_table(&table);
        let widths = normalized.rows.iter().map(Vec::len).collect::<Vec<_>>();
        assert_eq!(widths, vec![1, 3, 0]);
        assert_eq!(normalized.column_count(), 3);
    }

    #[test]
    fn merges_tables_in_extractor_order() {
        let first = RawTable::new(vec![text_row(&["1"]), text_row(&["2"]), text_row(&["3"])]);
        let second = RawTable::new(vec![text_row(&["4", "x"]), text_row(&["5"])]);

        let merged = merge_page_tables(&[first, second]);
        assert_eq!(merged.row_count(), 5);
        let firsts = merged
            .rows
            .iter()
            .map(|row| row[0].as_str())
            .collect::<Vec<_>>();
        assert_eq!(firsts, vec!["1", "2", "3", "4", "5"]);
        assert_eq!(merged.rows[3], vec!["4", "x"]);
    }

    #[test]
    fn merging_nothing_yields_empty_grid() {
        assert!(merge_page_tables(&[]).is_empty());
    }
}
