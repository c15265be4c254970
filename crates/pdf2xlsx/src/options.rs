use std::ops::RangeInclusive;
use std::str::FromStr;

use crate::filename::FilenameTemplate;

/// Set of 1-based page numbers, parsed from strings like `1-3,5`. Ranges are
/// kept as spans, so parsing cost does not grow with the range width.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageSelection {
    spans: Vec<RangeInclusive<u32>>,
}

impl PageSelection {
    #[must_use]
    pub fn contains(&self, page: u32) -> bool {
        self.spans.iter().any(|span| span.contains(&page))
    }
}

impl FromStr for PageSelection {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let mut spans = Vec::new();
        for token in value.split(',').map(str::trim).filter(|s| !s.is_empty()) {
            if let Some((start, end)) = token.split_once('-') {
                let start: u32 = start
                    .trim()
                    .parse()
                    .map_err(|_| format!("invalid page range start: '{start}'"))?;
                let end: u32 = end
                    .trim()
                    .parse()
                    .map_err(|_| format!("invalid page range end: '{end}'"))?;
                if start == 0 || end == 0 {
                    return Err("pages are 1-based".to_string());
                }
                if end < start {
                    return Err(format!(
                        "invalid range '{token}': end is smaller than start"
                    ));
                }
                spans.push(start..=end);
            } else {
                let page: u32 = token
                    .parse()
                    .map_err(|_| format!("invalid page number: '{token}'"))?;
                if page == 0 {
                    return Err("pages are 1-based".to_string());
                }
                spans.push(page..=page);
            }
        }

        if spans.is_empty() {
            return Err("page selection cannot be empty".to_string());
        }

        Ok(Self { spans })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConvertOptions {
    pub pages: Option<PageSelection>,
    /// Minimum cells a text line needs to count as a table row.
    pub min_cols: usize,
    /// Append a direction suffix (南下/北上) to sheet names of timetable pages.
    pub directional_naming: bool,
    pub filename_template: FilenameTemplate,
}

impl ConvertOptions {
    /// Preset for bilingual railway timetables.
    #[must_use]
    pub fn timetable() -> Self {
        Self {
            directional_naming: true,
            filename_template: FilenameTemplate::timetable(),
            ..Self::default()
        }
    }
}

impl Default for ConvertOptions {
    fn default() -> Self {
        Self {
            pages: None,
            min_cols: 2,
            directional_naming: false,
            filename_template: FilenameTemplate::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{ConvertOptions, PageSelection};
    use crate::filename::FilenameTemplate;
    use std::str::FromStr;

    #[test]
    fn parse_page_selection_range_and_single() {
        let selection = PageSelection::from_str("1-3,5").expect("selection should parse");
        assert!(selection.contains(1));
        assert!(selection.contains(2));
        assert!(selection.contains(3));
        assert!(selection.contains(5));
        assert!(!selection.contains(4));
    }

    #[test]
    fn reject_invalid_page_selection() {
        let err = PageSelection::from_str("3-1").expect_err("invalid range should fail");
        assert!(err.contains("invalid range"));
        let err = PageSelection::from_str("0").expect_err("zero page should fail");
        assert!(err.contains("1-based"));
        let err = PageSelection::from_str(" , ").expect_err("empty selection should fail");
        assert!(err.contains("cannot be empty"));
    }

    #[test]
    fn full_width_range_parses_without_enumerating_pages() {
        let selection =
            PageSelection::from_str("1-4294967295").expect("full u32 range should parse");
        assert!(selection.contains(1));
        assert!(selection.contains(u32::MAX));
        assert!(!selection.contains(0));
    }

    #[test]
    fn timetable_preset_enables_directional_naming() {
        let options = ConvertOptions::timetable();
        assert!(options.directional_naming);
        assert_eq!(options.filename_template, FilenameTemplate::timetable());
        assert!(!ConvertOptions::default().directional_naming);
    }
}
