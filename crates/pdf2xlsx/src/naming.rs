use std::fmt::{Display, Formatter};
use std::sync::LazyLock;

use regex::Regex;

static SOUTHBOUND_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)南下|south[\s-]*bound").expect("hardcoded southbound regex is valid")
});

static NORTHBOUND_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)北上|north[\s-]*bound").expect("hardcoded northbound regex is valid")
});

/// Label of one sheet in the output workbook.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SheetName(String);

impl SheetName {
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// `Page_<n>` for a 1-based page number.
    #[must_use]
    pub fn for_page(page_number: u32) -> Self {
        Self(format!("Page_{page_number}"))
    }

    #[must_use]
    pub fn with_suffix(self, suffix: &str) -> Self {
        Self(format!("{}_{suffix}", self.0))
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for SheetName {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Travel direction printed on bilingual timetable pages.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Southbound,
    Northbound,
}

impl Direction {
    /// Southbound markers are checked first, so a page carrying both
    /// headers is named southbound.
    #[must_use]
    pub fn detect(text: &str) -> Option<Self> {
        if SOUTHBOUND_RE.is_match(text) {
            Some(Self::Southbound)
        } else if NORTHBOUND_RE.is_match(text) {
            Some(Self::Northbound)
        } else {
            None
        }
    }

    #[must_use]
    pub const fn suffix(self) -> &'static str {
        match self {
            Self::Southbound => "南下",
            Self::Northbound => "北上",
        }
    }
}

#[must_use]
pub fn sheet_name_for_page(page_number: u32, page_text: &str, directional: bool) -> SheetName {
    let base = SheetName::for_page(page_number);
    if !directional {
        return base;
    }

    match Direction::detect(page_text) {
        Some(direction) => base.with_suffix(direction.suffix()),
        None => base,
    }
}

#[cfg(test)]
mod tests {
    use super::{Direction, SheetName, sheet_name_for_page};

    #[test]
    fn base_name_uses_one_based_page_number() {
        assert_eq!(sheet_name_for_page(1, "", false).as_str(), "Page_1");
        assert_eq!(sheet_name_for_page(12, "南下", false).as_str(), "Page_12");
    }

    #[test]
    fn detects_localized_and_english_markers() {
        assert_eq!(Direction::detect("台灣高鐵 南下時刻表"), Some(Direction::Southbound));
        assert_eq!(Direction::detect("SOUTHBOUND trains"), Some(Direction::Southbound));
        assert_eq!(Direction::detect("North-bound"), Some(Direction::Northbound));
        assert_eq!(Direction::detect("北上 Taipei"), Some(Direction::Northbound));
        assert_eq!(Direction::detect("Timetable"), None);
    }

    #[test]
    fn southbound_wins_when_both_markers_appear() {
        let name = sheet_name_for_page(3, "北上 Northbound / 南下 Southbound", true);
        assert_eq!(name.as_str(), "Page_3_南下");
    }

    #[test]
    fn directional_suffixes() {
        assert_eq!(sheet_name_for_page(2, "Northbound", true).as_str(), "Page_2_北上");
        assert_eq!(sheet_name_for_page(4, "no marker", true).as_str(), "Page_4");
        assert_eq!(SheetName::for_page(5).with_suffix("x").to_string(), "Page_5_x");
    }
}
