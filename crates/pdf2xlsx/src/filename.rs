use chrono::NaiveDateTime;

pub const STEM_PLACEHOLDER: &str = "{stem}";
pub const TIMESTAMP_PLACEHOLDER: &str = "{timestamp}";
pub const TIMESTAMP_FORMAT: &str = "%Y%m%d_%H%M%S";

const FALLBACK_STEM: &str = "document";

/// Download file name pattern with `{stem}` and `{timestamp}` placeholders.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilenameTemplate(String);

impl FilenameTemplate {
    pub const CONVERTED: &'static str = "{stem}_converted_{timestamp}.xlsx";
    pub const TIMETABLE: &'static str = "thsr_schedule_{timestamp}.xlsx";

    #[must_use]
    pub fn new(template: impl Into<String>) -> Self {
        Self(template.into())
    }

    #[must_use]
    pub fn timetable() -> Self {
        Self::new(Self::TIMETABLE)
    }

    #[must_use]
    pub fn render(&self, original_name: &str, at: NaiveDateTime) -> String {
        let timestamp = at.format(TIMESTAMP_FORMAT).to_string();
        self.0
            .replace(STEM_PLACEHOLDER, &file_stem(original_name))
            .replace(TIMESTAMP_PLACEHOLDER, &timestamp)
    }
}

impl Default for FilenameTemplate {
    fn default() -> Self {
        Self::new(Self::CONVERTED)
    }
}

/// Base name of an uploaded file: directories and the last extension are
/// dropped. A name with nothing before its extension falls back to
/// `document`.
#[must_use]
pub fn file_stem(original_name: &str) -> String {
    let base = original_name
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or(original_name)
        .trim();
    let stem = base.rsplit_once('.').map_or(base, |(stem, _)| stem);

    if stem.is_empty() {
        FALLBACK_STEM.to_string()
    } else {
        stem.to_string()
    }
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use super::{FilenameTemplate, file_stem};

    fn at() -> chrono::NaiveDateTime {
        NaiveDate::from_ymd_opt(2026, 3, 7)
            .and_then(|date| date.and_hms_opt(9, 5, 1))
            .expect("valid datetime")
    }

    #[test]
    fn renders_default_template() {
        let name = FilenameTemplate::default().render("report.final.pdf", at());
        assert_eq!(name, "report.final_converted_20260307_090501.xlsx");
    }

    #[test]
    fn renders_timetable_template_without_stem() {
        let name = FilenameTemplate::timetable().render("whatever.pdf", at());
        assert_eq!(name, "thsr_schedule_20260307_090501.xlsx");
    }

    #[test]
    fn extension_only_name_renders_fallback_stem() {
        let name = FilenameTemplate::default().render(".pdf", at());
        assert_eq!(name, "document_converted_20260307_090501.xlsx");
    }

    #[test]
    fn stem_handles_paths_and_missing_extensions() {
        assert_eq!(file_stem("C:\\fakepath\\時刻表.pdf"), "時刻表");
        assert_eq!(file_stem("dir/notes"), "notes");
        assert_eq!(file_stem(".pdf"), "document");
        assert_eq!(file_stem("uploads/.pdf"), "document");
        assert_eq!(file_stem(""), "document");
    }
}
