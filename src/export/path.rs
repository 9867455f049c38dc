use chrono::NaiveDate;
use std::collections::{HashMap, HashSet};

/// Longest normalized path segment, in characters.
pub const MAX_SEGMENT_CHARS: usize = 80;

/// Segment used when nothing survives normalization.
pub const FALLBACK_SEGMENT: &str = "unknown";

/// Characters that are rejected by common filesystems or would add path levels.
const HOSTILE_CHARS: &[char] = &['<', '>', ':', '"', '/', '\\', '|', '?', '*'];

/// Turn free text into one safe path segment.
///
/// Trims, drops control and [`HOSTILE_CHARS`], collapses whitespace runs to
/// a single `_` and truncates to [`MAX_SEGMENT_CHARS`]. A segment left
/// empty or made only of dots (`.`, `..`) becomes [`FALLBACK_SEGMENT`].
pub fn normalize_segment(raw: &str) -> String {
    let stripped: String = raw
        .trim()
        .chars()
        .filter(|c| !c.is_control() && !HOSTILE_CHARS.contains(c))
        .collect();

    let collapsed = stripped.split_whitespace().collect::<Vec<_>>().join("_");
    let truncated: String = collapsed.chars().take(MAX_SEGMENT_CHARS).collect();

    if truncated.chars().all(|c| c == '.') {
        FALLBACK_SEGMENT.to_string()
    } else {
        truncated
    }
}

/// Entry names already handed out within one archive.
#[derive(Debug, Default)]
pub struct PathRegistry {
    used: HashSet<String>,
    /// Files seen per `{org}/{type}/{date}` group
    groups: HashMap<String, u32>,
}

impl PathRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `preferred`, or the first free `numbered(n)` for n = 2, 3, ...
    pub fn claim(&mut self, preferred: String, numbered: impl Fn(u32) -> String) -> String {
        if self.used.insert(preferred.clone()) {
            return preferred;
        }
        self.first_free(2, numbered)
    }

    fn first_free(&mut self, mut n: u32, numbered: impl Fn(u32) -> String) -> String {
        loop {
            let candidate = numbered(n);
            if self.used.insert(candidate.clone()) {
                return candidate;
            }
            n += 1;
        }
    }

    /// Claim `{org}/{type}/{date}_{name}` for a file.
    ///
    /// The k-th file of an org/type/date group (k >= 2) gets `_{k}` inserted
    /// after the date, counting up further while that path is taken, so
    /// numbering follows the order files are registered in.
    pub fn archive_path(
        &mut self,
        organization_name: &str,
        file_type: &str,
        date: NaiveDate,
        file_name: &str,
    ) -> String {
        let dir = format!(
            "{}/{}",
            normalize_segment(organization_name),
            normalize_segment(file_type)
        );
        let date = date.format("%Y-%m-%d").to_string();
        let name = normalize_segment(file_name);

        let seen = self.groups.entry(format!("{dir}/{date}")).or_insert(0);
        *seen += 1;
        let position = *seen;

        if position == 1 {
            return self.claim(format!("{dir}/{date}_{name}"), |n| {
                format!("{dir}/{date}_{n}_{name}")
            });
        }
        self.first_free(position, |n| format!("{dir}/{date}_{n}_{name}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn day(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn collapses_whitespace() {
        assert_eq!(normalize_segment("  Civil   Fleet \t"), "Civil_Fleet");
        assert_eq!(normalize_segment("a b\u{00A0}c"), "a_b_c");
    }

    #[test]
    fn strips_hostile_characters() {
        assert_eq!(normalize_segment(r#"inv<o>i:c"e/2\0|2?4*.pdf"#), "invoice2024.pdf");
        assert_eq!(normalize_segment("line\nbreak\u{7}"), "linebreak");
    }

    #[test]
    fn empty_becomes_fallback() {
        assert_eq!(normalize_segment(""), FALLBACK_SEGMENT);
        assert_eq!(normalize_segment("  ?*  "), FALLBACK_SEGMENT);
    }

    #[test]
    fn dot_segments_cannot_climb_directories() {
        assert_eq!(normalize_segment(".."), FALLBACK_SEGMENT);
        assert_eq!(normalize_segment(" . "), FALLBACK_SEGMENT);
        assert_eq!(normalize_segment("..."), FALLBACK_SEGMENT);
        assert_eq!(normalize_segment("../.."), FALLBACK_SEGMENT);
        assert_eq!(normalize_segment(".hidden"), ".hidden");

        let mut registry = PathRegistry::new();
        let path = registry.archive_path("..", "..", day(2024, 1, 5), "A.pdf");
        assert_eq!(path, "unknown/unknown/2024-01-05_A.pdf");
        assert!(path.split('/').all(|segment| segment != ".." && segment != "."));
    }

    #[test]
    fn truncates_by_characters() {
        let long = "é".repeat(100);
        let out = normalize_segment(&long);
        assert_eq!(out.chars().count(), MAX_SEGMENT_CHARS);
    }

    #[test]
    fn stripping_can_expose_whitespace() {
        assert_eq!(normalize_segment("a ? b"), "a_b");
        assert_eq!(normalize_segment("report ?"), "report");
    }

    #[test]
    fn duplicate_paths_get_numbered() {
        let mut registry = PathRegistry::new();
        let date = day(2024, 1, 5);
        let paths: Vec<_> = (0..3)
            .map(|_| registry.archive_path("Civil Fleet", "RECEIPT", date, "A.pdf"))
            .collect();

        assert_eq!(
            paths,
            [
                "Civil_Fleet/RECEIPT/2024-01-05_A.pdf",
                "Civil_Fleet/RECEIPT/2024-01-05_2_A.pdf",
                "Civil_Fleet/RECEIPT/2024-01-05_3_A.pdf",
            ]
        );
    }

    #[test]
    fn later_files_of_a_group_are_numbered() {
        let mut registry = PathRegistry::new();
        let paths = [
            registry.archive_path("Civil Fleet", "RECEIPT", day(2024, 1, 5), "A.pdf"),
            registry.archive_path("Civil Fleet", "RECEIPT", day(2024, 1, 5), "B.pdf"),
            registry.archive_path("Other Org", "REPORT", day(2024, 2, 1), "C.pdf"),
            registry.archive_path("Civil Fleet", "RECEIPT", day(2024, 1, 6), "A.pdf"),
        ];
        assert_eq!(
            paths,
            [
                "Civil_Fleet/RECEIPT/2024-01-05_A.pdf",
                "Civil_Fleet/RECEIPT/2024-01-05_2_B.pdf",
                "Other_Org/REPORT/2024-02-01_C.pdf",
                "Civil_Fleet/RECEIPT/2024-01-06_A.pdf",
            ]
        );
    }

    #[test]
    fn group_numbering_skips_taken_paths() {
        let mut registry = PathRegistry::new();
        let date = day(2024, 1, 5);
        let first = registry.archive_path("o", "t", date, "2_B.pdf");
        let second = registry.archive_path("o", "t", date, "B.pdf");
        assert_eq!(first, "o/t/2024-01-05_2_B.pdf");
        assert_eq!(second, "o/t/2024-01-05_3_B.pdf");
    }

    #[test]
    fn names_equal_after_normalization_collide() {
        let mut registry = PathRegistry::new();
        let date = day(2024, 2, 1);
        let first = registry.archive_path("Other Org", "REPORT", date, "C.pdf");
        let second = registry.archive_path("Other  Org", "REPORT", date, " C.pdf ");
        assert_eq!(first, "Other_Org/REPORT/2024-02-01_C.pdf");
        assert_eq!(second, "Other_Org/REPORT/2024-02-01_2_C.pdf");
    }

    #[test]
    fn numbered_candidate_already_taken() {
        let mut registry = PathRegistry::new();
        registry.claim("x".to_string(), |n| format!("x{n}"));
        registry.claim("x2".to_string(), |n| format!("x2-{n}"));
        assert_eq!(registry.claim("x".to_string(), |n| format!("x{n}")), "x3");
    }
}
