//! Free-text field normalization: delimiter splitting, keyword dedup,
//! category-path flattening and XML escaping.

use std::collections::BTreeSet;
use std::sync::LazyLock;

use quick_xml::escape::partial_escape;
use regex::Regex;

/// Matches a GCMD-style hierarchy separator (`Oceans > Ocean Temperature`).
static CATEGORY_SEP_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s+>\s+").expect("category separator regex"));

/// Split on `delimiter` and trim each piece.
///
/// Returns `None` for absent or blank input, never an empty list. Empty
/// pieces (`"a,,b"`) are dropped.
pub fn split_and_strip(raw: Option<&str>, delimiter: char) -> Option<Vec<String>> {
    let raw = raw?;
    let parts: Vec<String> = raw
        .split(delimiter)
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .map(String::from)
        .collect();

    if parts.is_empty() { None } else { Some(parts) }
}

/// Deduplicate a comma-joined keyword field.
///
/// Source ordering is not kept; tokens come back sorted so repeated runs
/// produce identical output. Absent input stays absent.
pub fn dedup_keywords(raw: Option<&str>) -> Option<String> {
    let unique: BTreeSet<String> = split_and_strip(raw, ',')?.into_iter().collect();
    Some(unique.into_iter().collect::<Vec<_>>().join(","))
}

/// Split a keyword field into a deduplicated, sorted list.
pub fn keyword_list(raw: Option<&str>) -> Vec<String> {
    split_and_strip(raw, ',')
        .map(|parts| {
            parts
                .into_iter()
                .collect::<BTreeSet<_>>()
                .into_iter()
                .collect()
        })
        .unwrap_or_default()
}

/// Flatten a category path into plain comma-separated terms.
///
/// `Oceans > Ocean Chemistry/Salinity (PSU)` becomes
/// `Oceans, Ocean Chemistry-Salinity PSU`.
pub fn normalize_category_path(raw: &str) -> String {
    CATEGORY_SEP_RE
        .replace_all(raw, ", ")
        .replace('/', "-")
        .replace(['(', ')'], "")
}

/// Escape `&`, `<` and `>` for embedding in XML text. Quotes are left alone.
pub fn escape_xml(raw: &str) -> String {
    partial_escape(raw).into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn split_absent_and_blank_are_none() {
        assert_eq!(split_and_strip(None, ','), None);
        assert_eq!(split_and_strip(Some(""), ','), None);
        assert_eq!(split_and_strip(Some("  ,  "), ','), None);
    }

    #[test]
    fn split_trims_each_piece() {
        assert_eq!(
            split_and_strip(Some("a, b ,c"), ','),
            Some(vec!["a".to_string(), "b".to_string(), "c".to_string()])
        );
        assert_eq!(
            split_and_strip(Some("x; y;;z"), ';'),
            Some(vec!["x".to_string(), "y".to_string(), "z".to_string()])
        );
    }

    #[test]
    fn dedup_removes_repeats() {
        let deduped = dedup_keywords(Some("salinity, temperature,salinity , oxygen")).unwrap();
        let tokens: BTreeSet<&str> = deduped.split(',').collect();
        assert_eq!(tokens, BTreeSet::from(["oxygen", "salinity", "temperature"]));
        assert_eq!(deduped.split(',').count(), 3);
    }

    #[test]
    fn dedup_is_idempotent() {
        let once = dedup_keywords(Some("b, a, b, c, a")).unwrap();
        let twice = dedup_keywords(Some(&once)).unwrap();
        let first: BTreeSet<&str> = once.split(',').collect();
        let second: BTreeSet<&str> = twice.split(',').collect();
        assert_eq!(first, second);
    }

    #[test]
    fn dedup_missing_field_is_none() {
        assert_eq!(dedup_keywords(None), None);
    }

    #[test]
    fn keyword_list_is_sorted_and_unique() {
        assert_eq!(keyword_list(Some("waves, tide, waves")), vec!["tide", "waves"]);
        assert!(keyword_list(None).is_empty());
    }

    #[test]
    fn category_path_flattening() {
        assert_eq!(
            normalize_category_path("Oceans > Ocean Chemistry/Salinity (PSU)"),
            "Oceans, Ocean Chemistry-Salinity PSU"
        );
        assert_eq!(normalize_category_path("plain"), "plain");
    }

    #[test]
    fn xml_escaping() {
        assert_eq!(escape_xml("a&b <c> \"d\" 'e'"), "a&amp;b &lt;c&gt; \"d\" 'e'");
        assert_eq!(escape_xml("plain"), "plain");
    }
}
