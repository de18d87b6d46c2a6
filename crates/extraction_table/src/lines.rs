//! Line-level recognizers shared by classification and parsing.

use std::sync::LazyLock;

use regex::Regex;

static CITATION_CODE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\[\[C:[^\]]*\]\]").expect("valid citation pattern"));
static CODE_FENCE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)^```[A-Za-z0-9_-]*\s*\n(.*?)\n?```$").expect("valid fence pattern")
});
static KEY_VALUE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*(?:[-*•]\s+)?\**([A-Za-z0-9][^:|*]{0,79}?)\**\s*:\s*\**\s*(\S.*?)\s*$")
        .expect("valid key-value pattern")
});
static JSON_FRAGMENT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*(\{.*\}|\[.*\])\s*$").expect("valid fragment pattern"));
static SEPARATOR_CELL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^:?-+:?$").expect("valid separator pattern"));

pub(crate) static SECTION: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*##\s+(.+?)\s*$").expect("valid section pattern"));
pub(crate) static DESCRIPTION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*[-*]\s*\*\*Description:\*\*\s*(.*?)\s*$").expect("valid description pattern")
});
pub(crate) static VALUE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*[-*]\s*\*\*Value:\*\*\s*(.*?)\s*$").expect("valid value pattern")
});

/// Removes `[[C:...]]` citation codes and a surrounding markdown code fence.
pub fn prepare_text(raw: &str) -> String {
    let stripped = CITATION_CODE.replace_all(raw, "");
    let trimmed = stripped.trim();
    match CODE_FENCE.captures(trimmed) {
        Some(caps) => caps[1].trim().to_string(),
        None => trimmed.to_string(),
    }
}

pub(crate) fn key_value(line: &str) -> Option<(String, String)> {
    let caps = KEY_VALUE.captures(line)?;
    let key = caps[1].trim();
    let value = caps[2].trim();
    // `https://...` is a URL, not a field.
    if key.is_empty() || value.starts_with("//") {
        return None;
    }
    Some((key.to_string(), value.to_string()))
}

/// Cells of a `|`-delimited line, outer pipes removed. Needs two cells.
pub(crate) fn pipe_cells(line: &str) -> Option<Vec<String>> {
    let line = line.trim();
    if !line.contains('|') {
        return None;
    }
    let inner = line.strip_prefix('|').unwrap_or(line);
    let inner = inner.strip_suffix('|').unwrap_or(inner);
    let cells: Vec<String> = inner.split('|').map(|c| c.trim().to_string()).collect();
    (cells.len() >= 2).then_some(cells)
}

pub(crate) fn is_separator_row(cells: &[String]) -> bool {
    cells
        .iter()
        .all(|cell| cell.is_empty() || SEPARATOR_CELL.is_match(cell))
}

pub(crate) fn json_fragment(line: &str) -> Option<&str> {
    JSON_FRAGMENT
        .captures(line)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str())
}

pub(crate) fn strip_backticks(value: &str) -> &str {
    value
        .strip_prefix('`')
        .and_then(|v| v.strip_suffix('`'))
        .unwrap_or(value)
        .trim()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prepare_strips_citations_and_fences() {
        assert_eq!(prepare_text("Total: 5 [[C:12]]"), "Total: 5");
        assert_eq!(prepare_text("```json\n[{\"a\":1}]\n```"), "[{\"a\":1}]");
    }

    #[test]
    fn recognizes_key_value_variants() {
        assert_eq!(
            key_value("Party Name: Alice"),
            Some(("Party Name".to_string(), "Alice".to_string()))
        );
        assert_eq!(
            key_value("- **Court:** High Court"),
            Some(("Court".to_string(), "High Court".to_string()))
        );
        assert_eq!(key_value("https://example.com"), None);
        assert_eq!(key_value("no separator here"), None);
        assert_eq!(key_value("Empty:"), None);
    }

    #[test]
    fn splits_pipe_rows() {
        assert_eq!(
            pipe_cells("| Name | Age |"),
            Some(vec!["Name".to_string(), "Age".to_string()])
        );
        assert_eq!(pipe_cells("a|b|c").map(|c| c.len()), Some(3));
        assert_eq!(pipe_cells("just |"), None);
        assert_eq!(pipe_cells("|only|"), None);
        assert!(is_separator_row(&pipe_cells("|---|:--:|").expect("cells")));
    }

    #[test]
    fn finds_json_fragments() {
        assert_eq!(json_fragment("  {\"a\": 1}  "), Some("{\"a\": 1}"));
        assert_eq!(json_fragment("prefix {\"a\": 1}"), None);
    }
}
