use std::sync::LazyLock;

use regex::Regex;

static DATA_PREFIX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^data:\s*").expect("valid data prefix pattern"));
static SUP_CITATION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\s*<sup>\[\[.*?\]\]</sup>").expect("valid sup citation pattern")
});
static BARE_CITATION: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s*\[\[.*?\]\]").expect("valid bare citation pattern"));

/// Cleans one streamed content fragment for display.
///
/// Citation markers are removed together with the whitespace directly in
/// front of them, so `"Answer [[2]]"` becomes `"Answer"` while the leading
/// space of an ordinary token such as `" world"` is kept.
pub fn sanitize_content(content: &str) -> String {
    let without_prefix = DATA_PREFIX.replace(content, "");
    let without_sup = SUP_CITATION.replace_all(&without_prefix, "");
    BARE_CITATION.replace_all(&without_sup, "").into_owned()
}
