use std::sync::LazyLock;

use regex::Regex;

static WHITESPACE_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+").unwrap());
static PUNCT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"[«»"'()\[\]!?.,;:]"#).unwrap());
static QUERY_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\?.*$").unwrap());

/// Grouping key for a company display name. Two names with the same key are
/// the same company; nothing else is consulted.
pub fn normalize_name(name: &str) -> String {
    let collapsed = WHITESPACE_RE.replace_all(name.trim(), " ");
    let upper = collapsed.to_uppercase();
    let stripped = PUNCT_RE.replace_all(&upper, "");
    // stripping "a ( b" leaves a double space; collapse again so the key is a fixed point
    WHITESPACE_RE.replace_all(stripped.trim(), " ").into_owned()
}

/// Canonical form of a site URL: lowercase, https scheme, no query, no trailing slash.
pub fn normalize_url(url: &str) -> String {
    let trimmed = url.trim().to_lowercase();
    if trimmed.is_empty() {
        return String::new();
    }
    let with_scheme = if trimmed.starts_with("http://") || trimmed.starts_with("https://") {
        trimmed
    } else {
        format!("https://{}", trimmed)
    };
    let no_query = QUERY_RE.replace(&with_scheme, "");
    no_query
        .strip_suffix('/')
        .unwrap_or(&no_query)
        .to_string()
}
