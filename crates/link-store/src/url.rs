//! Operator input helpers for URLs.

const DEFAULT_SCHEME: &str = "https://";

/// Trims `input` and prefixes `https://` unless it already starts with
/// `http://` or `https://`. Returns `None` for blank input.
pub fn normalize_url(input: &str) -> Option<String> {
    let url = input.trim();
    if url.is_empty() {
        return None;
    }
    if url.starts_with("http://") || url.starts_with("https://") {
        Some(url.to_owned())
    } else {
        Some(format!("{DEFAULT_SCHEME}{url}"))
    }
}

/// Parses one URL per line, skipping blank lines.
pub fn parse_url_list(text: &str) -> Vec<String> {
    text.lines().filter_map(normalize_url).collect()
}

/// Default shortcut name for `url`: everything before the first `/` once
/// the scheme is stripped.
pub fn suggest_name(url: &str) -> String {
    let rest = url
        .trim()
        .trim_start_matches("https://")
        .trim_start_matches("http://");
    rest.split('/').next().unwrap_or(rest).to_owned()
}
