//! URL helpers shared by navigation and session persistence

use url::Url;

/// Normalize a board URL typed by a user: add the missing scheme and
/// leave anything that already has one untouched.
pub fn normalize_url(url: &str) -> String {
    let trimmed = url.trim();

    if trimmed.contains("://")
        || trimmed.starts_with("data:")
        || trimmed.starts_with("about:")
    {
        return trimmed.to_string();
    }

    if trimmed.starts_with("localhost") || trimmed.starts_with("127.0.0.1") {
        return format!("http://{}", trimmed);
    }

    format!("https://{}", trimmed)
}

/// Key under which a site's session is stored: lowercased host with a
/// leading `www.` removed. Falls back to the trimmed input when the URL
/// has no host.
pub fn site_key(url: &str) -> String {
    let normalized = normalize_url(url);
    match Url::parse(&normalized).ok().and_then(|u| u.host_str().map(str::to_lowercase)) {
        Some(host) => host.strip_prefix("www.").unwrap_or(&host).to_string(),
        None => url.trim().to_lowercase(),
    }
}

/// Collapse runs of whitespace into single spaces and trim the ends
pub fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Truncate to at most `max_chars` characters without splitting a code point
pub fn truncate_chars(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((byte_index, _)) => &text[..byte_index],
        None => text,
    }
}
