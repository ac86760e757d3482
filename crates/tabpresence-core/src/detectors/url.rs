use once_cell::sync::Lazy;
use regex::Regex;

/// URL heuristics, tried strictest first
static URL_PATTERNS: Lazy<[Regex; 3]> = Lazy::new(|| {
    [
        // Absolute http(s) URL
        Regex::new(r"https?://\S+").expect("Invalid http URL regex"),
        // Bare www. host
        Regex::new(r"www\.\S+\.\S+").expect("Invalid www URL regex"),
        // Loose host/path
        Regex::new(r"\S+\.[a-z]{2,}/\S*").expect("Invalid host/path regex"),
    ]
});

/// Extract the first URL-looking substring from a raw window title
///
/// Best effort only: most titles are page names and yield an empty string.
pub fn extract_url(title: &str) -> String {
    URL_PATTERNS
        .iter()
        .find_map(|re| re.find(title))
        .map(|m| m.as_str().to_string())
        .unwrap_or_default()
}
