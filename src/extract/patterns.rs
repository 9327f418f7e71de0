// Compiled field patterns.
//
// Each pattern is compiled once and used as a pure function from a string
// to an optional capture.

use std::sync::LazyLock;

use percent_encoding::percent_decode_str;
use regex_lite::Regex;

static REPLIES: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(\d[\d,]*)\s+repl(?:y|ies)\b").expect("replies pattern compiles")
});

static RETWEETS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(\d[\d,]*)\s+(?:retweets?|reposts?)\b").expect("retweets pattern compiles")
});

static LIKES: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(\d[\d,]*)\s+likes?\b").expect("likes pattern compiles")
});

static HASHTAG_LINK: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?:https?://[^/]+)?/hashtag/([^\s?/#]+)").expect("hashtag pattern compiles")
});

static PROFILE_LINK: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?:https?://[^/]+)?/([^\s/?#]+)").expect("profile pattern compiles")
});

/// Which engagement counter a pattern reads.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Counter {
    Replies,
    Retweets,
    Likes,
}

impl Counter {
    pub const ALL: [Counter; 3] = [Counter::Replies, Counter::Retweets, Counter::Likes];

    pub fn field(&self) -> &'static str {
        match self {
            Counter::Replies => "replies",
            Counter::Retweets => "retweets",
            Counter::Likes => "likes",
        }
    }

    fn pattern(&self) -> &'static Regex {
        match self {
            Counter::Replies => &*REPLIES,
            Counter::Retweets => &*RETWEETS,
            Counter::Likes => &*LIKES,
        }
    }

    /// The raw number this counter's pattern captures in `label`, if any.
    pub fn capture<'a>(&self, label: &'a str) -> Option<&'a str> {
        self.pattern()
            .captures(label)
            .and_then(|caps| caps.get(1))
            .map(|m| m.as_str())
    }
}

/// Parse a captured count such as `1,204`. `None` when it doesn't fit.
pub fn parse_count(raw: &str) -> Option<i64> {
    let digits: String = raw.chars().filter(|c| *c != ',').collect();
    digits.parse::<i64>().ok()
}

/// Tag slug of a hashtag link (`/hashtag/Rust?src=hashtag_click` -> `Rust`).
pub fn hashtag_slug(href: &str) -> Option<&str> {
    HASHTAG_LINK
        .captures(href)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str())
}

/// Handle of a profile link (`/bob` or `https://x.com/bob/` -> `bob`).
pub fn profile_handle(href: &str) -> Option<&str> {
    PROFILE_LINK
        .captures(href)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str())
}

/// Normalize tag text so the same tag always maps to the same row:
/// percent-decoded, leading '#' stripped, lowercased.
pub fn normalize_hashtag(raw: &str) -> Option<String> {
    let decoded = percent_decode_str(raw).decode_utf8_lossy();
    let tag = decoded.trim().trim_start_matches('#').trim().to_lowercase();
    if tag.is_empty() {
        None
    } else {
        Some(tag)
    }
}
