// Record extraction: fetched page markup -> structured post records.
//
// The page is parsed into a DOM once; each post container is handed to
// `extract_post` as its own fragment. Extraction is best-effort: a missing or
// malformed sub-element degrades that field to its default and is logged.
// Only a missing author rejects the record.

pub mod patterns;

use std::collections::BTreeSet;
use std::sync::LazyLock;

use scraper::{ElementRef, Html, Selector};
use tracing::{debug, info, warn};

use crate::error::IngestError;
use patterns::Counter;

pub use patterns::normalize_hashtag;

static POST_CONTAINER: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse(r#"[data-testid="tweet"]"#).expect("static selector"));
static ENGAGEMENT_GROUP: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse(r#"div[role="group"][aria-label]"#).expect("static selector"));
static ANCHOR: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("a[href]").expect("static selector"));
static PROFILE_LINK: LazyLock<Selector> = LazyLock::new(|| {
    Selector::parse(r#"a[aria-haspopup="false"][role="link"][href]"#).expect("static selector")
});
static AUTO_DIR: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse(r#"div[dir="auto"]"#).expect("static selector"));
static SPAN: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("span").expect("static selector"));
static POST_TEXT: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse(r#"div[lang][dir="auto"]"#).expect("static selector"));

/// One post as read from markup, before profile data is attached.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExtractedPost {
    pub author_handle: String,
    pub display_name: Option<String>,
    pub replies: i64,
    pub retweets: i64,
    pub likes: i64,
    pub hashtags: BTreeSet<String>,
    pub text: String,
}

/// Records that survived extraction, plus how many fragments were dropped.
#[derive(Debug, Default)]
pub struct ExtractionPass {
    pub records: Vec<ExtractedPost>,
    pub rejected: usize,
}

/// Split a fetched page into one markup fragment per post container.
pub fn split_posts(document: &str) -> Vec<String> {
    let html = Html::parse_document(document);
    html.select(&POST_CONTAINER).map(|el| el.html()).collect()
}

/// Extract every fragment, logging and counting the rejected ones.
pub fn extract_all(fragments: &[String]) -> ExtractionPass {
    let mut pass = ExtractionPass::default();

    for (index, fragment) in fragments.iter().enumerate() {
        match extract_post(fragment) {
            Ok(record) => pass.records.push(record),
            Err(e) => {
                warn!(fragment = index, error = %e, "Dropping post fragment");
                pass.rejected += 1;
            }
        }
    }

    info!(
        fragments = fragments.len(),
        extracted = pass.records.len(),
        rejected = pass.rejected,
        "Extraction pass complete"
    );

    pass
}

/// Extract one post record from its markup fragment.
pub fn extract_post(fragment: &str) -> Result<ExtractedPost, IngestError> {
    let html = Html::parse_fragment(fragment);
    let root = html.root_element();

    let author_handle = author_handle(&root)?;
    let (replies, retweets, likes) = engagement_counts(&root, &author_handle);

    Ok(ExtractedPost {
        display_name: display_name(&root),
        hashtags: hashtags(&root),
        text: post_text(&root, &author_handle),
        author_handle,
        replies,
        retweets,
        likes,
    })
}

fn author_handle(root: &ElementRef) -> Result<String, IngestError> {
    let link = root
        .select(&PROFILE_LINK)
        .next()
        .ok_or_else(|| IngestError::RecordRejected {
            reason: "no author profile link".to_string(),
        })?;

    let href = link.value().attr("href").unwrap_or_default();
    patterns::profile_handle(href)
        .map(str::to_string)
        .ok_or_else(|| IngestError::RecordRejected {
            reason: format!("author link `{href}` is not a profile path"),
        })
}

/// Replies, retweets and likes from the single engagement label.
fn engagement_counts(root: &ElementRef, handle: &str) -> (i64, i64, i64) {
    let labels: Vec<&str> = root
        .select(&ENGAGEMENT_GROUP)
        .filter_map(|el| el.value().attr("aria-label"))
        .collect();

    let label = match labels.as_slice() {
        [] => {
            let e = IngestError::ExtractionDegraded {
                field: "engagement",
                reason: "no engagement label".to_string(),
            };
            debug!(handle, error = %e, "Engagement counts defaulted");
            return (0, 0, 0);
        }
        [label] => *label,
        many => {
            let e = IngestError::ExtractionDegraded {
                field: "engagement",
                reason: format!("{} engagement labels, ambiguous", many.len()),
            };
            warn!(handle, error = %e, "Engagement counts defaulted");
            return (0, 0, 0);
        }
    };

    let mut counts = [0i64; 3];
    for (slot, counter) in counts.iter_mut().zip(Counter::ALL) {
        let Some(raw) = counter.capture(label) else {
            continue;
        };
        match patterns::parse_count(raw) {
            Some(n) => *slot = n,
            None => {
                let e = IngestError::ExtractionDegraded {
                    field: counter.field(),
                    reason: format!("unparseable count `{raw}`"),
                };
                warn!(handle, error = %e, "Count defaulted");
            }
        }
    }

    (counts[0], counts[1], counts[2])
}

fn hashtags(root: &ElementRef) -> BTreeSet<String> {
    root.select(&ANCHOR)
        .filter_map(|a| a.value().attr("href"))
        .filter_map(patterns::hashtag_slug)
        .filter_map(normalize_hashtag)
        .collect()
}

fn display_name(root: &ElementRef) -> Option<String> {
    root.select(&AUTO_DIR)
        .find_map(|div| div.select(&SPAN).next())
        .map(|span| span.text().collect::<String>().trim().to_string())
        .filter(|name| !name.is_empty())
}

fn post_text(root: &ElementRef, handle: &str) -> String {
    match root.select(&POST_TEXT).next() {
        Some(el) => el.text().collect::<String>().trim().to_string(),
        None => {
            let e = IngestError::ExtractionDegraded {
                field: "text",
                reason: "no language-tagged text element".to_string(),
            };
            debug!(handle, error = %e, "Post text defaulted");
            String::new()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fragment(label_groups: &[&str], author: Option<&str>, tags: &[&str], text: &str) -> String {
        let mut html = String::from(r#"<article data-testid="tweet"><div>"#);
        if let Some(handle) = author {
            html.push_str(&format!(
                r#"<a href="/{handle}" role="link" aria-haspopup="false"><div dir="auto"><span>Display {handle}</span></div></a>"#
            ));
        }
        if !text.is_empty() {
            html.push_str(&format!(r#"<div lang="en" dir="auto"><span>{text}</span></div>"#));
        }
        for tag in tags {
            html.push_str(&format!(
                r#"<a href="/hashtag/{tag}?src=hashtag_click" role="link">#{tag}</a>"#
            ));
        }
        for label in label_groups {
            html.push_str(&format!(r#"<div role="group" aria-label="{label}"></div>"#));
        }
        html.push_str("</div></article>");
        html
    }

    #[test]
    fn test_complete_fragment() {
        let html = fragment(
            &["3 replies, 10 likes"],
            Some("bob"),
            &["rust", "systems"],
            "Ownership is neat",
        );
        let post = extract_post(&html).unwrap();
        assert_eq!(post.author_handle, "bob");
        assert_eq!(post.display_name.as_deref(), Some("Display bob"));
        assert_eq!((post.replies, post.retweets, post.likes), (3, 0, 10));
        assert_eq!(
            post.hashtags.iter().cloned().collect::<Vec<_>>(),
            vec!["rust", "systems"]
        );
        assert_eq!(post.text, "Ownership is neat");
    }

    #[test]
    fn test_missing_author_rejected() {
        let html = fragment(&["3 replies"], None, &["rust"], "no author here");
        let err = extract_post(&html).unwrap_err();
        assert!(matches!(err, IngestError::RecordRejected { .. }));
    }

    #[test]
    fn test_permalink_author_link_uses_leading_segment() {
        let html = r#"<div data-testid="tweet">
            <a href="/bob/status/1" role="link" aria-haspopup="false">permalink</a>
            <a href="/bob" role="link" aria-haspopup="false"><div dir="auto"><span>Bob</span></div></a>
            <div lang="en" dir="auto"><span>kept</span></div>
        </div>"#;
        let post = extract_post(html).unwrap();
        assert_eq!(post.author_handle, "bob");
        assert_eq!(post.text, "kept");
    }

    #[test]
    fn test_author_link_without_path_rejected() {
        let html = r#"<div data-testid="tweet">
            <a href="https://x.com/" role="link" aria-haspopup="false">home</a>
        </div>"#;
        assert!(matches!(
            extract_post(html),
            Err(IngestError::RecordRejected { .. })
        ));
    }

    #[test]
    fn test_single_pattern_label_sets_only_that_count() {
        for (label, expected) in [
            ("5 replies", (5, 0, 0)),
            ("6 Retweets", (0, 6, 0)),
            ("7 reposts", (0, 7, 0)),
            ("8 likes", (0, 0, 8)),
        ] {
            let html = fragment(&[label], Some("bob"), &[], "text");
            let post = extract_post(&html).unwrap();
            assert_eq!((post.replies, post.retweets, post.likes), expected, "{label}");
        }
    }

    #[test]
    fn test_two_labels_are_ambiguous() {
        let html = fragment(&["3 replies, 10 likes", "4 replies"], Some("bob"), &[], "text");
        let post = extract_post(&html).unwrap();
        assert_eq!((post.replies, post.retweets, post.likes), (0, 0, 0));
    }

    #[test]
    fn test_no_label_defaults_to_zero() {
        let html = fragment(&[], Some("bob"), &[], "text");
        let post = extract_post(&html).unwrap();
        assert_eq!((post.replies, post.retweets, post.likes), (0, 0, 0));
    }

    #[test]
    fn test_thousands_separator() {
        let html = fragment(&["1,204 replies, 12,000 likes"], Some("bob"), &[], "x");
        let post = extract_post(&html).unwrap();
        assert_eq!(post.replies, 1204);
        assert_eq!(post.likes, 12000);
    }

    #[test]
    fn test_missing_text_is_empty_not_rejected() {
        let html = fragment(&["1 like"], Some("bob"), &[], "");
        let post = extract_post(&html).unwrap();
        assert_eq!(post.text, "");
        assert_eq!(post.likes, 1);
    }

    #[test]
    fn test_duplicate_and_mixed_case_hashtags_collapse() {
        let html = fragment(&[], Some("bob"), &["Rust", "rust", "RUST", "wasm"], "t");
        let post = extract_post(&html).unwrap();
        assert_eq!(post.hashtags.len(), 2);
        assert!(post.hashtags.contains("rust"));
        assert!(post.hashtags.contains("wasm"));
    }

    #[test]
    fn test_split_posts_and_extract_all() {
        let page = format!(
            "<html><body><main>{}{}{}</main></body></html>",
            fragment(&["3 replies"], Some("bob"), &[], "one"),
            fragment(&[], None, &[], "orphan"),
            fragment(&["2 likes"], Some("carol"), &[], "two"),
        );
        let fragments = split_posts(&page);
        assert_eq!(fragments.len(), 3);

        let pass = extract_all(&fragments);
        assert_eq!(pass.records.len(), 2);
        assert_eq!(pass.rejected, 1);
        assert_eq!(pass.records[1].author_handle, "carol");
    }

    #[test]
    fn test_split_posts_empty_page() {
        assert!(split_posts("").is_empty());
        assert!(split_posts("<html><body><p>nothing</p></body></html>").is_empty());
    }
}
