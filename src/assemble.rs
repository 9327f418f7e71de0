// Post assembly: extracted record + resolved profile -> persistable Post.
//
// The post id is a SHA-256 over the immutable fields (lowercased author
// handle and text, joined by a unit separator), so re-ingesting the same
// post always produces the same id and updates instead of duplicating.

use std::collections::HashMap;

use sha2::{Digest, Sha256};

use crate::db::models::{AuthorProfile, Post};
use crate::error::IngestError;
use crate::extract::ExtractedPost;

/// Deterministic content id for a post.
pub fn post_id(author: &str, text: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(author.trim().to_lowercase().as_bytes());
    hasher.update([0x1f]);
    hasher.update(text.as_bytes());
    hex::encode(hasher.finalize())
}

/// Combine an extracted record with its author's profile.
pub fn assemble(extracted: ExtractedPost, profile: &AuthorProfile) -> Result<Post, IngestError> {
    let author = extracted.author_handle.trim();
    if author.is_empty() {
        return Err(IngestError::RecordRejected {
            reason: "empty author handle".to_string(),
        });
    }

    Ok(Post {
        id: post_id(author, &extracted.text),
        author: author.to_string(),
        display_name: extracted.display_name,
        replies: extracted.replies,
        retweets: extracted.retweets,
        likes: extracted.likes,
        hashtags: extracted.hashtags,
        text: extracted.text,
        author_followers: profile.follower_count,
        author_posts: profile.post_count,
        author_location: profile.location.clone(),
        profile_resolved: profile.resolved,
    })
}

/// Collapse repeated observations of the same post within one page.
///
/// Keeps first-seen order; the last observation's counters win.
pub fn dedupe_posts(posts: Vec<Post>) -> Vec<Post> {
    let mut index: HashMap<String, usize> = HashMap::new();
    let mut unique: Vec<Post> = Vec::with_capacity(posts.len());

    for post in posts {
        match index.get(&post.id) {
            Some(&i) => unique[i] = post,
            None => {
                index.insert(post.id.clone(), unique.len());
                unique.push(post);
            }
        }
    }

    unique
}

#[cfg(test)]
mod tests {
    use super::*;

    fn extracted(author: &str, text: &str, likes: i64) -> ExtractedPost {
        ExtractedPost {
            author_handle: author.to_string(),
            text: text.to_string(),
            likes,
            ..Default::default()
        }
    }

    #[test]
    fn test_post_id_is_deterministic() {
        let a = post_id("bob", "hello world");
        assert_eq!(a, post_id("bob", "hello world"));
        assert_eq!(a.len(), 64);
        assert!(a.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn test_post_id_ignores_handle_case() {
        assert_eq!(post_id("Bob", "hi"), post_id("bob", "hi"));
    }

    #[test]
    fn test_post_id_separates_fields() {
        assert_ne!(post_id("bob", "hello"), post_id("bo", "bhello"));
        assert_ne!(post_id("bob", "hello"), post_id("bob", "hello!"));
        assert_ne!(post_id("bob", "hello"), post_id("carol", "hello"));
    }

    #[test]
    fn test_assemble_copies_profile() {
        let profile = AuthorProfile {
            post_count: 900,
            follower_count: 45,
            location: "Oslo".to_string(),
            resolved: true,
        };
        let post = assemble(extracted("bob", "text", 7), &profile).unwrap();
        assert_eq!(post.id, post_id("bob", "text"));
        assert_eq!(post.likes, 7);
        assert_eq!(post.author_followers, 45);
        assert_eq!(post.author_posts, 900);
        assert_eq!(post.author_location, "Oslo");
        assert!(post.profile_resolved);
    }

    #[test]
    fn test_assemble_with_degraded_profile() {
        let post = assemble(extracted("bob", "text", 0), &AuthorProfile::default()).unwrap();
        assert_eq!(post.author_followers, 0);
        assert_eq!(post.author_location, "");
        assert!(!post.profile_resolved);
    }

    #[test]
    fn test_assemble_rejects_blank_author() {
        let err = assemble(extracted("  ", "text", 0), &AuthorProfile::default()).unwrap_err();
        assert!(matches!(err, IngestError::RecordRejected { .. }));
    }

    #[test]
    fn test_dedupe_keeps_latest_counters() {
        let profile = AuthorProfile::default();
        let posts = vec![
            assemble(extracted("bob", "same", 1), &profile).unwrap(),
            assemble(extracted("carol", "other", 2), &profile).unwrap(),
            assemble(extracted("bob", "same", 5), &profile).unwrap(),
        ];
        let unique = dedupe_posts(posts);
        assert_eq!(unique.len(), 2);
        assert_eq!(unique[0].author, "bob");
        assert_eq!(unique[0].likes, 5);
        assert_eq!(unique[1].author, "carol");
    }
}
