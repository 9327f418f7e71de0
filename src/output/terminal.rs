// Colored terminal output for run summaries and store totals.

use colored::Colorize;

use crate::db::models::{Post, RunSummary, StoreCounts};

/// Display what one ingest run did.
pub fn display_run_summary(summary: &RunSummary) {
    println!(
        "\n{}",
        format!("=== Run for \"{}\" ===", summary.search).bold()
    );
    println!("  Searched by:      @{}", summary.username);
    println!("  Post fragments:   {}", summary.fragments);
    if summary.rejected > 0 {
        println!(
            "  Rejected:         {}",
            summary.rejected.to_string().yellow()
        );
    }
    println!(
        "  Persisted:        {} ({} new, {} refreshed)",
        summary.persisted().to_string().green(),
        summary.inserted,
        summary.refreshed
    );
    if summary.skipped > 0 {
        println!("  Skipped:          {}", summary.skipped.to_string().red());
    }
    println!(
        "  Profile lookups:  {} ({} degraded)",
        summary.lookups_issued, summary.profiles_degraded
    );
}

/// Display row totals for every table in the store.
pub fn display_store_counts(counts: &StoreCounts) {
    println!("\n{}", "=== Store ===".bold());
    let rows = [
        ("usernames", counts.usernames),
        ("searches", counts.searches),
        ("hashtags", counts.hashtags),
        ("posts", counts.posts),
        ("searches_posts", counts.searches_posts),
        ("posts_hashtags", counts.posts_hashtags),
        ("username_searches", counts.username_searches),
        ("posts_username_searches", counts.posts_username_searches),
    ];
    for (table, count) in rows {
        println!("  {:<26} {:>8}", table.dimmed(), count);
    }
}

/// Display the first few posts of a run.
pub fn display_posts(posts: &[Post], limit: usize) {
    if posts.is_empty() {
        println!("\nNo posts found.");
        return;
    }

    println!(
        "\n{}",
        format!("=== Posts ({} of {}) ===", posts.len().min(limit), posts.len()).bold()
    );
    for post in posts.iter().take(limit) {
        let preview = super::truncate_chars(&post.text, 100);
        println!(
            "  @{:<20} {:>5} replies {:>5} retweets {:>6} likes  {}",
            post.author,
            post.replies,
            post.retweets,
            post.likes,
            preview.dimmed()
        );
    }
}
