// Legacy CSV export of one run's assembled posts.
//
// Every field is quoted. The file is created fresh: an existing path is
// never overwritten.

use std::fs::OpenOptions;
use std::io::{self, BufWriter, Write};
use std::path::Path;

use crate::db::models::Post;

pub const HEADER: [&str; 5] = ["User", "Replies", "Retweets", "Hashtags", "Text"];

/// Write `posts` to a new CSV file at `path`.
///
/// Fails with `io::ErrorKind::AlreadyExists` if the file is already there.
pub fn write_csv(path: &Path, posts: &[Post]) -> io::Result<()> {
    let file = OpenOptions::new().write(true).create_new(true).open(path)?;
    let mut out = BufWriter::new(file);
    write_rows(&mut out, posts)?;
    out.flush()
}

/// Serialize the header and one row per post into any writer.
pub fn write_rows<W: Write>(out: &mut W, posts: &[Post]) -> io::Result<()> {
    write_record(out, HEADER.iter().map(|h| h.to_string()))?;
    for post in posts {
        let hashtags = post
            .hashtags
            .iter()
            .map(|t| format!("#{t}"))
            .collect::<Vec<_>>()
            .join(" ");
        write_record(
            out,
            [
                post.author.clone(),
                post.replies.to_string(),
                post.retweets.to_string(),
                hashtags,
                post.text.clone(),
            ],
        )?;
    }
    Ok(())
}

fn write_record<W, I>(out: &mut W, fields: I) -> io::Result<()>
where
    W: Write,
    I: IntoIterator<Item = String>,
{
    let line = fields
        .into_iter()
        .map(|f| quote(&f))
        .collect::<Vec<_>>()
        .join(",");
    write!(out, "{line}\r\n")
}

fn quote(field: &str) -> String {
    format!("\"{}\"", field.replace('"', "\"\""))
}
