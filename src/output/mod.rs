//! CLI output formatting and display helpers.

use std::path::Path;

use albumcache_core::AlbumSummary;

/// Tags shown in the regular album view.
pub const SUMMARY_TAG_LIMIT: usize = 5;

/// Tags shown in the author view.
pub const AUTHOR_TAG_LIMIT: usize = 3;

/// Shown when the remote reports no publication date.
pub const UNKNOWN_DATE: &str = "unknown";

/// Formats the regular album view.
#[must_use]
pub fn format_summary(summary: &AlbumSummary) -> String {
    summary_lines(summary, SUMMARY_TAG_LIMIT).join("\n")
}

/// Formats the author view: the author's work count, then the album.
#[must_use]
pub fn format_author_summary(author: &str, summary: &AlbumSummary) -> String {
    let mut lines = Vec::with_capacity(7);
    if let Some(total) = summary.author_total {
        lines.push(format!("Author {author} has {total} work(s)"));
    }
    lines.extend(summary_lines(summary, AUTHOR_TAG_LIMIT));
    lines.join("\n")
}

/// Formats the result of a document download.
#[must_use]
pub fn format_document(path: &Path) -> String {
    format!("Document: {}", path.display())
}

fn summary_lines(summary: &AlbumSummary, tag_limit: usize) -> Vec<String> {
    let tags = summary
        .tags
        .iter()
        .take(tag_limit)
        .map(String::as_str)
        .collect::<Vec<_>>()
        .join(", ");
    vec![
        format!("Title: {}", summary.title),
        format!("Id: {}", summary.album_id),
        format!("Tags: {tags}"),
        format!(
            "Published: {}",
            summary.pub_date.as_deref().unwrap_or(UNKNOWN_DATE)
        ),
        format!("Pages: {}", summary.page_count),
        format!("Cover: {}", summary.cover_path.display()),
    ]
}
