use feed_rs::parser;

use super::http::html_to_plain_text;
use super::RawNews;
use crate::error::Result;
use crate::pipeline::normalize::truncate_chars;

/// Upper bound on stored content scraped from a feed or listing.
pub(crate) const MAX_CONTENT_CHARS: usize = 1000;

/// Parses an RSS/Atom document into news candidates, newest `limit` entries.
pub(crate) fn parse_feed(bytes: &[u8], limit: usize) -> Result<Vec<RawNews>> {
    let feed = parser::parse(bytes)?;

    let items = feed
        .entries
        .into_iter()
        .take(limit)
        .map(|entry| {
            // Try summary first, then fall back to the full content
            let content_html = entry
                .summary
                .as_ref()
                .map(|s| s.content.clone())
                .or_else(|| entry.content.as_ref().and_then(|c| c.body.clone()))
                .unwrap_or_default();

            RawNews {
                title: entry.title.map(|t| t.content.trim().to_string()),
                url: entry.links.first().map(|l| l.href.clone()),
                content: Some(truncate_chars(
                    &html_to_plain_text(&content_html),
                    MAX_CONTENT_CHARS,
                )),
                published: entry.published.or(entry.updated).map(|dt| dt.to_rfc3339()),
            }
        })
        .filter(|item| {
            item.title.as_deref().is_some_and(|t| !t.is_empty())
                && item.url.as_deref().is_some_and(|u| !u.is_empty())
        })
        .collect();

    Ok(items)
}
