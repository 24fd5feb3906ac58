use scraper::{ElementRef, Html};

use super::feed::MAX_CONTENT_CHARS;
use super::http::{element_text, first_match, resolve_url, selector};
use super::RawNews;
use crate::pipeline::normalize::truncate_chars;

/// Where to look inside each article card of a blog-style listing.
pub(crate) struct ArticleLayout<'a> {
    /// Card selectors; the first one that matches anything is used.
    pub cards: &'a [&'a str],
    pub title: &'a [&'a str],
    pub content: &'a [&'a str],
    pub date: &'a [&'a str],
    pub base_url: &'a str,
    pub limit: usize,
}

pub(crate) fn parse_article_list(html: &str, layout: &ArticleLayout<'_>) -> Vec<RawNews> {
    let document = Html::parse_document(html);

    for css in layout.cards {
        let sel = selector(css);
        let cards: Vec<_> = document.select(&sel).take(layout.limit).collect();
        if !cards.is_empty() {
            return cards
                .into_iter()
                .filter_map(|card| parse_card(card, layout))
                .collect();
        }
    }

    Vec::new()
}

fn parse_card(card: ElementRef<'_>, layout: &ArticleLayout<'_>) -> Option<RawNews> {
    let title = first_match(card, layout.title)
        .map(element_text)
        .filter(|t| !t.is_empty())?;
    let href = first_match(card, &["a[href]"])?.value().attr("href")?;

    let content = first_match(card, layout.content)
        .map(|el| truncate_chars(&element_text(el), MAX_CONTENT_CHARS));

    let published = first_match(card, layout.date).map(|el| {
        el.value()
            .attr("datetime")
            .map(str::to_string)
            .unwrap_or_else(|| element_text(el))
    });

    Some(RawNews {
        title: Some(title),
        url: Some(resolve_url(href, layout.base_url)),
        content,
        published,
    })
}
