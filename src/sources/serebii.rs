//! [Serebii](https://www.serebii.net/pokemongo/) news tables.

use async_trait::async_trait;
use scraper::{ElementRef, Html};
use tracing::info;

use super::classify::EventKeywords;
use super::feed::MAX_CONTENT_CHARS;
use super::http::{element_text, first_match, resolve_url, selector};
use super::{events_from_news, HttpClient, RawEvent, RawNews, SourceAdapter};
use crate::error::Result;
use crate::pipeline::normalize::truncate_chars;

const NEWS_URL: &str = "https://www.serebii.net/pokemongo/";
const MAX_NEWS: usize = 10;

pub struct Serebii {
    client: HttpClient,
}

impl Serebii {
    pub fn new(client: HttpClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl SourceAdapter for Serebii {
    fn name(&self) -> &'static str {
        "Serebii"
    }

    async fn fetch_news(&self) -> Result<Vec<RawNews>> {
        let html = self.client.get_text(NEWS_URL).await?;
        let news = parse_news(&html);
        info!(count = news.len(), source = self.name(), "Scraped news items");
        Ok(news)
    }

    async fn fetch_events(&self) -> Result<Vec<RawEvent>> {
        let news = self.fetch_news().await?;
        let events = events_from_news(&news, EventKeywords::WithSeason);
        info!(count = events.len(), source = self.name(), "Extracted events from news");
        Ok(events)
    }
}

pub fn parse_news(html: &str) -> Vec<RawNews> {
    let document = Html::parse_document(html);
    let Some(content) = first_match(document.root_element(), &["div.content", "td.content"])
    else {
        return Vec::new();
    };

    content
        .select(&selector("table.news"))
        .take(MAX_NEWS)
        .filter_map(parse_news_table)
        .collect()
}

fn parse_news_table(table: ElementRef<'_>) -> Option<RawNews> {
    let link = first_match(table, &["a"])?;
    let title = element_text(link);
    let href = link.value().attr("href").unwrap_or_default();
    if title.is_empty() || href.is_empty() {
        return None;
    }

    Some(RawNews {
        title: Some(title),
        url: Some(resolve_url(href, NEWS_URL)),
        content: Some(truncate_chars(&element_text(table), MAX_CONTENT_CHARS)),
        published: first_match(table, &["span.date"]).map(element_text),
    })
}
