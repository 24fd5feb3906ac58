//! [LeekDuck](https://leekduck.com): the event calendar plus the post cards
//! on the home page.

use async_trait::async_trait;
use scraper::{ElementRef, Html};
use tracing::{debug, info, instrument};

use super::http::{element_text, first_match, resolve_url, selector, HttpClient};
use super::{RawEvent, RawNews, SourceAdapter};
use crate::error::Result;

const BASE_URL: &str = "https://leekduck.com";
const EVENTS_URL: &str = "https://leekduck.com/events/";
const MAX_NEWS: usize = 10;

pub struct LeekDuck {
    client: HttpClient,
}

impl LeekDuck {
    pub fn new(client: HttpClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl SourceAdapter for LeekDuck {
    fn name(&self) -> &'static str {
        "LeekDuck"
    }

    #[instrument(level = "debug", skip_all, fields(source = "LeekDuck"))]
    async fn fetch_news(&self) -> Result<Vec<RawNews>> {
        let html = self.client.get_text(BASE_URL).await?;
        let news = parse_news(&html);
        info!(count = news.len(), source = self.name(), "Scraped news items");
        Ok(news)
    }

    #[instrument(level = "debug", skip_all, fields(source = "LeekDuck"))]
    async fn fetch_events(&self) -> Result<Vec<RawEvent>> {
        let html = self.client.get_text(EVENTS_URL).await?;
        let events = parse_events(&html);
        info!(count = events.len(), source = self.name(), "Scraped events");
        Ok(events)
    }
}

pub fn parse_events(html: &str) -> Vec<RawEvent> {
    let document = Html::parse_document(html);
    document
        .select(&selector("div.event-item-wrapper"))
        .filter_map(parse_event_item)
        .collect()
}

fn parse_event_item(item: ElementRef<'_>) -> Option<RawEvent> {
    let title = first_match(item, &["h2", "h3", "a.event-item-link"]).map(element_text);
    let Some(title) = title.filter(|t| !t.is_empty()) else {
        debug!("Skipping LeekDuck event without a title");
        return None;
    };

    let url = first_match(item, &["a.event-item-link"])
        .and_then(|link| link.value().attr("href"))
        .map(|href| resolve_url(href, EVENTS_URL));

    Some(RawEvent {
        title: Some(title),
        url,
        event_type: first_match(item, &["span.event-type", "div.event-type"])
            .map(element_text)
            .filter(|t| !t.is_empty()),
        date_text: first_match(item, &["div.event-date", "span.event-date"]).map(element_text),
        description: first_match(item, &["p.event-description", "div.event-description"])
            .map(element_text),
    })
}

pub fn parse_news(html: &str) -> Vec<RawNews> {
    let document = Html::parse_document(html);
    let Some(list) = document.select(&selector("ol")).next() else {
        debug!("LeekDuck: could not find news list");
        return Vec::new();
    };

    list.children()
        .filter_map(ElementRef::wrap)
        .filter(|el| el.value().name() == "li")
        .take(MAX_NEWS)
        .filter_map(parse_news_item)
        .collect()
}

fn parse_news_item(item: ElementRef<'_>) -> Option<RawNews> {
    let card = first_match(item, &["div.post-card"])?;
    let link = card
        .select(&selector("a[href]"))
        .find(|a| a.value().attr("href").is_some_and(|h| h.contains("/posts/")))?;
    let href = link.value().attr("href")?;

    let title = link
        .value()
        .attr("alt")
        .or_else(|| link.value().attr("aria-label"))
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty())
        .or_else(|| first_match(card, &["h3", "h2", "h4"]).map(element_text))?;

    let content = first_match(card, &["div.post-card-body a.tag"])
        .map(element_text)
        .unwrap_or_default();

    Some(RawNews {
        title: Some(title),
        url: Some(resolve_url(href, BASE_URL)),
        content: Some(content),
        published: item
            .value()
            .attr("data-resource-updated-date")
            .map(str::to_string),
    })
}
