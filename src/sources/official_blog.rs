//! The official Pokemon GO blog. RSS first, article listing as a fallback;
//! events are the news posts whose titles announce one.

use async_trait::async_trait;
use tracing::{info, warn};

use super::articles::{parse_article_list, ArticleLayout};
use super::classify::EventKeywords;
use super::feed::parse_feed;
use super::{events_from_news, HttpClient, RawEvent, RawNews, SourceAdapter};
use crate::error::Result;

const BASE_URL: &str = "https://pokemongolive.com";
const BLOG_URL: &str = "https://pokemongolive.com/en/news/";
const RSS_URL: &str = "https://pokemongolive.com/en/rss";
const MAX_ITEMS: usize = 15;

const LAYOUT: ArticleLayout<'static> = ArticleLayout {
    cards: &["article", "div.news-item"],
    title: &["h2", "h3", "h1"],
    content: &["p", "div.excerpt"],
    date: &["time", "span.date"],
    base_url: BASE_URL,
    limit: MAX_ITEMS,
};

pub struct OfficialBlog {
    client: HttpClient,
}

impl OfficialBlog {
    pub fn new(client: HttpClient) -> Self {
        Self { client }
    }

    async fn try_rss(&self) -> Vec<RawNews> {
        let parsed = match self.client.get_bytes(RSS_URL).await {
            Ok(bytes) => parse_feed(&bytes, MAX_ITEMS),
            Err(e) => Err(e),
        };
        parsed.unwrap_or_else(|e| {
            warn!(error = %e, source = self.name(), "RSS unavailable, falling back to HTML");
            Vec::new()
        })
    }
}

#[async_trait]
impl SourceAdapter for OfficialBlog {
    fn name(&self) -> &'static str {
        "Official Blog"
    }

    async fn fetch_news(&self) -> Result<Vec<RawNews>> {
        let mut news = self.try_rss().await;
        if news.is_empty() {
            let html = self.client.get_text(BLOG_URL).await?;
            news = parse_article_list(&html, &LAYOUT);
        }
        info!(count = news.len(), source = self.name(), "Scraped news items");
        Ok(news)
    }

    async fn fetch_events(&self) -> Result<Vec<RawEvent>> {
        let news = self.fetch_news().await?;
        let events = events_from_news(&news, EventKeywords::Base);
        info!(count = events.len(), source = self.name(), "Extracted events from news");
        Ok(events)
    }
}
