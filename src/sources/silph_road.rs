//! [The Silph Road](https://thesilphroad.com) news articles.

use async_trait::async_trait;
use tracing::info;

use super::articles::{parse_article_list, ArticleLayout};
use super::classify::EventKeywords;
use super::{events_from_news, HttpClient, RawEvent, RawNews, SourceAdapter};
use crate::error::Result;

const BASE_URL: &str = "https://thesilphroad.com";
const NEWS_URL: &str = "https://thesilphroad.com/news";

const LAYOUT: ArticleLayout<'static> = ArticleLayout {
    cards: &["article.news-article", "article"],
    title: &["h2", "h3", "a.title"],
    content: &["p.excerpt", "p"],
    date: &["time", "span.date"],
    base_url: BASE_URL,
    limit: 15,
};

pub struct SilphRoad {
    client: HttpClient,
}

impl SilphRoad {
    pub fn new(client: HttpClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl SourceAdapter for SilphRoad {
    fn name(&self) -> &'static str {
        "The Silph Road"
    }

    async fn fetch_news(&self) -> Result<Vec<RawNews>> {
        let html = self.client.get_text(NEWS_URL).await?;
        let news = parse_article_list(&html, &LAYOUT);
        info!(count = news.len(), source = self.name(), "Scraped news items");
        Ok(news)
    }

    async fn fetch_events(&self) -> Result<Vec<RawEvent>> {
        let news = self.fetch_news().await?;
        let events = events_from_news(&news, EventKeywords::WithSeasonAndAnnouncements);
        info!(count = events.len(), source = self.name(), "Extracted events from news");
        Ok(events)
    }
}
