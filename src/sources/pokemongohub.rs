//! [Pokemon GO Hub](https://pokemongohub.net) news, RSS first.

use async_trait::async_trait;
use tracing::{info, warn};

use super::articles::{parse_article_list, ArticleLayout};
use super::classify::EventKeywords;
use super::feed::parse_feed;
use super::{events_from_news, HttpClient, RawEvent, RawNews, SourceAdapter};
use crate::error::Result;

const BASE_URL: &str = "https://pokemongohub.net";
const NEWS_URL: &str = "https://pokemongohub.net/post/news/";
const RSS_URL: &str = "https://pokemongohub.net/feed/";
const MAX_ITEMS: usize = 15;

const LAYOUT: ArticleLayout<'static> = ArticleLayout {
    cards: &["article.post"],
    title: &["h2", "h3", "a.title"],
    content: &["div.entry-content p", "p"],
    date: &["time", "span.date"],
    base_url: BASE_URL,
    limit: MAX_ITEMS,
};

pub struct PokemonGoHub {
    client: HttpClient,
}

impl PokemonGoHub {
    pub fn new(client: HttpClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl SourceAdapter for PokemonGoHub {
    fn name(&self) -> &'static str {
        "Pokemon GO Hub"
    }

    async fn fetch_news(&self) -> Result<Vec<RawNews>> {
        let rss = match self.client.get_bytes(RSS_URL).await {
            Ok(bytes) => parse_feed(&bytes, MAX_ITEMS),
            Err(e) => Err(e),
        };
        let mut news = rss.unwrap_or_else(|e| {
            warn!(error = %e, source = self.name(), "RSS unavailable, falling back to HTML");
            Vec::new()
        });

        if news.is_empty() {
            let html = self.client.get_text(NEWS_URL).await?;
            news = parse_article_list(&html, &LAYOUT);
        }

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

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn listing_only_reads_post_articles() {
        let html = r#"
            <article class="post">
              <h2><a href="https://pokemongohub.net/post/news/season-announced/">New season announced</a></h2>
              <div class="entry-content"><p>Details inside.</p></div>
            </article>
            <article class="page"><h2><a href="/about">About</a></h2></article>
        "#;
        let news = parse_article_list(html, &LAYOUT);
        assert_eq!(news.len(), 1);
        assert_eq!(news[0].content.as_deref(), Some("Details inside."));

        let events = events_from_news(&news, EventKeywords::WithSeasonAndAnnouncements);
        assert_eq!(events.len(), 1);
    }
}
