//! Source adapters: one per upstream site, each satisfying the same
//! capability traits so the pipeline never branches on a concrete site.
//!
//! | Source | Module | News | Events | Raids |
//! |--------|--------|------|--------|-------|
//! | LeekDuck | [`leekduck`] | home page post cards | event calendar | |
//! | Official Blog | [`official_blog`] | RSS, HTML fallback | derived from news | |
//! | Pokemon GO Hub | [`pokemongohub`] | RSS, HTML fallback | derived from news | |
//! | Serebii | [`serebii`] | news tables | derived from news | |
//! | The Silph Road | [`silph_road`] | articles | derived from news | |
//! | Pokebattler | [`pokebattler`] | | | bosses + counters |
//!
//! Fetches are best-effort: a malformed entry is skipped and its siblings
//! still come through. Whole-source failures surface as `Err` and the
//! pipeline turns them into an empty contribution.

use async_trait::async_trait;

use crate::error::Result;
use crate::models::NewRaidCounter;

mod articles;
pub mod classify;
mod feed;
mod http;
pub mod leekduck;
pub mod official_blog;
pub mod pokebattler;
pub mod pokemongohub;
pub mod serebii;
pub mod silph_road;

pub use http::HttpClient;

/// A news candidate as scraped. Title and url are required downstream.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawNews {
    pub title: Option<String>,
    pub url: Option<String>,
    pub content: Option<String>,
    pub published: Option<String>,
}

/// An event candidate as scraped.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawEvent {
    pub title: Option<String>,
    pub url: Option<String>,
    pub event_type: Option<String>,
    pub date_text: Option<String>,
    pub description: Option<String>,
}

/// A boss discovered on the raid list page.
#[derive(Debug, Clone, PartialEq)]
pub struct BossStub {
    pub name: String,
    pub tier: Option<String>,
    pub url: Option<String>,
    pub is_active: bool,
}

/// Whatever a boss detail page yielded.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BossInfo {
    pub pokemon_id: Option<i64>,
    pub tier: Option<String>,
    pub cp_min: Option<i64>,
    pub cp_max: Option<i64>,
    pub cp_boosted_min: Option<i64>,
    pub cp_boosted_max: Option<i64>,
    pub types: Vec<String>,
    pub weaknesses: Vec<String>,
    pub weather_boost: Vec<String>,
    pub image_url: Option<String>,
}

#[async_trait]
pub trait SourceAdapter: Send + Sync {
    /// Stored as the `source` column of every record this adapter yields.
    fn name(&self) -> &'static str;

    async fn fetch_news(&self) -> Result<Vec<RawNews>>;

    async fn fetch_events(&self) -> Result<Vec<RawEvent>>;
}

#[async_trait]
pub trait RaidSource: Send + Sync {
    fn name(&self) -> &'static str;

    async fn fetch_raid_bosses(&self) -> Result<Vec<BossStub>>;

    async fn fetch_counters(&self, boss_name: &str) -> Result<(BossInfo, Vec<NewRaidCounter>)>;

    /// Pause inserted between two boss detail fetches.
    fn detail_delay(&self) -> std::time::Duration {
        std::time::Duration::ZERO
    }

    /// Upper bound on bosses detailed per cycle.
    fn max_bosses(&self) -> usize {
        usize::MAX
    }
}

/// Every news/event adapter, in the order a cycle visits them.
pub fn default_sources(client: &HttpClient) -> Vec<Box<dyn SourceAdapter>> {
    vec![
        Box::new(leekduck::LeekDuck::new(client.clone())),
        Box::new(official_blog::OfficialBlog::new(client.clone())),
        Box::new(silph_road::SilphRoad::new(client.clone())),
        Box::new(serebii::Serebii::new(client.clone())),
        Box::new(pokemongohub::PokemonGoHub::new(client.clone())),
    ]
}

/// Derives event candidates from a news feed for sources without a calendar.
pub(crate) fn events_from_news(
    news: &[RawNews],
    keywords: classify::EventKeywords,
) -> Vec<RawEvent> {
    news.iter()
        .filter_map(|item| {
            let title = item.title.as_deref()?;
            if !keywords.is_event_post(title) {
                return None;
            }
            Some(RawEvent {
                title: Some(title.to_string()),
                url: item.url.clone(),
                event_type: None,
                date_text: None,
                description: item.content.clone(),
            })
        })
        .collect()
}
