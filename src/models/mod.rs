mod event;
mod news;
mod query;
mod raid;

pub use event::{Event, EventType, NewEvent};
pub use news::{NewNewsItem, NewsItem};
pub use query::{CounterQuery, EventQuery, NewsQuery, Page, Pagination, RaidBossQuery};
pub use raid::{
    BossCounters, NewRaidCounter, RaidBoss, RaidBossRecord, RaidBossSuggestion, RaidCounter, RaidRefresh,
};

use serde::Serialize;

/// Outcome of one news+events cycle.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct NewsCycleReport {
    pub news_added: usize,
    pub events_added: usize,
}

/// Outcome of one raid cycle.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RaidCycleReport {
    pub added: usize,
    pub updated: usize,
    pub total_processed: usize,
}
