use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
    pub id: i64,
    pub title: String,
    pub event_type: Option<String>,
    pub start_date: Option<DateTime<Utc>>,
    pub end_date: Option<DateTime<Utc>>,
    pub description: Option<String>,
    pub summary: Option<String>,
    pub source: String,
    pub url: Option<String>,
    pub scraped_date: DateTime<Utc>,
}

/// A normalized event record ready to be persisted.
///
/// `url` may be absent when a source lists an event without a detail page;
/// such events are deduplicated on `(title, source)` instead.
#[derive(Debug, Clone, PartialEq)]
pub struct NewEvent {
    pub title: String,
    pub event_type: String,
    pub start_date: Option<DateTime<Utc>>,
    pub end_date: Option<DateTime<Utc>>,
    pub description: Option<String>,
    pub summary: Option<String>,
    pub source: String,
    pub url: Option<String>,
}

/// Categories produced by keyword inference.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventType {
    CommunityDay,
    SpotlightHour,
    RaidEvent,
    GoBattleLeague,
    ResearchEvent,
    GoFest,
    SeasonEvent,
    SpecialEvent,
}

impl EventType {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventType::CommunityDay => "Community Day",
            EventType::SpotlightHour => "Spotlight Hour",
            EventType::RaidEvent => "Raid Event",
            EventType::GoBattleLeague => "GO Battle League",
            EventType::ResearchEvent => "Research Event",
            EventType::GoFest => "GO Fest",
            EventType::SeasonEvent => "Season Event",
            EventType::SpecialEvent => "Special Event",
        }
    }
}

impl fmt::Display for EventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
