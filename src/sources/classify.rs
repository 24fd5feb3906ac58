//! Keyword rules shared by the adapters and the normalizer.

use crate::models::EventType;

/// Ordered rules: the first matching keyword wins, so the more specific
/// phrases sit ahead of the generic ones.
const EVENT_TYPE_RULES: &[(&[&str], EventType)] = &[
    (&["community day"], EventType::CommunityDay),
    (&["spotlight hour"], EventType::SpotlightHour),
    (&["raid"], EventType::RaidEvent),
    (&["go battle", "gbl"], EventType::GoBattleLeague),
    (&["research"], EventType::ResearchEvent),
    (&["go fest"], EventType::GoFest),
    (&["season"], EventType::SeasonEvent),
];

pub fn infer_event_type(title: &str) -> EventType {
    let title = title.to_lowercase();
    EVENT_TYPE_RULES
        .iter()
        .find(|(keywords, _)| keywords.iter().any(|k| title.contains(k)))
        .map(|(_, event_type)| *event_type)
        .unwrap_or(EventType::SpecialEvent)
}

/// Keyword set deciding whether a general news post announces an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKeywords {
    Base,
    WithSeason,
    WithSeasonAndAnnouncements,
}

const BASE_EVENT_KEYWORDS: &[&str] = &[
    "community day",
    "event",
    "spotlight hour",
    "raid",
    "research",
    "special",
    "celebration",
    "go fest",
    "featured",
    "bonus",
    "challenge",
];

impl EventKeywords {
    fn extra(&self) -> &'static [&'static str] {
        match self {
            EventKeywords::Base => &[],
            EventKeywords::WithSeason => &["season"],
            EventKeywords::WithSeasonAndAnnouncements => &["season", "announced"],
        }
    }

    pub fn is_event_post(&self, title: &str) -> bool {
        let title = title.to_lowercase();
        BASE_EVENT_KEYWORDS
            .iter()
            .chain(self.extra())
            .any(|keyword| title.contains(keyword))
    }
}
