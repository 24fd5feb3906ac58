//! Maps raw adapter output onto the canonical record shapes.
//!
//! Nothing in here fails: a missing required field drops the candidate and an
//! unreadable date becomes `None`.

use std::sync::OnceLock;

use chrono::{DateTime, Datelike, NaiveDate, NaiveDateTime, Utc};
use regex::Regex;

use crate::models::{NewEvent, NewNewsItem, NewRaidCounter, RaidBossRecord};
use crate::sources::classify::infer_event_type;
use crate::sources::{BossInfo, BossStub, RawEvent, RawNews};

const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M",
    "%B %d, %Y %I:%M %p",
    "%B %d %Y %I:%M %p",
    "%b %d, %Y %I:%M %p",
    "%d %B %Y %H:%M",
];

const DATE_FORMATS: &[&str] = &[
    "%Y-%m-%d",
    "%B %d, %Y",
    "%B %d %Y",
    "%b %d, %Y",
    "%d %B %Y",
    "%d %b %Y",
    "%m/%d/%Y",
];

const WEEKDAYS: &[&str] = &[
    "monday",
    "tuesday",
    "wednesday",
    "thursday",
    "friday",
    "saturday",
    "sunday",
    "mon",
    "tue",
    "wed",
    "thu",
    "fri",
    "sat",
    "sun",
];

fn ordinal_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(\d{1,2})(?:st|nd|rd|th)\b").expect("valid ordinal regex"))
}

fn range_separator_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\s*(?:–|—|\s-\s|\bto\b|\buntil\b)\s*").expect("valid range regex"))
}

/// "Jan 15-17, 2025": a bare hyphen between two day numbers.
fn day_span_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^(.*\D\d{1,2})-(\d{1,2}(?:\D.*)?)$").expect("valid day span regex")
    })
}

fn local_time_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)\s*local\s+time.*$").expect("valid filler regex"))
}

fn year_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\b\d{4}\b").expect("valid year regex"))
}

/// Collapses runs of whitespace and trims; empty text becomes `None`.
pub fn clean_text(text: &str) -> Option<String> {
    let cleaned = text.split_whitespace().collect::<Vec<_>>().join(" ");
    if cleaned.is_empty() {
        None
    } else {
        Some(cleaned)
    }
}

/// Truncates to at most `max` characters without splitting a code point.
pub fn truncate_chars(text: &str, max: usize) -> String {
    text.chars().take(max).collect()
}

/// Comma-joined storage form of an ordered list.
pub fn join_list(items: &[String]) -> String {
    items
        .iter()
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join(",")
}

/// Inverse of [`join_list`]; the empty string is the empty list.
pub fn split_list(stored: &str) -> Vec<String> {
    stored
        .split(',')
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

/// Best-effort parse of a loose date string. Never panics; anything it does
/// not recognize yields `None`.
pub fn parse_loose_date(text: &str) -> Option<DateTime<Utc>> {
    let text = text.trim();
    if text.is_empty() {
        return None;
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(text) {
        return Some(dt.with_timezone(&Utc));
    }
    if let Ok(dt) = DateTime::parse_from_rfc2822(text) {
        return Some(dt.with_timezone(&Utc));
    }

    let cleaned = simplify_date_text(text);
    for fmt in DATETIME_FORMATS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(&cleaned, fmt) {
            return Some(naive.and_utc());
        }
    }
    for fmt in DATE_FORMATS {
        if let Ok(date) = NaiveDate::parse_from_str(&cleaned, fmt) {
            return date.and_hms_opt(0, 0, 0).map(|naive| naive.and_utc());
        }
    }
    None
}

/// Drops weekday prefixes, ordinal suffixes and "at"/"local time" filler.
fn simplify_date_text(text: &str) -> String {
    let mut text = ordinal_re().replace_all(text, "$1").into_owned();

    if let Some((first, rest)) = text.split_once(',') {
        if WEEKDAYS.contains(&first.trim().to_lowercase().as_str()) {
            text = rest.trim().to_string();
        }
    }

    let text = local_time_re().replace(&text, "");

    text.replace(", at ", " ")
        .replace(" at ", " ")
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .trim_end_matches(',')
        .to_string()
}

/// Splits "Jan 15 - Jan 17, 2025" style text into start and end timestamps.
/// A missing year or month on one side is borrowed from the other.
pub fn parse_date_range(text: &str) -> (Option<DateTime<Utc>>, Option<DateTime<Utc>>) {
    let text = text.trim();
    let mut parts = range_separator_re().splitn(text, 2);
    let start_text = parts.next().unwrap_or_default().trim();
    let Some(end_text) = parts.next().map(str::trim).filter(|s| !s.is_empty()) else {
        if let Some(single) = parse_loose_date(start_text) {
            return (Some(single), None);
        }
        return match day_span_re().captures(start_text) {
            Some(span) => parse_date_range(&format!("{} - {}", &span[1], &span[2])),
            None => (None, None),
        };
    };

    let mut start = parse_loose_date(start_text);
    let mut end = parse_loose_date(end_text);

    // "January 15 - 17, 2025": the end side lacks a month.
    if end.is_none() && end_text.starts_with(|c: char| c.is_ascii_digit()) {
        if let Some(month) = start_text.split_whitespace().next() {
            end = parse_loose_date(&format!("{month} {end_text}"));
        }
    }

    if start.is_none() && !year_re().is_match(start_text) {
        let year = end
            .map(|e| e.year())
            .or_else(|| year_re().find(end_text).and_then(|m| m.as_str().parse().ok()));
        if let Some(year) = year {
            start = parse_loose_date(&format!("{start_text}, {year}"));
        }
    }

    if end.is_none() && !year_re().is_match(end_text) {
        if let Some(year) = start.map(|s| s.year()) {
            end = parse_loose_date(&format!("{end_text}, {year}"));
        }
    }

    (start, end)
}

/// Canonical news record, or `None` when title or url is missing.
pub fn normalize_news(raw: RawNews, source: &str) -> Option<NewNewsItem> {
    let title = raw.title.as_deref().and_then(clean_text)?;
    let url = raw.url.as_deref().and_then(clean_text)?;

    Some(NewNewsItem {
        title,
        content: raw.content.as_deref().and_then(clean_text),
        summary: None,
        source: source.to_string(),
        url,
        published_date: raw.published.as_deref().and_then(parse_loose_date),
    })
}

/// Canonical event record, or `None` when the title is missing. An absent
/// event type is inferred from the title.
pub fn normalize_event(raw: RawEvent, source: &str) -> Option<NewEvent> {
    let title = raw.title.as_deref().and_then(clean_text)?;

    let event_type = raw
        .event_type
        .as_deref()
        .and_then(clean_text)
        .unwrap_or_else(|| infer_event_type(&title).to_string());

    let (start_date, end_date) = raw
        .date_text
        .as_deref()
        .map(parse_date_range)
        .unwrap_or((None, None));

    Some(NewEvent {
        title,
        event_type,
        start_date,
        end_date,
        description: raw.description.as_deref().and_then(clean_text),
        summary: None,
        source: source.to_string(),
        url: raw.url.as_deref().and_then(clean_text),
    })
}

/// Combines the list-page stub with the detail-page info. Stub values win,
/// matching the order the raid adapter discovers them in.
pub fn merge_boss(stub: &BossStub, info: BossInfo) -> Option<RaidBossRecord> {
    let name = clean_text(&stub.name)?;
    Some(RaidBossRecord {
        name,
        pokemon_id: info.pokemon_id,
        tier: stub.tier.clone().or(info.tier),
        cp_min: info.cp_min,
        cp_max: info.cp_max,
        cp_boosted_min: info.cp_boosted_min,
        cp_boosted_max: info.cp_boosted_max,
        types: info.types,
        weaknesses: info.weaknesses,
        weather_boost: info.weather_boost,
        is_active: stub.is_active,
        start_date: None,
        end_date: None,
        image_url: info.image_url,
    })
}

/// Drops unnamed counters and keeps scrape order; ranks are stored as given.
pub fn normalize_counters(counters: Vec<NewRaidCounter>) -> Vec<NewRaidCounter> {
    counters
        .into_iter()
        .filter_map(|mut counter| {
            counter.pokemon_name = clean_text(&counter.pokemon_name)?;
            Some(counter)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn utc(y: i32, m: u32, d: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, 0, 0, 0).unwrap()
    }

    #[test]
    fn list_fields_round_trip_through_storage_form() {
        let types = vec!["Psychic".to_string(), "Flying".to_string()];
        assert_eq!(join_list(&types), "Psychic,Flying");
        assert_eq!(split_list("Psychic,Flying"), types);
        assert!(split_list("").is_empty());
        assert_eq!(split_list(" Fire , ,Water"), vec!["Fire", "Water"]);
    }

    #[test]
    fn parses_machine_formats() {
        assert_eq!(
            parse_loose_date("2025-03-01T10:00:00+00:00"),
            Some(Utc.with_ymd_and_hms(2025, 3, 1, 10, 0, 0).unwrap())
        );
        assert_eq!(
            parse_loose_date("Sat, 01 Mar 2025 10:00:00 +0000"),
            Some(Utc.with_ymd_and_hms(2025, 3, 1, 10, 0, 0).unwrap())
        );
        assert_eq!(parse_loose_date("2025-03-01"), Some(utc(2025, 3, 1)));
    }

    #[test]
    fn parses_human_formats() {
        assert_eq!(parse_loose_date("March 1, 2025"), Some(utc(2025, 3, 1)));
        assert_eq!(parse_loose_date("Saturday, March 1st, 2025"), Some(utc(2025, 3, 1)));
        assert_eq!(
            parse_loose_date("Saturday, March 1, 2025, at 2:00 PM Local Time"),
            Some(Utc.with_ymd_and_hms(2025, 3, 1, 14, 0, 0).unwrap())
        );
    }

    #[test]
    fn unparseable_dates_are_none() {
        assert_eq!(parse_loose_date(""), None);
        assert_eq!(parse_loose_date("sometime soon"), None);
        assert_eq!(parse_loose_date("32/13/2025"), None);
        assert_eq!(parse_loose_date("ñ–—"), None);
    }

    #[test]
    fn date_ranges_borrow_missing_parts() {
        assert_eq!(
            parse_date_range("Jan 15 - Jan 17, 2025"),
            (Some(utc(2025, 1, 15)), Some(utc(2025, 1, 17)))
        );
        assert_eq!(
            parse_date_range("January 15 – 17, 2025"),
            (Some(utc(2025, 1, 15)), Some(utc(2025, 1, 17)))
        );
        assert_eq!(
            parse_date_range("March 1, 2025 to March 3, 2025"),
            (Some(utc(2025, 3, 1)), Some(utc(2025, 3, 3)))
        );
        assert_eq!(parse_date_range("March 1, 2025"), (Some(utc(2025, 3, 1)), None));
        assert_eq!(parse_date_range("TBA"), (None, None));
    }

    #[test]
    fn tight_hyphen_between_days_is_a_range() {
        assert_eq!(
            parse_date_range("Jan 15-17, 2025"),
            (Some(utc(2025, 1, 15)), Some(utc(2025, 1, 17)))
        );
        assert_eq!(parse_date_range("2025-01-15"), (Some(utc(2025, 1, 15)), None));
        assert_eq!(parse_date_range("Jan 1-3"), (None, None));
    }

    #[test]
    fn news_without_url_or_title_is_dropped() {
        let raw = RawNews {
            title: Some("  ".into()),
            url: Some("https://example.com/a".into()),
            ..Default::default()
        };
        assert!(normalize_news(raw, "Serebii").is_none());

        let raw = RawNews {
            title: Some("Title".into()),
            url: None,
            ..Default::default()
        };
        assert!(normalize_news(raw, "Serebii").is_none());
    }

    #[test]
    fn news_fields_are_cleaned_and_dated() {
        let raw = RawNews {
            title: Some("  Spotlight\n Hour  ".into()),
            url: Some("https://example.com/a".into()),
            content: Some("".into()),
            published: Some("not a date".into()),
        };
        let item = normalize_news(raw, "LeekDuck").unwrap();
        assert_eq!(item.title, "Spotlight Hour");
        assert_eq!(item.source, "LeekDuck");
        assert_eq!(item.content, None);
        assert_eq!(item.published_date, None);
        assert_eq!(item.summary, None);
    }

    #[test]
    fn event_type_is_inferred_only_when_absent() {
        let raw = RawEvent {
            title: Some("Community Day Raid Weekend".into()),
            ..Default::default()
        };
        assert_eq!(normalize_event(raw, "LeekDuck").unwrap().event_type, "Community Day");

        let raw = RawEvent {
            title: Some("Community Day".into()),
            event_type: Some("Event".into()),
            ..Default::default()
        };
        assert_eq!(normalize_event(raw, "LeekDuck").unwrap().event_type, "Event");
    }

    #[test]
    fn merge_prefers_stub_tier_and_activity() {
        let stub = BossStub {
            name: "Mewtwo".into(),
            tier: Some("5".into()),
            url: None,
            is_active: true,
        };
        let info = BossInfo {
            tier: Some("Mega".into()),
            cp_min: Some(2275),
            cp_max: Some(2387),
            types: vec!["Psychic".into()],
            ..Default::default()
        };
        let record = merge_boss(&stub, info).unwrap();
        assert_eq!(record.tier.as_deref(), Some("5"));
        assert_eq!(record.cp_min, Some(2275));
        assert!(record.is_active);
        assert_eq!(record.types, vec!["Psychic"]);
    }

    #[test]
    fn counters_keep_order_and_drop_unnamed() {
        let counters = vec![
            NewRaidCounter { pokemon_name: "Mewtwo".into(), rank: 1, ..Default::default() },
            NewRaidCounter { pokemon_name: " ".into(), rank: 2, ..Default::default() },
            NewRaidCounter { pokemon_name: "Gengar".into(), rank: 2, ..Default::default() },
        ];
        let names: Vec<_> = normalize_counters(counters)
            .into_iter()
            .map(|c| (c.pokemon_name, c.rank))
            .collect();
        assert_eq!(names, vec![("Mewtwo".to_string(), 1), ("Gengar".to_string(), 2)]);
    }
}
