use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RaidBoss {
    pub id: i64,
    pub name: String,
    pub pokemon_id: Option<i64>,
    pub tier: Option<String>,
    pub cp_min: Option<i64>,
    pub cp_max: Option<i64>,
    pub cp_boosted_min: Option<i64>,
    pub cp_boosted_max: Option<i64>,
    pub types: Vec<String>,
    pub weaknesses: Vec<String>,
    pub weather_boost: Vec<String>,
    pub is_active: bool,
    pub start_date: Option<DateTime<Utc>>,
    pub end_date: Option<DateTime<Utc>>,
    pub image_url: Option<String>,
    pub scraped_date: DateTime<Utc>,
    pub last_updated: DateTime<Utc>,
}

/// Every writable raid boss column. An update writes all of them, so a field
/// the latest scrape did not find is cleared rather than kept.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct RaidBossRecord {
    pub name: String,
    pub pokemon_id: Option<i64>,
    pub tier: Option<String>,
    pub cp_min: Option<i64>,
    pub cp_max: Option<i64>,
    pub cp_boosted_min: Option<i64>,
    pub cp_boosted_max: Option<i64>,
    pub types: Vec<String>,
    pub weaknesses: Vec<String>,
    pub weather_boost: Vec<String>,
    pub is_active: bool,
    pub start_date: Option<DateTime<Utc>>,
    pub end_date: Option<DateTime<Utc>>,
    pub image_url: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RaidCounter {
    pub id: i64,
    pub raid_boss_id: i64,
    pub pokemon_name: String,
    pub rank: i64,
    pub fast_move: Option<String>,
    pub charge_move: Option<String>,
    pub pokemon_types: Vec<String>,
    pub dps: Option<f64>,
    pub tdo: Option<f64>,
    pub ttw: Option<f64>,
    pub is_shadow: bool,
    pub is_mega: bool,
    pub is_legendary: bool,
    pub scraped_date: DateTime<Utc>,
}

/// A counter as scraped; the owning boss id is assigned at persistence time.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct NewRaidCounter {
    pub pokemon_name: String,
    pub rank: i64,
    pub fast_move: Option<String>,
    pub charge_move: Option<String>,
    pub pokemon_types: Vec<String>,
    pub dps: Option<f64>,
    pub tdo: Option<f64>,
    pub ttw: Option<f64>,
    pub is_shadow: bool,
    pub is_mega: bool,
    pub is_legendary: bool,
}

/// One boss and the full counter set that replaces whatever it had before.
#[derive(Debug, Clone, PartialEq)]
pub struct RaidRefresh {
    pub boss: RaidBossRecord,
    pub counters: Vec<NewRaidCounter>,
}

/// Trimmed-down boss shape for autocomplete.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RaidBossSuggestion {
    pub id: i64,
    pub name: String,
    pub tier: Option<String>,
    pub is_active: bool,
    pub types: Vec<String>,
}

/// A boss together with its filtered, rank-ordered counters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BossCounters {
    pub boss: RaidBoss,
    pub counters: Vec<RaidCounter>,
}
