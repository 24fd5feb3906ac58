use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewsItem {
    pub id: i64,
    pub title: String,
    pub content: Option<String>,
    pub summary: Option<String>,
    pub source: String,
    pub url: String,
    pub published_date: Option<DateTime<Utc>>,
    pub scraped_date: DateTime<Utc>,
}

/// A normalized news record ready to be persisted.
#[derive(Debug, Clone, PartialEq)]
pub struct NewNewsItem {
    pub title: String,
    pub content: Option<String>,
    pub summary: Option<String>,
    pub source: String,
    pub url: String,
    pub published_date: Option<DateTime<Utc>>,
}
