use chrono::{DateTime, Utc};
use serde::Serialize;

pub const MAX_PER_PAGE: u32 = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pagination {
    pub page: u32,
    pub per_page: u32,
}

impl Pagination {
    pub fn new(page: Option<u32>, per_page: Option<u32>, default_per_page: u32) -> Self {
        Self {
            page: page.unwrap_or(1).max(1),
            per_page: per_page
                .unwrap_or(default_per_page)
                .clamp(1, MAX_PER_PAGE),
        }
    }

    pub fn offset(&self) -> i64 {
        i64::from(self.page - 1) * i64::from(self.per_page)
    }

    pub fn limit(&self) -> i64 {
        i64::from(self.per_page)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Page<T> {
    pub data: Vec<T>,
    pub page: u32,
    pub per_page: u32,
    pub total: u64,
    pub pages: u64,
}

impl<T> Page<T> {
    pub fn new(data: Vec<T>, pagination: Pagination, total: u64) -> Self {
        let per_page = u64::from(pagination.per_page);
        Self {
            data,
            page: pagination.page,
            per_page: pagination.per_page,
            total,
            pages: total.div_ceil(per_page),
        }
    }
}

#[derive(Debug, Clone)]
pub struct NewsQuery {
    pub source: Option<String>,
    pub pagination: Pagination,
}

#[derive(Debug, Clone)]
pub struct EventQuery {
    pub event_type: Option<String>,
    pub source: Option<String>,
    pub starts_after: Option<DateTime<Utc>>,
    pub ends_before: Option<DateTime<Utc>>,
    pub pagination: Pagination,
}

#[derive(Debug, Clone)]
pub struct RaidBossQuery {
    pub tier: Option<String>,
    pub active: Option<bool>,
    pub pagination: Pagination,
}

#[derive(Debug, Clone)]
pub struct CounterQuery {
    pub include_shadow: bool,
    pub include_mega: bool,
    pub include_legendary: bool,
    pub limit: u32,
}

impl Default for CounterQuery {
    fn default() -> Self {
        Self {
            include_shadow: true,
            include_mega: true,
            include_legendary: true,
            limit: 20,
        }
    }
}
