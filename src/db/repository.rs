use chrono::{DateTime, Datelike, Duration, NaiveDate, SecondsFormat, SubsecRound, Utc};
use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, OptionalExtension, Row};
use tokio_rusqlite::Connection;

use crate::error::{AppError, Result};
use crate::models::{
    BossCounters, CounterQuery, Event, EventQuery, NewEvent, NewNewsItem, NewsCycleReport,
    NewsItem, NewsQuery, Page, Pagination, RaidBoss, RaidBossQuery, RaidBossSuggestion,
    RaidCounter, RaidCycleReport, RaidRefresh,
};
use crate::pipeline::normalize::{join_list, split_list};

use super::schema::SCHEMA;

const SEARCH_LIMIT: i64 = 10;

const NEWS_COLUMNS: &str =
    "id, title, content, summary, source, url, published_date, scraped_date";
const EVENT_COLUMNS: &str = "id, title, event_type, start_date, end_date, description, summary, source, url, scraped_date";
const BOSS_COLUMNS: &str = r#"id, name, pokemon_id, tier, cp_min, cp_max, cp_boosted_min, cp_boosted_max,
    types, weaknesses, weather_boost, is_active, start_date, end_date, image_url,
    scraped_date, last_updated"#;
const COUNTER_COLUMNS: &str = r#"id, raid_boss_id, pokemon_name, rank, fast_move, charge_move,
    pokemon_types, dps, tdo, ttw, is_shadow, is_mega, is_legendary, scraped_date"#;

/// Shared handle to the SQLite store.
///
/// All cycle writes go through [`Repository::commit_news_cycle`] and
/// [`Repository::commit_raid_cycle`], each of which runs in a single
/// transaction: a cycle is either fully visible or not at all.
#[derive(Clone)]
pub struct Repository {
    conn: Connection,
}

impl Repository {
    pub async fn new(db_path: &str) -> Result<Self> {
        let conn = Connection::open(db_path).await?;
        Self::init(conn).await
    }

    #[cfg(test)]
    pub async fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().await?;
        Self::init(conn).await
    }

    async fn init(conn: Connection) -> Result<Self> {
        conn.call(|conn| {
            conn.execute_batch(SCHEMA)?;
            Ok(())
        })
        .await?;

        Ok(Self { conn })
    }

    // Existence checks

    pub async fn news_exists(&self, url: &str) -> Result<bool> {
        let url = url.to_string();
        let exists = self
            .conn
            .call(move |conn| Ok(news_exists_in(conn, &url)?))
            .await?;
        Ok(exists)
    }

    pub async fn event_exists(&self, event: &NewEvent) -> Result<bool> {
        let url = event.url.clone();
        let title = event.title.clone();
        let source = event.source.clone();
        let exists = self
            .conn
            .call(move |conn| Ok(event_exists_in(conn, url.as_deref(), &title, &source)?))
            .await?;
        Ok(exists)
    }

    // Cycle commits

    /// Inserts every record not already stored. Records already present
    /// (by natural key) are left untouched, including earlier copies from
    /// the same batch.
    pub async fn commit_news_cycle(
        &self,
        news: Vec<NewNewsItem>,
        events: Vec<NewEvent>,
    ) -> Result<NewsCycleReport> {
        let report = self
            .conn
            .call(move |conn| {
                let tx = conn.transaction()?;
                let now = format_timestamp(&Utc::now());
                let mut report = NewsCycleReport::default();

                for item in &news {
                    if news_exists_in(&tx, &item.url)? {
                        continue;
                    }
                    tx.execute(
                        r#"INSERT INTO news_items
                           (title, content, summary, source, url, published_date, scraped_date)
                           VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)"#,
                        params![
                            item.title,
                            item.content,
                            item.summary,
                            item.source,
                            item.url,
                            item.published_date.as_ref().map(format_timestamp),
                            now,
                        ],
                    )?;
                    report.news_added += 1;
                }

                for event in &events {
                    if event_exists_in(&tx, event.url.as_deref(), &event.title, &event.source)? {
                        continue;
                    }
                    tx.execute(
                        r#"INSERT INTO events
                           (title, event_type, start_date, end_date, description, summary,
                            source, url, scraped_date)
                           VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)"#,
                        params![
                            event.title,
                            event.event_type,
                            event.start_date.as_ref().map(format_timestamp),
                            event.end_date.as_ref().map(format_timestamp),
                            event.description,
                            event.summary,
                            event.source,
                            event.url,
                            now,
                        ],
                    )?;
                    report.events_added += 1;
                }

                tx.commit()?;
                Ok(report)
            })
            .await?;
        Ok(report)
    }

    /// Upserts each boss by name (full replace of every writable column) and
    /// swaps its whole counter set for the new one.
    pub async fn commit_raid_cycle(&self, refreshes: Vec<RaidRefresh>) -> Result<RaidCycleReport> {
        let report = self
            .conn
            .call(move |conn| {
                let tx = conn.transaction()?;
                let now = Utc::now().trunc_subsecs(6);
                let now_text = format_timestamp(&now);
                let mut report = RaidCycleReport::default();

                for RaidRefresh { boss, counters } in &refreshes {
                    let existing: Option<(i64, String)> = tx
                        .query_row(
                            "SELECT id, last_updated FROM raid_bosses WHERE name = ?1",
                            params![boss.name],
                            |row| Ok((row.get(0)?, row.get(1)?)),
                        )
                        .optional()?;

                    let boss_id = match existing {
                        Some((id, previous)) => {
                            let last_updated = next_update_time(now, parse_datetime(&previous));
                            tx.execute(
                                r#"UPDATE raid_bosses SET
                                       pokemon_id = ?2, tier = ?3, cp_min = ?4, cp_max = ?5,
                                       cp_boosted_min = ?6, cp_boosted_max = ?7, types = ?8,
                                       weaknesses = ?9, weather_boost = ?10, is_active = ?11,
                                       start_date = ?12, end_date = ?13, image_url = ?14,
                                       last_updated = ?15
                                   WHERE id = ?1"#,
                                params![
                                    id,
                                    boss.pokemon_id,
                                    boss.tier,
                                    boss.cp_min,
                                    boss.cp_max,
                                    boss.cp_boosted_min,
                                    boss.cp_boosted_max,
                                    join_list(&boss.types),
                                    join_list(&boss.weaknesses),
                                    join_list(&boss.weather_boost),
                                    boss.is_active,
                                    boss.start_date.as_ref().map(format_timestamp),
                                    boss.end_date.as_ref().map(format_timestamp),
                                    boss.image_url,
                                    format_timestamp(&last_updated),
                                ],
                            )?;
                            report.updated += 1;
                            id
                        }
                        None => {
                            tx.execute(
                                r#"INSERT INTO raid_bosses
                                   (name, pokemon_id, tier, cp_min, cp_max, cp_boosted_min,
                                    cp_boosted_max, types, weaknesses, weather_boost, is_active,
                                    start_date, end_date, image_url, scraped_date, last_updated)
                                   VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12,
                                           ?13, ?14, ?15, ?15)"#,
                                params![
                                    boss.name,
                                    boss.pokemon_id,
                                    boss.tier,
                                    boss.cp_min,
                                    boss.cp_max,
                                    boss.cp_boosted_min,
                                    boss.cp_boosted_max,
                                    join_list(&boss.types),
                                    join_list(&boss.weaknesses),
                                    join_list(&boss.weather_boost),
                                    boss.is_active,
                                    boss.start_date.as_ref().map(format_timestamp),
                                    boss.end_date.as_ref().map(format_timestamp),
                                    boss.image_url,
                                    now_text,
                                ],
                            )?;
                            report.added += 1;
                            tx.last_insert_rowid()
                        }
                    };

                    tx.execute(
                        "DELETE FROM raid_counters WHERE raid_boss_id = ?1",
                        params![boss_id],
                    )?;
                    for counter in counters {
                        tx.execute(
                            r#"INSERT INTO raid_counters
                               (raid_boss_id, pokemon_name, rank, fast_move, charge_move,
                                pokemon_types, dps, tdo, ttw, is_shadow, is_mega, is_legendary,
                                scraped_date)
                               VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)"#,
                            params![
                                boss_id,
                                counter.pokemon_name,
                                counter.rank,
                                counter.fast_move,
                                counter.charge_move,
                                join_list(&counter.pokemon_types),
                                counter.dps,
                                counter.tdo,
                                counter.ttw,
                                counter.is_shadow,
                                counter.is_mega,
                                counter.is_legendary,
                                now_text,
                            ],
                        )?;
                    }

                    report.total_processed += 1;
                }

                tx.commit()?;
                Ok(report)
            })
            .await?;
        Ok(report)
    }

    // News queries

    pub async fn list_news(&self, query: NewsQuery) -> Result<Page<NewsItem>> {
        let mut filter = Filter::default();
        if let Some(source) = query.source {
            filter.push("source = ?", Value::Text(source));
        }
        let pagination = query.pagination;

        let (items, total) = self
            .conn
            .call(move |conn| {
                let total = filter.count(conn, "news_items")?;
                let sql = format!(
                    "SELECT {NEWS_COLUMNS} FROM news_items{} \
                     ORDER BY published_date DESC NULLS LAST, scraped_date DESC LIMIT ? OFFSET ?",
                    filter.where_clause()
                );
                let mut stmt = conn.prepare(&sql)?;
                let items = stmt
                    .query_map(params_from_iter(filter.paged(pagination)), news_from_row)?
                    .collect::<std::result::Result<Vec<_>, _>>()?;
                Ok((items, total))
            })
            .await?;
        Ok(Page::new(items, pagination, total))
    }

    pub async fn get_news(&self, id: i64) -> Result<Option<NewsItem>> {
        let item = self
            .conn
            .call(move |conn| {
                let sql = format!("SELECT {NEWS_COLUMNS} FROM news_items WHERE id = ?1");
                Ok(conn.query_row(&sql, params![id], news_from_row).optional()?)
            })
            .await?;
        Ok(item)
    }

    pub async fn news_sources(&self) -> Result<Vec<String>> {
        self.distinct_values("SELECT DISTINCT source FROM news_items ORDER BY source")
            .await
    }

    // Event queries

    pub async fn list_events(&self, query: EventQuery) -> Result<Page<Event>> {
        let mut filter = Filter::default();
        if let Some(event_type) = query.event_type {
            filter.push("event_type = ?", Value::Text(event_type));
        }
        if let Some(source) = query.source {
            filter.push("source = ?", Value::Text(source));
        }
        if let Some(start) = query.starts_after {
            filter.push("start_date >= ?", Value::Text(format_timestamp(&start)));
        }
        if let Some(end) = query.ends_before {
            filter.push("end_date <= ?", Value::Text(format_timestamp(&end)));
        }
        let pagination = query.pagination;

        let (events, total) = self
            .conn
            .call(move |conn| {
                let total = filter.count(conn, "events")?;
                let sql = format!(
                    "SELECT {EVENT_COLUMNS} FROM events{} \
                     ORDER BY start_date DESC NULLS LAST, scraped_date DESC LIMIT ? OFFSET ?",
                    filter.where_clause()
                );
                let mut stmt = conn.prepare(&sql)?;
                let events = stmt
                    .query_map(params_from_iter(filter.paged(pagination)), event_from_row)?
                    .collect::<std::result::Result<Vec<_>, _>>()?;
                Ok((events, total))
            })
            .await?;
        Ok(Page::new(events, pagination, total))
    }

    pub async fn get_event(&self, id: i64) -> Result<Option<Event>> {
        let event = self
            .conn
            .call(move |conn| {
                let sql = format!("SELECT {EVENT_COLUMNS} FROM events WHERE id = ?1");
                Ok(conn.query_row(&sql, params![id], event_from_row).optional()?)
            })
            .await?;
        Ok(event)
    }

    pub async fn event_types(&self) -> Result<Vec<String>> {
        self.distinct_values(
            "SELECT DISTINCT event_type FROM events WHERE event_type IS NOT NULL ORDER BY event_type",
        )
        .await
    }

    /// Events starting within the given calendar month, earliest first.
    pub async fn calendar_events(&self, year: i32, month: u32) -> Result<Vec<Event>> {
        let start = NaiveDate::from_ymd_opt(year, month, 1)
            .ok_or_else(|| AppError::BadRequest(format!("invalid month {year}-{month}")))?;
        let next = if start.month() == 12 {
            NaiveDate::from_ymd_opt(year + 1, 1, 1)
        } else {
            NaiveDate::from_ymd_opt(year, month + 1, 1)
        }
        .ok_or_else(|| AppError::BadRequest(format!("invalid month {year}-{month}")))?;

        let start = format_timestamp(&start.and_time(chrono::NaiveTime::MIN).and_utc());
        let next = format_timestamp(&next.and_time(chrono::NaiveTime::MIN).and_utc());

        let events = self
            .conn
            .call(move |conn| {
                let sql = format!(
                    "SELECT {EVENT_COLUMNS} FROM events \
                     WHERE start_date >= ?1 AND start_date < ?2 ORDER BY start_date, id"
                );
                let mut stmt = conn.prepare(&sql)?;
                let events = stmt
                    .query_map(params![start, next], event_from_row)?
                    .collect::<std::result::Result<Vec<_>, _>>()?;
                Ok(events)
            })
            .await?;
        Ok(events)
    }

    /// Events that have not ended as of `now`, earliest start first.
    /// Events without an end date are left out.
    pub async fn upcoming_events(&self, now: DateTime<Utc>) -> Result<Vec<Event>> {
        let now = format_timestamp(&now);
        let events = self
            .conn
            .call(move |conn| {
                let sql = format!(
                    "SELECT {EVENT_COLUMNS} FROM events WHERE end_date >= ?1 ORDER BY start_date, id"
                );
                let mut stmt = conn.prepare(&sql)?;
                let events = stmt
                    .query_map(params![now], event_from_row)?
                    .collect::<std::result::Result<Vec<_>, _>>()?;
                Ok(events)
            })
            .await?;
        Ok(events)
    }

    // Raid queries

    pub async fn list_raid_bosses(&self, query: RaidBossQuery) -> Result<Page<RaidBoss>> {
        let mut filter = Filter::default();
        if let Some(tier) = query.tier {
            filter.push("tier = ?", Value::Text(tier));
        }
        if let Some(active) = query.active {
            filter.push("is_active = ?", Value::Integer(i64::from(active)));
        }
        let pagination = query.pagination;

        let (bosses, total) = self
            .conn
            .call(move |conn| {
                let total = filter.count(conn, "raid_bosses")?;
                let sql = format!(
                    "SELECT {BOSS_COLUMNS} FROM raid_bosses{} ORDER BY tier, name LIMIT ? OFFSET ?",
                    filter.where_clause()
                );
                let mut stmt = conn.prepare(&sql)?;
                let bosses = stmt
                    .query_map(params_from_iter(filter.paged(pagination)), boss_from_row)?
                    .collect::<std::result::Result<Vec<_>, _>>()?;
                Ok((bosses, total))
            })
            .await?;
        Ok(Page::new(bosses, pagination, total))
    }

    pub async fn raid_tiers(&self) -> Result<Vec<String>> {
        self.distinct_values(
            "SELECT DISTINCT tier FROM raid_bosses WHERE tier IS NOT NULL ORDER BY tier",
        )
        .await
    }

    /// Case-insensitive substring search, active bosses first.
    pub async fn search_raid_bosses(&self, q: &str) -> Result<Vec<RaidBossSuggestion>> {
        let q = q.trim().to_lowercase();
        if q.is_empty() {
            return Ok(Vec::new());
        }

        let suggestions = self
            .conn
            .call(move |conn| {
                let mut stmt = conn.prepare(
                    r#"SELECT id, name, tier, is_active, types FROM raid_bosses
                       WHERE instr(lower(name), ?1) > 0
                       ORDER BY is_active DESC, name
                       LIMIT ?2"#,
                )?;
                let suggestions = stmt
                    .query_map(params![q, SEARCH_LIMIT], |row| {
                        Ok(RaidBossSuggestion {
                            id: row.get(0)?,
                            name: row.get(1)?,
                            tier: row.get(2)?,
                            is_active: row.get(3)?,
                            types: list_column(row, 4)?,
                        })
                    })?
                    .collect::<std::result::Result<Vec<_>, _>>()?;
                Ok(suggestions)
            })
            .await?;
        Ok(suggestions)
    }

    /// Looks a boss up by case-insensitive exact name and returns its
    /// counters ordered by rank, then insertion. `None` when the boss is
    /// unknown.
    pub async fn counters_for_boss(
        &self,
        name: &str,
        query: CounterQuery,
    ) -> Result<Option<BossCounters>> {
        let name = name.to_string();
        let result = self
            .conn
            .call(move |conn| {
                let sql = format!(
                    "SELECT {BOSS_COLUMNS} FROM raid_bosses WHERE name = ?1 COLLATE NOCASE ORDER BY id LIMIT 1"
                );
                let Some(boss) = conn.query_row(&sql, params![name], boss_from_row).optional()?
                else {
                    return Ok(None);
                };

                let sql = format!(
                    "SELECT {COUNTER_COLUMNS} FROM raid_counters
                     WHERE raid_boss_id = ?1
                       AND (?2 OR is_shadow = 0)
                       AND (?3 OR is_mega = 0)
                       AND (?4 OR is_legendary = 0)
                     ORDER BY rank, id
                     LIMIT ?5"
                );
                let mut stmt = conn.prepare(&sql)?;
                let counters = stmt
                    .query_map(
                        params![
                            boss.id,
                            query.include_shadow,
                            query.include_mega,
                            query.include_legendary,
                            i64::from(query.limit),
                        ],
                        counter_from_row,
                    )?
                    .collect::<std::result::Result<Vec<_>, _>>()?;
                Ok(Some(BossCounters { boss, counters }))
            })
            .await?;
        Ok(result)
    }

    async fn distinct_values(&self, sql: &'static str) -> Result<Vec<String>> {
        let values = self
            .conn
            .call(move |conn| {
                let mut stmt = conn.prepare(sql)?;
                let values = stmt
                    .query_map([], |row| row.get::<_, String>(0))?
                    .collect::<std::result::Result<Vec<_>, _>>()?;
                Ok(values)
            })
            .await?;
        Ok(values)
    }
}

/// Accumulates `WHERE` clauses with their positional arguments.
#[derive(Default)]
struct Filter {
    clauses: Vec<&'static str>,
    args: Vec<Value>,
}

impl Filter {
    fn push(&mut self, clause: &'static str, arg: Value) {
        self.clauses.push(clause);
        self.args.push(arg);
    }

    fn where_clause(&self) -> String {
        if self.clauses.is_empty() {
            String::new()
        } else {
            format!(" WHERE {}", self.clauses.join(" AND "))
        }
    }

    fn count(&self, conn: &rusqlite::Connection, table: &str) -> rusqlite::Result<u64> {
        let sql = format!("SELECT COUNT(*) FROM {table}{}", self.where_clause());
        let total: i64 = conn.query_row(&sql, params_from_iter(self.args.iter()), |row| row.get(0))?;
        Ok(total.max(0) as u64)
    }

    fn paged(&self, pagination: Pagination) -> Vec<Value> {
        let mut args = self.args.clone();
        args.push(Value::Integer(pagination.limit()));
        args.push(Value::Integer(pagination.offset()));
        args
    }
}

fn news_exists_in(conn: &rusqlite::Connection, url: &str) -> rusqlite::Result<bool> {
    conn.query_row(
        "SELECT EXISTS(SELECT 1 FROM news_items WHERE url = ?1)",
        params![url],
        |row| row.get(0),
    )
}

/// Events with a url are keyed by it; url-less events by `(title, source)`.
fn event_exists_in(
    conn: &rusqlite::Connection,
    url: Option<&str>,
    title: &str,
    source: &str,
) -> rusqlite::Result<bool> {
    match url {
        Some(url) => conn.query_row(
            "SELECT EXISTS(SELECT 1 FROM events WHERE url = ?1)",
            params![url],
            |row| row.get(0),
        ),
        None => conn.query_row(
            "SELECT EXISTS(SELECT 1 FROM events WHERE url IS NULL AND title = ?1 AND source = ?2)",
            params![title, source],
            |row| row.get(0),
        ),
    }
}

/// `last_updated` must strictly increase even when two updates land within
/// the same microsecond.
fn next_update_time(now: DateTime<Utc>, previous: Option<DateTime<Utc>>) -> DateTime<Utc> {
    match previous {
        Some(previous) if previous >= now => previous + Duration::microseconds(1),
        _ => now,
    }
}

fn format_timestamp(dt: &DateTime<Utc>) -> String {
    dt.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn parse_datetime(s: &str) -> Option<DateTime<Utc>> {
    // Try RFC3339 first (e.g., "2026-01-11T12:34:56.000000Z")
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }
    // Try SQLite datetime format (e.g., "2026-01-11 12:34:56")
    if let Ok(naive) = chrono::NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S") {
        return Some(naive.and_utc());
    }
    None
}

fn optional_datetime(row: &Row, idx: usize) -> rusqlite::Result<Option<DateTime<Utc>>> {
    Ok(row
        .get::<_, Option<String>>(idx)?
        .and_then(|s| parse_datetime(&s)))
}

fn datetime_or_now(row: &Row, idx: usize) -> rusqlite::Result<DateTime<Utc>> {
    Ok(optional_datetime(row, idx)?.unwrap_or_else(Utc::now))
}

fn list_column(row: &Row, idx: usize) -> rusqlite::Result<Vec<String>> {
    Ok(row
        .get::<_, Option<String>>(idx)?
        .map(|s| split_list(&s))
        .unwrap_or_default())
}

fn news_from_row(row: &Row) -> rusqlite::Result<NewsItem> {
    Ok(NewsItem {
        id: row.get(0)?,
        title: row.get(1)?,
        content: row.get(2)?,
        summary: row.get(3)?,
        source: row.get(4)?,
        url: row.get(5)?,
        published_date: optional_datetime(row, 6)?,
        scraped_date: datetime_or_now(row, 7)?,
    })
}

fn event_from_row(row: &Row) -> rusqlite::Result<Event> {
    Ok(Event {
        id: row.get(0)?,
        title: row.get(1)?,
        event_type: row.get(2)?,
        start_date: optional_datetime(row, 3)?,
        end_date: optional_datetime(row, 4)?,
        description: row.get(5)?,
        summary: row.get(6)?,
        source: row.get(7)?,
        url: row.get(8)?,
        scraped_date: datetime_or_now(row, 9)?,
    })
}

fn boss_from_row(row: &Row) -> rusqlite::Result<RaidBoss> {
    Ok(RaidBoss {
        id: row.get(0)?,
        name: row.get(1)?,
        pokemon_id: row.get(2)?,
        tier: row.get(3)?,
        cp_min: row.get(4)?,
        cp_max: row.get(5)?,
        cp_boosted_min: row.get(6)?,
        cp_boosted_max: row.get(7)?,
        types: list_column(row, 8)?,
        weaknesses: list_column(row, 9)?,
        weather_boost: list_column(row, 10)?,
        is_active: row.get(11)?,
        start_date: optional_datetime(row, 12)?,
        end_date: optional_datetime(row, 13)?,
        image_url: row.get(14)?,
        scraped_date: datetime_or_now(row, 15)?,
        last_updated: datetime_or_now(row, 16)?,
    })
}

fn counter_from_row(row: &Row) -> rusqlite::Result<RaidCounter> {
    Ok(RaidCounter {
        id: row.get(0)?,
        raid_boss_id: row.get(1)?,
        pokemon_name: row.get(2)?,
        rank: row.get(3)?,
        fast_move: row.get(4)?,
        charge_move: row.get(5)?,
        pokemon_types: list_column(row, 6)?,
        dps: row.get(7)?,
        tdo: row.get(8)?,
        ttw: row.get(9)?,
        is_shadow: row.get(10)?,
        is_mega: row.get(11)?,
        is_legendary: row.get(12)?,
        scraped_date: datetime_or_now(row, 13)?,
    })
}
