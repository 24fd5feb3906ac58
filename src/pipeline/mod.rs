//! The two cycles everything else drives: news+events and raids.
//!
//! A cycle gathers from every adapter in turn, normalizes, summarizes only
//! what is not stored yet, and hands the batch to the repository for a single
//! transactional commit. Adapter failures shrink the batch; persistence
//! failures abort the cycle.

pub mod normalize;

use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};

use tracing::{info, instrument, warn};

use crate::ai::SummaryGateway;
use crate::db::Repository;
use crate::error::{AppError, Result};
use crate::models::{NewEvent, NewNewsItem, NewsCycleReport, RaidCycleReport, RaidRefresh};
use crate::sources::{RaidSource, SourceAdapter};

use normalize::{merge_boss, normalize_counters, normalize_event, normalize_news};

pub struct Pipeline {
    sources: Vec<Box<dyn SourceAdapter>>,
    raid_source: Box<dyn RaidSource>,
    gateway: SummaryGateway,
    repo: Repository,
    news_running: AtomicBool,
    raid_running: AtomicBool,
}

/// Clears a running flag when the cycle ends, however it ends.
struct RunningGuard<'a>(&'a AtomicBool);

impl<'a> RunningGuard<'a> {
    fn acquire(flag: &'a AtomicBool, cycle: &'static str) -> Result<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .map_err(|_| AppError::CycleInProgress(cycle))?;
        Ok(Self(flag))
    }
}

impl Drop for RunningGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

impl Pipeline {
    pub fn new(
        sources: Vec<Box<dyn SourceAdapter>>,
        raid_source: Box<dyn RaidSource>,
        gateway: SummaryGateway,
        repo: Repository,
    ) -> Self {
        Self {
            sources,
            raid_source,
            gateway,
            repo,
            news_running: AtomicBool::new(false),
            raid_running: AtomicBool::new(false),
        }
    }

    pub fn repository(&self) -> &Repository {
        &self.repo
    }

    pub fn news_cycle_running(&self) -> bool {
        self.news_running.load(Ordering::Acquire)
    }

    pub fn raid_cycle_running(&self) -> bool {
        self.raid_running.load(Ordering::Acquire)
    }

    /// Scrapes news and events from every source and commits whatever is new.
    /// Fails with [`AppError::CycleInProgress`] if a news cycle is already
    /// running.
    #[instrument(level = "info", skip_all)]
    pub async fn run_news_cycle(&self) -> Result<NewsCycleReport> {
        let _guard = RunningGuard::acquire(&self.news_running, "news")?;
        info!("Starting news cycle");

        let mut news = Vec::new();
        let mut events = Vec::new();

        for source in &self.sources {
            let name = source.name();

            match source.fetch_news().await {
                Ok(items) => {
                    news.extend(items.into_iter().filter_map(|raw| normalize_news(raw, name)))
                }
                Err(e) => warn!(source = name, error = %e, "News fetch failed"),
            }

            match source.fetch_events().await {
                Ok(items) => {
                    events.extend(items.into_iter().filter_map(|raw| normalize_event(raw, name)))
                }
                Err(e) => warn!(source = name, error = %e, "Event fetch failed"),
            }
        }

        let news = self.summarize_new_news(news).await?;
        let events = self.summarize_new_events(events).await?;

        let report = self.repo.commit_news_cycle(news, events).await?;
        info!(
            news_added = report.news_added,
            events_added = report.events_added,
            "News cycle committed"
        );
        Ok(report)
    }

    /// Refreshes raid bosses and their counters from the raid source.
    /// Fails with [`AppError::CycleInProgress`] if a raid cycle is already
    /// running.
    #[instrument(level = "info", skip_all, fields(source = self.raid_source.name()))]
    pub async fn run_raid_cycle(&self) -> Result<RaidCycleReport> {
        let _guard = RunningGuard::acquire(&self.raid_running, "raid")?;
        info!("Starting raid cycle");

        let stubs = match self.raid_source.fetch_raid_bosses().await {
            Ok(stubs) => stubs,
            Err(e) => {
                warn!(error = %e, "Raid boss list fetch failed");
                Vec::new()
            }
        };

        let delay = self.raid_source.detail_delay();
        let mut refreshes = Vec::new();

        for (i, stub) in stubs.iter().take(self.raid_source.max_bosses()).enumerate() {
            if i > 0 && !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }

            let (info, counters) = match self.raid_source.fetch_counters(&stub.name).await {
                Ok(detail) => detail,
                Err(e) => {
                    warn!(boss = %stub.name, error = %e, "Counter fetch failed, leaving boss untouched");
                    continue;
                }
            };

            if let Some(boss) = merge_boss(stub, info) {
                refreshes.push(RaidRefresh {
                    boss,
                    counters: normalize_counters(counters),
                });
            }
        }

        let report = self.repo.commit_raid_cycle(refreshes).await?;
        info!(
            added = report.added,
            updated = report.updated,
            total = report.total_processed,
            "Raid cycle committed"
        );
        Ok(report)
    }

    async fn summarize_new_news(&self, items: Vec<NewNewsItem>) -> Result<Vec<NewNewsItem>> {
        let mut seen = HashSet::new();
        let mut fresh = Vec::new();

        for mut item in items {
            if !seen.insert(item.url.clone()) || self.repo.news_exists(&item.url).await? {
                continue;
            }
            let content = item.content.as_deref().unwrap_or_default();
            item.summary = Some(self.gateway.summarize_news(&item.title, content).await);
            fresh.push(item);
        }

        Ok(fresh)
    }

    async fn summarize_new_events(&self, events: Vec<NewEvent>) -> Result<Vec<NewEvent>> {
        let mut seen = HashSet::new();
        let mut fresh = Vec::new();

        for mut event in events {
            let key = match &event.url {
                Some(url) => (Some(url.clone()), String::new(), String::new()),
                None => (None, event.title.clone(), event.source.clone()),
            };
            if !seen.insert(key) || self.repo.event_exists(&event).await? {
                continue;
            }
            let description = event.description.as_deref().unwrap_or_default();
            event.summary = Some(self.gateway.summarize_event(&event.title, description).await);
            fresh.push(event);
        }

        Ok(fresh)
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::ai::TextGenerator;
    use crate::models::{CounterQuery, NewRaidCounter, NewsQuery, Pagination, RaidBossQuery};
    use crate::sources::{BossInfo, BossStub, RawEvent, RawNews};
    use async_trait::async_trait;
    use std::sync::atomic::AtomicUsize;
    use std::sync::{Arc, Mutex};
    use std::time::Duration;

    pub(crate) struct FakeSource {
        pub name: &'static str,
        pub news: Vec<RawNews>,
        pub events: Vec<RawEvent>,
        pub fail: bool,
    }

    impl FakeSource {
        pub fn with_news(name: &'static str, urls: &[&str]) -> Self {
            Self {
                name,
                news: urls
                    .iter()
                    .map(|url| RawNews {
                        title: Some(format!("News {url}")),
                        url: Some(url.to_string()),
                        content: Some("Some body text.".into()),
                        published: Some("2024-03-01T10:00:00Z".into()),
                    })
                    .collect(),
                events: Vec::new(),
                fail: false,
            }
        }

        pub fn failing(name: &'static str) -> Self {
            Self {
                name,
                news: Vec::new(),
                events: Vec::new(),
                fail: true,
            }
        }
    }

    #[async_trait]
    impl SourceAdapter for FakeSource {
        fn name(&self) -> &'static str {
            self.name
        }

        async fn fetch_news(&self) -> Result<Vec<RawNews>> {
            if self.fail {
                return Err(AppError::UpstreamStatus {
                    url: format!("https://{}.invalid", self.name),
                    status: 503,
                });
            }
            Ok(self.news.clone())
        }

        async fn fetch_events(&self) -> Result<Vec<RawEvent>> {
            Ok(self.events.clone())
        }
    }

    #[derive(Default)]
    pub(crate) struct FakeRaids {
        pub bosses: Vec<BossStub>,
        pub counters: Vec<&'static str>,
        pub failing: Vec<&'static str>,
        pub hold: Option<Duration>,
        pub requested: Arc<Mutex<Vec<String>>>,
    }

    pub(crate) fn stub(name: &str) -> BossStub {
        BossStub {
            name: name.to_string(),
            tier: Some("5".into()),
            url: None,
            is_active: true,
        }
    }

    #[async_trait]
    impl RaidSource for FakeRaids {
        fn name(&self) -> &'static str {
            "Fake"
        }

        async fn fetch_raid_bosses(&self) -> Result<Vec<BossStub>> {
            if let Some(hold) = self.hold {
                tokio::time::sleep(hold).await;
            }
            Ok(self.bosses.clone())
        }

        async fn fetch_counters(&self, boss_name: &str) -> Result<(BossInfo, Vec<NewRaidCounter>)> {
            self.requested.lock().unwrap().push(boss_name.to_string());
            if self.failing.contains(&boss_name) {
                return Err(AppError::NotFound(boss_name.to_string()));
            }
            let counters = self
                .counters
                .iter()
                .enumerate()
                .map(|(i, name)| NewRaidCounter {
                    pokemon_name: name.to_string(),
                    rank: i as i64 + 1,
                    ..Default::default()
                })
                .collect();
            let info = BossInfo {
                types: vec!["Dragon".into()],
                ..Default::default()
            };
            Ok((info, counters))
        }

        fn max_bosses(&self) -> usize {
            3
        }
    }

    struct CountingGenerator(AtomicUsize);

    #[async_trait]
    impl TextGenerator for CountingGenerator {
        async fn generate(&self, _prompt: &str, _max_tokens: u32) -> Result<String> {
            self.0.fetch_add(1, Ordering::SeqCst);
            Ok("Generated summary.".into())
        }
    }

    pub(crate) async fn pipeline_with(
        sources: Vec<Box<dyn SourceAdapter>>,
        raids: FakeRaids,
    ) -> Pipeline {
        let repo = Repository::in_memory().await.unwrap();
        Pipeline::new(sources, Box::new(raids), SummaryGateway::offline(), repo)
    }

    fn all_news() -> NewsQuery {
        NewsQuery {
            source: None,
            pagination: Pagination::new(None, Some(100), 20),
        }
    }

    #[tokio::test]
    async fn failing_source_does_not_block_others() {
        let pipeline = pipeline_with(
            vec![
                Box::new(FakeSource::failing("Broken")),
                Box::new(FakeSource::with_news("Working", &["https://w/1", "https://w/2"])),
            ],
            FakeRaids::default(),
        )
        .await;

        let report = pipeline.run_news_cycle().await.unwrap();
        assert_eq!(report.news_added, 2);

        let page = pipeline.repository().list_news(all_news()).await.unwrap();
        assert!(page.data.iter().all(|n| n.source == "Working"));
        assert!(page
            .data
            .iter()
            .all(|n| n.summary.as_deref() == Some("Some body text.")));
    }

    #[tokio::test]
    async fn second_cycle_adds_nothing_and_skips_summaries() {
        let generator = Arc::new(CountingGenerator(AtomicUsize::new(0)));
        let repo = Repository::in_memory().await.unwrap();
        let mut source = FakeSource::with_news("LeekDuck", &["https://l/1"]);
        source.events = vec![RawEvent {
            title: Some("Community Day: Bulbasaur".into()),
            url: Some("https://l/events/cd".into()),
            date_text: Some("March 2, 2024 - March 3, 2024".into()),
            ..Default::default()
        }];
        let pipeline = Pipeline::new(
            vec![Box::new(source)],
            Box::new(FakeRaids::default()),
            SummaryGateway::new(Some(generator.clone())),
            repo,
        );

        let first = pipeline.run_news_cycle().await.unwrap();
        let second = pipeline.run_news_cycle().await.unwrap();

        assert_eq!(first, NewsCycleReport { news_added: 1, events_added: 1 });
        assert_eq!(second, NewsCycleReport::default());
        assert_eq!(generator.0.load(Ordering::SeqCst), 2);

        let events = pipeline.repository().calendar_events(2024, 3).await.unwrap();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].event_type.as_deref(), Some("Community Day"));
        assert_eq!(events[0].summary.as_deref(), Some("Generated summary."));
    }

    #[tokio::test]
    async fn raid_cycle_skips_failed_bosses_and_caps_detail_fetches() {
        let raids = FakeRaids {
            bosses: ["Dialga", "Palkia", "Giratina", "Regigigas"]
                .iter()
                .map(|n| stub(n))
                .collect(),
            counters: vec!["Machamp", "Lucario"],
            failing: vec!["Palkia"],
            ..Default::default()
        };
        let requested = raids.requested.clone();
        let pipeline = pipeline_with(vec![], raids).await;

        let report = pipeline.run_raid_cycle().await.unwrap();
        assert_eq!(report.added, 2);
        assert_eq!(*requested.lock().unwrap(), ["Dialga", "Palkia", "Giratina"]);
        assert_eq!(report.total_processed, 2);

        let page = pipeline
            .repository()
            .list_raid_bosses(RaidBossQuery {
                tier: None,
                active: None,
                pagination: Pagination::new(None, None, 50),
            })
            .await
            .unwrap();
        let names: Vec<_> = page.data.iter().map(|b| b.name.as_str()).collect();
        assert_eq!(names, ["Dialga", "Giratina"]);

        let counters = pipeline
            .repository()
            .counters_for_boss("Dialga", CounterQuery::default())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(counters.counters.len(), 2);
        assert_eq!(counters.boss.types, vec!["Dragon".to_string()]);
    }

    #[tokio::test]
    async fn overlapping_raid_cycles_are_rejected() {
        let raids = FakeRaids {
            bosses: vec![stub("Dialga")],
            hold: Some(Duration::from_millis(200)),
            ..Default::default()
        };
        let pipeline = Arc::new(pipeline_with(vec![], raids).await);

        let running = {
            let pipeline = pipeline.clone();
            tokio::spawn(async move { pipeline.run_raid_cycle().await })
        };
        tokio::time::sleep(Duration::from_millis(50)).await;

        assert!(pipeline.raid_cycle_running());
        assert!(matches!(
            pipeline.run_raid_cycle().await,
            Err(AppError::CycleInProgress("raid"))
        ));

        let report = running.await.unwrap().unwrap();
        assert_eq!(report.added, 1);
        assert!(!pipeline.raid_cycle_running());
    }
}
