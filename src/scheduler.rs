//! Background runner for the two periodic cycles.
//!
//! Each job owns a ticker; ticks missed while a cycle runs are dropped, never
//! queued. Manual triggers share the pipeline's running flags, so a tick that
//! lands during a manual run is skipped.

use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{self, Instant, MissedTickBehavior};
use tracing::{error, info};

use crate::error::AppError;
use crate::pipeline::Pipeline;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum JobState {
    Idle,
    Running,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SchedulerStatus {
    pub news: JobState,
    pub raids: JobState,
}

#[derive(Debug, Clone, Copy)]
enum Job {
    News,
    Raids,
}

impl Job {
    fn name(self) -> &'static str {
        match self {
            Job::News => "news",
            Job::Raids => "raids",
        }
    }

    async fn run(self, pipeline: &Pipeline) {
        let result = match self {
            Job::News => pipeline.run_news_cycle().await.map(|r| {
                info!(news = r.news_added, events = r.events_added, "Scheduled news cycle done")
            }),
            Job::Raids => pipeline.run_raid_cycle().await.map(|r| {
                info!(added = r.added, updated = r.updated, "Scheduled raid cycle done")
            }),
        };

        match result {
            Ok(()) => {}
            Err(AppError::CycleInProgress(_)) => {
                info!(job = self.name(), "Cycle already running, skipping tick")
            }
            Err(e) => error!(job = self.name(), error = %e, "Scheduled cycle failed"),
        }
    }
}

pub struct Scheduler {
    pipeline: Arc<Pipeline>,
    shutdown_tx: watch::Sender<bool>,
    handles: Vec<JoinHandle<()>>,
}

impl Scheduler {
    /// Spawns both jobs. The news job fires immediately when
    /// `scrape_on_startup` is set; the raid job always waits one interval.
    pub fn start(
        pipeline: Arc<Pipeline>,
        news_interval: Duration,
        raid_interval: Duration,
        scrape_on_startup: bool,
    ) -> Self {
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let now = Instant::now();

        let news_start = if scrape_on_startup {
            now
        } else {
            now + news_interval
        };

        let handles = vec![
            spawn_job(
                Job::News,
                pipeline.clone(),
                news_start,
                news_interval,
                shutdown_rx.clone(),
            ),
            spawn_job(
                Job::Raids,
                pipeline.clone(),
                now + raid_interval,
                raid_interval,
                shutdown_rx,
            ),
        ];

        info!(
            news_minutes = news_interval.as_secs() / 60,
            raid_hours = raid_interval.as_secs() / 3600,
            "Scheduler started"
        );

        Self {
            pipeline,
            shutdown_tx,
            handles,
        }
    }

    pub fn status(&self) -> SchedulerStatus {
        job_status(&self.pipeline)
    }

    /// Stops ticking and waits for any in-flight cycle to finish.
    pub async fn shutdown(self) {
        let _ = self.shutdown_tx.send(true);
        for handle in self.handles {
            if let Err(e) = handle.await {
                error!(error = %e, "Scheduler task panicked");
            }
        }
        info!("Scheduler stopped");
    }
}

/// Job states as seen through the pipeline's running flags; manual runs
/// count too.
pub fn job_status(pipeline: &Pipeline) -> SchedulerStatus {
    SchedulerStatus {
        news: state(pipeline.news_cycle_running()),
        raids: state(pipeline.raid_cycle_running()),
    }
}

fn state(running: bool) -> JobState {
    if running {
        JobState::Running
    } else {
        JobState::Idle
    }
}

fn spawn_job(
    job: Job,
    pipeline: Arc<Pipeline>,
    start: Instant,
    period: Duration,
    mut shutdown_rx: watch::Receiver<bool>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = time::interval_at(start, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                _ = ticker.tick() => job.run(&pipeline).await,
                _ = shutdown_rx.changed() => break,
            }
            if *shutdown_rx.borrow() {
                break;
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{NewsQuery, Pagination, RaidBossQuery};
    use crate::pipeline::tests::{pipeline_with, stub, FakeRaids, FakeSource};

    const HOUR: Duration = Duration::from_secs(3600);

    #[tokio::test]
    async fn news_job_fires_on_startup_and_raid_job_waits() {
        let pipeline = Arc::new(
            pipeline_with(
                vec![Box::new(FakeSource::with_news("LeekDuck", &["https://l/1"]))],
                FakeRaids {
                    bosses: vec![stub("Dialga")],
                    ..Default::default()
                },
            )
            .await,
        );

        let scheduler = Scheduler::start(pipeline.clone(), HOUR, HOUR, true);
        tokio::time::sleep(Duration::from_millis(100)).await;
        scheduler.shutdown().await;

        let repo = pipeline.repository();
        let news = repo
            .list_news(NewsQuery {
                source: None,
                pagination: Pagination::new(None, None, 20),
            })
            .await
            .unwrap();
        assert_eq!(news.total, 1);

        let bosses = repo
            .list_raid_bosses(RaidBossQuery {
                tier: None,
                active: None,
                pagination: Pagination::new(None, None, 50),
            })
            .await
            .unwrap();
        assert_eq!(bosses.total, 0);
    }

    #[tokio::test]
    async fn status_reports_running_cycle_and_shutdown_waits_for_it() {
        let pipeline = Arc::new(
            pipeline_with(
                vec![],
                FakeRaids {
                    bosses: vec![stub("Palkia")],
                    hold: Some(Duration::from_millis(300)),
                    ..Default::default()
                },
            )
            .await,
        );

        let scheduler =
            Scheduler::start(pipeline.clone(), HOUR, Duration::from_millis(20), false);
        tokio::time::sleep(Duration::from_millis(100)).await;

        assert_eq!(
            scheduler.status(),
            SchedulerStatus {
                news: JobState::Idle,
                raids: JobState::Running,
            }
        );

        scheduler.shutdown().await;
        assert!(!pipeline.raid_cycle_running());

        let bosses = pipeline
            .repository()
            .list_raid_bosses(RaidBossQuery {
                tier: None,
                active: None,
                pagination: Pagination::new(None, None, 50),
            })
            .await
            .unwrap();
        assert_eq!(bosses.total, 1);
    }
}
