use axum::extract::State;
use axum::Json;
use serde::Serialize;
use serde_json::{json, Value};

use super::{ApiResponse, AppState};
use crate::error::Result;
use crate::models::NewsCycleReport;
use crate::scheduler::{job_status, SchedulerStatus};

#[derive(Serialize)]
pub struct HealthResponse {
    status: &'static str,
    jobs: SchedulerStatus,
}

pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy",
        jobs: job_status(&state.pipeline),
    })
}

pub async fn index() -> Json<Value> {
    Json(json!({
        "name": env!("CARGO_PKG_NAME"),
        "version": env!("CARGO_PKG_VERSION"),
        "endpoints": {
            "news": "/api/news",
            "events": "/api/events",
            "raids": "/api/raids",
            "scrape": "/api/scrape",
            "health": "/api/health",
            "assistant": "/api/assistant",
        },
    }))
}

/// Runs a news+events cycle synchronously.
pub async fn trigger_scrape(
    State(state): State<AppState>,
) -> Result<Json<ApiResponse<NewsCycleReport>>> {
    let report = state.pipeline.run_news_cycle().await?;
    Ok(ApiResponse::ok(report))
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use axum::http::StatusCode;

    use crate::api::tests::{app_with, send};
    use crate::pipeline::tests::{stub, FakeRaids, FakeSource};

    #[tokio::test]
    async fn health_and_index() {
        let (app, _) = app_with(vec![], FakeRaids::default()).await;

        let (status, body) = send(&app, "GET", "/api/health").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "healthy");
        assert_eq!(body["jobs"]["news"], "Idle");

        let (status, body) = send(&app, "GET", "/").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["endpoints"]["news"], "/api/news");
    }

    #[tokio::test]
    async fn manual_scrape_reports_counts() {
        let (app, _) = app_with(
            vec![Box::new(FakeSource::with_news("Serebii", &["https://s/1"]))],
            FakeRaids::default(),
        )
        .await;

        let (status, body) = send(&app, "POST", "/api/scrape").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["success"], true);
        assert_eq!(body["data"]["news_added"], 1);

        let (_, body) = send(&app, "POST", "/api/scrape").await;
        assert_eq!(body["data"]["news_added"], 0);
    }

    #[tokio::test]
    async fn overlapping_refresh_is_409() {
        let (app, pipeline) = app_with(
            vec![],
            FakeRaids {
                bosses: vec![stub("Dialga")],
                hold: Some(Duration::from_millis(200)),
                ..Default::default()
            },
        )
        .await;

        let running = {
            let pipeline = Arc::clone(&pipeline);
            tokio::spawn(async move { pipeline.run_raid_cycle().await })
        };
        tokio::time::sleep(Duration::from_millis(50)).await;

        let (status, body) = send(&app, "POST", "/api/raids/refresh").await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(body["success"], false);

        let (_, body) = send(&app, "GET", "/api/health").await;
        assert_eq!(body["jobs"]["raids"], "Running");

        running.await.unwrap().unwrap();
    }
}
