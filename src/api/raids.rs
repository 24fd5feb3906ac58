use axum::extract::{Path, Query, State};
use axum::Json;
use serde::Deserialize;

use super::{flag, ApiResponse, AppState};
use crate::error::{AppError, Result};
use crate::models::{
    BossCounters, CounterQuery, Pagination, RaidBoss, RaidBossQuery, RaidBossSuggestion,
    RaidCycleReport,
};

const DEFAULT_PER_PAGE: u32 = 50;

#[derive(Debug, Deserialize)]
pub struct RaidParams {
    page: Option<u32>,
    per_page: Option<u32>,
    tier: Option<String>,
    active: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct SearchParams {
    q: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct CounterParams {
    limit: Option<u32>,
    include_shadow: Option<String>,
    include_mega: Option<String>,
    include_legendary: Option<String>,
}

pub async fn list(
    State(state): State<AppState>,
    Query(params): Query<RaidParams>,
) -> Result<Json<ApiResponse<Vec<RaidBoss>>>> {
    let query = RaidBossQuery {
        tier: params.tier.filter(|s| !s.is_empty()),
        active: params.active.as_deref().map(|v| flag(Some(v), false)),
        pagination: Pagination::new(params.page, params.per_page, DEFAULT_PER_PAGE),
    };
    let page = state.repo().list_raid_bosses(query).await?;
    Ok(ApiResponse::paged(page))
}

pub async fn tiers(State(state): State<AppState>) -> Result<Json<ApiResponse<Vec<String>>>> {
    Ok(ApiResponse::ok(state.repo().raid_tiers().await?))
}

pub async fn search(
    State(state): State<AppState>,
    Query(params): Query<SearchParams>,
) -> Result<Json<ApiResponse<Vec<RaidBossSuggestion>>>> {
    let q = params.q.unwrap_or_default();
    Ok(ApiResponse::ok(state.repo().search_raid_bosses(&q).await?))
}

pub async fn counters(
    State(state): State<AppState>,
    Path(name): Path<String>,
    Query(params): Query<CounterParams>,
) -> Result<Json<ApiResponse<BossCounters>>> {
    let defaults = CounterQuery::default();
    let query = CounterQuery {
        include_shadow: flag(params.include_shadow.as_deref(), defaults.include_shadow),
        include_mega: flag(params.include_mega.as_deref(), defaults.include_mega),
        include_legendary: flag(params.include_legendary.as_deref(), defaults.include_legendary),
        limit: params.limit.unwrap_or(defaults.limit),
    };

    let result = state
        .repo()
        .counters_for_boss(&name, query)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("raid boss \"{name}\"")))?;
    Ok(ApiResponse::ok(result))
}

pub async fn refresh(State(state): State<AppState>) -> Result<Json<ApiResponse<RaidCycleReport>>> {
    let report = state.pipeline.run_raid_cycle().await?;
    Ok(ApiResponse::ok(report))
}

#[cfg(test)]
mod tests {
    use axum::http::StatusCode;

    use crate::api::tests::{app_with, send};
    use crate::pipeline::tests::{stub, FakeRaids};

    fn raids() -> FakeRaids {
        FakeRaids {
            bosses: vec![stub("Dialga"), stub("Palkia")],
            counters: vec!["Dialga", "Machamp", "Lucario"],
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn refresh_then_query_counters() {
        let (app, _) = app_with(vec![], raids()).await;

        let (status, body) = send(&app, "POST", "/api/raids/refresh").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["added"], 2);
        assert_eq!(body["data"]["total_processed"], 2);

        let (status, body) = send(&app, "GET", "/api/raids/dialga/counters?limit=2").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["boss"]["name"], "Dialga");
        assert_eq!(body["data"]["boss"]["types"], serde_json::json!(["Dragon"]));
        let counters = body["data"]["counters"].as_array().unwrap();
        assert_eq!(counters.len(), 2);
        assert_eq!(counters[0]["pokemon_name"], "Dialga");
        assert_eq!(counters[0]["rank"], 1);
    }

    #[tokio::test]
    async fn unknown_boss_counters_is_404() {
        let (app, _) = app_with(vec![], raids()).await;
        let (status, body) = send(&app, "GET", "/api/raids/Missingno/counters").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["success"], false);
    }

    #[tokio::test]
    async fn search_and_listing() {
        let (app, pipeline) = app_with(vec![], raids()).await;
        pipeline.run_raid_cycle().await.unwrap();

        let (_, body) = send(&app, "GET", "/api/raids/search?q=alk").await;
        assert_eq!(body["data"].as_array().unwrap().len(), 1);
        assert_eq!(body["data"][0]["name"], "Palkia");

        let (_, body) = send(&app, "GET", "/api/raids/search?q=").await;
        assert_eq!(body["data"], serde_json::json!([]));

        let (_, body) = send(&app, "GET", "/api/raids?tier=5&active=true").await;
        assert_eq!(body["pagination"]["total"], 2);
        assert_eq!(body["data"][0]["name"], "Dialga");

        let (_, body) = send(&app, "GET", "/api/raids?active=false").await;
        assert_eq!(body["pagination"]["total"], 0);

        let (_, body) = send(&app, "GET", "/api/raids/tiers").await;
        assert_eq!(body["data"], serde_json::json!(["5"]));
    }
}
