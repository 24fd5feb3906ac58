use axum::extract::{Path, Query, State};
use axum::Json;
use chrono::{Datelike, Utc};
use serde::Deserialize;

use super::{ApiResponse, AppState};
use crate::error::{AppError, Result};
use crate::models::{Event, EventQuery, Pagination};
use crate::pipeline::normalize::parse_loose_date;

const DEFAULT_PER_PAGE: u32 = 50;

#[derive(Debug, Deserialize)]
pub struct EventParams {
    page: Option<u32>,
    per_page: Option<u32>,
    #[serde(rename = "type")]
    event_type: Option<String>,
    source: Option<String>,
    start_date: Option<String>,
    end_date: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct CalendarParams {
    month: Option<u32>,
    year: Option<i32>,
}

/// Unparseable date filters are ignored rather than rejected.
pub async fn list(
    State(state): State<AppState>,
    Query(params): Query<EventParams>,
) -> Result<Json<ApiResponse<Vec<Event>>>> {
    let query = EventQuery {
        event_type: params.event_type.filter(|s| !s.is_empty()),
        source: params.source.filter(|s| !s.is_empty()),
        starts_after: params.start_date.as_deref().and_then(parse_loose_date),
        ends_before: params.end_date.as_deref().and_then(parse_loose_date),
        pagination: Pagination::new(params.page, params.per_page, DEFAULT_PER_PAGE),
    };
    let page = state.repo().list_events(query).await?;
    Ok(ApiResponse::paged(page))
}

pub async fn get_one(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<ApiResponse<Event>>> {
    let event = state
        .repo()
        .get_event(id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("event {id}")))?;
    Ok(ApiResponse::ok(event))
}

pub async fn types(State(state): State<AppState>) -> Result<Json<ApiResponse<Vec<String>>>> {
    Ok(ApiResponse::ok(state.repo().event_types().await?))
}

/// Defaults to the current month.
pub async fn calendar(
    State(state): State<AppState>,
    Query(params): Query<CalendarParams>,
) -> Result<Json<ApiResponse<Vec<Event>>>> {
    let today = Utc::now();
    let month = params.month.unwrap_or_else(|| today.month());
    let year = params.year.unwrap_or_else(|| today.year());
    Ok(ApiResponse::ok(state.repo().calendar_events(year, month).await?))
}
