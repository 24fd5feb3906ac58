use axum::extract::{Path, Query, State};
use axum::Json;
use serde::Deserialize;

use super::{ApiResponse, AppState};
use crate::error::{AppError, Result};
use crate::models::{NewsItem, NewsQuery, Pagination};

const DEFAULT_PER_PAGE: u32 = 20;

#[derive(Debug, Deserialize)]
pub struct NewsParams {
    page: Option<u32>,
    per_page: Option<u32>,
    source: Option<String>,
}

pub async fn list(
    State(state): State<AppState>,
    Query(params): Query<NewsParams>,
) -> Result<Json<ApiResponse<Vec<NewsItem>>>> {
    let query = NewsQuery {
        source: params.source.filter(|s| !s.is_empty()),
        pagination: Pagination::new(params.page, params.per_page, DEFAULT_PER_PAGE),
    };
    let page = state.repo().list_news(query).await?;
    Ok(ApiResponse::paged(page))
}

pub async fn get_one(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<ApiResponse<NewsItem>>> {
    let item = state
        .repo()
        .get_news(id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("news item {id}")))?;
    Ok(ApiResponse::ok(item))
}

pub async fn sources(State(state): State<AppState>) -> Result<Json<ApiResponse<Vec<String>>>> {
    Ok(ApiResponse::ok(state.repo().news_sources().await?))
}
