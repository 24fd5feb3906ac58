use axum::extract::State;
use axum::Json;
use chrono::Utc;
use serde::{Deserialize, Serialize};

use super::{ApiResponse, AppState};
use crate::ai::{ChatMessage, Preferences, Recommendation, SUGGESTIONS};
use crate::error::{AppError, Result};

#[derive(Debug, Deserialize)]
pub struct AskRequest {
    question: Option<String>,
    #[serde(default)]
    conversation_history: Vec<ChatMessage>,
}

#[derive(Serialize)]
pub struct AskResponse {
    response: String,
    model: &'static str,
}

#[derive(Serialize)]
pub struct RecommendResponse {
    #[serde(flatten)]
    recommendation: Recommendation,
    model: Option<&'static str>,
}

#[derive(Serialize)]
pub struct AssistantHealth {
    status: &'static str,
    model: &'static str,
}

pub async fn ask(
    State(state): State<AppState>,
    Json(request): Json<AskRequest>,
) -> Result<Json<ApiResponse<AskResponse>>> {
    let question = request
        .question
        .ok_or_else(|| AppError::BadRequest("Question is required".into()))?;

    let response = state
        .assistant
        .ask(&question, request.conversation_history)
        .await?;
    Ok(ApiResponse::ok(AskResponse {
        response,
        model: state.assistant.model().unwrap_or_default(),
    }))
}

pub async fn suggestions() -> Json<ApiResponse<[&'static str; 10]>> {
    ApiResponse::ok(SUGGESTIONS)
}

/// Recommends among events that have not ended yet.
pub async fn recommend_events(
    State(state): State<AppState>,
    Json(preferences): Json<Preferences>,
) -> Result<Json<ApiResponse<RecommendResponse>>> {
    let events = state.repo().upcoming_events(Utc::now()).await?;
    let recommendation = state.assistant.recommend(&preferences, &events).await?;
    Ok(ApiResponse::ok(RecommendResponse {
        recommendation,
        model: state.assistant.model(),
    }))
}

pub async fn health(State(state): State<AppState>) -> Result<Json<ApiResponse<AssistantHealth>>> {
    let model = state
        .assistant
        .model()
        .ok_or_else(|| AppError::AssistantUnavailable("ANTHROPIC_API_KEY not set".into()))?;
    Ok(ApiResponse::ok(AssistantHealth {
        status: "ready",
        model,
    }))
}
