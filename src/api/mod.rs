//! Thin JSON API over the repository plus the manual cycle triggers.

mod assistant;
mod events;
mod news;
mod raids;
mod system;

use std::sync::Arc;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Serialize;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::error;

use crate::ai::Assistant;
use crate::db::Repository;
use crate::error::AppError;
use crate::models::Page;
use crate::pipeline::Pipeline;

#[derive(Clone)]
pub struct AppState {
    pipeline: Arc<Pipeline>,
    assistant: Arc<Assistant>,
}

impl AppState {
    pub fn new(pipeline: Arc<Pipeline>, assistant: Assistant) -> Self {
        Self {
            pipeline,
            assistant: Arc::new(assistant),
        }
    }

    fn repo(&self) -> &Repository {
        self.pipeline.repository()
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(system::index))
        .route("/api/health", get(system::health))
        .route("/api/scrape", post(system::trigger_scrape))
        .route("/api/news", get(news::list))
        .route("/api/news/sources", get(news::sources))
        .route("/api/news/:id", get(news::get_one))
        .route("/api/events", get(events::list))
        .route("/api/events/types", get(events::types))
        .route("/api/events/calendar", get(events::calendar))
        .route("/api/events/:id", get(events::get_one))
        .route("/api/raids", get(raids::list))
        .route("/api/raids/tiers", get(raids::tiers))
        .route("/api/raids/search", get(raids::search))
        .route("/api/raids/refresh", post(raids::refresh))
        .route("/api/raids/:name/counters", get(raids::counters))
        .route("/api/assistant/ask", post(assistant::ask))
        .route("/api/assistant/suggestions", get(assistant::suggestions))
        .route("/api/assistant/recommend-events", post(assistant::recommend_events))
        .route("/api/assistant/health", get(assistant::health))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

#[derive(Debug, Serialize)]
pub struct PaginationMeta {
    page: u32,
    per_page: u32,
    total: u64,
    pages: u64,
}

/// `{success, data, pagination?}` envelope shared by every endpoint.
#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    success: bool,
    data: T,
    #[serde(skip_serializing_if = "Option::is_none")]
    pagination: Option<PaginationMeta>,
}

impl<T> ApiResponse<T> {
    fn ok(data: T) -> Json<Self> {
        Json(Self {
            success: true,
            data,
            pagination: None,
        })
    }
}

impl<T> ApiResponse<Vec<T>> {
    fn paged(page: Page<T>) -> Json<Self> {
        Json(Self {
            success: true,
            pagination: Some(PaginationMeta {
                page: page.page,
                per_page: page.per_page,
                total: page.total,
                pages: page.pages,
            }),
            data: page.data,
        })
    }
}

#[derive(Serialize)]
struct ErrorBody {
    success: bool,
    error: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = match &self {
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::CycleInProgress(_) => StatusCode::CONFLICT,
            AppError::AssistantUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        if status.is_server_error() {
            error!(error = %self, "Request failed");
        }

        let body = ErrorBody {
            success: false,
            error: self.to_string(),
        };
        (status, Json(body)).into_response()
    }
}

/// Query-string booleans: only a case-insensitive `true` is true.
fn flag(value: Option<&str>, default: bool) -> bool {
    value.map_or(default, |v| v.trim().eq_ignore_ascii_case("true"))
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use axum::body::{to_bytes, Body};
    use axum::http::Request;
    use serde_json::Value;
    use tower::ServiceExt;

    use crate::ai::TextGenerator;
    use crate::pipeline::tests::{pipeline_with, FakeRaids};
    use crate::sources::SourceAdapter;

    pub(crate) async fn app_with(
        sources: Vec<Box<dyn SourceAdapter>>,
        raids: FakeRaids,
    ) -> (Router, Arc<Pipeline>) {
        app_with_generator(sources, raids, None).await
    }

    pub(crate) async fn app_with_generator(
        sources: Vec<Box<dyn SourceAdapter>>,
        raids: FakeRaids,
        generator: Option<Arc<dyn TextGenerator>>,
    ) -> (Router, Arc<Pipeline>) {
        let pipeline = Arc::new(pipeline_with(sources, raids).await);
        let state = AppState::new(pipeline.clone(), Assistant::new(generator));
        (router(state), pipeline)
    }

    pub(crate) async fn send(app: &Router, method: &str, uri: &str) -> (StatusCode, Value) {
        dispatch(app, Request::builder().method(method).uri(uri).body(Body::empty()).unwrap())
            .await
    }

    pub(crate) async fn send_json(
        app: &Router,
        method: &str,
        uri: &str,
        body: Value,
    ) -> (StatusCode, Value) {
        let request = Request::builder()
            .method(method)
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap();
        dispatch(app, request).await
    }

    async fn dispatch(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
        let response = app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let json = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, json)
    }

    #[test]
    fn flags_default_and_parse_loosely() {
        assert!(flag(None, true));
        assert!(!flag(None, false));
        assert!(flag(Some("TRUE"), false));
        assert!(!flag(Some("yes"), true));
        assert!(!flag(Some("false"), true));
    }

    #[tokio::test]
    async fn errors_map_to_status_codes() {
        let cases = [
            (AppError::NotFound("x".into()), StatusCode::NOT_FOUND),
            (AppError::BadRequest("x".into()), StatusCode::BAD_REQUEST),
            (AppError::CycleInProgress("news"), StatusCode::CONFLICT),
            (
                AppError::AssistantUnavailable("x".into()),
                StatusCode::SERVICE_UNAVAILABLE,
            ),
            (AppError::Config("x".into()), StatusCode::INTERNAL_SERVER_ERROR),
        ];
        for (err, expected) in cases {
            let response = err.into_response();
            assert_eq!(response.status(), expected);
            let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
            let json: Value = serde_json::from_slice(&bytes).unwrap();
            assert_eq!(json["success"], false);
        }
    }

    #[tokio::test]
    async fn unknown_route_is_404() {
        let (app, _) = app_with(vec![], FakeRaids::default()).await;
        let (status, _) = send(&app, "GET", "/api/nope").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }
}
