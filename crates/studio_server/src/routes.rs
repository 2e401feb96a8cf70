use std::path::Path;
use std::sync::Arc;
use std::time::Instant;

use axum::{
    extract::{Path as UrlPath, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use chrono::Utc;
use serde::Deserialize;
use serde_json::{json, Value};
use studio_core::prompts::PLATFORM_NAME;
use studio_core::{AppViewModel, ErrorLogEntry, MediaData, Msg, Widget};
use tower_http::cors::CorsLayer;
use tower_http::services::{ServeDir, ServeFile};

use crate::dashboard::Dashboard;

pub struct AppContext {
    pub dashboard: Dashboard,
    pub port: u16,
    started: Instant,
}

impl AppContext {
    pub fn new(dashboard: Dashboard, port: u16) -> Self {
        Self {
            dashboard,
            port,
            started: Instant::now(),
        }
    }
}

pub type SharedContext = Arc<AppContext>;

#[derive(Debug)]
pub enum ApiError {
    NotFound(String),
    BadRequest(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
        };
        (status, Json(json!({ "error": message }))).into_response()
    }
}

#[derive(Debug, Deserialize)]
pub struct PromptBody {
    pub prompt: String,
}

#[derive(Debug, Deserialize)]
pub struct UploadBody {
    pub mime_type: String,
    pub data: String,
}

/// API routes plus the static page, with `index.html` served for unknown paths.
pub fn build_router(context: SharedContext, static_dir: &Path) -> Router {
    let static_files =
        ServeDir::new(static_dir).fallback(ServeFile::new(static_dir.join("index.html")));

    Router::new()
        .route("/health", get(health))
        .route("/api/status", get(status))
        .route("/api/dashboard", get(dashboard_view))
        .route("/api/widgets/{widget}/submit", post(submit_prompt))
        .route("/api/widgets/{widget}/reset", post(reset_widget))
        .route("/api/studio/upload", post(upload_image))
        .route("/api/errors", get(list_errors).delete(clear_errors))
        .fallback_service(static_files)
        .layer(CorsLayer::permissive())
        .with_state(context)
}

async fn health(State(context): State<SharedContext>) -> Json<Value> {
    Json(json!({
        "status": "healthy",
        "message": format!("{PLATFORM_NAME} is running"),
        "timestamp": Utc::now().to_rfc3339(),
        "uptime": context.started.elapsed().as_secs_f64(),
    }))
}

async fn status(State(context): State<SharedContext>) -> Json<Value> {
    Json(json!({
        "platform": PLATFORM_NAME,
        "version": env!("CARGO_PKG_VERSION"),
        "status": "operational",
        "server": "axum",
        "port": context.port,
    }))
}

async fn dashboard_view(State(context): State<SharedContext>) -> Json<AppViewModel> {
    Json(context.dashboard.view())
}

async fn submit_prompt(
    State(context): State<SharedContext>,
    UrlPath(slug): UrlPath<String>,
    Json(body): Json<PromptBody>,
) -> Result<Json<AppViewModel>, ApiError> {
    let widget = widget_from_slug(&slug)?;
    Ok(Json(context.dashboard.dispatch(Msg::PromptSubmitted {
        widget,
        prompt: body.prompt,
    })))
}

async fn reset_widget(
    State(context): State<SharedContext>,
    UrlPath(slug): UrlPath<String>,
) -> Result<Json<AppViewModel>, ApiError> {
    let widget = widget_from_slug(&slug)?;
    Ok(Json(context.dashboard.dispatch(Msg::WidgetReset { widget })))
}

async fn upload_image(
    State(context): State<SharedContext>,
    Json(body): Json<UploadBody>,
) -> Result<Json<AppViewModel>, ApiError> {
    if !body.mime_type.starts_with("image/") {
        return Err(ApiError::BadRequest(format!(
            "unsupported media type: {}",
            body.mime_type
        )));
    }
    match STANDARD.decode(body.data.as_bytes()) {
        Ok(bytes) if !bytes.is_empty() => {}
        _ => return Err(ApiError::BadRequest("image data must be non-empty base64".into())),
    }
    let image = MediaData::new(body.mime_type, body.data);
    Ok(Json(context.dashboard.dispatch(Msg::ImageUploaded(image))))
}

async fn list_errors(State(context): State<SharedContext>) -> Json<Vec<ErrorLogEntry>> {
    Json(context.dashboard.error_log())
}

async fn clear_errors(State(context): State<SharedContext>) -> StatusCode {
    context.dashboard.dispatch(Msg::ClearErrorLog);
    StatusCode::NO_CONTENT
}

fn widget_from_slug(slug: &str) -> Result<Widget, ApiError> {
    Widget::from_slug(slug).ok_or_else(|| ApiError::NotFound(format!("unknown widget: {slug}")))
}
