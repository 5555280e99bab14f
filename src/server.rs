use std::sync::Arc;

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, Query, State};
use axum::http::{StatusCode, header};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono_tz::Tz;
use serde::Deserialize;
use sqlx::SqlitePool;
use tracing::{debug, warn};

use crate::error::{FetchError, ImportError, InputError};
use crate::export::{self, ExportFormat};
use crate::generate::ScriptGenerator;
use crate::models::{ContentInput, GenerationOptions, InputType};
use crate::{extract, pipeline, store};

const DEFAULT_LIST_LIMIT: i64 = 20;
const MAX_LIST_LIMIT: i64 = 100;

#[derive(Clone)]
pub struct AppState {
    pub pool: SqlitePool,
    pub generator: Arc<ScriptGenerator>,
    /// Client used for article fetches.
    pub http: reqwest::Client,
    pub timezone: Tz,
}

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/api/fetch-content", post(fetch_content))
        .route("/api/generate-script", post(generate_script))
        .route("/api/scripts", get(list_scripts))
        .route("/api/scripts/{id}", get(get_script))
        .route("/api/scripts/{id}/export", get(export_script))
        .with_state(state)
}

fn error_response(status: StatusCode, error: &str, message: impl Into<String>) -> Response {
    (
        status,
        Json(serde_json::json!({ "error": error, "message": message.into() })),
    )
        .into_response()
}

fn internal_error(context: &str, e: anyhow::Error) -> Response {
    warn!(error = ?e, "{context}");
    error_response(StatusCode::INTERNAL_SERVER_ERROR, "internal", "Internal error")
}

fn bad_json(rejection: JsonRejection) -> Response {
    error_response(rejection.status(), "invalid_request", rejection.body_text())
}

async fn health() -> Response {
    Json(serde_json::json!({ "status": "ok" })).into_response()
}

#[derive(Deserialize)]
struct FetchRequest {
    url: String,
}

async fn fetch_content(State(state): State<AppState>, payload: Result<Json<FetchRequest>, JsonRejection>) -> Response {
    let Json(request) = match payload {
        Ok(p) => p,
        Err(rejection) => return bad_json(rejection),
    };

    match extract::fetch_article(&state.http, request.url.trim()).await {
        Ok(fetched) => Json(fetched).into_response(),
        Err(e) => import_error_response(e),
    }
}

fn import_error_response(e: ImportError) -> Response {
    debug!(error = %e, "article import failed");
    match e {
        ImportError::Fetch(FetchError::InvalidUrl { .. }) => {
            error_response(StatusCode::BAD_REQUEST, "invalid_url", e.to_string())
        }
        ImportError::Fetch(_) => error_response(StatusCode::BAD_GATEWAY, "fetch_failed", e.to_string()),
        ImportError::Extraction(_) => error_response(StatusCode::UNPROCESSABLE_ENTITY, "no_content", e.to_string()),
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateRequest {
    content: String,
    #[serde(default)]
    input_type: InputType,
    source_url: Option<String>,
    title: Option<String>,
    style: Option<String>,
    duration: Option<String>,
    show_name: Option<String>,
}

async fn generate_script(
    State(state): State<AppState>,
    payload: Result<Json<GenerateRequest>, JsonRejection>,
) -> Response {
    let Json(request) = match payload {
        Ok(p) => p,
        Err(rejection) => return bad_json(rejection),
    };

    let options = GenerationOptions::from_raw(
        request.style.as_deref(),
        request.duration.as_deref(),
        request.show_name.as_deref(),
    );
    let input_type = request.input_type;
    let input = ContentInput {
        text: request.content,
        input_type,
        source_url: request.source_url.filter(|_| input_type == InputType::Url),
        title: request.title,
    };

    match pipeline::create_script(&state.pool, &state.generator, input, options, state.timezone).await {
        Ok(script) => (StatusCode::CREATED, Json(script)).into_response(),
        Err(e) => match e.downcast_ref::<InputError>() {
            Some(input_error) => error_response(StatusCode::BAD_REQUEST, "invalid_input", input_error.to_string()),
            None => internal_error("failed to create script", e),
        },
    }
}

#[derive(Deserialize)]
struct ListQuery {
    limit: Option<i64>,
}

async fn list_scripts(State(state): State<AppState>, Query(query): Query<ListQuery>) -> Response {
    let limit = query.limit.unwrap_or(DEFAULT_LIST_LIMIT).clamp(1, MAX_LIST_LIMIT);
    match store::list_scripts(&state.pool, limit).await {
        Ok(scripts) => Json(scripts).into_response(),
        Err(e) => internal_error("failed to list scripts", e),
    }
}

async fn get_script(State(state): State<AppState>, Path(id): Path<String>) -> Response {
    match store::get_script(&state.pool, &id).await {
        Ok(Some(script)) => Json(script).into_response(),
        Ok(None) => error_response(StatusCode::NOT_FOUND, "not_found", format!("no script with id '{id}'")),
        Err(e) => internal_error("failed to load script", e),
    }
}

#[derive(Deserialize)]
struct ExportQuery {
    format: Option<String>,
}

async fn export_script(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Query(query): Query<ExportQuery>,
) -> Response {
    let format = match query.format.as_deref().map(str::parse::<ExportFormat>).transpose() {
        Ok(f) => f.unwrap_or_default(),
        Err(message) => return error_response(StatusCode::BAD_REQUEST, "invalid_format", message),
    };

    let script = match store::get_script(&state.pool, &id).await {
        Ok(Some(s)) => s,
        Ok(None) => {
            return error_response(StatusCode::NOT_FOUND, "not_found", format!("no script with id '{id}'"));
        }
        Err(e) => return internal_error("failed to load script", e),
    };

    let body = match export::render(&script, format) {
        Ok(b) => b,
        Err(e) => return internal_error("failed to render export", e),
    };

    (
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, format.content_type().to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{}\"", export::file_name(&script, format)),
            ),
        ],
        body,
    )
        .into_response()
}
