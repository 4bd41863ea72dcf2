use axum::{
    extract::{Path, State},
    http::{header, StatusCode},
    response::{IntoResponse, Json, Response},
    routing::{get, post},
    Router,
};
use base64::Engine;
use serde_json::{json, Value};
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{error, info};

use paper_flow::{
    ConversationDriver, FileReference, InMemorySessionStorage, IntakeReference, SectionKey,
    SessionError,
};

use crate::clients::{HttpCoordinator, HttpUploadTransport};
use crate::models::{CreateSessionRequest, SendMessageRequest, SessionView, TurnResponse};

type ApiResult<T> = Result<Json<T>, ApiError>;
type ApiError = (StatusCode, Json<Value>);

fn bad_request_error(message: &str) -> ApiError {
    (StatusCode::BAD_REQUEST, Json(json!({ "error": message })))
}

fn not_found_error(message: &str, id: &str) -> ApiError {
    (
        StatusCode::NOT_FOUND,
        Json(json!({
            "error": message,
            "session_id": id
        })),
    )
}

fn internal_error(message: &str, details: &str) -> ApiError {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(json!({
            "error": message,
            "details": details
        })),
    )
}

fn map_session_error(e: SessionError) -> ApiError {
    match e {
        SessionError::SessionNotFound(id) => not_found_error("Session not found", &id),
        SessionError::TurnInFlight(_) => (
            StatusCode::CONFLICT,
            Json(json!({ "error": "A turn is already in flight" })),
        ),
        SessionError::EmptyUtterance => bad_request_error("Message cannot be empty"),
        SessionError::IntakeIncomplete => {
            bad_request_error("Provide a PDF, a DOI, or an arXiv link")
        }
        other => internal_error("Session operation failed", &other.to_string()),
    }
}

#[derive(Clone)]
pub struct AppState {
    pub driver: ConversationDriver,
}

pub fn create_app() -> Router {
    let coordinator_url =
        std::env::var("COORDINATOR_URL").expect("COORDINATOR_URL environment variable must be set");
    let upload_url =
        std::env::var("UPLOAD_URL").expect("UPLOAD_URL environment variable must be set");

    let driver = ConversationDriver::new(
        Arc::new(HttpCoordinator::new(coordinator_url)),
        Arc::new(HttpUploadTransport::new(upload_url)),
        Arc::new(InMemorySessionStorage::new()),
    );

    build_router(AppState { driver })
}

fn build_router(app_state: AppState) -> Router {
    Router::new()
        .route("/", get(root))
        .route("/health", get(health_check))
        .route("/sessions", post(create_session))
        .route("/sessions/{id}", get(get_session))
        .route("/sessions/{id}/messages", post(send_message))
        .route("/sessions/{id}/reset", post(reset_session))
        .route("/sessions/{id}/sections/{key}", post(toggle_section))
        .route("/sessions/{id}/export", get(export_session))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(app_state)
}

async fn root() -> Json<Value> {
    Json(json!({
        "service": "Paper Analysis Session Service",
        "version": "1.0.0",
        "description": "Conversational front-end for research-paper analysis",
        "endpoints": {
            "POST /sessions": "Submit a paper reference and start a session",
            "GET /sessions/{id}": "Get session state and results",
            "POST /sessions/{id}/messages": "Send one conversation turn",
            "POST /sessions/{id}/reset": "Reset the session",
            "POST /sessions/{id}/sections/{key}": "Toggle a disclosure section",
            "GET /sessions/{id}/export": "Export the current results as text",
            "GET /health": "Health check"
        }
    }))
}

async fn health_check() -> Json<Value> {
    Json(json!({
        "status": "healthy",
        "timestamp": chrono::Utc::now().to_rfc3339()
    }))
}

async fn create_session(
    State(state): State<AppState>,
    Json(request): Json<CreateSessionRequest>,
) -> ApiResult<TurnResponse> {
    let intake = build_intake(request)?;
    info!("starting session from intake submission");

    let outcome = state.driver.start(intake).await.map_err(|e| {
        error!("failed to start session: {}", e);
        map_session_error(e)
    })?;

    Ok(Json(TurnResponse {
        session_id: outcome.session_id,
        response: outcome.assistant_text,
        stage: outcome.stage,
        results_updated: outcome.results_updated,
    }))
}

fn build_intake(request: CreateSessionRequest) -> Result<IntakeReference, ApiError> {
    let mut intake = IntakeReference {
        file: None,
        doi: request.doi,
        arxiv_url: request.arxiv_url,
    };
    if let Some(encoded) = request.file_base64 {
        let bytes = base64::engine::general_purpose::STANDARD
            .decode(encoded.as_bytes())
            .map_err(|_| bad_request_error("file_base64 is not valid base64"))?;
        intake.attach_file(FileReference {
            name: request.file_name.unwrap_or_else(|| "paper.pdf".to_string()),
            bytes,
        });
    }
    Ok(intake)
}

async fn send_message(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
    Json(request): Json<SendMessageRequest>,
) -> ApiResult<TurnResponse> {
    let outcome = state
        .driver
        .send(&session_id, &request.content)
        .await
        .map_err(map_session_error)?;

    Ok(Json(TurnResponse {
        session_id: outcome.session_id,
        response: outcome.assistant_text,
        stage: outcome.stage,
        results_updated: outcome.results_updated,
    }))
}

async fn get_session(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
) -> ApiResult<SessionView> {
    let session = state
        .driver
        .session(&session_id)
        .await
        .map_err(map_session_error)?;
    Ok(Json(SessionView::from_session(&session)))
}

async fn reset_session(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
) -> ApiResult<Value> {
    state
        .driver
        .reset(&session_id)
        .await
        .map_err(map_session_error)?;
    Ok(Json(json!({
        "session_id": session_id,
        "status": "reset"
    })))
}

async fn toggle_section(
    State(state): State<AppState>,
    Path((session_id, key)): Path<(String, SectionKey)>,
) -> ApiResult<SessionView> {
    state
        .driver
        .toggle_section(&session_id, key)
        .await
        .map_err(map_session_error)?;
    let session = state
        .driver
        .session(&session_id)
        .await
        .map_err(map_session_error)?;
    Ok(Json(SessionView::from_session(&session)))
}

async fn export_session(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
) -> Result<Response, ApiError> {
    let session = state
        .driver
        .session(&session_id)
        .await
        .map_err(map_session_error)?;

    let Some(export) = paper_flow::render(&session.results) else {
        return Err(not_found_error("Nothing to export yet", &session_id));
    };

    let headers = [
        (header::CONTENT_TYPE, "text/plain; charset=utf-8".to_string()),
        (
            header::CONTENT_DISPOSITION,
            format!("attachment; filename=\"{}\"", export.filename),
        ),
    ];
    Ok((headers, export.content).into_response())
}
