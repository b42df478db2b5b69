//! HTTP request handlers

use super::sse::sse_stream;
use super::types::{
    CatalogResponse, CreateConversationResponse, ErrorResponse, EstimateRequest, QueuedResponse,
    SendEventRequest,
};
use super::AppState;
use crate::gateway::InboundEvent;
use crate::state_machine::Session;
use crate::valuation::{appraise, Valuation, MAX_YEAR, MIN_YEAR};
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};

/// Create the API router
pub fn create_router(state: AppState) -> Router {
    Router::new()
        // Conversation lifecycle
        .route("/api/conversations/new", post(create_conversation))
        .route("/api/conversations/:id", get(get_conversation))
        .route("/api/conversations/:id/events", post(send_event))
        .route("/api/conversations/:id/stream", get(stream_conversation))
        // Reference data
        .route("/api/catalog", get(get_catalog))
        .route("/api/estimate", post(estimate))
        // Version
        .route("/version", get(get_version))
        .with_state(state)
}

// ============================================================
// Conversations
// ============================================================

async fn create_conversation() -> Json<CreateConversationResponse> {
    Json(CreateConversationResponse {
        conversation_id: uuid::Uuid::new_v4().to_string(),
    })
}

async fn get_conversation(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Session>, AppError> {
    state
        .runtime
        .snapshot(&id)
        .await
        .map(Json)
        .ok_or_else(|| AppError::NotFound(format!("No session for conversation {id}")))
}

async fn send_event(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(req): Json<SendEventRequest>,
) -> Result<Json<QueuedResponse>, AppError> {
    let inbound = InboundEvent {
        conversation_id: id.clone(),
        kind: req.kind,
        text: req.text,
        file_id: req.file_id,
    };
    let event = inbound
        .into_event()
        .ok_or_else(|| AppError::BadRequest("Text events require a text field".to_string()))?;

    state
        .runtime
        .send_event(&id, event)
        .await
        .map_err(|e| AppError::Internal(e.to_string()))?;

    Ok(Json(QueuedResponse { queued: true }))
}

async fn stream_conversation(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> impl IntoResponse {
    sse_stream(id, state.replies.subscribe())
}

// ============================================================
// Reference data
// ============================================================

async fn get_catalog(State(state): State<AppState>) -> Json<CatalogResponse> {
    Json(CatalogResponse::from(state.runtime.catalog().as_ref()))
}

async fn estimate(
    State(state): State<AppState>,
    Json(req): Json<EstimateRequest>,
) -> Result<Json<Valuation>, AppError> {
    let catalog = state.runtime.catalog();

    let make = catalog
        .is_valid_make(&req.make)
        .ok_or_else(|| AppError::BadRequest(format!("Unknown make: {}", req.make)))?;
    let model = catalog
        .is_valid_model(make, &req.model)
        .ok_or_else(|| AppError::BadRequest(format!("Unknown model for {make}: {}", req.model)))?;
    if !(MIN_YEAR..=MAX_YEAR).contains(&req.year) {
        return Err(AppError::BadRequest(format!(
            "Year must be between {MIN_YEAR} and {MAX_YEAR}"
        )));
    }

    Ok(Json(appraise(catalog, make, model, req.year, req.mileage)))
}

async fn get_version() -> &'static str {
    concat!("autoquote ", env!("CARGO_PKG_VERSION"))
}

// ============================================================
// Error Handling
// ============================================================

#[derive(Debug)]
enum AppError {
    BadRequest(String),
    NotFound(String),
    Internal(String),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            AppError::Internal(msg) => {
                tracing::error!(error = %msg, "Request failed");
                (StatusCode::INTERNAL_SERVER_ERROR, msg)
            }
        };

        let body = Json(ErrorResponse::new(message));
        (status, body).into_response()
    }
}
