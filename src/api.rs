//! REST API Server for the Config Assistant
//!
//! Exposes the session state machine via HTTP endpoints
//! Integrates with frontend UI

use axum::{
    extract::{Query, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tracing::info;

use crate::error::AssistantError;
use crate::session::SessionManager;

/// =============================
/// Request Models
/// =============================

#[derive(Debug, Deserialize)]
pub struct SetGoalRequest {
    pub goal: Option<String>,
    pub session_id: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct AnswerRequest {
    pub key: Option<String>,
    pub value: Option<String>,
    pub session_id: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct SessionQuery {
    pub session_id: Option<String>,
}

/// =============================
/// Response Models
/// =============================

#[derive(Debug, Serialize)]
struct OkResponse {
    ok: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    goal: Option<String>,
}

#[derive(Debug, Serialize)]
struct ErrorResponse {
    ok: bool,
    error: String,
}

fn error_reply(err: AssistantError) -> (StatusCode, Json<ErrorResponse>) {
    let status = match err {
        AssistantError::InvalidInput(_) => StatusCode::BAD_REQUEST,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    };
    (
        status,
        Json(ErrorResponse {
            ok: false,
            error: err.to_string(),
        }),
    )
}

/// =============================
/// API State
/// =============================

#[derive(Clone)]
pub struct ApiState {
    pub sessions: Arc<SessionManager>,
}

/// =============================
/// Helpers — Session Identity
/// =============================

fn stable_uuid_from_string(input: &str) -> uuid::Uuid {
    use sha2::{Digest, Sha256};

    let hash = Sha256::digest(input.as_bytes());
    let mut bytes = [0u8; 16];
    bytes.copy_from_slice(&hash[..16]);

    // Set UUID version (4) and variant (RFC4122) bits.
    bytes[6] = (bytes[6] & 0x0f) | 0x40;
    bytes[8] = (bytes[8] & 0x3f) | 0x80;

    uuid::Uuid::from_bytes(bytes)
}

/// Map whatever the client sent to one canonical session key. A missing
/// or blank id lands everyone on the same shared session, mirroring a
/// single-user dev setup.
fn resolve_session_id(value: Option<&str>) -> String {
    match value {
        Some(v) if !v.trim().is_empty() => {
            let v = v.trim();
            uuid::Uuid::parse_str(v)
                .unwrap_or_else(|_| stable_uuid_from_string(v))
                .to_string()
        }
        _ => stable_uuid_from_string("default-session").to_string(),
    }
}

/// =============================
/// Health Endpoint
/// =============================

async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "healthy",
        "timestamp": chrono::Utc::now().to_rfc3339()
    }))
}

/// =============================
/// Session Endpoints
/// =============================

async fn set_goal(
    State(state): State<ApiState>,
    Json(req): Json<SetGoalRequest>,
) -> std::result::Result<Json<OkResponse>, (StatusCode, Json<ErrorResponse>)> {
    let session_id = resolve_session_id(req.session_id.as_deref());
    let goal = req.goal.unwrap_or_default();

    info!(session_id = %session_id, "Received set-goal request");

    match state.sessions.set_goal(&session_id, &goal).await {
        Ok(goal) => Ok(Json(OkResponse {
            ok: true,
            goal: Some(goal),
        })),
        Err(e) => Err(error_reply(e)),
    }
}

async fn set_answer(
    State(state): State<ApiState>,
    Json(req): Json<AnswerRequest>,
) -> std::result::Result<Json<OkResponse>, (StatusCode, Json<ErrorResponse>)> {
    let session_id = resolve_session_id(req.session_id.as_deref());
    let key = req.key.unwrap_or_default();
    let value = req.value.unwrap_or_default();

    match state.sessions.set_answer(&session_id, &key, &value).await {
        Ok(()) => Ok(Json(OkResponse {
            ok: true,
            goal: None,
        })),
        Err(e) => Err(error_reply(e)),
    }
}

async fn pending_questions(
    State(state): State<ApiState>,
    Query(query): Query<SessionQuery>,
) -> std::result::Result<Json<serde_json::Value>, (StatusCode, Json<ErrorResponse>)> {
    let session_id = resolve_session_id(query.session_id.as_deref());

    match state.sessions.pending_questions(&session_id).await {
        Ok(questions) => Ok(Json(serde_json::json!({ "questions": questions }))),
        Err(e) => Err(error_reply(e)),
    }
}

async fn session_state(
    State(state): State<ApiState>,
    Query(query): Query<SessionQuery>,
) -> std::result::Result<Json<crate::models::SessionState>, (StatusCode, Json<ErrorResponse>)> {
    let session_id = resolve_session_id(query.session_id.as_deref());

    match state.sessions.state(&session_id).await {
        Ok(session) => Ok(Json(session)),
        Err(e) => Err(error_reply(e)),
    }
}

async fn generate_plan(
    State(state): State<ApiState>,
    Query(query): Query<SessionQuery>,
) -> std::result::Result<Json<crate::models::Plan>, (StatusCode, Json<ErrorResponse>)> {
    let session_id = resolve_session_id(query.session_id.as_deref());

    info!(session_id = %session_id, "Received plan request");

    match state.sessions.generate_plan(&session_id).await {
        Ok(plan) => Ok(Json(plan)),
        Err(e) => Err(error_reply(e)),
    }
}

/// =============================
/// Router
/// =============================

pub fn create_router(sessions: Arc<SessionManager>) -> Router {
    let state = ApiState { sessions };

    Router::new()
        .route("/health", get(health))
        .route("/api/set-goal", post(set_goal))
        .route("/api/answer", post(set_answer))
        .route("/api/pending-questions", get(pending_questions))
        .route("/api/state", get(session_state))
        .route("/api/plan", get(generate_plan))
        .with_state(state)
        .layer(CorsLayer::permissive())
}

/// =============================
/// Server Startup
/// =============================

pub async fn start_server(
    sessions: Arc<SessionManager>,
    port: u16,
) -> std::result::Result<(), Box<dyn std::error::Error>> {
    let router = create_router(sessions);

    let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{}", port)).await?;

    info!("API Server listening on http://0.0.0.0:{}", port);
    info!("Local: http://127.0.0.1:{}", port);

    axum::serve(listener, router).await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stable_uuid_is_deterministic() {
        let a = stable_uuid_from_string("browser-token-123");
        let b = stable_uuid_from_string("browser-token-123");
        let c = stable_uuid_from_string("browser-token-124");

        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_eq!(a.get_version_num(), 4);
    }

    #[test]
    fn test_resolve_session_id() {
        let valid = "b2f7c0de-9f30-4d1a-8c0e-5a9f54c3f1ab";
        assert_eq!(resolve_session_id(Some(valid)), valid);

        // arbitrary client tokens hash to a stable uuid
        assert_eq!(
            resolve_session_id(Some("my-token")),
            resolve_session_id(Some("my-token"))
        );

        // blank and missing collapse to the shared dev session
        assert_eq!(resolve_session_id(None), resolve_session_id(Some("  ")));
    }
}
