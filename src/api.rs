//! REST API server for the SDRAG assistant
//!
//! Thin HTTP shell around the orchestrator: sessions, chat and audit
//! lookup. Messages within one session are answered one at a time.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::info;
use uuid::Uuid;

use crate::agent::{welcome_message, Orchestrator};
use crate::models::SessionContext;
use crate::sink::BufferedSink;
use crate::trace::RecordingEmitter;

/// =============================
/// Request Models
/// =============================

#[derive(Debug, Default, Deserialize)]
pub struct SessionRequest {
    pub user_id: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    pub session_id: Option<String>,
    pub user_id: Option<String>,
    pub message: String,
}

/// =============================
/// Response Wrapper
/// =============================

#[derive(Debug, Serialize, Deserialize)]
pub struct ApiResponse {
    pub success: bool,
    pub data: Option<serde_json::Value>,
    pub error: Option<String>,
    pub timestamp: String,
}

impl ApiResponse {
    pub fn success<T: Serialize>(data: T) -> Self {
        Self {
            success: true,
            data: serde_json::to_value(data).ok(),
            error: None,
            timestamp: chrono::Utc::now().to_rfc3339(),
        }
    }

    pub fn error(message: String) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(message),
            timestamp: chrono::Utc::now().to_rfc3339(),
        }
    }
}

/// =============================
/// API State
/// =============================

struct SessionEntry {
    context: SessionContext,
    /// Held for the whole pipeline of one message
    in_flight: Arc<Mutex<()>>,
}

#[derive(Clone)]
pub struct ApiState {
    pub orchestrator: Arc<Orchestrator>,
    sessions: Arc<RwLock<HashMap<Uuid, SessionEntry>>>,
}

impl ApiState {
    pub fn new(orchestrator: Arc<Orchestrator>) -> Self {
        Self {
            orchestrator,
            sessions: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    async fn open_session(&self, context: SessionContext) -> (SessionContext, Arc<Mutex<()>>) {
        let mut sessions = self.sessions.write().await;
        let entry = sessions
            .entry(context.session_id)
            .or_insert_with(|| SessionEntry {
                context,
                in_flight: Arc::new(Mutex::new(())),
            });
        (entry.context.clone(), entry.in_flight.clone())
    }

    pub async fn session_count(&self) -> usize {
        self.sessions.read().await.len()
    }
}

/// =============================
/// Helpers — Session Ids
/// =============================

fn stable_uuid_from_string(input: &str) -> Uuid {
    use sha2::{Digest, Sha256};

    let hash = Sha256::digest(input.as_bytes());
    let mut bytes = [0u8; 16];
    bytes.copy_from_slice(&hash[..16]);

    // Set UUID version (4) and variant (RFC4122) bits.
    bytes[6] = (bytes[6] & 0x0f) | 0x40;
    bytes[8] = (bytes[8] & 0x3f) | 0x80;

    Uuid::from_bytes(bytes)
}

/// Client-supplied session ids may be UUIDs or arbitrary strings
fn parse_session_id(value: Option<&str>) -> Option<Uuid> {
    match value {
        Some(v) if !v.trim().is_empty() => {
            Some(Uuid::parse_str(v).unwrap_or_else(|_| stable_uuid_from_string(v)))
        }
        _ => None,
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
/// Session Endpoint
/// =============================

async fn create_session(
    State(state): State<ApiState>,
    body: Option<Json<SessionRequest>>,
) -> (StatusCode, Json<ApiResponse>) {
    let req = body.map(|Json(req)| req).unwrap_or_default();
    let (session, _) = state.open_session(SessionContext::new(req.user_id)).await;

    info!(session_id = %session.session_id, "Session created");

    (
        StatusCode::OK,
        Json(ApiResponse::success(serde_json::json!({
            "session_id": session.session_id,
            "welcome": welcome_message(),
        }))),
    )
}

/// =============================
/// Chat Endpoint
/// =============================

async fn chat_handler(
    State(state): State<ApiState>,
    Json(req): Json<ChatRequest>,
) -> (StatusCode, Json<ApiResponse>) {
    if req.message.trim().is_empty() {
        return (
            StatusCode::BAD_REQUEST,
            Json(ApiResponse::error("Message is empty".into())),
        );
    }

    // Without a session id the message is a one-shot session: nothing to
    // serialise against, nothing to keep
    let (session, in_flight) = match parse_session_id(req.session_id.as_deref()) {
        Some(session_id) => {
            let context = SessionContext {
                session_id,
                user_id: req.user_id.clone(),
            };
            state.open_session(context).await
        }
        None => (
            SessionContext::new(req.user_id.clone()),
            Arc::new(Mutex::new(())),
        ),
    };
    let _guard = in_flight.lock().await;

    info!(session_id = %session.session_id, "Received chat message");

    let tracer = RecordingEmitter::new();
    let sink = BufferedSink::new();

    let outcome = state
        .orchestrator
        .handle_query(&session, &req.message, &tracer, &sink)
        .await;

    (
        StatusCode::OK,
        Json(ApiResponse::success(serde_json::json!({
            "session_id": session.session_id,
            "answer": outcome.answer,
            "classification": outcome.classification,
            "sql": outcome.sql,
            "data": outcome.data,
            "steps": tracer.steps(),
            "total_duration_ms": outcome.total_duration_ms,
            "audit_id": outcome.audit_id,
        }))),
    )
}

/// =============================
/// Audit Endpoints
/// =============================

async fn get_audit_trace(
    State(state): State<ApiState>,
    Path(trace_id): Path<Uuid>,
) -> (StatusCode, Json<ApiResponse>) {
    let audit_log = state.orchestrator.audit_log();

    match audit_log.get(trace_id).await {
        Some(trace) => {
            let verified = audit_log.verify_integrity(trace_id).await;
            (
                StatusCode::OK,
                Json(ApiResponse::success(serde_json::json!({
                    "trace": trace,
                    "integrity_verified": verified,
                }))),
            )
        }
        None => (
            StatusCode::NOT_FOUND,
            Json(ApiResponse::error(format!("Trace {} not found", trace_id))),
        ),
    }
}

async fn list_session_traces(
    State(state): State<ApiState>,
    Path(session_id): Path<String>,
) -> (StatusCode, Json<ApiResponse>) {
    let Some(session_id) = parse_session_id(Some(&session_id)) else {
        return (
            StatusCode::BAD_REQUEST,
            Json(ApiResponse::error("Invalid session id".into())),
        );
    };

    let traces = state
        .orchestrator
        .audit_log()
        .list_for_session(session_id)
        .await;

    (
        StatusCode::OK,
        Json(ApiResponse::success(serde_json::json!({
            "session_id": session_id,
            "traces": traces,
        }))),
    )
}

/// =============================
/// Router
/// =============================

pub fn create_router(orchestrator: Arc<Orchestrator>) -> Router {
    router_with_state(ApiState::new(orchestrator))
}

pub fn router_with_state(state: ApiState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/api/session", post(create_session))
        .route("/api/chat", post(chat_handler))
        .route("/api/audit/:trace_id", get(get_audit_trace))
        .route("/api/sessions/:session_id/traces", get(list_session_traces))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}

/// =============================
/// Server Startup
/// =============================

pub async fn start_server(orchestrator: Arc<Orchestrator>, port: u16) -> crate::Result<()> {
    let router = create_router(orchestrator);

    let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{}", port)).await?;

    info!("API Server listening on http://0.0.0.0:{}", port);
    info!("Local: http://127.0.0.1:{}", port);

    axum::serve(listener, router).await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audit::AuditLog;
    use crate::llm::StaticExplainer;
    use crate::metrics::MetricStore;
    use axum::body::{to_bytes, Body};
    use axum::http::Request;
    use serde_json::Value;
    use crate::llm::ExplanationRequester;
    use async_trait::async_trait;
    use std::time::Duration;
    use tokio::sync::Notify;
    use tower::ServiceExt;

    fn orchestrator_with(explainer: Arc<dyn ExplanationRequester>) -> Arc<Orchestrator> {
        Arc::new(Orchestrator::new(
            Arc::new(MetricStore::reference()),
            explainer,
            AuditLog::new(),
        ))
    }

    fn setup_test_app() -> Router {
        create_router(orchestrator_with(Arc::new(StaticExplainer::new(
            "Explanation placeholder",
        ))))
    }

    /// Holds semantic explanations until released; chat replies pass through
    #[derive(Default)]
    struct GatedExplainer {
        entered: Notify,
        release: Notify,
    }

    #[async_trait]
    impl ExplanationRequester for GatedExplainer {
        async fn complete(&self, _system_prompt: &str, user_prompt: &str) -> String {
            if user_prompt.contains("Verified value") {
                self.entered.notify_one();
                self.release.notified().await;
            }
            "done".to_string()
        }
    }

    async fn get_body_json(response: axum::response::Response) -> Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    fn post_json(uri: &str, body: Value) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    #[tokio::test]
    async fn test_health() {
        let response = setup_test_app()
            .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(get_body_json(response).await["status"], "healthy");
    }

    #[tokio::test]
    async fn test_create_session() {
        let response = setup_test_app()
            .oneshot(post_json("/api/session", serde_json::json!({"user_id": "u1"})))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let json = get_body_json(response).await;
        assert_eq!(json["success"], true);
        assert!(json["data"]["session_id"].is_string());
        assert!(json["data"]["welcome"].as_str().unwrap().contains("SDRAG"));
    }

    #[tokio::test]
    async fn test_chat_semantic() {
        let response = setup_test_app()
            .oneshot(post_json(
                "/api/chat",
                serde_json::json!({
                    "session_id": "chat-123",
                    "message": "¿Cuál fue el revenue del Q4 2024?"
                }),
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let json = get_body_json(response).await;
        let data = &json["data"];

        assert_eq!(data["session_id"], stable_uuid_from_string("chat-123").to_string());
        assert_eq!(data["classification"]["route"], "semantic");
        assert_eq!(data["classification"]["metric"], "revenue");
        assert_eq!(data["classification"]["period"], "Q4_2024");
        assert_eq!(data["data"]["formatted"], "$1,234,567.00");
        assert_eq!(data["steps"].as_array().unwrap().len(), 4);
        assert!(data["answer"].as_str().unwrap().contains("Explanation placeholder"));
    }

    #[tokio::test]
    async fn test_chat_rejects_empty_message() {
        let response = setup_test_app()
            .oneshot(post_json("/api/chat", serde_json::json!({"message": "   "})))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(get_body_json(response).await["success"], false);
    }

    #[tokio::test]
    async fn test_audit_roundtrip() {
        let app = setup_test_app();

        let response = app
            .clone()
            .oneshot(post_json(
                "/api/chat",
                serde_json::json!({
                    "session_id": "s-1",
                    "message": "¿Cuál es la política de vacaciones?"
                }),
            ))
            .await
            .unwrap();
        let json = get_body_json(response).await;
        let audit_id = json["data"]["audit_id"].as_str().unwrap().to_string();
        assert_eq!(json["data"]["classification"]["route"], "documental");

        let response = app
            .clone()
            .oneshot(
                Request::builder()
                    .uri(format!("/api/audit/{}", audit_id))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let json = get_body_json(response).await;
        assert_eq!(json["data"]["integrity_verified"], true);
        assert_eq!(json["data"]["trace"]["query"], "¿Cuál es la política de vacaciones?");

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/api/sessions/s-1/traces")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        let json = get_body_json(response).await;
        assert_eq!(json["data"]["traces"][0], audit_id.as_str());
    }

    #[tokio::test]
    async fn test_anonymous_chats_are_not_registered() {
        let state = ApiState::new(orchestrator_with(Arc::new(StaticExplainer::new("ok"))));
        let app = router_with_state(state.clone());

        for _ in 0..5 {
            let response = app
                .clone()
                .oneshot(post_json("/api/chat", serde_json::json!({"message": "hola"})))
                .await
                .unwrap();
            assert_eq!(response.status(), StatusCode::OK);
        }
        assert_eq!(state.session_count().await, 0);

        for _ in 0..2 {
            app.clone()
                .oneshot(post_json(
                    "/api/chat",
                    serde_json::json!({"session_id": "kept", "message": "hola"}),
                ))
                .await
                .unwrap();
        }
        assert_eq!(state.session_count().await, 1);
    }

    #[tokio::test]
    async fn test_same_session_waits_other_session_proceeds() {
        let explainer = Arc::new(GatedExplainer::default());
        let app = create_router(orchestrator_with(explainer.clone()));

        let send = |session_id: &str, message: &str| {
            let request = post_json(
                "/api/chat",
                serde_json::json!({"session_id": session_id, "message": message}),
            );
            tokio::spawn(app.clone().oneshot(request))
        };

        // Holds the "busy" session inside its explanation step
        let first = send("busy", "revenue Q4 2024");
        explainer.entered.notified().await;

        let mut queued = send("busy", "hola");
        let other = send("idle", "hola");

        let response = tokio::time::timeout(Duration::from_secs(5), other)
            .await
            .expect("other session blocked")
            .unwrap()
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        assert!(
            tokio::time::timeout(Duration::from_millis(100), &mut queued)
                .await
                .is_err(),
            "second message for the same session ran concurrently"
        );

        explainer.release.notify_one();

        let response = first.await.unwrap().unwrap();
        assert_eq!(get_body_json(response).await["data"]["data"]["formatted"], "$1,234,567.00");

        let response = tokio::time::timeout(Duration::from_secs(5), queued)
            .await
            .expect("queued message never ran")
            .unwrap()
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_unknown_trace_is_404() {
        let response = setup_test_app()
            .oneshot(
                Request::builder()
                    .uri(format!("/api/audit/{}", Uuid::new_v4()))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn test_session_id_parsing() {
        let id = Uuid::new_v4();
        assert_eq!(parse_session_id(Some(&id.to_string())), Some(id));
        assert_eq!(
            parse_session_id(Some("chat-1")),
            parse_session_id(Some("chat-1"))
        );
        assert!(parse_session_id(Some("  ")).is_none());
        assert!(parse_session_id(None).is_none());
    }
}
