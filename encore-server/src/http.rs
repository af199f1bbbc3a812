//! Encore HTTP REST API
//!
//! Axum-based HTTP server that exposes the query pipeline and its stores
//! to the UI layer. Architecture: each endpoint has a thin axum handler
//! that delegates to a pure inner function. The inner functions are
//! directly testable without axum dispatch machinery.
//!
//! Endpoints:
//! - GET    /health      — health check with DB status
//! - GET    /version     — server version info
//! - POST   /query       — run the three-stage query pipeline
//! - POST   /feedback    — set Like/Dislike on a history record
//! - GET    /history     — list all query records
//! - GET    /preferences — list all per-user preference rows
//! - GET    /workflow    — list all persisted workflow steps
//! - DELETE /history     — bulk-clear the query history

use std::sync::Arc;

use anyhow::Result;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use encore_core::models::Feedback;
use encore_core::EncoreConfig;
use serde::Deserialize;
use sqlx::SqlitePool;
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use uuid::Uuid;

use crate::store;
use crate::subsystems::pipeline::Orchestrator;

/// Shared state for all HTTP handlers
#[derive(Clone)]
pub struct HttpState {
    pub pool: SqlitePool,
    pub orchestrator: Orchestrator,
}

/// Build the Axum router with all endpoints
pub fn build_router(state: Arc<HttpState>) -> Router {
    Router::new()
        .route("/health", get(health_handler))
        .route("/version", get(version_handler))
        .route("/query", post(query_handler))
        .route("/feedback", post(feedback_handler))
        .route("/history", get(history_handler).delete(clear_history_handler))
        .route("/preferences", get(preferences_handler))
        .route("/workflow", get(workflow_handler))
        .with_state(state)
}

/// Start the HTTP server on the configured address.
/// Gracefully shuts down when the broadcast shutdown signal fires.
pub async fn start_http_server(
    state: HttpState,
    config: &EncoreConfig,
    mut shutdown: broadcast::Receiver<()>,
) -> Result<()> {
    let addr = format!("{}:{}", config.http.host, config.http.port);

    let app = build_router(Arc::new(state));
    let listener = TcpListener::bind(&addr).await?;
    tracing::info!("Encore HTTP API listening on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            let _ = shutdown.recv().await;
            tracing::info!("HTTP server shutting down...");
        })
        .await?;

    Ok(())
}

// ============================================================================
// Request DTOs
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct QueryRequest {
    /// Opaque session identifier; minted by the server when absent.
    pub user_id: Option<String>,
    pub query: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct FeedbackRequest {
    pub record_id: i64,
    pub feedback: String,
}

// ============================================================================
// Inner (directly testable) business logic functions
// ============================================================================

/// Inner health check — queries DB and returns (status_code, json_body).
pub async fn health_inner(pool: &SqlitePool) -> (StatusCode, serde_json::Value) {
    match encore_core::db::health_check(pool).await {
        Ok(v) => (
            StatusCode::OK,
            serde_json::json!({
                "status": "healthy",
                "version": env!("CARGO_PKG_VERSION"),
                "sqlite": v,
            }),
        ),
        Err(e) => (
            StatusCode::SERVICE_UNAVAILABLE,
            serde_json::json!({
                "status": "unhealthy",
                "error": e.to_string(),
            }),
        ),
    }
}

/// Inner version — returns version info (pure, no IO).
pub fn version_inner() -> serde_json::Value {
    serde_json::json!({
        "version": env!("CARGO_PKG_VERSION"),
        "protocol": "encore/1",
    })
}

/// Inner query — validates input, mints a session id when missing, and runs
/// the pipeline. The pipeline itself always produces a displayable result.
pub async fn query_inner(
    orchestrator: &Orchestrator,
    req: QueryRequest,
) -> (StatusCode, serde_json::Value) {
    let query = match req.query {
        Some(q) if !q.trim().is_empty() => q,
        _ => {
            return (
                StatusCode::BAD_REQUEST,
                serde_json::json!({
                    "error": "query field is required",
                    "status": "error",
                }),
            );
        }
    };

    let user_id = req
        .user_id
        .filter(|id| !id.trim().is_empty())
        .unwrap_or_else(|| Uuid::new_v4().to_string());

    let outcome = orchestrator.run_query(&user_id, &query).await;

    (
        StatusCode::OK,
        serde_json::json!({
            "user_id": user_id,
            "result": outcome.result,
            "trace": outcome.trace,
            "record_id": outcome.record_id,
            "warnings": outcome.warnings,
        }),
    )
}

/// Inner feedback — validates the verdict and updates the record.
pub async fn feedback_inner(
    pool: &SqlitePool,
    req: FeedbackRequest,
) -> (StatusCode, serde_json::Value) {
    let feedback: Feedback = match req.feedback.parse() {
        Ok(f) => f,
        Err(e) => {
            return (
                StatusCode::BAD_REQUEST,
                serde_json::json!({
                    "error": e,
                    "status": "error",
                }),
            );
        }
    };

    match store::update_feedback(pool, req.record_id, feedback).await {
        Ok(true) => (
            StatusCode::OK,
            serde_json::json!({
                "updated": true,
                "record_id": req.record_id,
                "feedback": feedback.as_str(),
            }),
        ),
        Ok(false) => (
            StatusCode::NOT_FOUND,
            serde_json::json!({
                "error": format!("no query record with id {}", req.record_id),
                "status": "error",
            }),
        ),
        Err(e) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            serde_json::json!({
                "error": e.to_string(),
                "status": "error",
            }),
        ),
    }
}

/// Inner history listing.
pub async fn history_inner(pool: &SqlitePool) -> (StatusCode, serde_json::Value) {
    match store::list_query_records(pool).await {
        Ok(records) => (
            StatusCode::OK,
            serde_json::json!({
                "count": records.len(),
                "records": records,
            }),
        ),
        Err(e) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            serde_json::json!({
                "error": e.to_string(),
                "status": "error",
            }),
        ),
    }
}

/// Inner preferences listing.
pub async fn preferences_inner(pool: &SqlitePool) -> (StatusCode, serde_json::Value) {
    match store::list_preference_rows(pool).await {
        Ok(rows) => (
            StatusCode::OK,
            serde_json::json!({
                "count": rows.len(),
                "preferences": rows,
            }),
        ),
        Err(e) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            serde_json::json!({
                "error": e.to_string(),
                "status": "error",
            }),
        ),
    }
}

/// Inner workflow-log listing.
pub async fn workflow_inner(pool: &SqlitePool) -> (StatusCode, serde_json::Value) {
    match store::list_workflow_steps(pool).await {
        Ok(steps) => (
            StatusCode::OK,
            serde_json::json!({
                "count": steps.len(),
                "steps": steps,
            }),
        ),
        Err(e) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            serde_json::json!({
                "error": e.to_string(),
                "status": "error",
            }),
        ),
    }
}

/// Inner bulk history clear.
pub async fn clear_history_inner(pool: &SqlitePool) -> (StatusCode, serde_json::Value) {
    match store::clear_query_records(pool).await {
        Ok(()) => (StatusCode::OK, serde_json::json!({ "cleared": true })),
        Err(e) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            serde_json::json!({
                "error": e.to_string(),
                "status": "error",
            }),
        ),
    }
}

// ============================================================================
// Axum handler wrappers (thin — delegate to inner functions)
// ============================================================================

pub async fn health_handler(State(state): State<Arc<HttpState>>) -> impl IntoResponse {
    let (status, body) = health_inner(&state.pool).await;
    (status, Json(body))
}

pub async fn version_handler() -> impl IntoResponse {
    (StatusCode::OK, Json(version_inner()))
}

pub async fn query_handler(
    State(state): State<Arc<HttpState>>,
    Json(req): Json<QueryRequest>,
) -> impl IntoResponse {
    let (status, body) = query_inner(&state.orchestrator, req).await;
    (status, Json(body))
}

pub async fn feedback_handler(
    State(state): State<Arc<HttpState>>,
    Json(req): Json<FeedbackRequest>,
) -> impl IntoResponse {
    let (status, body) = feedback_inner(&state.pool, req).await;
    (status, Json(body))
}

pub async fn history_handler(State(state): State<Arc<HttpState>>) -> impl IntoResponse {
    let (status, body) = history_inner(&state.pool).await;
    (status, Json(body))
}

pub async fn preferences_handler(State(state): State<Arc<HttpState>>) -> impl IntoResponse {
    let (status, body) = preferences_inner(&state.pool).await;
    (status, Json(body))
}

pub async fn workflow_handler(State(state): State<Arc<HttpState>>) -> impl IntoResponse {
    let (status, body) = workflow_inner(&state.pool).await;
    (status, Json(body))
}

pub async fn clear_history_handler(State(state): State<Arc<HttpState>>) -> impl IntoResponse {
    let (status, body) = clear_history_inner(&state.pool).await;
    (status, Json(body))
}

// ============================================================================
// Unit Tests — call inner functions directly
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use encore_core::directory::{DirectoryClient, DirectoryClientConfig};
    use encore_core::llm::{ChatClient, ChatClientConfig};
    use sqlx::sqlite::SqlitePoolOptions;
    use std::sync::Arc as StdArc;

    async fn test_pool() -> SqlitePool {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .expect("in-memory pool");
        encore_core::db::init_schema(&pool).await.expect("schema");
        pool
    }

    /// Orchestrator wired to unreachable boundaries — fine for tests that
    /// never get past input validation.
    fn dead_end_orchestrator(pool: SqlitePool) -> Orchestrator {
        let llm = ChatClient::with_base_url(
            ChatClientConfig {
                api_key: "test".to_string(),
                model: "gpt-3.5-turbo".to_string(),
                temperature: 0.1,
            },
            "http://127.0.0.1:1".to_string(),
        )
        .expect("client");
        let directory = DirectoryClient::with_base_url(
            DirectoryClientConfig {
                api_key: "test".to_string(),
                timeout_seconds: 1,
            },
            "http://127.0.0.1:1".to_string(),
        )
        .expect("client");
        Orchestrator::new(pool, StdArc::new(llm), StdArc::new(directory), 100, 500)
    }

    // ========================================================================
    // TEST 1: version_inner is pure and returns correct fields
    // ========================================================================
    #[test]
    fn test_version_inner_pure() {
        let v = version_inner();
        assert!(v["version"].is_string(), "version must be string");
        assert_eq!(v["protocol"], "encore/1", "protocol must be encore/1");
    }

    // ========================================================================
    // TEST 2: health_inner returns 200 against an in-memory DB
    // ========================================================================
    #[tokio::test]
    async fn test_health_inner_ok() {
        let pool = test_pool().await;
        let (status, body) = health_inner(&pool).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "healthy");
        assert!(body["sqlite"].is_string());
    }

    // ========================================================================
    // TEST 3: query_inner — missing query returns 400 BAD_REQUEST
    // ========================================================================
    #[tokio::test]
    async fn test_query_inner_missing_query() {
        let pool = test_pool().await;
        let orchestrator = dead_end_orchestrator(pool);

        let req = QueryRequest {
            user_id: None,
            query: None,
        };
        let (status, body) = query_inner(&orchestrator, req).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["status"], "error");
    }

    // ========================================================================
    // TEST 4: query_inner — whitespace-only query returns 400
    // ========================================================================
    #[tokio::test]
    async fn test_query_inner_whitespace_query() {
        let pool = test_pool().await;
        let orchestrator = dead_end_orchestrator(pool);

        let req = QueryRequest {
            user_id: Some("u1".to_string()),
            query: Some("   ".to_string()),
        };
        let (status, body) = query_inner(&orchestrator, req).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["status"], "error");
    }

    // ========================================================================
    // TEST 5: feedback_inner — invalid verdict returns 400
    // ========================================================================
    #[tokio::test]
    async fn test_feedback_inner_invalid_value() {
        let pool = test_pool().await;
        let req = FeedbackRequest {
            record_id: 1,
            feedback: "Shrug".to_string(),
        };
        let (status, body) = feedback_inner(&pool, req).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["status"], "error");
    }

    // ========================================================================
    // TEST 6: feedback_inner — unknown record returns 404
    // ========================================================================
    #[tokio::test]
    async fn test_feedback_inner_unknown_record() {
        let pool = test_pool().await;
        let req = FeedbackRequest {
            record_id: 42,
            feedback: "Like".to_string(),
        };
        let (status, _body) = feedback_inner(&pool, req).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    // ========================================================================
    // TEST 7: feedback_inner — valid update round-trips through history
    // ========================================================================
    #[tokio::test]
    async fn test_feedback_inner_updates_record() {
        let pool = test_pool().await;
        let id = store::append_query_record(&pool, "u1", "q", "r")
            .await
            .unwrap();

        let req = FeedbackRequest {
            record_id: id,
            feedback: "like".to_string(),
        };
        let (status, body) = feedback_inner(&pool, req).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["updated"], true);
        assert_eq!(body["feedback"], "Like");

        let (status, body) = history_inner(&pool).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["records"][0]["feedback"], "Like");
    }

    // ========================================================================
    // TEST 8: history listing and bulk clear
    // ========================================================================
    #[tokio::test]
    async fn test_history_listing_and_clear() {
        let pool = test_pool().await;
        store::append_query_record(&pool, "u1", "q1", "r1")
            .await
            .unwrap();
        store::append_query_record(&pool, "u2", "q2", "r2")
            .await
            .unwrap();

        let (status, body) = history_inner(&pool).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["count"], 2);

        let (status, body) = clear_history_inner(&pool).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["cleared"], true);

        let (_, body) = history_inner(&pool).await;
        assert_eq!(body["count"], 0);
    }

    // ========================================================================
    // TEST 9: preferences and workflow listings start empty
    // ========================================================================
    #[tokio::test]
    async fn test_admin_listings_empty() {
        let pool = test_pool().await;

        let (status, body) = preferences_inner(&pool).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["count"], 0);

        let (status, body) = workflow_inner(&pool).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["count"], 0);
    }
}
