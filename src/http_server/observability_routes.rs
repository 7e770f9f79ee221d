//! Observability HTTP Routes
//!
//! Health check and generation session listing.

use std::sync::Arc;

use axum::{extract::State, http::StatusCode, response::IntoResponse, routing::get, Json, Router};
use serde::Serialize;

use super::notebook_routes::NotebookState;
use crate::generation::SessionInfo;
use crate::render::CacheStats;

/// Health check response
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}

/// Session listing response
#[derive(Debug, Serialize)]
pub struct SessionsResponse {
    pub sessions: Vec<SessionInfo>,
    pub render_cache: CacheStats,
}

/// Health check route
pub fn health_routes() -> Router {
    Router::new().route("/health", get(health_handler))
}

/// Session listing route
pub fn sessions_routes(state: Arc<NotebookState>) -> Router {
    Router::new()
        .route("/sessions", get(sessions_handler))
        .with_state(state)
}

/// Health check handler
async fn health_handler() -> impl IntoResponse {
    let response = HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    };

    (StatusCode::OK, Json(response))
}

async fn sessions_handler(State(state): State<Arc<NotebookState>>) -> impl IntoResponse {
    let response = SessionsResponse {
        sessions: state.registry.sessions(),
        render_cache: state.cache.stats(),
    };

    (StatusCode::OK, Json(response))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http_server::notebook_routes::testing;
    use axum::body::Body;
    use axum::http::Request;
    use tower::ServiceExt;

    #[test]
    fn test_health_response_serialization() {
        let response = HealthResponse {
            status: "ok".to_string(),
            version: "0.1.0".to_string(),
        };

        let json = serde_json::to_string(&response).unwrap();
        assert!(json.contains("ok"));
    }

    #[tokio::test]
    async fn test_sessions_lists_completed_runs() {
        let state = testing::state(r#"{"cells":[]}"#);
        state.registry.run_to_completion("/listed").await;

        let response = sessions_routes(state)
            .oneshot(Request::get("/sessions").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["sessions"][0]["locator"], "/listed");
        assert_eq!(json["sessions"][0]["state"], "completed");
        // finish renders the final document once
        assert_eq!(json["render_cache"]["misses"], 1);
    }
}
