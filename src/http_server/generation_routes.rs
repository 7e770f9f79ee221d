//! Generation HTTP Routes
//!
//! Starts generation for a locator without streaming it, for clients that
//! poll the session listing or read the store directly.

use std::sync::Arc;

use axum::{extract::State, http::StatusCode, response::IntoResponse, routing::post, Json, Router};
use serde::{Deserialize, Serialize};

use super::notebook_routes::NotebookState;
use crate::generation::SessionDecision;
use crate::store::{Artifact, SessionKey};

#[derive(Debug, Deserialize)]
pub struct GenerateRequest {
    /// Locator to generate: path plus optional query
    #[serde(default)]
    pub url: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct GenerateResponse {
    pub key: SessionKey,
    pub locator: String,
    pub decision: SessionDecision,
    /// Store name of the document once it is finished
    pub artifact: String,
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

/// Generation route
pub fn generation_routes(state: Arc<NotebookState>) -> Router {
    Router::new()
        .route("/gen", post(generate_handler))
        .with_state(state)
}

async fn generate_handler(
    State(state): State<Arc<NotebookState>>,
    Json(request): Json<GenerateRequest>,
) -> impl IntoResponse {
    let locator = match request.url.filter(|url| url.starts_with('/')) {
        Some(url) => url,
        None => {
            return (
                StatusCode::BAD_REQUEST,
                Json(ErrorResponse {
                    error: "url must be a path starting with '/'".to_string(),
                }),
            )
                .into_response()
        }
    };

    let registry = state.registry.clone();
    let ensure_locator = locator.clone();
    let decision = match tokio::task::spawn_blocking(move || registry.ensure(&ensure_locator)).await {
        Ok(decision) => decision,
        Err(e) => {
            tracing::error!(locator = %locator, error = %e, "session lookup failed");
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorResponse {
                    error: e.to_string(),
                }),
            )
                .into_response();
        }
    };

    let key = SessionKey::for_locator(&locator);
    tracing::info!(%key, locator = %locator, ?decision, "generation requested");
    let response = GenerateResponse {
        artifact: Artifact::Final.file_name(&key),
        key,
        locator,
        decision,
    };
    (StatusCode::ACCEPTED, Json(response)).into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http_server::notebook_routes::testing;
    use axum::body::Body;
    use axum::http::{header, Request};
    use tower::ServiceExt;

    fn post_json(body: &str) -> Request<Body> {
        Request::post("/gen")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    #[tokio::test]
    async fn test_gen_starts_session() {
        let state = testing::state(r#"{"cells":[{"id":"a"}]}"#);
        let response = generation_routes(state.clone())
            .oneshot(post_json(r#"{"url":"/topic/rust?level=intro"}"#))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::ACCEPTED);

        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        let key = SessionKey::for_locator("/topic/rust?level=intro");
        assert_eq!(json["decision"], "started");
        assert_eq!(json["key"], key.as_str());
        assert_eq!(json["artifact"], format!("{}-final.ipynb", key));
        assert!(state.registry.session(&key).is_some());
    }

    #[tokio::test]
    async fn test_gen_requires_path() {
        let state = testing::state(r#"{"cells":[]}"#);
        for body in [r#"{}"#, r#"{"url":"topic"}"#] {
            let response = generation_routes(state.clone())
                .oneshot(post_json(body))
                .await
                .unwrap();
            assert_eq!(response.status(), StatusCode::BAD_REQUEST, "body {}", body);
        }
    }
}
