//! Axum HTTP surface. Three routes map directly to the egress contract in
//! spec §6: start a traversal, fetch the latest result, clear the latest
//! result. The document tree is loaded once at startup and is read-only for
//! every run served afterwards (§5, "the document tree is read-only during
//! a run").

use axum::{
    extract::{Json as JsonExtract, Request, State},
    http::{header, StatusCode},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use ghte_core::{EngineConfig, GatewayConfig, TraversalResult};
use ghte_engine::store::ResultStore;
use ghte_llm::provider::LlmProvider;
use serde::Deserialize;
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tracing::{info, warn};

pub struct AppState {
    pub document: serde_json::Value,
    pub provider: Arc<dyn LlmProvider>,
    pub config: EngineConfig,
    pub store: Arc<ResultStore>,
    /// If set, `/traversal*` routes require `Authorization: Bearer <token>` to match.
    /// `/health` stays open regardless, the way the teacher's gateway never gates its
    /// own liveness probe behind request auth.
    pub auth_token: Option<String>,
}

#[derive(thiserror::Error, Debug)]
pub enum GatewayError {
    #[error(transparent)]
    Engine(#[from] ghte_core::Error),
}

impl IntoResponse for GatewayError {
    fn into_response(self) -> Response {
        let status = match &self {
            GatewayError::Engine(ghte_core::Error::MalformedDocument(_))
            | GatewayError::Engine(ghte_core::Error::InvalidTree { .. }) => StatusCode::BAD_REQUEST,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        (status, Json(serde_json::json!({ "error": self.to_string() }))).into_response()
    }
}

#[derive(Deserialize)]
struct StartTraversalRequest {
    #[serde(rename = "caseInformation")]
    case_information: serde_json::Value,
    #[serde(rename = "maxDepth")]
    max_depth: Option<u32>,
}

pub async fn serve(gateway_config: GatewayConfig, state: Arc<AppState>) -> anyhow::Result<()> {
    let protected = Router::new()
        .route("/traversal", post(start_traversal_handler))
        .route("/traversal/latest", get(fetch_latest_handler))
        .route("/traversal/latest/clear", post(clear_latest_handler))
        .route_layer(middleware::from_fn_with_state(state.clone(), require_auth));

    let app = Router::new()
        .route("/health", get(health_handler))
        .merge(protected)
        .layer(CorsLayer::new().allow_origin(Any).allow_methods(Any))
        .with_state(state);

    let bind_addr: SocketAddr = format!("{}:{}", gateway_config.bind.to_addr(), gateway_config.port)
        .parse()
        .expect("invalid bind address");

    info!("GHTE gateway listening on {bind_addr}");
    let listener = tokio::net::TcpListener::bind(bind_addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}

/// Enforces `GatewayConfig.auth_token` (§6 ingress/egress are otherwise unauthenticated):
/// when a token is configured, `/traversal*` requests must carry a matching
/// `Authorization: Bearer <token>` header. No token configured means no enforcement,
/// matching the field's `#[serde(default)]` "opt-in" shape.
async fn require_auth(
    State(state): State<Arc<AppState>>,
    request: Request,
    next: Next,
) -> Response {
    let Some(expected) = &state.auth_token else {
        return next.run(request).await;
    };

    let presented = request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "));

    match presented {
        Some(token) if token == expected => next.run(request).await,
        _ => {
            warn!("rejected traversal request with missing or invalid bearer token");
            (StatusCode::UNAUTHORIZED, Json(serde_json::json!({ "error": "unauthorized" })))
                .into_response()
        }
    }
}

async fn health_handler() -> impl IntoResponse {
    Json(serde_json::json!({ "status": "ok" }))
}

async fn start_traversal_handler(
    State(state): State<Arc<AppState>>,
    JsonExtract(req): JsonExtract<StartTraversalRequest>,
) -> Result<Json<TraversalResult>, GatewayError> {
    let mut config = state.config.clone();
    if let Some(max_depth) = req.max_depth {
        config.max_depth = max_depth;
    }

    let result = ghte_engine::run(&state.document, req.case_information, config, state.provider.clone()).await?;

    if let Err(e) = state.store.commit(&result) {
        tracing::warn!(error = %e, "result store commit failed; returning run result anyway");
    }

    Ok(Json(result))
}

async fn fetch_latest_handler(State(state): State<Arc<AppState>>) -> Json<Option<TraversalResult>> {
    Json(state.store.fetch_latest())
}

async fn clear_latest_handler(State(state): State<Arc<AppState>>) -> StatusCode {
    state.store.clear_latest();
    StatusCode::NO_CONTENT
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::Request;
    use ghte_llm::provider::{LlmCompletion, LlmError, LlmResult, LlmStream};
    use ghte_llm::types::{AccumulatedToolCall, LlmContent, LlmRequest};
    use tower::ServiceExt;

    struct StubOracle;

    #[async_trait::async_trait]
    impl LlmProvider for StubOracle {
        fn name(&self) -> &str {
            "stub"
        }
        fn models(&self) -> &[&str] {
            &["stub-model"]
        }
        async fn complete_stream(
            &self,
            _request: LlmRequest,
            _cancel: Option<tokio_util::sync::CancellationToken>,
        ) -> LlmResult<LlmStream> {
            unreachable!()
        }
        async fn complete(&self, request: LlmRequest) -> LlmResult<LlmCompletion> {
            let LlmContent::Text(prompt) = &request.messages[0].content else {
                return Err(LlmError::InvalidResponse("expected text".into()));
            };
            let arguments = if prompt.contains("synthesize_recommendation") {
                serde_json::json!({ "recommendation": "ok", "confidence": 0.5, "keyFindings": [] }).to_string()
            } else {
                serde_json::json!({ "decisions": [{ "nodeId": "root", "relevanceScore": 0.9, "shouldExploreChildren": false, "reasoning": "x" }] }).to_string()
            };
            Ok(LlmCompletion {
                tool_calls: vec![AccumulatedToolCall { id: "1".into(), name: "x".into(), arguments }],
                ..Default::default()
            })
        }
    }

    fn test_state(dir: &tempfile::TempDir) -> Arc<AppState> {
        test_state_with_auth(dir, None)
    }

    fn test_state_with_auth(dir: &tempfile::TempDir, auth_token: Option<String>) -> Arc<AppState> {
        Arc::new(AppState {
            document: serde_json::json!({
                "nodes": { "root": {"id": "root", "title": "Root", "level": 0, "children": []} },
                "rootNodes": ["root"]
            }),
            provider: Arc::new(StubOracle),
            config: EngineConfig { chunk_delay_ms: 0, ..EngineConfig::default() },
            store: Arc::new(ResultStore::new(dir.path().join("latest.json"))),
            auth_token,
        })
    }

    /// Mirrors `serve`'s router construction: `/health` is always open,
    /// `/traversal*` sits behind `require_auth`.
    fn app(state: Arc<AppState>) -> Router {
        let protected = Router::new()
            .route("/traversal", post(start_traversal_handler))
            .route("/traversal/latest", get(fetch_latest_handler))
            .route("/traversal/latest/clear", post(clear_latest_handler))
            .route_layer(middleware::from_fn_with_state(state.clone(), require_auth));

        Router::new()
            .route("/health", get(health_handler))
            .merge(protected)
            .with_state(state)
    }

    #[tokio::test]
    async fn health_returns_ok() {
        let dir = tempfile::tempdir().unwrap();
        let response = app(test_state(&dir))
            .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn latest_is_null_before_any_run() {
        let dir = tempfile::tempdir().unwrap();
        let response = app(test_state(&dir))
            .oneshot(Request::builder().uri("/traversal/latest").body(Body::empty()).unwrap())
            .await
            .unwrap();
        let body = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        assert_eq!(&body[..], b"null");
    }

    #[tokio::test]
    async fn starting_a_traversal_populates_latest() {
        let dir = tempfile::tempdir().unwrap();
        let state = test_state(&dir);
        let req_body = serde_json::json!({ "caseInformation": { "summary": "refund dispute" } }).to_string();

        let response = app(state.clone())
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/traversal")
                    .header("content-type", "application/json")
                    .body(Body::from(req_body))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let response = app(state.clone())
            .oneshot(Request::builder().uri("/traversal/latest").body(Body::empty()).unwrap())
            .await
            .unwrap();
        let body = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let value: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert!(value.is_object());

        let response = app(state.clone())
            .oneshot(Request::builder().method("POST").uri("/traversal/latest/clear").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NO_CONTENT);
    }

    #[tokio::test]
    async fn health_is_open_even_when_a_token_is_configured() {
        let dir = tempfile::tempdir().unwrap();
        let state = test_state_with_auth(&dir, Some("secret".to_string()));
        let response = app(state)
            .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn traversal_route_rejects_missing_bearer_token() {
        let dir = tempfile::tempdir().unwrap();
        let state = test_state_with_auth(&dir, Some("secret".to_string()));
        let response = app(state)
            .oneshot(Request::builder().uri("/traversal/latest").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn traversal_route_rejects_wrong_bearer_token() {
        let dir = tempfile::tempdir().unwrap();
        let state = test_state_with_auth(&dir, Some("secret".to_string()));
        let response = app(state)
            .oneshot(
                Request::builder()
                    .uri("/traversal/latest")
                    .header("authorization", "Bearer wrong")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn traversal_route_accepts_matching_bearer_token() {
        let dir = tempfile::tempdir().unwrap();
        let state = test_state_with_auth(&dir, Some("secret".to_string()));
        let response = app(state)
            .oneshot(
                Request::builder()
                    .uri("/traversal/latest")
                    .header("authorization", "Bearer secret")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }
}
