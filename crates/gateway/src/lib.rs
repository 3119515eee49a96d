//! HTTP gateway for the Parlance agent.
//!
//! Exposes one shared conversational agent over REST: SSE-streamed chat,
//! synchronous completion, tool dispatch, and history persistence.
//!
//! Built on Axum. The agent is constructed lazily on first use by the
//! [`AgentManager`]; all routes share it through [`GatewayState`].

pub mod chat;
pub mod error;
pub mod handle;
pub mod history;
pub mod tools;

pub use handle::AgentManager;

use axum::Router;
use axum::extract::{DefaultBodyLimit, State};
use axum::http::{HeaderValue, Method, StatusCode, header};
use axum::response::{IntoResponse, Json, Response};
use axum::routing::{get, post};
use chrono::{DateTime, Utc};
use parlance_config::{AppConfig, GatewayConfig};
use serde::Serialize;
use std::sync::Arc;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tracing::{info, warn};

/// Shared application state for the gateway.
pub struct GatewayState {
    pub manager: AgentManager,
    pub max_message_chars: usize,
}

pub type SharedState = Arc<GatewayState>;

impl GatewayState {
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            manager: AgentManager::from_config(config),
            max_message_chars: config.limits.max_message_chars,
        }
    }
}

/// Generic `{success, message, data?}` envelope for mutating operations.
#[derive(Debug, Serialize)]
pub struct ApiResponse {
    pub success: bool,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,
}

impl ApiResponse {
    pub fn ok(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: message.into(),
            data: None,
        }
    }

    pub fn with_data(mut self, data: serde_json::Value) -> Self {
        self.data = Some(data);
        self
    }
}

/// Build the Axum router with all gateway routes.
pub fn build_router(state: SharedState) -> Router {
    Router::new()
        .route("/", get(root_handler))
        .route("/health", get(health_handler))
        .route("/chat", post(chat::chat))
        .route("/chat/completion", post(chat::completion))
        .route("/chat/reset", post(chat::reset))
        .route("/tools", get(tools::list_tools))
        .route("/tools/{name}", get(tools::get_tool))
        .route("/tools/{name}/execute", post(tools::execute_tool))
        .route(
            "/history",
            get(history::get_history).delete(history::clear_history),
        )
        .route("/history/save", post(history::save_history))
        .route("/history/load", post(history::load_history))
        .with_state(state)
}

/// Build the full application: routes plus CORS, body limit, and trace
/// logging.
pub fn build_app(state: SharedState, gateway: &GatewayConfig) -> Router {
    build_router(state)
        .layer(DefaultBodyLimit::max(1024 * 1024))
        .layer(cors_layer(&gateway.cors_origins))
        .layer(tower_http::trace::TraceLayer::new_for_http())
}

/// CORS with an explicit origin allow-list from config.
fn cors_layer(origins: &[String]) -> CorsLayer {
    let allowed: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match origin.parse() {
            Ok(value) => Some(value),
            Err(_) => {
                warn!(origin = %origin, "Ignoring unparseable CORS origin");
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(allowed))
        .allow_methods([Method::GET, Method::POST, Method::DELETE])
        .allow_headers([header::CONTENT_TYPE])
        .max_age(std::time::Duration::from_secs(3600))
}

/// Start the gateway HTTP server.
pub async fn start(config: AppConfig) -> anyhow::Result<()> {
    let addr = format!("{}:{}", config.gateway.host, config.gateway.port);
    let state = Arc::new(GatewayState::from_config(&config));
    let app = build_app(state, &config.gateway);

    info!(addr = %addr, "Gateway listening");
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}

// --- Handlers ---

#[derive(Serialize)]
struct RootResponse {
    service: &'static str,
    version: &'static str,
    status: &'static str,
}

async fn root_handler() -> Json<RootResponse> {
    Json(RootResponse {
        service: "parlance-gateway",
        version: env!("CARGO_PKG_VERSION"),
        status: "running",
    })
}

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    timestamp: DateTime<Utc>,
    tools_enabled: Vec<String>,
}

/// `GET /health` — 503 when the agent cannot be constructed or its
/// provider is unreachable.
async fn health_handler(State(state): State<SharedState>) -> Response {
    match state.manager.get().await {
        Ok(agent) => {
            let reachable = agent.provider().health_check().await.unwrap_or(false);
            let (code, status) = if reachable {
                (StatusCode::OK, "healthy")
            } else {
                (StatusCode::SERVICE_UNAVAILABLE, "unhealthy")
            };
            let body = HealthResponse {
                status,
                timestamp: Utc::now(),
                tools_enabled: agent.tools().names(),
            };
            (code, Json(body)).into_response()
        }
        Err(e) => {
            warn!(error = %e, "Health check failed to reach the agent");
            let body = HealthResponse {
                status: "unavailable",
                timestamp: Utc::now(),
                tools_enabled: Vec::new(),
            };
            (StatusCode::SERVICE_UNAVAILABLE, Json(body)).into_response()
        }
    }
}


#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{body_json, scripted_state};
    use axum::body::Body;
    use axum::http::Request;
    use parlance_core::Error;
    use parlance_providers::scripted::ScriptedProvider;
    use tower::ServiceExt;

    fn get(uri: &str) -> Request<Body> {
        Request::builder().uri(uri).body(Body::empty()).unwrap()
    }

    #[tokio::test]
    async fn root_reports_the_service() {
        let app = build_router(scripted_state(ScriptedProvider::say(["x"])));
        let response = app.oneshot(get("/")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["service"], "parlance-gateway");
        assert_eq!(body["status"], "running");
    }

    #[tokio::test]
    async fn health_lists_enabled_tools() {
        let app = build_router(scripted_state(ScriptedProvider::say(["x"])));
        let response = app.oneshot(get("/health")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["status"], "healthy");
        assert_eq!(body["tools_enabled"][0], "calculator");
        assert!(body["timestamp"].is_string());
    }

    #[tokio::test]
    async fn health_is_503_when_agent_cannot_be_built() {
        let state = Arc::new(GatewayState {
            manager: AgentManager::new(|| {
                Err(Error::Config {
                    message: "no API key".into(),
                })
            }),
            max_message_chars: 10_000,
        });
        let response = build_router(state).oneshot(get("/health")).await.unwrap();
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
        let body = body_json(response).await;
        assert_eq!(body["status"], "unavailable");
    }

    #[tokio::test]
    async fn app_layers_do_not_break_routing() {
        let gateway = GatewayConfig::default();
        let app = build_app(scripted_state(ScriptedProvider::say(["x"])), &gateway);
        let response = app.oneshot(get("/health")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }
}
