//! Tool routes: catalog listing, lookup, and execution.

use crate::SharedState;
use crate::error::ApiError;
use axum::extract::{Path, State};
use axum::response::Json;
use parlance_core::tool::{ToolDescriptor, ToolExecutionResult};
use parlance_core::Error;
use serde::{Deserialize, Serialize};
use tracing::info;

#[derive(Debug, Serialize)]
pub struct ToolsResponse {
    pub tools: Vec<ToolDescriptor>,
}

#[derive(Debug, Deserialize)]
pub struct ExecuteRequest {
    pub function: String,
    #[serde(default)]
    pub parameters: serde_json::Value,
}

/// `GET /tools` — every registered tool with its functions.
pub async fn list_tools(
    State(state): State<SharedState>,
) -> std::result::Result<Json<ToolsResponse>, ApiError> {
    let agent = state.manager.get().await?;
    Ok(Json(ToolsResponse {
        tools: agent.tools().list(),
    }))
}

/// `GET /tools/{name}` — one tool's catalog entry, 404 if unknown.
pub async fn get_tool(
    State(state): State<SharedState>,
    Path(name): Path<String>,
) -> std::result::Result<Json<ToolDescriptor>, ApiError> {
    let agent = state.manager.get().await?;
    agent
        .tools()
        .get(&name)
        .map(Json)
        .ok_or_else(|| Error::NotFound(format!("Tool not found: {name}")).into())
}

/// `POST /tools/{name}/execute` — run one function.
///
/// Only an unknown *tool* name is a transport fault (404). Faults inside a
/// known tool, including an unknown function, come back as 200 with
/// `success: false`.
pub async fn execute_tool(
    State(state): State<SharedState>,
    Path(name): Path<String>,
    Json(request): Json<ExecuteRequest>,
) -> std::result::Result<Json<ToolExecutionResult>, ApiError> {
    let agent = state.manager.get().await?;
    if !agent.tools().contains(&name) {
        return Err(Error::NotFound(format!("Tool not found: {name}")).into());
    }

    info!(tool = %name, function = %request.function, "Executing tool function");
    let result = agent.tools().execute(&request.function, request.parameters).await;
    Ok(Json(result))
}

#[cfg(test)]
mod tests {
    use crate::build_router;
    use crate::testing::{body_json, scripted_state};
    use axum::body::Body;
    use axum::http::{Request, StatusCode, header};
    use parlance_providers::scripted::ScriptedProvider;
    use tower::ServiceExt;

    fn get(uri: &str) -> Request<Body> {
        Request::builder().uri(uri).body(Body::empty()).unwrap()
    }

    fn post_json(uri: &str, body: &str) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    fn app() -> axum::Router {
        build_router(scripted_state(ScriptedProvider::say(["ok"])))
    }

    #[tokio::test]
    async fn lists_all_tools_with_functions() {
        let response = app().oneshot(get("/tools")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;

        let names: Vec<_> = body["tools"]
            .as_array()
            .unwrap()
            .iter()
            .map(|t| t["name"].as_str().unwrap().to_string())
            .collect();
        assert_eq!(names, vec!["calculator", "clock", "text"]);
        assert_eq!(body["tools"][0]["functions"][0]["name"], "calculate");
    }

    #[tokio::test]
    async fn looks_up_one_tool() {
        let response = app().oneshot(get("/tools/clock")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["name"], "clock");
        assert!(body["functions"].as_array().unwrap().len() >= 2);
    }

    #[tokio::test]
    async fn unknown_tool_is_404() {
        for request in [
            get("/tools/nope"),
            post_json("/tools/nope/execute", r#"{"function": "f"}"#),
        ] {
            let response = app().oneshot(request).await.unwrap();
            assert_eq!(response.status(), StatusCode::NOT_FOUND);
        }
    }

    #[tokio::test]
    async fn executes_a_function() {
        let response = app()
            .oneshot(post_json(
                "/tools/calculator/execute",
                r#"{"function": "calculate", "parameters": {"expression": "2 + 2"}}"#,
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["success"], true);
        assert_eq!(body["output"], "4");
    }

    #[tokio::test]
    async fn invalid_parameters_are_normalized() {
        let response = app()
            .oneshot(post_json(
                "/tools/calculator/execute",
                r#"{"function": "calculate", "parameters": {}}"#,
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["success"], false);
        assert!(!body["error"].as_str().unwrap().is_empty());
    }

    #[tokio::test]
    async fn unknown_function_on_known_tool_is_normalized() {
        let response = app()
            .oneshot(post_json(
                "/tools/calculator/execute",
                r#"{"function": "integrate", "parameters": {}}"#,
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["success"], false);
        assert!(body["error"].as_str().unwrap().contains("integrate"));
    }
}
