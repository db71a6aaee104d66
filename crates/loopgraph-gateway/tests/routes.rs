use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use tower::ServiceExt;

use loopgraph_core::config::EngineConfig;
use loopgraph_engine::WorkflowEngine;
use loopgraph_gateway::{router, AppState};
use loopgraph_test_utils::{
    refine_until_definition, runaway_definition, summarize_definition, test_registry,
};

fn app() -> Router {
    let engine = WorkflowEngine::new(Arc::new(test_registry()), &EngineConfig::default());
    router(Arc::new(AppState {
        engine: Arc::new(engine),
    }))
}

async fn send(app: &Router, req: Request<Body>) -> (StatusCode, serde_json::Value) {
    let resp = app.clone().oneshot(req).await.unwrap();
    let status = resp.status();
    let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX)
        .await
        .unwrap();
    let json = if bytes.is_empty() {
        serde_json::Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, json)
}

fn post(uri: &str, body: serde_json::Value) -> Request<Body> {
    Request::post(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn get(uri: &str) -> Request<Body> {
    Request::get(uri).body(Body::empty()).unwrap()
}

async fn create(app: &Router, def: serde_json::Value) -> String {
    let (status, body) = send(app, post("/graph/create", def)).await;
    assert_eq!(status, StatusCode::OK, "{body}");
    body["graph_id"].as_str().unwrap().to_string()
}

#[tokio::test]
async fn test_health() {
    let (status, body) = send(&app(), get("/api/health")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
    assert!(body["version"].is_string());
}

#[tokio::test]
async fn test_create_and_run_summarize() {
    let app = app();
    let graph_id = create(&app, serde_json::to_value(summarize_definition()).unwrap()).await;

    let (status, body) = send(
        &app,
        post(
            "/graph/run",
            serde_json::json!({
                "graph_id": graph_id,
                "initial_state": {"input_text": "hello world"},
            }),
        ),
    )
    .await;

    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["final_state"]["length"], 12);
    assert_eq!(body["final_state"]["final_summary"], "hello world.");
    let log = body["execution_log"].as_array().unwrap();
    let nodes: Vec<&str> = log.iter().map(|e| e["node"].as_str().unwrap()).collect();
    assert_eq!(nodes, vec!["split", "summarize", "merge", "refine"]);
    assert_eq!(body["final_state"]["log"], body["execution_log"]);

    let run_id = body["run_id"].as_str().unwrap();
    let (status, cp) = send(&app, get(&format!("/graph/state/{run_id}"))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(cp["status"]["kind"], "completed");
    assert_eq!(cp["step"], 4);
    assert_eq!(cp["graph_id"], graph_id.as_str());
}

#[tokio::test]
async fn test_create_accepts_tool_alias() {
    let app = app();
    let graph_id = create(
        &app,
        serde_json::json!({
            "nodes": [{"name": "split", "tool": "split_text"}],
            "edges": {},
            "start": "split",
        }),
    )
    .await;

    let (status, graph) = send(&app, get(&format!("/graph/{graph_id}"))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(graph["start"], "split");
    assert_eq!(graph["nodes"]["split"], "split_text");
}

#[tokio::test]
async fn test_create_rejects_invalid_definition() {
    let (status, body) = send(
        &app(),
        post(
            "/graph/create",
            serde_json::json!({
                "nodes": [{"name": "a", "step": "noop"}],
                "edges": {"a": "b"},
                "start": "a",
            }),
        ),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("'b'"));
}

#[tokio::test]
async fn test_run_unknown_graph() {
    let (status, body) = send(
        &app(),
        post(
            "/graph/run",
            serde_json::json!({"graph_id": "missing", "initial_state": {}}),
        ),
    )
    .await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(body["error"].as_str().unwrap().contains("missing"));
    assert!(body.get("run_id").is_none());
}

#[tokio::test]
async fn test_runaway_run_reports_run_id_and_failed_checkpoint() {
    let app = app();
    let graph_id = create(&app, serde_json::to_value(runaway_definition()).unwrap()).await;

    let (status, body) = send(
        &app,
        post(
            "/graph/run",
            serde_json::json!({"graph_id": graph_id, "initial_state": {}}),
        ),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("100"));

    let run_id = body["run_id"].as_str().unwrap();
    let (status, cp) = send(&app, get(&format!("/graph/state/{run_id}"))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(cp["status"]["kind"], "failed");
    assert_eq!(cp["step"], 100);
}

#[tokio::test]
async fn test_rejected_input_has_no_run_id() {
    let app = app();
    let graph_id = create(&app, serde_json::to_value(summarize_definition()).unwrap()).await;

    let (status, body) = send(
        &app,
        post(
            "/graph/run",
            serde_json::json!({"graph_id": graph_id, "initial_state": {"log": []}}),
        ),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("'log'"));
    assert!(body.get("run_id").is_none());
}

#[tokio::test]
async fn test_refine_loop_over_http() {
    let app = app();
    let graph_id = create(
        &app,
        serde_json::to_value(refine_until_definition(200)).unwrap(),
    )
    .await;

    let (status, body) = send(
        &app,
        post(
            "/graph/run",
            serde_json::json!({
                "graph_id": graph_id,
                "initial_state": {"input_text": "word ".repeat(300)},
            }),
        ),
    )
    .await;

    assert_eq!(status, StatusCode::OK, "{body}");
    assert!(body["final_state"]["length"].as_i64().unwrap() <= 200);
}

#[tokio::test]
async fn test_unknown_run_and_graph_are_404() {
    let app = app();
    let (status, _) = send(&app, get("/graph/state/nope")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, body) = send(&app, get("/graph/nope")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(body["error"].is_string());
}
