//! Integration tests for the portal client
//!
//! These tests run the client against an in-process axum server standing in
//! for the remote backend.

use agent_portal::portal::api::{Plan, PortalClient, PLAN_REQUIRED_MESSAGE};
use agent_portal::portal::chat::{ChatEvent, ChatSession, TurnState, APOLOGY};
use agent_portal::portal::config::{Credentials, PortalConfig};
use agent_portal::portal::error::PortalError;
use agent_portal::portal::graph::{Graph, GraphEditor};
use agent_portal::portal::run::{RunExecutor, RunRequest, RunStatus, RunWatcher};
use axum::body::Body;
use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use futures::StreamExt;
use serde_json::{json, Value};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::mpsc;

// ============================================================================
// Fake backend
// ============================================================================

#[derive(Clone, Default)]
struct Backend {
    last_run: Arc<Mutex<Option<Value>>>,
    last_auth: Arc<Mutex<Option<String>>>,
    last_chat: Arc<Mutex<Option<Value>>>,
    polls: Arc<AtomicUsize>,
}

async fn agent_run(
    State(backend): State<Backend>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    *backend.last_auth.lock().unwrap() = headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);

    if body["goal"] == "explode" {
        return (StatusCode::INTERNAL_SERVER_ERROR, "executor down").into_response();
    }
    *backend.last_run.lock().unwrap() = Some(body);
    Json(json!({ "summary": "# Report", "runId": "abc" })).into_response()
}

async fn start_agent(Path(id): Path<String>, Json(body): Json<Value>) -> Response {
    if id == "gated" {
        return (
            StatusCode::FORBIDDEN,
            Json(json!({ "ok": false, "error": "plan" })),
        )
            .into_response();
    }
    assert!(body["goal"].is_string());
    Json(json!({ "ok": true, "runId": 17 })).into_response()
}

async fn run_status(State(backend): State<Backend>, Path(id): Path<String>) -> Json<Value> {
    if id == "gone" {
        return Json(json!({ "ok": false, "error": "run not found" }));
    }
    let poll = backend.polls.fetch_add(1, Ordering::SeqCst);
    let status = match poll {
        0 => "queued",
        1 => "running",
        _ => "succeeded",
    };
    Json(json!({
        "ok": true,
        "run": {
            "id": id,
            "status": status,
            "goal": "research",
            "steps": [
                { "id": "s1", "index": 0, "tool": "plan", "status": if poll >= 1 { "done" } else { "queued" } }
            ]
        }
    }))
}

async fn chat_send(State(backend): State<Backend>, Json(body): Json<Value>) -> Response {
    let text = body["messages"]
        .as_array()
        .and_then(|m| m.last())
        .and_then(|m| m["content"].as_str())
        .unwrap_or_default()
        .to_string();
    *backend.last_chat.lock().unwrap() = Some(body);

    match text.as_str() {
        "fail please" => {
            return (StatusCode::INTERNAL_SERVER_ERROR, "model unavailable").into_response();
        }
        "slow please" => return slow_stream(),
        "break please" => return broken_stream(),
        _ => {}
    }

    let reads: Vec<Result<&'static str, std::io::Error>> = vec![
        Ok("data: {\"content\":\"Hel\"}\n"),
        Ok("data: {not-json}\ndata: {\"con"),
        Ok("tent\":\"lo\"}\n"),
        Ok("data: [DONE]\n"),
    ];
    Response::builder()
        .header("content-type", "text/event-stream")
        .body(Body::from_stream(futures::stream::iter(reads)))
        .unwrap()
}

/// Four lines spaced 200ms apart
fn slow_stream() -> Response {
    let lines = vec![
        "data: {\"content\":\"a\"}\n",
        "data: {\"content\":\"b\"}\n",
        "data: {\"content\":\"c\"}\n",
        "data: [DONE]\n",
    ];
    let reads = futures::stream::iter(lines).then(|line| async move {
        tokio::time::sleep(Duration::from_millis(200)).await;
        Ok::<_, std::io::Error>(line)
    });
    event_stream(Body::from_stream(reads))
}

/// One content line, then the connection drops
fn broken_stream() -> Response {
    let reads = futures::stream::iter(vec![
        Ok("data: {\"content\":\"Partial\"}\n"),
        Err(std::io::Error::new(std::io::ErrorKind::ConnectionReset, "backend crashed")),
    ])
    .then(|read| async move {
        if read.is_err() {
            tokio::time::sleep(Duration::from_millis(100)).await;
        }
        read
    });
    event_stream(Body::from_stream(reads))
}

fn event_stream(body: Body) -> Response {
    Response::builder()
        .header("content-type", "text/event-stream")
        .body(body)
        .unwrap()
}

async fn agents() -> Json<Value> {
    Json(json!({ "ok": true, "agents": [{ "id": 3, "name": "Researcher", "defaultModel": "gpt-4o" }] }))
}

async fn create_agent(Json(body): Json<Value>) -> Json<Value> {
    Json(json!({
        "ok": true,
        "agent": {
            "id": 4,
            "name": body["name"],
            "description": body["description"],
            "defaultModel": body["defaultModel"]
        }
    }))
}

async fn runs() -> Json<Value> {
    Json(json!({
        "ok": true,
        "runs": [
            { "id": 17, "agentId": 3, "status": "succeeded", "goal": "research" },
            { "id": "18", "status": "running", "goal": "follow up" }
        ]
    }))
}

async fn project_chats(Path(id): Path<String>) -> Response {
    if id == "locked" {
        return (StatusCode::FORBIDDEN, "not your project").into_response();
    }
    Json(json!({ "ok": true, "chats": [{ "id": 5, "title": "Chat 1", "project_id": id }] }))
        .into_response()
}

async fn projects() -> Json<Value> {
    Json(json!({ "ok": true, "projects": [{ "id": 1, "name": "Research" }] }))
}

async fn create_project(Json(body): Json<Value>) -> Json<Value> {
    Json(json!({ "ok": true, "project": { "id": 2, "name": body["name"] } }))
}

async fn create_chat(Json(body): Json<Value>) -> Json<Value> {
    Json(json!({
        "ok": true,
        "chat": { "id": 5, "title": body["title"], "model": body["model"], "project_id": body["projectId"] }
    }))
}

async fn messages(Path(id): Path<String>) -> Json<Value> {
    if id == "missing" {
        return Json(json!({ "ok": false, "error": "chat not found" }));
    }
    Json(json!({
        "ok": true,
        "messages": [
            { "role": "user", "content": "hi" },
            { "role": "assistant", "content": "hello" }
        ]
    }))
}

async fn me() -> Json<Value> {
    Json(json!({ "ok": true, "user": { "plan": "pro" } }))
}

async fn spawn_backend(backend: Backend) -> String {
    let app = Router::new()
        .route("/api/agent/run", post(agent_run))
        .route("/api/agents", get(agents).post(create_agent))
        .route("/api/agents/{id}/run", post(start_agent))
        .route("/api/agent-runs", get(runs))
        .route("/api/agent-runs/{id}", get(run_status))
        .route("/api/ai-portal/chat/send", post(chat_send))
        .route("/api/ai-portal/projects", get(projects).post(create_project))
        .route("/api/ai-portal/projects/{id}/chats", get(project_chats))
        .route("/api/ai-portal/chats", post(create_chat))
        .route("/api/ai-portal/chats/{id}/messages", get(messages))
        .route("/api/ai-portal/me", get(me))
        .with_state(backend);

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{}", addr)
}

async fn config_for(backend: &Backend) -> PortalConfig {
    let base = spawn_backend(backend.clone()).await;
    PortalConfig::new(&base)
        .unwrap()
        .with_credentials(Credentials::bearer("test-token"))
        .with_poll_interval(Duration::from_millis(10))
}

async fn client_for(backend: &Backend) -> PortalClient {
    PortalClient::new(config_for(backend).await).unwrap()
}

// ============================================================================
// Graph runs
// ============================================================================

#[tokio::test]
async fn test_graph_run_offers_summary_download() {
    let backend = Backend::default();
    let client = client_for(&backend).await;

    let receipt = client
        .submit_graph(&RunRequest::new("test", Graph::new()))
        .await
        .unwrap();

    let artifact = receipt.summary_artifact().unwrap();
    assert_eq!(artifact.file_name, "agent-run-abc.md");

    let dir = tempfile::tempdir().unwrap();
    let path = artifact.write_to(dir.path()).unwrap();
    assert_eq!(std::fs::read_to_string(path).unwrap(), "# Report");

    let sent = backend.last_run.lock().unwrap().clone().unwrap();
    assert_eq!(sent, json!({ "goal": "test", "graph": { "nodes": [], "edges": [] } }));
    assert_eq!(
        backend.last_auth.lock().unwrap().as_deref(),
        Some("Bearer test-token")
    );
}

#[tokio::test]
async fn test_graph_run_transmits_placeholders_verbatim() {
    let backend = Backend::default();
    let client = client_for(&backend).await;
    let editor = GraphEditor::starter();

    client
        .submit_graph(&RunRequest::new("research", editor.serialize()))
        .await
        .unwrap();

    let sent = backend.last_run.lock().unwrap().clone().unwrap();
    let nodes = sent["graph"]["nodes"].as_array().unwrap();
    assert_eq!(nodes.len(), 3);
    assert_eq!(
        nodes[2]["data"]["input"]["prompt"],
        "Analyze findings: {{step:search.response.results[0].snippet}}"
    );
    assert_eq!(sent["graph"]["edges"][0]["source"], "plan");
}

#[tokio::test]
async fn test_graph_run_server_error() {
    let backend = Backend::default();
    let client = client_for(&backend).await;

    let result = client
        .submit_graph(&RunRequest::new("explode", Graph::new()))
        .await;
    match result {
        Err(PortalError::Status { status, body, .. }) => {
            assert_eq!(status, 500);
            assert_eq!(body, "executor down");
        }
        other => panic!("expected status error, got {:?}", other),
    }
}

#[tokio::test]
async fn test_unreachable_backend_is_transport_error() {
    let config = PortalConfig::new("http://127.0.0.1:9").unwrap();
    let client = PortalClient::new(config).unwrap();

    let result = client
        .submit_graph(&RunRequest::new("test", Graph::new()))
        .await;
    assert!(matches!(result, Err(PortalError::Http(_))));
}

// ============================================================================
// Agent runs
// ============================================================================

#[tokio::test]
async fn test_agent_run_is_polled_to_completion() {
    let backend = Backend::default();
    let client = client_for(&backend).await;
    let interval = client.config().poll_interval;

    let run_id = client.start_agent_run("a1", "research").await.unwrap();
    assert_eq!(run_id, "17");

    let watcher = RunWatcher::new(Arc::new(client), interval);
    let (tx, mut rx) = mpsc::channel(16);
    let run = watcher.watch(&run_id, Some(tx)).await.unwrap();

    assert_eq!(run.status, RunStatus::Succeeded);
    assert_eq!(backend.polls.load(Ordering::SeqCst), 3);

    let mut statuses = Vec::new();
    while let Some(run) = rx.recv().await {
        statuses.push(run.status);
    }
    assert_eq!(
        statuses,
        vec![RunStatus::Queued, RunStatus::Running, RunStatus::Succeeded]
    );
}

#[tokio::test]
async fn test_agent_run_plan_gated() {
    let backend = Backend::default();
    let client = client_for(&backend).await;

    match client.start_agent_run("gated", "research").await {
        Err(PortalError::PlanRequired(message)) => assert_eq!(message, PLAN_REQUIRED_MESSAGE),
        other => panic!("expected plan error, got {:?}", other),
    }
}

#[tokio::test]
async fn test_agent_run_blank_goal_not_sent() {
    let backend = Backend::default();
    let client = client_for(&backend).await;

    let result = client.start_agent_run("a1", "   ").await;
    assert!(matches!(result, Err(PortalError::InvalidInput(_))));
}

#[tokio::test]
async fn test_agents_list_and_create() {
    let backend = Backend::default();
    let client = client_for(&backend).await;

    let agents = client.list_agents().await.unwrap();
    assert_eq!(agents.len(), 1);
    assert_eq!(agents[0].id, "3");
    assert_eq!(agents[0].default_model.as_deref(), Some("gpt-4o"));

    let agent = client
        .create_agent("Analyst", "Reads papers", "openai:gpt-4o")
        .await
        .unwrap();
    assert_eq!(agent.id, "4");
    assert_eq!(agent.name, "Analyst");
    assert_eq!(agent.default_model.as_deref(), Some("openai:gpt-4o"));
}

#[tokio::test]
async fn test_create_agent_blank_name_not_sent() {
    let backend = Backend::default();
    let client = client_for(&backend).await;

    let result = client.create_agent("  ", "", "gpt-4o").await;
    assert!(matches!(result, Err(PortalError::InvalidInput(_))));
}

#[tokio::test]
async fn test_list_runs() {
    let backend = Backend::default();
    let client = client_for(&backend).await;

    let runs = client.list_runs().await.unwrap();
    assert_eq!(runs.len(), 2);
    assert_eq!(runs[0].id, "17");
    assert_eq!(runs[0].agent_id.as_deref(), Some("3"));
    assert_eq!(runs[0].status, RunStatus::Succeeded);
    assert_eq!(runs[1].status, RunStatus::Running);
}

#[tokio::test]
async fn test_unreported_run_is_none() {
    let backend = Backend::default();
    let client = client_for(&backend).await;

    assert!(client.fetch_run("gone").await.unwrap().is_none());
}

#[tokio::test]
async fn test_run_id_is_percent_encoded() {
    let backend = Backend::default();
    let client = client_for(&backend).await;

    let run = client.fetch_run("run/7 x").await.unwrap().unwrap();
    assert_eq!(run.id, "run/7 x");
    assert_eq!(backend.polls.load(Ordering::SeqCst), 1);
}

// ============================================================================
// Chat streaming
// ============================================================================

#[tokio::test]
async fn test_chat_streams_reply_into_session() {
    let backend = Backend::default();
    let client = client_for(&backend).await;
    let mut session = ChatSession::new("openai:gpt-4o");
    session.set_chat_id("5");

    let (tx, mut rx) = mpsc::channel(64);
    let reply = client
        .send_chat(&mut session, "Say hello", Some(&tx))
        .await
        .unwrap();
    drop(tx);

    assert_eq!(reply, "Hello");
    assert_eq!(session.state(), TurnState::Done);
    let last = session.last_message().unwrap();
    assert_eq!(last.content, "Hello");
    assert!(!last.streaming);

    let mut events = Vec::new();
    while let Some(event) = rx.recv().await {
        events.push(event);
    }
    assert_eq!(events.first(), Some(&ChatEvent::Started));
    assert_eq!(events.last(), Some(&ChatEvent::Done));
    assert!(events.contains(&ChatEvent::Content("Hello".to_string())));

    let sent = backend.last_chat.lock().unwrap().clone().unwrap();
    assert_eq!(sent["chatId"], "5");
    assert_eq!(sent["model"], "openai:gpt-4o");
    assert_eq!(sent["messages"].as_array().unwrap().len(), 2);
    assert_eq!(sent["messages"][1]["content"], "Say hello");
}

#[tokio::test]
async fn test_chat_failure_appends_apology() {
    let backend = Backend::default();
    let client = client_for(&backend).await;
    let mut session = ChatSession::new("openai:gpt-4o");

    let result = client.send_chat(&mut session, "fail please", None).await;

    assert!(matches!(result, Err(PortalError::Status { status: 500, .. })));
    assert_eq!(session.state(), TurnState::Failed);
    assert!(!session.is_loading());
    assert_eq!(session.messages().len(), 3);
    assert_eq!(session.last_message().unwrap().content, APOLOGY);
}

#[tokio::test]
async fn test_slow_stream_outlives_request_timeout() {
    let backend = Backend::default();
    let config = config_for(&backend)
        .await
        .with_request_timeout(Duration::from_millis(300));
    let client = PortalClient::new(config).unwrap();
    let mut session = ChatSession::new("openai:gpt-4o");

    let reply = client
        .send_chat(&mut session, "slow please", None)
        .await
        .unwrap();

    assert_eq!(reply, "abc");
    assert_eq!(session.state(), TurnState::Done);
}

#[tokio::test]
async fn test_chat_broken_mid_stream_keeps_partial_reply() {
    let backend = Backend::default();
    let client = client_for(&backend).await;
    let mut session = ChatSession::new("openai:gpt-4o");

    let result = client.send_chat(&mut session, "break please", None).await;

    assert!(matches!(result, Err(PortalError::Http(_))));
    assert_eq!(session.state(), TurnState::Failed);

    let messages = session.messages();
    assert_eq!(messages.len(), 4);
    let partial = &messages[2];
    assert_eq!(partial.content, "Partial");
    assert!(!partial.streaming);
    assert_eq!(messages[3].content, APOLOGY);
}

// ============================================================================
// Portal CRUD
// ============================================================================

#[tokio::test]
async fn test_projects_chats_and_messages() {
    let backend = Backend::default();
    let client = client_for(&backend).await;

    let projects = client.list_projects().await.unwrap();
    assert_eq!(projects.len(), 1);
    assert_eq!(projects[0].id, "1");

    let project = client.create_project("Project 2", "New AI project").await.unwrap();
    assert_eq!(project.name, "Project 2");

    let chat = client
        .create_chat(&project.id, "Chat 1", "openai:gpt-4o")
        .await
        .unwrap();
    assert_eq!(chat.id, "5");
    assert_eq!(chat.project_id.as_deref(), Some("2"));

    let history = client.list_messages(&chat.id).await.unwrap();
    assert_eq!(history.len(), 2);
    assert_eq!(history[1].content, "hello");
}

#[tokio::test]
async fn test_rejected_envelope() {
    let backend = Backend::default();
    let client = client_for(&backend).await;

    match client.list_messages("missing").await {
        Err(PortalError::Rejected { message, .. }) => assert_eq!(message, "chat not found"),
        other => panic!("expected rejection, got {:?}", other),
    }
}

#[tokio::test]
async fn test_forbidden_crud_stays_status_error() {
    let backend = Backend::default();
    let client = client_for(&backend).await;

    match client.list_chats("locked").await {
        Err(PortalError::Status { status, body, .. }) => {
            assert_eq!(status, 403);
            assert_eq!(body, "not your project");
        }
        other => panic!("expected status error, got {:?}", other),
    }

    let chats = client.list_chats("2").await.unwrap();
    assert_eq!(chats[0].project_id.as_deref(), Some("2"));
}

#[tokio::test]
async fn test_current_plan() {
    let backend = Backend::default();
    let client = client_for(&backend).await;

    assert_eq!(client.current_plan().await.unwrap(), Plan::Pro);
}
