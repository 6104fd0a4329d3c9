// End-to-end pipeline scenarios against a scripted gateway.
//
// The mock gateway records every request body and answers each step with
// canned `data: {"text": ...}` frames, so the tests can assert both the
// step sequence and the exact wire traffic.

use axum::{
    Json, Router,
    extract::State,
    http::{StatusCode, header},
    response::IntoResponse,
    routing::post,
};
use serde_json::{Value, json};
use sqlx::SqlitePool;
use std::sync::{Arc, Mutex};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use mentor::controller::ChatController;
use mentor::gateway::{Gateway, HttpGateway};
use mentor::message::ChatEvent;
use mentor::pipeline::Session;
use mentor::store::{self, history::HistoryStore};

const USER: &str = "learner@example.com";

#[derive(Clone)]
struct GatewayScript {
    analysis_reply: Arc<Mutex<String>>,
    calls: Arc<Mutex<Vec<Value>>>,
}

impl GatewayScript {
    fn steps(&self) -> Vec<String> {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .map(|body| body["stepType"].as_str().unwrap_or("?").to_string())
            .collect()
    }

    fn last_body_for(&self, step: &str) -> Option<Value> {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .rev()
            .find(|body| body["stepType"] == step)
            .cloned()
    }
}

fn frames(parts: &[&str]) -> String {
    parts
        .iter()
        .map(|part| format!("data: {}\n\n", json!({ "text": part })))
        .collect()
}

async fn gateway_handler(
    State(script): State<GatewayScript>,
    Json(body): Json<Value>,
) -> impl IntoResponse {
    script.calls.lock().unwrap().push(body.clone());

    let sse = match body["stepType"].as_str().unwrap_or("") {
        "recommendation_check" => {
            let message = body["message"].as_str().unwrap_or("");
            let verdict = if message.to_ascii_lowercase().contains("learn") {
                "true"
            } else {
                "false"
            };
            frames(&[verdict])
        }
        "content_analysis" => {
            let reply = script.analysis_reply.lock().unwrap().clone();
            frames(&[reply.as_str()])
        }
        "final_response" => {
            let selected = &body["selectedContent"][0];
            let name = selected["title"]
                .as_str()
                .or_else(|| selected["name"].as_str())
                .unwrap_or("that resource")
                .to_string();
            let text = format!("You should explore {name} to get started.");
            frames(&[text.as_str()])
        }
        _ => frames(&["Hel", "lo wor", "ld"]),
    };

    ([(header::CONTENT_TYPE, "text/event-stream")], sse)
}

async fn spawn_gateway(analysis_reply: &str) -> (String, GatewayScript) {
    let script = GatewayScript {
        analysis_reply: Arc::new(Mutex::new(analysis_reply.to_string())),
        calls: Arc::new(Mutex::new(Vec::new())),
    };
    let app = Router::new()
        .route("/", post(gateway_handler))
        .with_state(script.clone());

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    (format!("http://{addr}"), script)
}

async fn test_pool() -> SqlitePool {
    let pool = store::connect("sqlite::memory:", 1).await.unwrap();
    store::init_schema(&pool).await.unwrap();
    pool
}

async fn seed_prompt(pool: &SqlitePool) {
    sqlx::query(
        "INSERT INTO prompts (id, title, description, prompt_text, status) \
         VALUES ('p1', 'Prompt Engineering Basics', 'Core prompting patterns', \
                 'You are a helpful tutor...', 'published')",
    )
    .execute(pool)
    .await
    .unwrap();
}

fn controller(pool: SqlitePool, url: &str) -> ChatController {
    let gateway: Arc<dyn Gateway> = Arc::new(HttpGateway::new(url, "").unwrap());
    ChatController::new(gateway, pool, Session::new(USER))
}

async fn send(ctrl: &mut ChatController, message: &str) -> Vec<ChatEvent> {
    let (tx, mut rx) = mpsc::channel(256);
    ctrl.send_message(message, tx, CancellationToken::new())
        .await
        .unwrap();

    let mut events = Vec::new();
    while let Ok(event) = rx.try_recv() {
        events.push(event);
    }
    events
}

fn accumulated(events: &[ChatEvent]) -> String {
    events
        .iter()
        .filter_map(|e| match e {
            ChatEvent::Fragment(text) => Some(text.as_str()),
            _ => None,
        })
        .collect()
}

fn completed(events: &[ChatEvent]) -> Option<&mentor::message::ChatMessage> {
    events.iter().find_map(|e| match e {
        ChatEvent::Completed(message) => Some(message),
        _ => None,
    })
}

#[tokio::test]
async fn recommendation_scenario_end_to_end() {
    let pool = test_pool().await;
    seed_prompt(&pool).await;
    let (url, script) = spawn_gateway(r#"[{"type":"prompts","id":"p1"}]"#).await;
    let mut ctrl = controller(pool.clone(), &url);
    ctrl.load_history().await;

    let events = send(&mut ctrl, "How can I learn about AI prompting?").await;

    assert_eq!(
        script.steps(),
        vec!["recommendation_check", "content_analysis", "final_response"]
    );

    // The catalog projection went out with the analysis request
    let analysis = script.last_body_for("content_analysis").unwrap();
    let catalog = analysis["contentData"].as_array().unwrap();
    assert_eq!(catalog.len(), 1);
    assert_eq!(catalog[0]["name"], "Prompt Engineering Basics");
    assert_eq!(catalog[0]["type"], "prompt");
    assert_eq!(analysis["userEmail"], USER);

    // Live render == completed message, and it references the item
    let reply = completed(&events).unwrap();
    assert_eq!(accumulated(&events), reply.content);
    assert!(reply.content.contains("Prompt Engineering Basics"));
    assert_eq!(reply.recommended_content.as_ref().unwrap().len(), 1);

    // Last two conversation entries are this turn
    let conversation = ctrl.conversation();
    let n = conversation.len();
    assert_eq!(
        conversation[n - 2].content,
        "How can I learn about AI prompting?"
    );
    assert_eq!(conversation[n - 1].content, reply.content);

    // Reloading from the store yields the same text
    let stored = HistoryStore::new(pool).load(USER).await.unwrap();
    assert_eq!(stored.len(), 2);
    assert_eq!(stored[1].content, reply.content);
}

#[tokio::test]
async fn direct_scenario_skips_recommendation_steps() {
    let pool = test_pool().await;
    seed_prompt(&pool).await;
    let (url, script) = spawn_gateway("[]").await;
    let mut ctrl = controller(pool, &url);
    ctrl.load_history().await;

    let events = send(&mut ctrl, "What is 2+2?").await;

    // No catalog fetch, no content_analysis call
    assert_eq!(script.steps(), vec!["recommendation_check", "general_chat"]);

    let reply = completed(&events).unwrap();
    assert_eq!(reply.content, "Hello world");
    assert_eq!(accumulated(&events), "Hello world");
    assert!(reply.recommended_content.is_none());
}

#[tokio::test]
async fn malformed_recommendation_degrades_to_direct_mode() {
    let pool = test_pool().await;
    seed_prompt(&pool).await;
    let (url, script) = spawn_gateway("Here are some great picks for you!").await;
    let mut ctrl = controller(pool, &url);
    ctrl.load_history().await;

    let events = send(&mut ctrl, "What should I learn next?").await;

    assert_eq!(
        script.steps(),
        vec!["recommendation_check", "content_analysis", "general_chat"]
    );
    assert!(!events.iter().any(|e| matches!(e, ChatEvent::Error { .. })));

    let reply = completed(&events).unwrap();
    assert_eq!(reply.content, "Hello world");
    assert!(reply.recommended_content.is_none());
}

#[tokio::test]
async fn direct_mode_carries_conversation_context() {
    let pool = test_pool().await;
    let (url, script) = spawn_gateway("[]").await;
    let mut ctrl = controller(pool, &url);
    ctrl.load_history().await;

    send(&mut ctrl, "What is 2+2?").await;
    send(&mut ctrl, "Why is that?").await;

    let body = script.last_body_for("general_chat").unwrap();
    let prompt = body["message"].as_str().unwrap();
    assert!(prompt.contains("Student: What is 2+2?"));
    assert!(prompt.contains("AI Tutor: Hello world"));
    assert!(prompt.ends_with("Student: Why is that?"));
}

#[tokio::test]
async fn gateway_failure_surfaces_synthetic_reply() {
    async fn failing() -> impl IntoResponse {
        (StatusCode::INTERNAL_SERVER_ERROR, "boom")
    }

    let pool = test_pool().await;
    let app = Router::new().route("/", post(failing));
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    let mut ctrl = controller(pool.clone(), &format!("http://{addr}"));
    ctrl.load_history().await;

    let events = send(&mut ctrl, "hello").await;
    assert!(events.iter().any(|e| matches!(
        e,
        ChatEvent::Error { message } if message.starts_with("Sorry, I encountered an error")
    )));

    // Only the user turn made it to durable history
    assert_eq!(HistoryStore::new(pool).count(USER).await.unwrap(), 1);
}

#[tokio::test]
async fn empty_stream_completes_with_empty_text() {
    async fn silent() -> impl IntoResponse {
        ([(header::CONTENT_TYPE, "text/event-stream")], String::new())
    }

    let pool = test_pool().await;
    let app = Router::new().route("/", post(silent));
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    let mut ctrl = controller(pool, &format!("http://{addr}"));
    ctrl.load_history().await;

    // Zero fragments is done-with-no-output, not a failure
    let events = send(&mut ctrl, "hello").await;
    assert!(!events.iter().any(|e| matches!(e, ChatEvent::Error { .. })));
    let reply = completed(&events).unwrap();
    assert_eq!(reply.content, "");
}

#[tokio::test]
async fn round_trip_survives_process_restart() {
    let dir = tempfile::tempdir().unwrap();
    let db_url = format!("sqlite:{}/mentor.db", dir.path().display());

    let (url, _script) = spawn_gateway("[]").await;

    {
        let pool = store::connect(&db_url, 1).await.unwrap();
        store::init_schema(&pool).await.unwrap();
        let mut ctrl = controller(pool, &url);
        ctrl.load_history().await;
        send(&mut ctrl, "What is 2+2?").await;
    }

    // Fresh pool, as a new process would open
    let pool = store::connect(&db_url, 1).await.unwrap();
    let stored = HistoryStore::new(pool.clone()).load(USER).await.unwrap();
    assert_eq!(stored.len(), 2);
    assert_eq!(stored[0].content, "What is 2+2?");
    assert_eq!(stored[1].content, "Hello world");

    // A resumed controller sees the same conversation
    let mut ctrl = controller(pool, &url);
    ctrl.load_history().await;
    assert_eq!(ctrl.conversation().len(), 2);
}
