//! HTTP surface tests against an in-process server.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::http::StatusCode;
use axum_test::TestServer;
use serde_json::{Value, json};
use signal_router::AppState;
use signal_router::config::{
    AppConfig, LogConfig, LogFormat, ProviderEnv, ProviderEnvSource, RouterConfig, ServerConfig,
};
use signal_router::llm::transport::{InboundResponse, OutboundRequest, TransportError};
use signal_router::llm::{HttpTransport, ProviderRouter, RateLimitTracker};
use signal_router::server::build_router;

/// Answers every request with the same response.
#[derive(Debug)]
struct FixedTransport {
    status: u16,
    body: String,
    seen: Mutex<Vec<OutboundRequest>>,
}

impl FixedTransport {
    fn new(status: u16, body: &Value) -> Arc<Self> {
        Arc::new(Self {
            status,
            body: body.to_string(),
            seen: Mutex::new(Vec::new()),
        })
    }
}

#[async_trait]
impl HttpTransport for FixedTransport {
    async fn send(&self, request: OutboundRequest) -> Result<InboundResponse, TransportError> {
        self.seen.lock().unwrap().push(request);
        Ok(InboundResponse {
            status: self.status,
            body: self.body.clone(),
        })
    }
}

fn config(max_body_bytes: usize) -> Arc<AppConfig> {
    Arc::new(AppConfig {
        server: ServerConfig {
            host: "127.0.0.1".to_string(),
            port: 0,
            max_body_bytes,
        },
        router: RouterConfig {
            request_timeout_secs: 5,
        },
        log: LogConfig {
            format: LogFormat::Compact,
        },
    })
}

fn server_with(transport: Arc<FixedTransport>, env: ProviderEnv, max_body_bytes: usize) -> TestServer {
    let state = AppState {
        router: ProviderRouter::new(transport, Arc::new(RateLimitTracker::new())),
        env_source: ProviderEnvSource::Fixed(env),
        config: config(max_body_bytes),
    };
    TestServer::new(build_router(state)).expect("test server starts")
}

fn groq_env() -> ProviderEnv {
    ProviderEnv::default().with("GROQ_API_KEY", "gk")
}

fn groq_answer() -> Value {
    json!({"choices": [{"message": {"content": r#"{"name":"Bulk export","ui":["Export button"],"confidence":64}"#}}]})
}

#[tokio::test]
async fn test_health() {
    let server = server_with(FixedTransport::new(200, &json!({})), ProviderEnv::default(), 1024);
    let response = server.get("/health").await;
    response.assert_status_ok();
    response.assert_json(&json!({"ok": true, "service": "signal-router"}));
}

#[tokio::test]
async fn test_router_status_lists_configured_providers() {
    let env = groq_env()
        .with("CLOUDFLARE_API_KEY", "cf")
        .with("CLOUDFLARE_MODEL", "@cf/qwen/qwen1.5-14b-chat-awq");
    // Cloudflare lacks an account id, so only groq is configured.
    let server = server_with(FixedTransport::new(200, &json!({})), env, 1024);

    let body: Value = server.get("/api/router/status").await.json();
    assert_eq!(
        body,
        json!({
            "ok": true,
            "configuredProviders": [
                {"name": "groq", "model": "llama-3.3-70b-versatile", "type": "openai-chat"}
            ]
        })
    );
}

#[tokio::test]
async fn test_recommend_success() {
    let transport = FixedTransport::new(200, &groq_answer());
    let server = server_with(Arc::clone(&transport), groq_env(), 64 * 1024);

    let response = server
        .post("/api/recommend")
        .json(&json!({
            "question": "What should we build for exports?",
            "mode": "FAST",
            "signals": [
                "Interview: export to CSV times out",
                "  ",
                "Usage: export errors up 40%",
                "exports.csv: 120 failed exports last week"
            ],
            "history": [{"topName": "Saved filters", "timestamp": "2024-04-02"}]
        }))
        .await;
    response.assert_status_ok();

    let body: Value = response.json();
    assert_eq!(body["ok"], true);
    assert_eq!(body["provider"], "groq");
    assert_eq!(body["model"], "llama-3.3-70b-versatile");
    assert_eq!(body["mode"], "fast");
    assert_eq!(body["recommendation"]["name"], "Bulk export");
    assert_eq!(body["recommendation"]["confidence"], 64);
    assert!(body["recommendation"]["score"].is_null());
    assert_eq!(body["context"]["signalCount"], 3);
    assert_eq!(
        body["context"]["sourceBreakdown"],
        json!({"interview": 1, "usage": 1, "market": 0, "upload": 1, "other": 0})
    );
    assert!(
        body["context"]["themes"]
            .as_array()
            .is_some_and(|t| t.iter().any(|v| v == "export"))
    );

    let seen = transport.seen.lock().unwrap();
    let prompt = seen[0].body["messages"][1]["content"].as_str().unwrap_or_default();
    assert!(prompt.contains("Question: What should we build for exports?"));
    assert!(prompt.contains("1. Saved filters (2024-04-02)"));
}

#[tokio::test]
async fn test_recommend_rejects_invalid_json() {
    let server = server_with(FixedTransport::new(200, &groq_answer()), groq_env(), 1024);
    let response = server.post("/api/recommend").text("{not json").await;
    response.assert_status(StatusCode::BAD_REQUEST);
    let body: Value = response.json();
    assert_eq!(body["ok"], false);
    assert!(
        body["error"]
            .as_str()
            .is_some_and(|e| e.starts_with("Invalid JSON payload: "))
    );
}

#[tokio::test]
async fn test_recommend_rejects_oversized_body() {
    let server = server_with(FixedTransport::new(200, &groq_answer()), groq_env(), 64);
    let signals: Vec<String> = (0..20).map(|i| format!("Usage: line {i}")).collect();
    let response = server
        .post("/api/recommend")
        .json(&json!({ "signals": signals }))
        .await;
    response.assert_status(StatusCode::BAD_REQUEST);
    let body: Value = response.json();
    assert!(
        body["error"]
            .as_str()
            .is_some_and(|e| e.starts_with("Invalid JSON payload: "))
    );
}

#[tokio::test]
async fn test_recommend_requires_a_signal() {
    let server = server_with(FixedTransport::new(200, &groq_answer()), groq_env(), 1024);
    for payload in [json!({"signals": ["  ", ""]}), json!({"signals": "text"}), json!({})] {
        let response = server.post("/api/recommend").json(&payload).await;
        response.assert_status(StatusCode::BAD_REQUEST);
        response.assert_json(&json!({
            "ok": false,
            "error": "At least one signal line is required."
        }));
    }
}

#[tokio::test]
async fn test_recommend_without_providers_is_503() {
    let server = server_with(
        FixedTransport::new(200, &groq_answer()),
        ProviderEnv::default(),
        1024,
    );
    let response = server
        .post("/api/recommend")
        .json(&json!({"signals": ["Usage: churn up"]}))
        .await;
    response.assert_status(StatusCode::SERVICE_UNAVAILABLE);
    response.assert_json(&json!({
        "ok": false,
        "code": "NO_PROVIDER_CONFIGURED",
        "error": "No configured providers found. Set API keys in environment variables."
    }));
}

#[tokio::test]
async fn test_recommend_all_failed_is_502() {
    let server = server_with(
        FixedTransport::new(500, &json!({"error": "boom"})),
        groq_env(),
        1024,
    );
    let response = server
        .post("/api/recommend")
        .json(&json!({"signals": ["Usage: churn up"]}))
        .await;
    response.assert_status(StatusCode::BAD_GATEWAY);
    response.assert_json(&json!({
        "ok": false,
        "code": "ALL_PROVIDERS_FAILED",
        "error": "All providers failed. [groq] 500 - \"boom\""
    }));
}
