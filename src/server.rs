use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use axum::{
    Json, Router,
    body::Bytes,
    extract::{DefaultBodyLimit, State, rejection::BytesRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use serde::Serialize;
use serde_json::{Value, json};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use crate::AppState;
use crate::config::{AppConfig, ProviderEnvSource};
use crate::context::{HistoryEntry, Mode, build_context};
use crate::llm::{
    ProviderRouter, RateLimitTracker, ReqwestTransport, RouterError, configured_providers,
};

/// Service name reported by `/health`.
pub const SERVICE_NAME: &str = "signal-router";
/// Most signal lines accepted from one request body.
pub const MAX_REQUEST_SIGNALS: usize = 300;
/// Most history entries accepted from one request body.
pub const MAX_REQUEST_HISTORY: usize = 5;

/// Start the Axum server with the provided configuration.
pub async fn start_server(config: Arc<AppConfig>) -> anyhow::Result<()> {
    let transport = ReqwestTransport::new(Duration::from_secs(config.router.request_timeout_secs))
        .context("Failed to build HTTP client")?;
    let router = ProviderRouter::new(Arc::new(transport), Arc::new(RateLimitTracker::new()));

    let state = AppState {
        router,
        env_source: ProviderEnvSource::Process,
        config: Arc::clone(&config),
    };

    for provider in configured_providers(&state.env_source.snapshot()) {
        info!(
            name: "router.provider.configured",
            provider = provider.name,
            model = %provider.model,
            family = provider.family.as_str(),
            "Provider configured"
        );
    }

    let app = build_router(state);

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;

    info!(
        name: "server.started",
        address = %addr,
        "Server started"
    );

    axum::serve(listener, app.into_make_service()).await?;
    Ok(())
}

/// Routes, CORS, tracing and the body limit, without binding a socket.
pub fn build_router(state: AppState) -> Router {
    let body_limit = state.config.server.max_body_bytes;
    Router::new()
        .route("/health", get(health))
        .route("/api/router/status", get(router_status))
        .route("/api/recommend", post(recommend))
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

// ─────────────────────────────────────────────────────────────────────────────
// Handlers
// ─────────────────────────────────────────────────────────────────────────────

/// GET /health
async fn health() -> Json<Value> {
    Json(json!({ "ok": true, "service": SERVICE_NAME }))
}

/// GET /api/router/status - Providers usable with the current environment.
async fn router_status(State(state): State<AppState>) -> Json<Value> {
    let providers = configured_providers(&state.env_source.snapshot());
    Json(json!({ "ok": true, "configuredProviders": providers }))
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ErrorBody {
    ok: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    code: Option<&'static str>,
    error: String,
}

fn error_response(status: StatusCode, code: Option<&'static str>, error: String) -> Response {
    let body = ErrorBody {
        ok: false,
        code,
        error,
    };
    (status, Json(body)).into_response()
}

impl IntoResponse for RouterError {
    fn into_response(self) -> Response {
        let status = match self {
            Self::NoProviderConfigured => StatusCode::SERVICE_UNAVAILABLE,
            Self::AllProvidersFailed { .. } => StatusCode::BAD_GATEWAY,
        };
        error_response(status, Some(self.code()), self.to_string())
    }
}

/// POST /api/recommend - Build a context and route it to a provider.
///
/// The body is parsed by hand so that malformed JSON and oversized bodies
/// both produce the same `Invalid JSON payload` error shape.
async fn recommend(State(state): State<AppState>, body: Result<Bytes, BytesRejection>) -> Response {
    let payload = match body.map_err(|e| e.body_text()).and_then(|bytes| parse_payload(&bytes)) {
        Ok(payload) => payload,
        Err(message) => {
            return error_response(
                StatusCode::BAD_REQUEST,
                None,
                format!("Invalid JSON payload: {message}"),
            );
        }
    };

    let question = payload.get("question").and_then(scalar_text).unwrap_or_default();
    let mode = payload
        .get("mode")
        .and_then(Value::as_str)
        .map(Mode::parse_lenient)
        .unwrap_or_default();
    let signals = signal_lines(payload.get("signals"));
    let history = history_entries(payload.get("history"));

    if signals.is_empty() {
        return error_response(
            StatusCode::BAD_REQUEST,
            None,
            "At least one signal line is required.".to_string(),
        );
    }

    let request_id = uuid::Uuid::new_v4();
    let context = build_context(&question, mode, &signals, &history);
    info!(
        name: "recommend.received",
        request_id = %request_id,
        mode = %mode,
        signals = context.signals.len(),
        themes = ?context.themes,
        "Recommendation requested"
    );

    let env = state.env_source.snapshot();
    match state.router.route(mode, &context, &env).await {
        Ok(routed) => Json(json!({
            "ok": true,
            "provider": routed.provider,
            "model": routed.model,
            "mode": routed.mode,
            "recommendation": routed.recommendation,
            "context": {
                "signalCount": context.signals.len(),
                "themes": context.themes,
                "sourceBreakdown": context.source_breakdown,
            },
        }))
        .into_response(),
        Err(err) => {
            warn!(
                name: "recommend.failed",
                request_id = %request_id,
                code = err.code(),
                error = %err,
                "Recommendation failed"
            );
            err.into_response()
        }
    }
}

/// An empty body is an empty object; anything else must be valid JSON.
fn parse_payload(bytes: &[u8]) -> Result<Value, String> {
    let text = std::str::from_utf8(bytes).map_err(|e| e.to_string())?.trim();
    if text.is_empty() {
        return Ok(Value::Object(serde_json::Map::new()));
    }
    serde_json::from_str(text).map_err(|e| e.to_string())
}

/// Strings as-is, numbers and booleans in their JSON form.
fn scalar_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

/// Trimmed, non-blank lines from a `signals` array, capped per request.
/// Anything other than an array yields no lines.
fn signal_lines(value: Option<&Value>) -> Vec<String> {
    let Some(Value::Array(items)) = value else {
        return Vec::new();
    };
    items
        .iter()
        .filter_map(|item| match item {
            Value::Null => None,
            Value::Object(_) | Value::Array(_) => Some(item.to_string()),
            other => scalar_text(other),
        })
        .map(|line| line.trim().to_string())
        .filter(|line| !line.is_empty())
        .take(MAX_REQUEST_SIGNALS)
        .collect()
}

fn history_entries(value: Option<&Value>) -> Vec<HistoryEntry> {
    let Some(Value::Array(items)) = value else {
        return Vec::new();
    };
    items
        .iter()
        .take(MAX_REQUEST_HISTORY)
        .map(|item| HistoryEntry {
            top_name: item.get("topName").and_then(scalar_text),
            timestamp: item.get("timestamp").and_then(scalar_text),
        })
        .collect()
}
