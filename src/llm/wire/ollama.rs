//! Ollama `/api/chat`, non-streaming.

use serde_json::{Value, json};

use super::{TEMPERATURE, chat_messages};
use crate::context::RecommendationContext;
use crate::llm::registry::ProviderRuntime;
use crate::llm::transport::OutboundRequest;

pub fn build_request(runtime: &ProviderRuntime, context: &RecommendationContext) -> OutboundRequest {
    let body = json!({
        "model": runtime.model,
        "stream": false,
        "messages": chat_messages(context),
        "options": { "temperature": TEMPERATURE },
    });
    let request = OutboundRequest::post_json(&runtime.endpoint, body);
    // Local servers usually run without auth.
    if runtime.api_key.is_empty() {
        request
    } else {
        request.bearer(&runtime.api_key)
    }
}

/// Text at `message.content`.
pub fn extract_text(body: &Value) -> Option<String> {
    body.pointer("/message/content")
        .and_then(Value::as_str)
        .map(ToString::to_string)
}
