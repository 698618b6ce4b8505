//! Cohere v2 chat.

use serde_json::{Value, json};

use super::{TEMPERATURE, chat_messages, join_text_parts};
use crate::context::RecommendationContext;
use crate::llm::registry::ProviderRuntime;
use crate::llm::transport::OutboundRequest;

pub fn build_request(runtime: &ProviderRuntime, context: &RecommendationContext) -> OutboundRequest {
    let body = json!({
        "model": runtime.model,
        "temperature": TEMPERATURE,
        "messages": chat_messages(context),
    });
    OutboundRequest::post_json(&runtime.endpoint, body).bearer(&runtime.api_key)
}

/// Top-level `text` (v1 shape) first, then `message.content[*].text` (v2).
pub fn extract_text(body: &Value) -> Option<String> {
    if let Some(text) = body.get("text").and_then(Value::as_str) {
        return Some(text.to_string());
    }
    body.pointer("/message/content")
        .and_then(Value::as_array)
        .map(|parts| join_text_parts(parts))
}
