//! `OpenAI`-compatible Chat Completions (Groq, Mistral, Cerebras, NVIDIA NIM,
//! Codestral, `OpenAI` itself).

use serde_json::{Value, json};

use super::{MAX_OUTPUT_TOKENS, TEMPERATURE, chat_messages};
use crate::context::RecommendationContext;
use crate::llm::registry::ProviderRuntime;
use crate::llm::transport::OutboundRequest;

pub fn build_request(runtime: &ProviderRuntime, context: &RecommendationContext) -> OutboundRequest {
    let body = json!({
        "model": runtime.model,
        "temperature": TEMPERATURE,
        "max_tokens": MAX_OUTPUT_TOKENS,
        "messages": chat_messages(context),
    });
    OutboundRequest::post_json(&runtime.endpoint, body).bearer(&runtime.api_key)
}

/// Text at `choices[0].message.content`.
pub fn extract_text(body: &Value) -> Option<String> {
    body.pointer("/choices/0/message/content")
        .and_then(Value::as_str)
        .map(ToString::to_string)
}
