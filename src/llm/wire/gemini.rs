//! Google Gemini `generateContent`.
//!
//! This integration sends no separate system role: system and user prompts
//! travel together as a single user turn, and the key goes in the query
//! string.

use serde_json::{Value, json};
use url::Url;

use super::{MAX_OUTPUT_TOKENS, TEMPERATURE, combined_prompt, join_text_parts};
use crate::context::RecommendationContext;
use crate::llm::error::ProviderError;
use crate::llm::registry::ProviderRuntime;
use crate::llm::transport::OutboundRequest;

/// `{endpoint}/{model}:generateContent?key={api_key}`
pub fn request_url(runtime: &ProviderRuntime) -> Result<Url, ProviderError> {
    let mut url =
        Url::parse(&runtime.endpoint).map_err(|e| ProviderError::InvalidEndpoint(e.to_string()))?;
    url.path_segments_mut()
        .map_err(|()| ProviderError::InvalidEndpoint(runtime.endpoint.clone()))?
        .pop_if_empty()
        .push(&format!("{}:generateContent", runtime.model));
    url.query_pairs_mut().append_pair("key", &runtime.api_key);
    Ok(url)
}

pub fn build_request(
    runtime: &ProviderRuntime,
    context: &RecommendationContext,
) -> Result<OutboundRequest, ProviderError> {
    let body = json!({
        "contents": [{
            "role": "user",
            "parts": [{ "text": combined_prompt(context) }],
        }],
        "generationConfig": {
            "temperature": TEMPERATURE,
            "maxOutputTokens": MAX_OUTPUT_TOKENS,
        },
    });
    Ok(OutboundRequest::post_json(request_url(runtime)?, body))
}

/// All `candidates[0].content.parts[*].text`, newline-joined.
pub fn extract_text(body: &Value) -> Option<String> {
    body.pointer("/candidates/0/content/parts")
        .and_then(Value::as_array)
        .map(|parts| join_text_parts(parts))
}
