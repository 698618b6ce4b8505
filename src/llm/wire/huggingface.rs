//! Hugging Face Inference API text generation. Prompt-only: there are no
//! chat roles, just one `inputs` string.

use serde_json::{Value, json};

use super::{MAX_OUTPUT_TOKENS, TEMPERATURE, combined_prompt};
use crate::context::RecommendationContext;
use crate::llm::registry::ProviderRuntime;
use crate::llm::transport::OutboundRequest;

/// Model ids contain a slash (`org/model`) that is part of the path, so the
/// URL is joined as text rather than escaped.
pub fn request_url(runtime: &ProviderRuntime) -> String {
    format!("{}/{}", runtime.endpoint.trim_end_matches('/'), runtime.model)
}

pub fn build_request(runtime: &ProviderRuntime, context: &RecommendationContext) -> OutboundRequest {
    let body = json!({
        "inputs": combined_prompt(context),
        "parameters": {
            "temperature": TEMPERATURE,
            "max_new_tokens": MAX_OUTPUT_TOKENS,
            "return_full_text": false,
        },
        "options": { "wait_for_model": true },
    });
    OutboundRequest::post_json(request_url(runtime), body).bearer(&runtime.api_key)
}

/// `[0].generated_text` or `.generated_text`.
pub fn extract_text(body: &Value) -> Option<String> {
    let holder = match body {
        Value::Array(items) => items.first()?,
        other => other,
    };
    holder
        .get("generated_text")
        .and_then(Value::as_str)
        .map(ToString::to_string)
}
