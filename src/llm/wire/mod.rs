//! Per-family request/response translation.
//!
//! Each submodule knows two things about its family: how to render the
//! outbound request from a [`RecommendationContext`], and where the model's
//! text lives in the response envelope. Everything else (sending, status
//! handling, empty-output detection, sanitizing) is shared in [`invoke`].

pub mod cloudflare;
pub mod cohere;
pub mod gemini;
pub mod huggingface;
pub mod ollama;
pub mod openai;

use serde_json::Value;
use tracing::debug;

use super::error::ProviderError;
use super::registry::{FormatFamily, ProviderRuntime};
use super::sanitize::{Recommendation, parse_recommendation};
use super::transport::{HttpTransport, OutboundRequest};
use super::{ChatMessage, MessageRole};
use crate::context::RecommendationContext;

/// Sampling temperature sent to every backend.
pub const TEMPERATURE: f64 = 0.2;
/// Output token cap, for families that accept one.
pub const MAX_OUTPUT_TOKENS: u32 = 1200;

impl FormatFamily {
    /// Render the request for this family.
    pub fn build_request(
        self,
        runtime: &ProviderRuntime,
        context: &RecommendationContext,
    ) -> Result<OutboundRequest, ProviderError> {
        match self {
            Self::OpenAiChat => Ok(openai::build_request(runtime, context)),
            Self::Gemini => gemini::build_request(runtime, context),
            Self::Cohere => Ok(cohere::build_request(runtime, context)),
            Self::CloudflareRun => cloudflare::build_request(runtime, context),
            Self::HuggingFaceInference => Ok(huggingface::build_request(runtime, context)),
            Self::OllamaChat => Ok(ollama::build_request(runtime, context)),
        }
    }

    /// Pull the raw model text out of this family's response body.
    pub fn extract_text(self, body: &Value) -> Option<String> {
        match self {
            Self::OpenAiChat => openai::extract_text(body),
            Self::Gemini => gemini::extract_text(body),
            Self::Cohere => cohere::extract_text(body),
            Self::CloudflareRun => cloudflare::extract_text(body),
            Self::HuggingFaceInference => huggingface::extract_text(body),
            Self::OllamaChat => ollama::extract_text(body),
        }
    }
}

/// Call one provider and return its sanitized recommendation.
pub async fn invoke(
    transport: &dyn HttpTransport,
    runtime: &ProviderRuntime,
    context: &RecommendationContext,
) -> Result<Recommendation, ProviderError> {
    let request = runtime.family.build_request(runtime, context)?;
    let response = transport.send(request).await?;

    let body: Value = serde_json::from_str(&response.body).unwrap_or(Value::Null);
    if !(200..300).contains(&response.status) {
        return Err(ProviderError::Http {
            status: response.status,
            body: error_body(&body, &response.body),
        });
    }

    let raw = runtime
        .family
        .extract_text(&body)
        .filter(|text| !text.trim().is_empty())
        .ok_or(ProviderError::EmptyOutput)?;

    debug!(
        name: "router.provider.output",
        provider = runtime.name,
        chars = raw.len(),
        "Model output received"
    );

    parse_recommendation(&raw, context)
}

/// Prefer a structured `error` member over the raw body.
fn error_body(parsed: &Value, raw: &str) -> String {
    match parsed.get("error") {
        Some(error) if !error.is_null() => error.to_string(),
        _ if !raw.trim().is_empty() => raw.to_string(),
        _ => "request failed".to_string(),
    }
}

/// The system/user message pair, exactly as built by the context.
pub(crate) fn chat_messages(context: &RecommendationContext) -> Vec<ChatMessage> {
    vec![
        ChatMessage {
            role: MessageRole::System,
            content: context.system_prompt.clone(),
        },
        ChatMessage {
            role: MessageRole::User,
            content: context.user_prompt.clone(),
        },
    ]
}

/// System and user prompt in one block, for prompt-only families.
pub(crate) fn combined_prompt(context: &RecommendationContext) -> String {
    format!("{}\n\n{}", context.system_prompt, context.user_prompt)
}

/// Join every `text` string found in an array of parts.
pub(crate) fn join_text_parts(parts: &[Value]) -> String {
    parts
        .iter()
        .map(|part| part.get("text").and_then(Value::as_str).unwrap_or_default())
        .collect::<Vec<_>>()
        .join("\n")
}
