//! Cloudflare Workers AI `ai/run`.

use serde_json::{Value, json};
use url::Url;

use super::{MAX_OUTPUT_TOKENS, TEMPERATURE, chat_messages};
use crate::context::RecommendationContext;
use crate::llm::error::ProviderError;
use crate::llm::registry::ProviderRuntime;
use crate::llm::transport::OutboundRequest;

/// `{endpoint}/{account_id}/ai/run/{model}` with each part escaped as one
/// path segment.
pub fn request_url(runtime: &ProviderRuntime) -> Result<Url, ProviderError> {
    let mut url =
        Url::parse(&runtime.endpoint).map_err(|e| ProviderError::InvalidEndpoint(e.to_string()))?;
    url.path_segments_mut()
        .map_err(|()| ProviderError::InvalidEndpoint(runtime.endpoint.clone()))?
        .pop_if_empty()
        .extend([runtime.account_id.as_str(), "ai", "run", runtime.model.as_str()]);
    Ok(url)
}

pub fn build_request(
    runtime: &ProviderRuntime,
    context: &RecommendationContext,
) -> Result<OutboundRequest, ProviderError> {
    let body = json!({
        "messages": chat_messages(context),
        "temperature": TEMPERATURE,
        "max_tokens": MAX_OUTPUT_TOKENS,
    });
    Ok(OutboundRequest::post_json(request_url(runtime)?, body).bearer(&runtime.api_key))
}

/// `result.response`, else `result.result`, else `result` itself when it is
/// a string.
pub fn extract_text(body: &Value) -> Option<String> {
    let result = body.get("result")?;
    result
        .get("response")
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
        .or_else(|| {
            result
                .get("result")
                .and_then(Value::as_str)
                .filter(|s| !s.is_empty())
        })
        .or_else(|| result.as_str())
        .map(ToString::to_string)
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::llm::wire::invoke;
    use crate::llm::wire::test_support::*;

    fn rt() -> ProviderRuntime {
        runtime(
            "cloudflare",
            &[("CLOUDFLARE_API_KEY", "cf"), ("CLOUDFLARE_ACCOUNT_ID", "acct42")],
        )
    }

    #[test]
    fn test_url_escapes_model_slashes() {
        assert_eq!(
            request_url(&rt()).expect("url builds").as_str(),
            "https://api.cloudflare.com/client/v4/accounts/acct42/ai/run/@cf%2Fmeta%2Fllama-3.1-8b-instruct"
        );
    }

    #[test]
    fn test_extract_fallbacks() {
        assert_eq!(
            extract_text(&json!({"result": {"response": "a", "result": "b"}})).as_deref(),
            Some("a")
        );
        assert_eq!(extract_text(&json!({"result": {"result": "b"}})).as_deref(), Some("b"));
        assert_eq!(extract_text(&json!({"result": "c"})).as_deref(), Some("c"));
        assert_eq!(extract_text(&json!({"success": false})), None);
    }

    #[tokio::test]
    async fn test_round_trip() {
        let transport = CannedTransport::json(&json!({
            "result": {"response": MODEL_JSON},
            "success": true
        }));
        let rec = invoke(&transport, &rt(), &context()).await.expect("succeeds");
        assert_eq!(rec.name, "One-tap checkout");

        let req = transport.last_request();
        assert_eq!(req.header("authorization"), Some("Bearer cf"));
        assert!(req.body.get("model").is_none());
        assert_eq!(req.body["messages"].as_array().map(Vec::len), Some(2));
    }
}
