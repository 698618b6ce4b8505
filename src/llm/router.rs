//! Sequential fallback across a mode's provider chain.

use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, info, warn};

use super::error::{ProviderError, RouterError};
use super::rate_limit::RateLimitTracker;
use super::registry::{ProviderRuntime, chain_for, resolve};
use super::sanitize::Recommendation;
use super::transport::HttpTransport;
use super::wire;
use crate::config::ProviderEnv;
use crate::context::{Mode, RecommendationContext};

/// A successful route: who answered and what they recommended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RoutedRecommendation {
    pub provider: &'static str,
    pub model: String,
    pub mode: Mode,
    pub recommendation: Recommendation,
}

/// Tries providers in chain order and returns the first usable answer.
///
/// Attempts within one call are strictly sequential. A provider is never
/// retried within the same call; rate-limited providers are skipped until
/// their cooldown expires.
#[derive(Debug, Clone)]
pub struct ProviderRouter {
    transport: Arc<dyn HttpTransport>,
    rate_limits: Arc<RateLimitTracker>,
}

impl ProviderRouter {
    pub fn new(transport: Arc<dyn HttpTransport>, rate_limits: Arc<RateLimitTracker>) -> Self {
        Self {
            transport,
            rate_limits,
        }
    }

    /// Shared cooldown state.
    pub fn rate_limits(&self) -> &Arc<RateLimitTracker> {
        &self.rate_limits
    }

    /// Route one request through the chain for `mode`.
    pub async fn route(
        &self,
        mode: Mode,
        context: &RecommendationContext,
        env: &ProviderEnv,
    ) -> Result<RoutedRecommendation, RouterError> {
        let runtimes: Vec<ProviderRuntime> = chain_for(mode)
            .iter()
            .filter_map(|name| resolve(name, env))
            .collect();

        if runtimes.is_empty() {
            warn!(name: "router.no_provider", mode = %mode, "No configured providers");
            return Err(RouterError::NoProviderConfigured);
        }

        let mut notes = Vec::new();
        for runtime in &runtimes {
            if self.rate_limits.is_cooling_down(runtime.name) {
                debug!(
                    name: "router.provider.skipped",
                    provider = runtime.name,
                    "Provider cooling down after rate limit"
                );
                notes.push(format!(
                    "[{}] 429 - temporarily skipped after rate limit",
                    runtime.name
                ));
                continue;
            }

            match wire::invoke(self.transport.as_ref(), runtime, context).await {
                Ok(recommendation) => {
                    self.rate_limits.clear(runtime.name);
                    info!(
                        name: "router.provider.succeeded",
                        provider = runtime.name,
                        model = %runtime.model,
                        mode = %mode,
                        "Provider returned a recommendation"
                    );
                    return Ok(RoutedRecommendation {
                        provider: runtime.name,
                        model: runtime.model.clone(),
                        mode,
                        recommendation,
                    });
                }
                Err(err) => notes.push(self.record_failure(runtime, &err)),
            }
        }

        Err(RouterError::AllProvidersFailed { notes })
    }

    /// Log the failure, apply a strike if it looks like a rate limit, and
    /// return its note.
    fn record_failure(&self, runtime: &ProviderRuntime, err: &ProviderError) -> String {
        let status = err
            .status()
            .map_or_else(|| "error".to_string(), |s| s.to_string());

        if err.is_rate_limit() {
            let cooldown = self.rate_limits.record_failure(runtime.name);
            warn!(
                name: "router.provider.rate_limited",
                provider = runtime.name,
                strikes = self.rate_limits.strikes(runtime.name),
                cooldown_secs = cooldown.as_secs(),
                "Provider rate limited"
            );
        } else {
            warn!(
                name: "router.provider.failed",
                provider = runtime.name,
                model = %runtime.model,
                status = %status,
                error = %err,
                "Provider attempt failed"
            );
        }

        format!("[{}] {status} - {err}", runtime.name)
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::llm::wire::test_support::{CannedTransport, MODEL_JSON, context};

    fn router(transport: CannedTransport) -> ProviderRouter {
        ProviderRouter::new(Arc::new(transport), Arc::new(RateLimitTracker::new()))
    }

    #[tokio::test]
    async fn test_empty_env_is_no_provider() {
        let router = router(CannedTransport::new(200, "{}"));
        let err = router
            .route(Mode::Balanced, &context(), &ProviderEnv::default())
            .await
            .unwrap_err();
        assert!(matches!(err, RouterError::NoProviderConfigured));
    }

    #[tokio::test]
    async fn test_single_provider_success() {
        let transport = CannedTransport::json(&json!({
            "choices": [{"message": {"content": MODEL_JSON}}]
        }));
        let router = router(transport);
        let env = ProviderEnv::default().with("GROQ_API_KEY", "gk");

        let routed = router
            .route(Mode::Fast, &context(), &env)
            .await
            .expect("groq answers");
        assert_eq!(routed.provider, "groq");
        assert_eq!(routed.model, "llama-3.3-70b-versatile");
        assert_eq!(routed.mode, Mode::Fast);
        assert_eq!(routed.recommendation.name, "One-tap checkout");
    }

    #[tokio::test(start_paused = true)]
    async fn test_rate_limit_note_and_strike() {
        let router = router(CannedTransport::new(429, "Too Many Requests"));
        let env = ProviderEnv::default().with("GROQ_API_KEY", "gk");

        let err = router
            .route(Mode::Balanced, &context(), &env)
            .await
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            "All providers failed. [groq] 429 - Too Many Requests"
        );
        assert_eq!(router.rate_limits().strikes("groq"), 1);

        let err = router
            .route(Mode::Balanced, &context(), &env)
            .await
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            "All providers failed. [groq] 429 - temporarily skipped after rate limit"
        );
        assert_eq!(router.rate_limits().strikes("groq"), 1);
    }

    #[tokio::test]
    async fn test_non_http_failure_note_uses_error() {
        let router = router(CannedTransport::json(&json!({"choices": []})));
        let env = ProviderEnv::default().with("GROQ_API_KEY", "gk");
        let err = router
            .route(Mode::Safe, &context(), &env)
            .await
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            "All providers failed. [groq] error - empty model output"
        );
        assert_eq!(router.rate_limits().strikes("groq"), 0);
    }
}
