//! Error types for provider calls and routing.

use std::sync::LazyLock;

use regex::Regex;

use super::transport::TransportError;

static RATE_LIMIT_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)rate.?limit|quota|too many requests").expect("rate limit pattern is valid")
});

/// Why a single provider attempt failed. Never fatal to the request; the
/// router records it and moves on.
#[derive(Debug, Clone, thiserror::Error)]
pub enum ProviderError {
    /// The provider answered with a non-success status.
    #[error("{body}")]
    Http { status: u16, body: String },

    #[error("request timed out")]
    Timeout,

    #[error("{0}")]
    Transport(String),

    /// The configured endpoint could not be turned into a request URL.
    #[error("invalid endpoint: {0}")]
    InvalidEndpoint(String),

    #[error("empty model output")]
    EmptyOutput,

    #[error("model response did not contain JSON")]
    NoJson,

    #[error("invalid JSON response: {0}")]
    InvalidJson(String),
}

impl ProviderError {
    /// HTTP status, when the failure came from one.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Http { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Best-effort check for rate limiting: HTTP 429 or rate-limit wording
    /// anywhere in the failure text.
    pub fn is_rate_limit(&self) -> bool {
        self.status() == Some(429) || RATE_LIMIT_PATTERN.is_match(&self.to_string())
    }
}

impl From<TransportError> for ProviderError {
    fn from(e: TransportError) -> Self {
        match e {
            TransportError::Timeout => Self::Timeout,
            TransportError::Other(msg) => Self::Transport(msg),
        }
    }
}

/// Why routing as a whole failed.
#[derive(Debug, Clone, thiserror::Error)]
pub enum RouterError {
    /// No provider in the mode's chain is configured. A deployment problem.
    #[error("No configured providers found. Set API keys in environment variables.")]
    NoProviderConfigured,

    /// Every configured provider was tried (or skipped) without success.
    #[error("All providers failed. {}", .notes.join(" | "))]
    AllProvidersFailed {
        /// One `[name] status - message` note per provider.
        notes: Vec<String>,
    },
}

impl RouterError {
    /// Stable machine-readable code.
    #[must_use]
    pub fn code(&self) -> &'static str {
        match self {
            Self::NoProviderConfigured => "NO_PROVIDER_CONFIGURED",
            Self::AllProvidersFailed { .. } => "ALL_PROVIDERS_FAILED",
        }
    }
}
