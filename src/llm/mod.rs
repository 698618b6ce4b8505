//! Provider routing for recommendation requests.
//!
//! # Overview
//!
//! The [`registry`] holds the static catalogue of backends and the fallback
//! chain for each [`Mode`](crate::context::Mode). The [`ProviderRouter`]
//! walks a chain, skipping providers that are unconfigured or cooling down
//! after a rate limit, and returns the first recommendation that parses.
//!
//! Each backend speaks one [`FormatFamily`]; the [`wire`] module translates
//! a context into that family's request and pulls model text back out of its
//! response. Model text then goes through [`sanitize`] before anyone sees it.

pub mod error;
pub mod rate_limit;
pub mod registry;
pub mod router;
pub mod sanitize;
pub mod transport;
pub mod wire;

pub use error::{ProviderError, RouterError};
pub use rate_limit::RateLimitTracker;
pub use registry::{FormatFamily, ProviderRuntime, ProviderStatus, configured_providers};
pub use router::{ProviderRouter, RoutedRecommendation};
pub use sanitize::Recommendation;
pub use transport::{HttpTransport, ReqwestTransport};

/// A message in a chat-style request.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct ChatMessage {
    /// Role of the message author.
    pub role: MessageRole,
    pub content: String,
}

/// Role of a message author.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    /// System prompt.
    System,
    /// User message.
    User,
}
