//! Signal Router
//!
//! Turns unstructured product signals (interview notes, usage logs, market
//! notes, uploaded file excerpts) into a structured feature recommendation
//! by asking one of several interchangeable language-model backends.
//!
//! # Architecture
//!
//! - **Signals**: tokenizing, source classification and severity scoring
//! - **Context**: deterministic, prompt-ready view of one request
//! - **LLM routing**: mode-specific provider chains with rate-limit backoff
//!   and per-backend wire formats
//! - **Server**: thin Axum JSON surface over the pipeline
//!
//! # Modules
//!
//! - [`signals`]: per-line analysis primitives
//! - [`context`]: recommendation context and prompts
//! - [`llm`]: provider registry, router, wire adapters and sanitizer
//! - [`config`]: process configuration and provider environment
//! - [`server`]: HTTP handlers

// Allow pedantic clippy warnings that don't add value for this codebase
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::cast_sign_loss)]
#![allow(clippy::missing_fields_in_debug)]
#![allow(clippy::implicit_hasher)]
#![allow(clippy::match_same_arms)]
#![allow(clippy::cargo_common_metadata)]
#![allow(clippy::multiple_crate_versions)]
#![allow(clippy::unused_async)]

pub mod config;
pub mod context;
pub mod llm;
pub mod server;
pub mod signals;
pub mod telemetry;

use std::sync::Arc;

use crate::config::{AppConfig, ProviderEnvSource};
use crate::llm::ProviderRouter;

/// Application state shared across all handlers.
#[derive(Debug, Clone)]
pub struct AppState {
    /// Provider router, holding the shared rate-limit tracker.
    pub router: ProviderRouter,
    /// Where provider credentials are read from on each request.
    pub env_source: ProviderEnvSource,
    /// Global Configuration
    pub config: Arc<AppConfig>,
}
