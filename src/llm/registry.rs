//! Static provider catalogue and per-mode fallback chains.
//!
//! A provider counts as *configured* exactly when [`resolve`] returns a
//! runtime for it. Both routing and status reporting go through that check.

use serde::Serialize;

use crate::config::ProviderEnv;
use crate::context::Mode;

/// Request/response envelope shape a provider's API speaks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum FormatFamily {
    /// `OpenAI`-compatible `/chat/completions`.
    #[serde(rename = "openai-chat")]
    OpenAiChat,
    /// Google Gemini `generateContent`.
    #[serde(rename = "gemini")]
    Gemini,
    /// Cohere v2 chat.
    #[serde(rename = "cohere")]
    Cohere,
    /// Cloudflare Workers AI `ai/run`.
    #[serde(rename = "cloudflare-run")]
    CloudflareRun,
    /// Hugging Face Inference API text generation.
    #[serde(rename = "huggingface-inference")]
    HuggingFaceInference,
    /// Ollama `/api/chat`.
    #[serde(rename = "ollama-chat")]
    OllamaChat,
}

impl FormatFamily {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::OpenAiChat => "openai-chat",
            Self::Gemini => "gemini",
            Self::Cohere => "cohere",
            Self::CloudflareRun => "cloudflare-run",
            Self::HuggingFaceInference => "huggingface-inference",
            Self::OllamaChat => "ollama-chat",
        }
    }
}

/// Static description of one backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProviderDefinition {
    pub name: &'static str,
    pub family: FormatFamily,
    pub key_env: &'static str,
    pub endpoint_env: &'static str,
    pub model_env: &'static str,
    /// Only Cloudflare needs an account id.
    pub account_env: Option<&'static str>,
    pub default_endpoint: &'static str,
    pub default_model: &'static str,
}

/// Explicit Ollama opt-in/opt-out flag.
pub const OLLAMA_ENABLED_ENV: &str = "OLLAMA_ENABLED";

pub const PROVIDERS: &[ProviderDefinition] = &[
    ProviderDefinition {
        name: "groq",
        family: FormatFamily::OpenAiChat,
        key_env: "GROQ_API_KEY",
        endpoint_env: "GROQ_BASE_URL",
        model_env: "GROQ_MODEL",
        account_env: None,
        default_endpoint: "https://api.groq.com/openai/v1/chat/completions",
        default_model: "llama-3.3-70b-versatile",
    },
    ProviderDefinition {
        name: "gemini",
        family: FormatFamily::Gemini,
        key_env: "GEMINI_API_KEY",
        endpoint_env: "GEMINI_BASE_URL",
        model_env: "GEMINI_MODEL",
        account_env: None,
        default_endpoint: "https://generativelanguage.googleapis.com/v1beta/models",
        default_model: "gemini-2.0-flash",
    },
    ProviderDefinition {
        name: "mistral",
        family: FormatFamily::OpenAiChat,
        key_env: "MISTRAL_API_KEY",
        endpoint_env: "MISTRAL_BASE_URL",
        model_env: "MISTRAL_MODEL",
        account_env: None,
        default_endpoint: "https://api.mistral.ai/v1/chat/completions",
        default_model: "mistral-large-latest",
    },
    ProviderDefinition {
        name: "cohere",
        family: FormatFamily::Cohere,
        key_env: "COHERE_API_KEY",
        endpoint_env: "COHERE_BASE_URL",
        model_env: "COHERE_MODEL",
        account_env: None,
        default_endpoint: "https://api.cohere.com/v2/chat",
        default_model: "command-r-plus",
    },
    ProviderDefinition {
        name: "codestral",
        family: FormatFamily::OpenAiChat,
        key_env: "CODESTRAL_API_KEY",
        endpoint_env: "CODESTRAL_BASE_URL",
        model_env: "CODESTRAL_MODEL",
        account_env: None,
        default_endpoint: "https://codestral.mistral.ai/v1/chat/completions",
        default_model: "codestral-latest",
    },
    ProviderDefinition {
        name: "nvidia",
        family: FormatFamily::OpenAiChat,
        key_env: "NVIDIA_NIM_API_KEY",
        endpoint_env: "NVIDIA_NIM_BASE_URL",
        model_env: "NVIDIA_NIM_MODEL",
        account_env: None,
        default_endpoint: "https://integrate.api.nvidia.com/v1/chat/completions",
        default_model: "meta/llama-3.1-70b-instruct",
    },
    ProviderDefinition {
        name: "cerebras",
        family: FormatFamily::OpenAiChat,
        key_env: "CEREBRAS_API_KEY",
        endpoint_env: "CEREBRAS_BASE_URL",
        model_env: "CEREBRAS_MODEL",
        account_env: None,
        default_endpoint: "https://api.cerebras.ai/v1/chat/completions",
        default_model: "llama-3.3-70b",
    },
    ProviderDefinition {
        name: "huggingface",
        family: FormatFamily::HuggingFaceInference,
        key_env: "HUGGINGFACE_API_KEY",
        endpoint_env: "HUGGINGFACE_BASE_URL",
        model_env: "HUGGINGFACE_MODEL",
        account_env: None,
        default_endpoint: "https://api-inference.huggingface.co/models",
        default_model: "mistralai/Mistral-7B-Instruct-v0.3",
    },
    ProviderDefinition {
        name: "cloudflare",
        family: FormatFamily::CloudflareRun,
        key_env: "CLOUDFLARE_API_KEY",
        endpoint_env: "CLOUDFLARE_BASE_URL",
        model_env: "CLOUDFLARE_MODEL",
        account_env: Some("CLOUDFLARE_ACCOUNT_ID"),
        default_endpoint: "https://api.cloudflare.com/client/v4/accounts",
        default_model: "@cf/meta/llama-3.1-8b-instruct",
    },
    ProviderDefinition {
        name: "ollama",
        family: FormatFamily::OllamaChat,
        key_env: "OLLAMA_API_KEY",
        endpoint_env: "OLLAMA_BASE_URL",
        model_env: "OLLAMA_MODEL",
        account_env: None,
        default_endpoint: "http://localhost:11434/api/chat",
        default_model: "llama3.1",
    },
    ProviderDefinition {
        name: "opencode",
        family: FormatFamily::OpenAiChat,
        key_env: "OPENCODE_API_KEY",
        endpoint_env: "OPENCODE_BASE_URL",
        model_env: "OPENCODE_MODEL",
        account_env: None,
        default_endpoint: "https://api.openai.com/v1/chat/completions",
        default_model: "gpt-4o-mini",
    },
];

const SAFE_CHAIN: &[&str] = &[
    "gemini",
    "groq",
    "mistral",
    "cerebras",
    "cohere",
    "nvidia",
    "cloudflare",
    "huggingface",
    "codestral",
    "opencode",
    "ollama",
];

const BALANCED_CHAIN: &[&str] = &[
    "groq",
    "gemini",
    "mistral",
    "cerebras",
    "cohere",
    "nvidia",
    "codestral",
    "cloudflare",
    "huggingface",
    "opencode",
    "ollama",
];

const FAST_CHAIN: &[&str] = &[
    "groq",
    "cerebras",
    "nvidia",
    "gemini",
    "mistral",
    "cohere",
    "codestral",
    "ollama",
    "cloudflare",
    "huggingface",
    "opencode",
];

/// Provider names to try, in order, for a mode.
pub fn chain_for(mode: Mode) -> &'static [&'static str] {
    match mode {
        Mode::Safe => SAFE_CHAIN,
        Mode::Balanced => BALANCED_CHAIN,
        Mode::Fast => FAST_CHAIN,
    }
}

/// Look up a provider definition by name.
pub fn definition(name: &str) -> Option<&'static ProviderDefinition> {
    PROVIDERS.iter().find(|p| p.name == name)
}

/// A provider definition resolved against live configuration.
#[derive(Clone, PartialEq, Eq)]
pub struct ProviderRuntime {
    pub name: &'static str,
    pub family: FormatFamily,
    pub endpoint: String,
    pub model: String,
    /// Empty only for Ollama without a key.
    pub api_key: String,
    /// Empty unless the provider is Cloudflare.
    pub account_id: String,
}

impl std::fmt::Debug for ProviderRuntime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderRuntime")
            .field("name", &self.name)
            .field("family", &self.family)
            .field("endpoint", &self.endpoint)
            .field("model", &self.model)
            .field("api_key", &if self.api_key.is_empty() { "" } else { "***" })
            .field("account_id", &self.account_id)
            .finish()
    }
}

/// Resolve a provider against configuration, or `None` if it is not usable.
pub fn resolve(name: &str, env: &ProviderEnv) -> Option<ProviderRuntime> {
    let def = definition(name)?;

    let endpoint = env.get(def.endpoint_env).unwrap_or(def.default_endpoint);
    let model = env.get(def.model_env).unwrap_or(def.default_model);
    let api_key = env.get(def.key_env).unwrap_or_default();
    let account_id = def
        .account_env
        .and_then(|key| env.get(key))
        .unwrap_or_default();

    if endpoint.is_empty() || model.is_empty() {
        return None;
    }

    match def.family {
        FormatFamily::OllamaChat => {
            if !ollama_opted_in(env, api_key) {
                return None;
            }
        }
        _ if api_key.is_empty() => return None,
        FormatFamily::CloudflareRun if account_id.is_empty() => return None,
        _ => {}
    }

    Some(ProviderRuntime {
        name: def.name,
        family: def.family,
        endpoint: endpoint.to_string(),
        model: model.to_string(),
        api_key: api_key.to_string(),
        account_id: account_id.to_string(),
    })
}

/// Ollama assumes a local server, so it needs an explicit signal that one
/// exists: the enable flag, an endpoint override, or a key. An explicit
/// `OLLAMA_ENABLED=false` always disables it.
fn ollama_opted_in(env: &ProviderEnv, api_key: &str) -> bool {
    let flag = env.get(OLLAMA_ENABLED_ENV).map(str::to_ascii_lowercase);
    match flag.as_deref() {
        Some("false") => false,
        Some("true") => true,
        _ => env.get("OLLAMA_BASE_URL").is_some() || !api_key.is_empty(),
    }
}

/// A configured provider, as reported by the status endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProviderStatus {
    pub name: &'static str,
    pub model: String,
    #[serde(rename = "type")]
    pub family: FormatFamily,
}

/// Every provider that any mode could use with this configuration.
///
/// Names are deduplicated in first-seen order across the safe, balanced and
/// fast chains.
pub fn configured_providers(env: &ProviderEnv) -> Vec<ProviderStatus> {
    let mut seen: Vec<&'static str> = Vec::new();
    for name in [Mode::Safe, Mode::Balanced, Mode::Fast]
        .into_iter()
        .flat_map(|mode| chain_for(mode).iter().copied())
    {
        if !seen.contains(&name) {
            seen.push(name);
        }
    }

    seen.into_iter()
        .filter_map(|name| resolve(name, env))
        .map(|runtime| ProviderStatus {
            name: runtime.name,
            model: runtime.model,
            family: runtime.family,
        })
        .collect()
}
