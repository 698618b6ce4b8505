//! Application configuration.
//!
//! Two kinds of configuration live here:
//!
//! - [`AppConfig`]: process settings (listen address, outbound timeout, log
//!   format), layered from defaults, an optional config file,
//!   `SIGNAL_ROUTER_*` environment variables and CLI flags.
//! - [`ProviderEnv`]: the flat key-value view of provider credentials and
//!   overrides (`GROQ_API_KEY`, `OLLAMA_BASE_URL`, ...). It is snapshotted
//!   per request because the hosting environment may change it at any time.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use clap::Parser;
use config::{Config, Environment, File};
use serde::Deserialize;

/// Default config file stem looked up in the working directory.
const DEFAULT_CONFIG_STEM: &str = "signal-router";

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Config file path
    #[arg(short, long, env = "CONFIG_FILE")]
    pub config: Option<String>,

    /// Host to bind
    #[arg(long, env = "HOST")]
    pub host: Option<String>,

    /// Port to listen on
    #[arg(long, env = "PORT")]
    pub port: Option<u16>,

    /// Timeout for each outbound provider call, in seconds
    #[arg(long, env = "ROUTER_REQUEST_TIMEOUT_SECS")]
    pub request_timeout_secs: Option<u64>,

    /// Log output format (compact or json)
    #[arg(long, env = "LOG_FORMAT")]
    pub log_format: Option<LogFormat>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub router: RouterConfig,
    pub log: LogConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Largest accepted request body.
    pub max_body_bytes: usize,
}

#[derive(Debug, Deserialize, Clone)]
pub struct RouterConfig {
    pub request_timeout_secs: u64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct LogConfig {
    pub format: LogFormat,
}

#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Compact,
    Json,
}

impl LogFormat {
    fn as_str(self) -> &'static str {
        match self {
            Self::Compact => "compact",
            Self::Json => "json",
        }
    }
}

impl AppConfig {
    pub fn load() -> Result<Self, config::ConfigError> {
        Self::load_from_args(std::env::args())
    }

    pub fn load_from_args<I, T>(args: I) -> Result<Self, config::ConfigError>
    where
        I: IntoIterator<Item = T>,
        T: Into<std::ffi::OsString> + Clone,
    {
        let cli =
            Cli::try_parse_from(args).map_err(|e| config::ConfigError::Message(e.to_string()))?;

        let mut builder = Config::builder()
            .set_default("server.host", "0.0.0.0")?
            .set_default("server.port", 3000)?
            .set_default("server.max_body_bytes", 1024 * 1024)?
            .set_default("router.request_timeout_secs", 45)?
            .set_default("log.format", LogFormat::Compact.as_str())?;

        // Explicit file must exist; the working-directory fallback is optional.
        builder = match &cli.config {
            Some(path) => builder.add_source(File::from(Path::new(path)).required(true)),
            None => builder.add_source(File::with_name(DEFAULT_CONFIG_STEM).required(false)),
        };

        // E.g. SIGNAL_ROUTER_SERVER__PORT=8000
        builder = builder.add_source(
            Environment::with_prefix("SIGNAL_ROUTER")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        );

        // CLI flags (and their env aliases) win over everything else.
        if let Some(host) = &cli.host {
            builder = builder.set_override("server.host", host.as_str())?;
        }
        if let Some(port) = cli.port {
            builder = builder.set_override("server.port", i64::from(port))?;
        }
        if let Some(secs) = cli.request_timeout_secs {
            let secs = i64::try_from(secs).map_err(|e| config::ConfigError::Message(e.to_string()))?;
            builder = builder.set_override("router.request_timeout_secs", secs)?;
        }
        if let Some(format) = cli.log_format {
            builder = builder.set_override("log.format", format.as_str())?;
        }

        builder.build()?.try_deserialize()
    }
}

/// Outcome of reading one env file, kept until logging is up.
#[derive(Debug)]
pub enum EnvFileLoad {
    Loaded(PathBuf),
    Failed { path: PathBuf, error: String },
}

impl EnvFileLoad {
    /// Emit the outcome as a tracing event.
    pub fn log(&self) {
        match self {
            Self::Loaded(path) => {
                tracing::debug!(name: "config.env_file.loaded", path = %path.display(), "Loaded env file");
            }
            Self::Failed { path, error } => tracing::warn!(
                name: "config.env_file.failed",
                path = %path.display(),
                error = %error,
                "Failed to load env file"
            ),
        }
    }
}

/// Load `.env.local` then `.env` from the working directory.
pub fn load_dotenv_files() -> Vec<EnvFileLoad> {
    load_dotenv_files_from(Path::new("."))
}

/// Load `.env.local` then `.env` from `dir`. Missing files are skipped.
///
/// Variables already present in the process environment are never replaced,
/// even when set to an empty string, so the first file to define a key wins
/// over the second.
pub fn load_dotenv_files_from(dir: &Path) -> Vec<EnvFileLoad> {
    [".env.local", ".env"]
        .into_iter()
        .map(|file| dir.join(file))
        .filter_map(|path| match dotenvy::from_path(&path) {
            Ok(()) => Some(EnvFileLoad::Loaded(path)),
            Err(e) if e.not_found() => None,
            Err(e) => Some(EnvFileLoad::Failed {
                path,
                error: e.to_string(),
            }),
        })
        .collect()
}

/// Key-value configuration consulted when resolving providers.
#[derive(Clone, Default)]
pub struct ProviderEnv {
    vars: HashMap<String, String>,
}

impl std::fmt::Debug for ProviderEnv {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut keys: Vec<&String> = self.vars.keys().collect();
        keys.sort();
        f.debug_struct("ProviderEnv").field("keys", &keys).finish()
    }
}

impl ProviderEnv {
    /// Snapshot the current process environment.
    ///
    /// Entries whose key or value is not valid UTF-8 are skipped.
    pub fn from_process_env() -> Self {
        Self {
            vars: std::env::vars_os()
                .filter_map(|(k, v)| Some((k.into_string().ok()?, v.into_string().ok()?)))
                .collect(),
        }
    }

    /// Look up a value, trimmed. Blank values count as missing.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.vars
            .get(key)
            .map(|v| v.trim())
            .filter(|v| !v.is_empty())
    }

    /// Set a value, returning `self` for chaining.
    #[must_use]
    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.vars.insert(key.into(), value.into());
        self
    }
}

impl<K, V> FromIterator<(K, V)> for ProviderEnv
where
    K: Into<String>,
    V: Into<String>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            vars: iter
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}

/// Where the server reads provider configuration from on each request.
#[derive(Debug, Clone)]
pub enum ProviderEnvSource {
    /// Re-read the process environment every time.
    Process,
    /// A fixed snapshot.
    Fixed(ProviderEnv),
}

impl ProviderEnvSource {
    pub fn snapshot(&self) -> ProviderEnv {
        match self {
            Self::Process => ProviderEnv::from_process_env(),
            Self::Fixed(env) => env.clone(),
        }
    }
}
