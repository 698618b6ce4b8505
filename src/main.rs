//! Signal Router Server
//!
//! Entry point for the recommendation routing service.

use std::sync::Arc;

use mimalloc::MiMalloc;
use tracing::error;

use signal_router::config::{AppConfig, load_dotenv_files};
use signal_router::{server, telemetry};

/// Global allocator for improved performance (M-MIMALLOC-APPS).
#[global_allocator]
static GLOBAL: MiMalloc = MiMalloc;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env.local / .env (if present) before anything reads the environment
    let env_files = load_dotenv_files();

    let config = match AppConfig::load() {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Configuration error: {e}");
            std::process::exit(1);
        }
    };

    // Initialize tracing (M-LOG-STRUCTURED)
    telemetry::init(config.log.format);
    for outcome in &env_files {
        outcome.log();
    }

    if let Err(e) = server::start_server(Arc::new(config)).await {
        error!(name: "server.failed", error = %e, "Server exited with error");
        return Err(e);
    }
    Ok(())
}
