//! Realtime WebSocket proxy.
//!
//! Browsers cannot attach an `Authorization` header to a WebSocket upgrade,
//! so clients connect here instead and the proxy dials the realtime API on
//! their behalf with the server-side credential.
//!
//! # Architecture Overview
//!
//! ```text
//!                     ┌──────────────────────────────────────────────┐
//!                     │                REALTIME PROXY                │
//!   Client upgrade    │  ┌─────────┐   ┌───────────┐   ┌──────────┐  │
//!  ───────────────────┼─▶│  http   │──▶│  bridge   │──▶│ upstream │──┼──▶ Realtime API
//!                     │  │ server  │   │  session  │   │  dialer  │  │    (wss, Bearer)
//!   GET /health       │  └────┬────┘   └───────────┘   └──────────┘  │
//!  ───────────────────┼───────┘                                      │
//!                     │  config · lifecycle · observability          │
//!                     └──────────────────────────────────────────────┘
//! ```

use clap::Parser;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use realtime_proxy::config::{self, ObservabilityConfig};
use realtime_proxy::lifecycle::startup;
use realtime_proxy::observability::logging;

#[derive(Parser)]
#[command(name = "realtime-proxy")]
#[command(about = "WebSocket proxy that injects the upstream credential", long_about = None)]
struct Cli {
    /// Optional TOML config file; environment variables override it.
    #[arg(short, long, env = "REALTIME_PROXY_CONFIG")]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> ExitCode {
    // Before parsing, so the file can also supply REALTIME_PROXY_CONFIG.
    let dotenv = config::loader::load_dotenv(Path::new(config::loader::DOTENV_FILE));
    let cli = Cli::parse();

    let config = match config::load_config(cli.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            logging::init(&ObservabilityConfig::default());
            log_dotenv(&dotenv);
            tracing::error!(error = %e, "Configuration rejected, not starting");
            if let config::ConfigError::Validation(errors) = &e {
                if errors.contains(&config::ValidationError::MissingCredential) {
                    tracing::error!(
                        "Set {} in the environment before starting",
                        config::loader::CREDENTIAL_VAR
                    );
                }
            }
            return ExitCode::FAILURE;
        }
    };

    logging::init(&config.observability);
    log_dotenv(&dotenv);
    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        bind_address = %config.bind_address(),
        upstream = %config.upstream.url,
        model = %config.upstream.model,
        "realtime-proxy starting"
    );

    if let Err(e) = startup::run(config).await {
        tracing::error!(error = %e, "Proxy stopped with an error");
        return ExitCode::FAILURE;
    }

    tracing::info!("Shutdown complete");
    ExitCode::SUCCESS
}

fn log_dotenv(outcome: &Result<bool, config::ConfigError>) {
    match outcome {
        Ok(true) => tracing::debug!(file = config::loader::DOTENV_FILE, "Loaded environment file"),
        Ok(false) => {}
        Err(e) => tracing::warn!(
            file = config::loader::DOTENV_FILE,
            error = %e,
            "Ignoring unreadable environment file"
        ),
    }
}
