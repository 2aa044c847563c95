use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use tokio::net::TcpListener;

use donna_relay::api::{self, ServerState};
use donna_relay::config::load_config;
use donna_relay::logging::init_logging;
use donna_relay::provider::Gemini;
use donna_relay::relay::{RelayClient, RelayConfig};

#[derive(Parser, Debug)]
#[command(name = "donna-server", about = "Chat relay between a web client and Gemini")]
struct ServerArgs {
    /// Config file; defaults to the platform config dir.
    #[arg(long, short = 'c')]
    config: Option<PathBuf>,
    /// Overrides the configured port and PORT.
    #[arg(long, short = 'p')]
    port: Option<u16>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = ServerArgs::parse();
    let loaded = load_config(args.config).context("failed to load configuration")?;
    let mut config = loaded.config;
    let _logger = init_logging(&config.logging).context("failed to start logging")?;
    if let Some(port) = args.port {
        config.server.port = port;
    }
    if !loaded.config_exists {
        log::info!("no config at {}, using defaults", loaded.path.display());
    }

    let api_key = config.provider.require_api_key()?;
    let provider = Gemini::new(
        api_key,
        Some(config.provider.model.clone()),
        Some(config.provider.base_url.clone()),
        config.provider.timeout_seconds,
    )?;

    let mut relay_config = RelayConfig::default().with_generation(config.generation.clone());
    if let Some(prompt) = config.system_prompt.take() {
        relay_config = relay_config.with_system_prompt(prompt);
    }
    let relay = RelayClient::new(Arc::new(provider), relay_config);
    let state = ServerState::new(relay.clone())
        .with_keep_alive(Duration::from_secs(config.server.keep_alive_secs));

    let addr = config.server.bind_addr();
    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;

    log::info!("model: {}", relay.model());
    log::info!(
        "system prompt: {} characters",
        relay.config().system_prompt.chars().count()
    );
    log::info!("routes: POST /api/chat, POST /api/chat-stream, GET /api/system-prompt, GET /api/health");

    api::serve(listener, state, shutdown_signal()).await?;
    log::info!("relay stopped");
    Ok(())
}

async fn shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                tokio::select! {
                    _ = sigterm.recv() => {}
                    _ = tokio::signal::ctrl_c() => {}
                }
            }
            Err(err) => {
                log::warn!("SIGTERM handler unavailable: {err}");
                let _ = tokio::signal::ctrl_c().await;
            }
        }
    }
    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
    }
    log::info!("shutdown requested");
}
