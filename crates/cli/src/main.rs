//! megaphone gateway binary: load config, build the channel registry,
//! serve the HTTP surface.

use std::{path::PathBuf, sync::Arc, time::Duration};

use {
    anyhow::Result,
    clap::Parser,
    tracing::{info, warn},
    tracing_subscriber::EnvFilter,
};

use {
    megaphone_channels::ChannelRegistry,
    megaphone_common::store::MemoryAccountStore,
    megaphone_config::MegaphoneConfig,
    megaphone_dispatch::{DispatchEngine, DispatchLimits},
    megaphone_gateway::GatewayState,
    megaphone_gmail::GmailAdapter,
    megaphone_instagram::InstagramAdapter,
};

#[derive(Debug, Parser)]
#[command(name = "megaphone", about = "Access-gated bulk outreach gateway", version)]
struct Cli {
    /// Path to a config file (defaults to standard discovery).
    #[arg(long)]
    config: Option<PathBuf>,

    /// Override the configured bind address.
    #[arg(long)]
    bind: Option<String>,

    /// Override the configured port.
    #[arg(long)]
    port: Option<u16>,
}

fn build_registry(config: &MegaphoneConfig) -> ChannelRegistry {
    let mut registry = ChannelRegistry::new();

    if let Some(ig) = &config.channels.instagram {
        let adapter = match &ig.base_url {
            Some(base) => {
                InstagramAdapter::with_base_url(&ig.username, ig.password.clone(), base)
            },
            None => InstagramAdapter::new(&ig.username, ig.password.clone()),
        };
        registry.register(Arc::new(adapter));
    }

    if let Some(gmail) = &config.channels.gmail {
        let adapter = match (&gmail.api_base, &gmail.token_url) {
            (Some(api), Some(token)) => GmailAdapter::with_endpoints(
                &gmail.user,
                &gmail.client_id,
                gmail.client_secret.clone(),
                gmail.refresh_token.clone(),
                api,
                token,
            ),
            _ => GmailAdapter::new(
                &gmail.user,
                &gmail.client_id,
                gmail.client_secret.clone(),
                gmail.refresh_token.clone(),
            ),
        };
        registry.register(Arc::new(adapter));
    }

    registry
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let config = match &cli.config {
        Some(path) => megaphone_config::load_config(path)?,
        None => megaphone_config::discover_and_load(),
    };

    let registry = build_registry(&config);
    if registry.is_empty() {
        warn!("no channels configured; extract and send calls will fail");
    } else {
        info!(channels = ?registry.ids(), "channels registered");
    }

    let limits = DispatchLimits {
        concurrency: config.dispatch.concurrency,
        send_timeout: Duration::from_secs(config.dispatch.send_timeout_secs),
    };
    let engine = Arc::new(DispatchEngine::new(registry.clone(), limits));
    let accounts = Arc::new(MemoryAccountStore::new(config.accounts.clone()));
    if !config.accounts.is_empty() {
        info!(count = config.accounts.len(), "accounts seeded from config");
    }

    let state = GatewayState::new(engine, registry, accounts);
    let bind = cli.bind.unwrap_or(config.gateway.bind);
    let port = cli.port.unwrap_or(config.gateway.port);

    megaphone_gateway::start_gateway(&bind, port, state).await
}
