mod config;
mod engine;
mod error;
mod gateway;
mod registry;
mod resolve;

use std::sync::Arc;

use rmcp::ServiceExt;
use tracing_subscriber::EnvFilter;

use crate::engine::server::DiscordEngine;
use crate::gateway::ready::ReadinessGate;
use crate::gateway::rest::RestGateway;
use crate::registry::UserAliases;
use crate::resolve::RoutingContext;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // stdout carries the MCP stream; all diagnostics go to stderr.
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("discord_mcp=info"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    tracing::info!("Starting discord-mcp");

    let config = config::load_from_env()?;
    if config.servers.is_empty() {
        tracing::warn!(
            "no server aliases configured; set {} or {}",
            config::ENV_GUILD_MAP,
            config::ENV_LEGACY_GUILD
        );
    }

    let ready = ReadinessGate::new();
    let gateway = Arc::new(RestGateway::new(config.token, ready.clone())?);

    // Login failures are logged, not fatal: the dispatcher keeps accepting
    // calls, which then fail with a readiness timeout until the operator
    // fixes the credential and restarts.
    let login_gateway = gateway.clone();
    tokio::spawn(async move {
        if let Err(e) = login_gateway.login().await {
            tracing::error!(error = %e, "Discord login failed");
        }
    });

    let ctx = Arc::new(RoutingContext {
        gateway,
        registry: config.servers,
        user_aliases: UserAliases::new(config.user_aliases),
        default_channel_id: config.default_channel_id,
        ready,
    });

    let engine = DiscordEngine::new(ctx);
    tracing::info!("discord-mcp serving MCP over stdio");

    let service = engine.serve((tokio::io::stdin(), tokio::io::stdout())).await?;
    service.waiting().await?;

    Ok(())
}
