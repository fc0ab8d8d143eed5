use crate::error::Error;
use crate::gateway::ready::DEFAULT_READY_TIMEOUT;
use crate::resolve::{channel, server, ResolvedChannel, RoutingContext};

/// Combine an optional channel hint and an optional server hint into one
/// resolved channel. Policy: await readiness, resolve the server (default
/// alias when absent), let an explicit channel win; otherwise fall back to
/// the configured default channel. The default channel is process-global
/// and may live in a different server than the routing target, so the
/// fallback scans every cached server for it.
pub async fn resolve_routed_channel(
    ctx: &RoutingContext,
    channel_hint: Option<&str>,
    server_hint: Option<&str>,
) -> Result<ResolvedChannel, Error> {
    ctx.ready.await_ready(DEFAULT_READY_TIMEOUT).await?;
    let resolved = server::resolve_server(ctx.gateway.as_ref(), &ctx.registry, server_hint)?;

    if let Some(query) = channel_hint.map(str::trim).filter(|c| !c.is_empty()) {
        return channel::resolve_channel(ctx.gateway.as_ref(), &resolved, query).await;
    }

    if let Some(default_id) = &ctx.default_channel_id {
        for candidate in ctx.gateway.cached_servers() {
            if let Some(hit) = ctx
                .gateway
                .cached_channels(&candidate.id)
                .into_iter()
                .find(|c| c.id == *default_id)
            {
                return Ok(ResolvedChannel::new(hit, candidate));
            }
        }
        tracing::warn!(channel = %default_id, "default channel id not present in any cached server");
    }

    Err(Error::NoChannelSpecified)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gateway::fake::FakeGateway;
    use crate::gateway::ready::ReadinessGate;
    use crate::registry::{ServerRegistry, UserAliases};
    use std::sync::Arc;

    fn context(fake: FakeGateway, default_channel: Option<&str>) -> RoutingContext {
        let ready = ReadinessGate::new();
        ready.mark_ready();
        RoutingContext {
            gateway: Arc::new(fake),
            registry: ServerRegistry::new(vec![
                ("work".to_string(), "111".to_string()),
                ("gaming".to_string(), "222".to_string()),
            ]),
            user_aliases: UserAliases::default(),
            default_channel_id: default_channel.map(str::to_string),
            ready,
        }
    }

    #[tokio::test]
    async fn test_explicit_channel_wins_over_default() {
        let fake = FakeGateway::new();
        fake.add_server("111", "Work Space", vec![FakeGateway::text_channel("5", "general")]);
        let ctx = context(fake, Some("9"));
        let resolved = resolve_routed_channel(&ctx, Some("general"), None).await.unwrap();
        assert_eq!(resolved.id, "5");
    }

    #[tokio::test]
    async fn test_default_channel_found_across_servers() {
        let fake = FakeGateway::new();
        fake.add_server("111", "Work Space", vec![]);
        fake.add_server("222", "Game Night", vec![FakeGateway::text_channel("9", "alerts")]);
        let ctx = context(fake, Some("9"));
        // Routing targets "work", the default channel lives in "gaming".
        let resolved = resolve_routed_channel(&ctx, None, Some("work")).await.unwrap();
        assert_eq!(resolved.id, "9");
        assert_eq!(resolved.server.id, "222");
    }

    #[tokio::test]
    async fn test_no_channel_and_no_default_fails() {
        let fake = FakeGateway::new();
        fake.add_server("111", "Work Space", vec![]);
        let ctx = context(fake, None);
        let err = resolve_routed_channel(&ctx, None, None).await.unwrap_err();
        assert!(matches!(err, Error::NoChannelSpecified));
    }

    #[tokio::test]
    async fn test_missing_default_channel_still_reports_no_channel() {
        let fake = FakeGateway::new();
        fake.add_server("111", "Work Space", vec![]);
        let ctx = context(fake, Some("404"));
        let err = resolve_routed_channel(&ctx, None, None).await.unwrap_err();
        assert!(matches!(err, Error::NoChannelSpecified));
    }

    #[tokio::test]
    async fn test_server_resolution_failure_propagates() {
        let fake = FakeGateway::new();
        fake.add_server("111", "Work Space", vec![]);
        let ctx = context(fake, None);
        let err = resolve_routed_channel(&ctx, Some("general"), Some("nowhere"))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::ServerNotFound(_)));
    }
}
