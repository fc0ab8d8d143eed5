use crate::error::Error;
use crate::gateway::{ChannelHandle, ChatGateway, ServerHandle};
use crate::resolve::ResolvedChannel;

/// Two-phase channel lookup within one server. Phase 1 is cache-only:
/// exact id match, then case-insensitive name match (with an optional
/// leading '#' stripped) restricted to text-capable channels. Phase 2 only
/// runs on a miss: force a full channel refresh and repeat the lookup.
///
/// The cache fills in lazily after connect, so the first reference to a
/// freshly created channel may predate a snapshot; refreshing on every call
/// would be wasteful, so the refresh is the fallback path, not the default.
pub async fn resolve_channel(
    gateway: &dyn ChatGateway,
    server: &ServerHandle,
    query: &str,
) -> Result<ResolvedChannel, Error> {
    if let Some(hit) = lookup(&gateway.cached_channels(&server.id), query) {
        return Ok(ResolvedChannel::new(hit, server.clone()));
    }
    let refreshed = gateway.refresh_channels(&server.id).await?;
    lookup(&refreshed, query)
        .map(|hit| ResolvedChannel::new(hit, server.clone()))
        .ok_or_else(|| {
            Error::ChannelNotFound(format!(
                "channel \"{query}\" not found in server \"{}\"",
                server.name
            ))
        })
}

fn lookup(channels: &[ChannelHandle], query: &str) -> Option<ChannelHandle> {
    if let Some(channel) = channels.iter().find(|c| c.id == query) {
        return Some(channel.clone());
    }
    let bare = query.strip_prefix('#').unwrap_or(query);
    channels
        .iter()
        .find(|c| {
            c.kind.is_text()
                && (c.name.eq_ignore_ascii_case(query) || c.name.eq_ignore_ascii_case(bare))
        })
        .cloned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gateway::fake::FakeGateway;
    use crate::gateway::ChannelKind;
    use std::sync::atomic::Ordering;

    fn server() -> ServerHandle {
        ServerHandle {
            id: "111".into(),
            name: "Work Space".into(),
        }
    }

    #[tokio::test]
    async fn test_cache_hit_by_id_skips_refresh() {
        let fake = FakeGateway::new();
        fake.add_server("111", "Work Space", vec![FakeGateway::text_channel("5", "general")]);
        let resolved = resolve_channel(&fake, &server(), "5").await.unwrap();
        assert_eq!(resolved.name, "general");
        assert_eq!(fake.refreshes.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_name_match_strips_hash_and_ignores_case() {
        let fake = FakeGateway::new();
        fake.add_server("111", "Work Space", vec![FakeGateway::text_channel("5", "General")]);
        let resolved = resolve_channel(&fake, &server(), "#general").await.unwrap();
        assert_eq!(resolved.id, "5");
    }

    #[tokio::test]
    async fn test_name_match_only_considers_text_capable_channels() {
        let fake = FakeGateway::new();
        let voice = ChannelHandle {
            id: "6".into(),
            name: "general".into(),
            kind: ChannelKind::Voice,
            category: None,
        };
        fake.add_server("111", "Work Space", vec![voice]);
        let err = resolve_channel(&fake, &server(), "general").await.unwrap_err();
        assert!(matches!(err, Error::ChannelNotFound(_)));
    }

    #[tokio::test]
    async fn test_miss_triggers_refresh_then_hits_in_same_call() {
        let fake = FakeGateway::new();
        fake.add_server("111", "Work Space", vec![]);
        fake.add_hidden_channel("111", FakeGateway::text_channel("7", "fresh"));
        let resolved = resolve_channel(&fake, &server(), "fresh").await.unwrap();
        assert_eq!(resolved.id, "7");
        assert_eq!(
            fake.refreshes.load(Ordering::SeqCst),
            1,
            "exactly one forced refresh on the fallback path"
        );
    }

    #[tokio::test]
    async fn test_exhausted_lookup_names_query_and_server() {
        let fake = FakeGateway::new();
        fake.add_server("111", "Work Space", vec![]);
        let err = resolve_channel(&fake, &server(), "ghost").await.unwrap_err();
        let message = err.to_string();
        assert!(message.contains("ghost"));
        assert!(message.contains("Work Space"));
    }
}
