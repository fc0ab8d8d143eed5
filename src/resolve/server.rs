use crate::error::Error;
use crate::gateway::{ChatGateway, ServerHandle};
use crate::registry::ServerRegistry;

/// Resolve a server from an optional hint. With a hint the order is:
/// registry alias (case-insensitive), then raw id for all-digit hints, then
/// case-insensitive name scan of the live cache. Without a hint the
/// registry's default alias is used.
pub fn resolve_server(
    gateway: &dyn ChatGateway,
    registry: &ServerRegistry,
    hint: Option<&str>,
) -> Result<ServerHandle, Error> {
    match hint.map(str::trim).filter(|h| !h.is_empty()) {
        Some(query) => resolve_hinted(gateway, registry, query),
        None => resolve_default(gateway, registry),
    }
}

fn resolve_default(
    gateway: &dyn ChatGateway,
    registry: &ServerRegistry,
) -> Result<ServerHandle, Error> {
    let alias = registry.default_alias();
    let id = registry.get(alias).ok_or_else(|| {
        Error::ServerNotFound(format!("no servers configured (default alias \"{alias}\")"))
    })?;
    gateway.cached_server(id).ok_or_else(|| {
        Error::ServerNotFound(format!(
            "default alias \"{alias}\" maps to server {id}, which the bot is not connected to"
        ))
    })
}

fn resolve_hinted(
    gateway: &dyn ChatGateway,
    registry: &ServerRegistry,
    query: &str,
) -> Result<ServerHandle, Error> {
    if let Some(id) = registry.get(query) {
        // A registered alias pointing at an unknown server is a
        // configuration error; report it, do not fall through.
        return gateway.cached_server(id).ok_or_else(|| {
            Error::ServerNotFound(format!(
                "alias \"{query}\" maps to server {id}, which the bot is not connected to"
            ))
        });
    }
    if is_all_digits(query) {
        return gateway
            .cached_server(query)
            .ok_or_else(|| not_found(registry, query));
    }
    gateway
        .cached_servers()
        .into_iter()
        .find(|s| s.name.eq_ignore_ascii_case(query))
        .ok_or_else(|| not_found(registry, query))
}

fn not_found(registry: &ServerRegistry, query: &str) -> Error {
    let aliases = registry.aliases();
    if aliases.is_empty() {
        Error::ServerNotFound(format!(
            "\"{query}\" matched no alias, server id, or server name (no aliases configured)"
        ))
    } else {
        Error::ServerNotFound(format!(
            "\"{query}\" matched no alias, server id, or server name; known aliases: {}",
            aliases.join(", ")
        ))
    }
}

pub(crate) fn is_all_digits(s: &str) -> bool {
    !s.is_empty() && s.chars().all(|c| c.is_ascii_digit())
}
