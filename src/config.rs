// Environment configuration, read once at startup and never reloaded.
//
// The server-alias map is a JSON object whose insertion order matters: the
// first entry becomes the default server when none is keyed "personal"
// (serde_json's preserve_order feature keeps the object ordered). Malformed
// map payloads fail soft to an empty map so a typo in one variable does not
// take the whole server down.

use std::collections::HashMap;

use crate::registry::{ServerRegistry, DEFAULT_ALIAS};

pub const ENV_TOKEN: &str = "DISCORD_TOKEN";
pub const ENV_GUILD_MAP: &str = "DISCORD_GUILD_IDS";
pub const ENV_LEGACY_GUILD: &str = "DISCORD_GUILD_ID";
pub const ENV_DEFAULT_CHANNEL: &str = "DISCORD_DEFAULT_CHANNEL_ID";
pub const ENV_USER_ALIASES: &str = "DISCORD_USER_ALIASES";

#[derive(Debug)]
pub struct Config {
    pub token: String,
    pub servers: ServerRegistry,
    pub default_channel_id: Option<String>,
    pub user_aliases: HashMap<String, String>,
}

pub fn load_from_env() -> anyhow::Result<Config> {
    let token = std::env::var(ENV_TOKEN)
        .map_err(|_| anyhow::anyhow!("{} is not set", ENV_TOKEN))?;

    let servers = parse_server_map(
        std::env::var(ENV_GUILD_MAP).ok().as_deref(),
        std::env::var(ENV_LEGACY_GUILD).ok().as_deref(),
    );
    let user_aliases = parse_user_map(std::env::var(ENV_USER_ALIASES).ok().as_deref());
    let default_channel_id = std::env::var(ENV_DEFAULT_CHANNEL)
        .ok()
        .filter(|v| !v.trim().is_empty());

    Ok(Config {
        token,
        servers,
        default_channel_id,
        user_aliases,
    })
}

/// Build the server registry from the JSON alias map, falling back to the
/// legacy single-server variable (folded in under the "personal" alias so it
/// becomes the default). A malformed map is treated as absent.
fn parse_server_map(map_json: Option<&str>, legacy_id: Option<&str>) -> ServerRegistry {
    if let Some(raw) = map_json {
        match serde_json::from_str::<serde_json::Map<String, serde_json::Value>>(raw) {
            Ok(map) => {
                let entries = map
                    .into_iter()
                    .filter_map(|(alias, value)| {
                        value.as_str().map(|id| (alias, id.to_string()))
                    })
                    .collect();
                return ServerRegistry::new(entries);
            }
            Err(e) => {
                tracing::warn!(error = %e, "{} is not a valid JSON object; ignoring", ENV_GUILD_MAP);
            }
        }
    }
    if let Some(id) = legacy_id.filter(|v| !v.trim().is_empty()) {
        return ServerRegistry::new(vec![(DEFAULT_ALIAS.to_string(), id.trim().to_string())]);
    }
    ServerRegistry::default()
}

fn parse_user_map(raw: Option<&str>) -> HashMap<String, String> {
    let Some(raw) = raw else {
        return HashMap::new();
    };
    match serde_json::from_str::<HashMap<String, String>>(raw) {
        Ok(map) => map,
        Err(e) => {
            tracing::warn!(error = %e, "{} is not a valid JSON object; ignoring", ENV_USER_ALIASES);
            HashMap::new()
        }
    }
}
