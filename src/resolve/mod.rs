// Identity resolution: loose, human-supplied identifiers (aliases, names,
// partial hints) are turned into concrete remote-entity handles against the
// gateway's live cache. All shared state travels in one context object so
// resolution stays free of ambient globals and tests can inject fixtures.

pub mod channel;
pub mod route;
pub mod server;
pub mod user;

use std::sync::Arc;

use crate::gateway::ready::ReadinessGate;
use crate::gateway::{ChannelHandle, ChatGateway, ServerHandle};
use crate::registry::{ServerRegistry, UserAliases};

pub struct RoutingContext {
    pub gateway: Arc<dyn ChatGateway>,
    pub registry: ServerRegistry,
    pub user_aliases: UserAliases,
    pub default_channel_id: Option<String>,
    pub ready: ReadinessGate,
}

/// A channel resolved for one call: a snapshot of the cache entry plus its
/// owning server. Never stored; every tool invocation re-resolves.
#[derive(Debug, Clone)]
pub struct ResolvedChannel {
    pub id: String,
    pub name: String,
    pub server: ServerHandle,
}

impl ResolvedChannel {
    pub fn new(channel: ChannelHandle, server: ServerHandle) -> Self {
        Self {
            id: channel.id,
            name: channel.name,
            server,
        }
    }
}
