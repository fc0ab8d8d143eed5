// The narrow interface to the Discord connection. Resolvers and the tool
// dispatcher only ever see this trait plus the owned snapshot types below;
// the connection machinery itself (auth, caching, REST plumbing) lives in
// the adapter implementations.

pub mod ready;
pub mod rest;

#[cfg(test)]
pub mod fake;

use async_trait::async_trait;
use thiserror::Error;

/// Failure surfaced by the connection collaborator itself (network error,
/// permission denial, unknown id). Passed through to the caller once; no
/// retries anywhere.
#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("http request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("discord api returned {status}: {message}")]
    Api { status: u16, message: String },
}

/// Snapshot of a server (guild) cache entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerHandle {
    pub id: String,
    pub name: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelKind {
    Text,
    Voice,
    Category,
    Announcement,
    Forum,
    Other,
}

impl ChannelKind {
    /// Channels that can carry ordinary text messages; name-based channel
    /// resolution only considers these.
    pub fn is_text(self) -> bool {
        matches!(self, Self::Text | Self::Announcement)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Text => "text",
            Self::Voice => "voice",
            Self::Category => "category",
            Self::Announcement => "announcement",
            Self::Forum => "forum",
            Self::Other => "other",
        }
    }

    pub fn from_discord(raw: u8) -> Self {
        match raw {
            0 => Self::Text,
            2 => Self::Voice,
            4 => Self::Category,
            5 => Self::Announcement,
            15 => Self::Forum,
            _ => Self::Other,
        }
    }
}

/// Snapshot of a channel cache entry within one server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelHandle {
    pub id: String,
    pub name: String,
    pub kind: ChannelKind,
    pub category: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserHandle {
    pub id: String,
    pub username: String,
    pub global_name: Option<String>,
    pub bot: bool,
}

/// A user seen through a server membership: adds the per-server display
/// name (nickname, falling back to global name, then username).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemberHandle {
    pub id: String,
    pub username: String,
    pub display_name: String,
    pub global_name: Option<String>,
    pub bot: bool,
}

impl MemberHandle {
    pub fn to_user(&self) -> UserHandle {
        UserHandle {
            id: self.id.clone(),
            username: self.username.clone(),
            global_name: self.global_name.clone(),
            bot: self.bot,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageRecord {
    pub author: String,
    pub content: String,
    pub timestamp: String,
    pub attachments: Vec<String>,
}

/// Capability object for the remote chat platform. Cached collections are
/// owned and mutated solely by the implementation; callers only read them
/// or request a refresh.
#[async_trait]
pub trait ChatGateway: Send + Sync {
    /// Servers the bot is joined to, in cache order.
    fn cached_servers(&self) -> Vec<ServerHandle>;

    fn cached_server(&self, id: &str) -> Option<ServerHandle>;

    fn cached_channels(&self, server_id: &str) -> Vec<ChannelHandle>;

    /// Force a full channel-list fetch for one server, updating the cache.
    async fn refresh_channels(&self, server_id: &str) -> Result<Vec<ChannelHandle>, GatewayError>;

    async fn fetch_user(&self, user_id: &str) -> Result<UserHandle, GatewayError>;

    /// Bounded member search by name prefix within one server.
    async fn search_members(
        &self,
        server_id: &str,
        query: &str,
        limit: u8,
    ) -> Result<Vec<MemberHandle>, GatewayError>;

    async fn list_members(
        &self,
        server_id: &str,
        limit: u16,
    ) -> Result<Vec<MemberHandle>, GatewayError>;

    async fn send_message(&self, channel_id: &str, content: &str) -> Result<(), GatewayError>;

    async fn send_file(
        &self,
        channel_id: &str,
        file_name: &str,
        bytes: Vec<u8>,
        content: Option<&str>,
    ) -> Result<(), GatewayError>;

    /// Open (or reuse) the DM channel with a user, returning its channel id.
    async fn open_direct_channel(&self, user_id: &str) -> Result<String, GatewayError>;

    /// Fetch recent messages, newest first (the platform's native order).
    async fn read_messages(
        &self,
        channel_id: &str,
        limit: u8,
    ) -> Result<Vec<MessageRecord>, GatewayError>;
}
