// Discord REST v10 implementation of the gateway capability.
//
// `login()` runs once in the background at startup: it validates the bot
// token, snapshots the joined servers and their channels into the local
// cache, and opens the readiness gate. Everything else is a single REST
// call; failures surface once to the caller with no retry or backoff.

use std::collections::HashMap;
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use async_trait::async_trait;
use reqwest::header;
use serde::de::DeserializeOwned;
use serde::Deserialize;

use crate::gateway::ready::ReadinessGate;
use crate::gateway::{
    ChannelHandle, ChannelKind, ChatGateway, GatewayError, MemberHandle, MessageRecord,
    ServerHandle, UserHandle,
};

const API_BASE: &str = "https://discord.com/api/v10";

// ── Wire shapes ───────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct ApiUser {
    id: String,
    username: String,
    #[serde(default)]
    global_name: Option<String>,
    #[serde(default)]
    bot: bool,
}

#[derive(Debug, Deserialize)]
struct ApiGuild {
    id: String,
    name: String,
}

#[derive(Debug, Deserialize)]
struct ApiChannel {
    id: String,
    #[serde(default)]
    name: Option<String>,
    #[serde(rename = "type")]
    kind: u8,
    #[serde(default)]
    parent_id: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ApiMember {
    user: ApiUser,
    #[serde(default)]
    nick: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ApiAttachment {
    url: String,
}

#[derive(Debug, Deserialize)]
struct ApiMessage {
    content: String,
    timestamp: String,
    author: ApiUser,
    #[serde(default)]
    attachments: Vec<ApiAttachment>,
}

// ── Adapter ───────────────────────────────────────────────────────────

struct CachedServer {
    server: ServerHandle,
    channels: Vec<ChannelHandle>,
}

pub struct RestGateway {
    http: reqwest::Client,
    token: String,
    ready: ReadinessGate,
    cache: RwLock<Vec<CachedServer>>,
}

impl RestGateway {
    pub fn new(token: String, ready: ReadinessGate) -> anyhow::Result<Self> {
        let http = reqwest::Client::builder()
            .user_agent(concat!("DiscordBot (discord-mcp, ", env!("CARGO_PKG_VERSION"), ")"))
            .build()?;
        Ok(Self {
            http,
            token,
            ready,
            cache: RwLock::new(Vec::new()),
        })
    }

    /// One-time login: validate the token, populate the server/channel
    /// cache, open the readiness gate.
    pub async fn login(&self) -> Result<(), GatewayError> {
        let me: ApiUser = self.get("/users/@me", &[]).await?;
        tracing::info!(user = %me.username, "authenticated with Discord");

        let guilds: Vec<ApiGuild> = self.get("/users/@me/guilds", &[]).await?;
        let mut servers = Vec::with_capacity(guilds.len());
        for guild in guilds {
            let channels = match self.fetch_channels(&guild.id).await {
                Ok(channels) => channels,
                Err(e) => {
                    tracing::warn!(server = %guild.id, error = %e, "could not list channels during login");
                    Vec::new()
                }
            };
            servers.push(CachedServer {
                server: ServerHandle {
                    id: guild.id,
                    name: guild.name,
                },
                channels,
            });
        }
        tracing::info!(servers = servers.len(), "server cache populated");

        *write(&self.cache) = servers;
        self.ready.mark_ready();
        Ok(())
    }

    async fn fetch_channels(&self, server_id: &str) -> Result<Vec<ChannelHandle>, GatewayError> {
        let raw: Vec<ApiChannel> = self.get(&format!("/guilds/{server_id}/channels"), &[]).await?;
        Ok(to_channel_handles(&raw))
    }

    async fn get<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<T, GatewayError> {
        let response = self
            .http
            .get(format!("{API_BASE}{path}"))
            .query(query)
            .header(header::AUTHORIZATION, format!("Bot {}", self.token))
            .send()
            .await?;
        Ok(Self::check(response).await?.json().await?)
    }

    async fn post<T: DeserializeOwned>(
        &self,
        path: &str,
        body: &serde_json::Value,
    ) -> Result<T, GatewayError> {
        let response = self
            .http
            .post(format!("{API_BASE}{path}"))
            .header(header::AUTHORIZATION, format!("Bot {}", self.token))
            .json(body)
            .send()
            .await?;
        Ok(Self::check(response).await?.json().await?)
    }

    async fn check(response: reqwest::Response) -> Result<reqwest::Response, GatewayError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let message = response.text().await.unwrap_or_default();
        Err(GatewayError::Api {
            status: status.as_u16(),
            message,
        })
    }
}

/// Map raw channels to handles, resolving each channel's parent category
/// name from the same listing.
fn to_channel_handles(raw: &[ApiChannel]) -> Vec<ChannelHandle> {
    let categories: HashMap<&str, &str> = raw
        .iter()
        .filter(|c| ChannelKind::from_discord(c.kind) == ChannelKind::Category)
        .filter_map(|c| c.name.as_deref().map(|name| (c.id.as_str(), name)))
        .collect();
    raw.iter()
        .map(|c| ChannelHandle {
            id: c.id.clone(),
            name: c.name.clone().unwrap_or_default(),
            kind: ChannelKind::from_discord(c.kind),
            category: c
                .parent_id
                .as_deref()
                .and_then(|p| categories.get(p).map(|name| (*name).to_string())),
        })
        .collect()
}

fn to_member_handle(member: &ApiMember) -> MemberHandle {
    let display_name = member
        .nick
        .clone()
        .or_else(|| member.user.global_name.clone())
        .unwrap_or_else(|| member.user.username.clone());
    MemberHandle {
        id: member.user.id.clone(),
        username: member.user.username.clone(),
        display_name,
        global_name: member.user.global_name.clone(),
        bot: member.user.bot,
    }
}

fn read<T>(lock: &RwLock<T>) -> RwLockReadGuard<'_, T> {
    lock.read().unwrap_or_else(PoisonError::into_inner)
}

fn write<T>(lock: &RwLock<T>) -> RwLockWriteGuard<'_, T> {
    lock.write().unwrap_or_else(PoisonError::into_inner)
}

#[async_trait]
impl ChatGateway for RestGateway {
    fn cached_servers(&self) -> Vec<ServerHandle> {
        read(&self.cache).iter().map(|s| s.server.clone()).collect()
    }

    fn cached_server(&self, id: &str) -> Option<ServerHandle> {
        read(&self.cache)
            .iter()
            .find(|s| s.server.id == id)
            .map(|s| s.server.clone())
    }

    fn cached_channels(&self, server_id: &str) -> Vec<ChannelHandle> {
        read(&self.cache)
            .iter()
            .find(|s| s.server.id == server_id)
            .map(|s| s.channels.clone())
            .unwrap_or_default()
    }

    async fn refresh_channels(&self, server_id: &str) -> Result<Vec<ChannelHandle>, GatewayError> {
        let channels = self.fetch_channels(server_id).await?;
        if let Some(entry) = write(&self.cache)
            .iter_mut()
            .find(|s| s.server.id == server_id)
        {
            entry.channels = channels.clone();
        }
        Ok(channels)
    }

    async fn fetch_user(&self, user_id: &str) -> Result<UserHandle, GatewayError> {
        let user: ApiUser = self.get(&format!("/users/{user_id}"), &[]).await?;
        Ok(UserHandle {
            id: user.id,
            username: user.username,
            global_name: user.global_name,
            bot: user.bot,
        })
    }

    async fn search_members(
        &self,
        server_id: &str,
        query: &str,
        limit: u8,
    ) -> Result<Vec<MemberHandle>, GatewayError> {
        let members: Vec<ApiMember> = self
            .get(
                &format!("/guilds/{server_id}/members/search"),
                &[("query", query.to_string()), ("limit", limit.to_string())],
            )
            .await?;
        Ok(members.iter().map(to_member_handle).collect())
    }

    async fn list_members(
        &self,
        server_id: &str,
        limit: u16,
    ) -> Result<Vec<MemberHandle>, GatewayError> {
        let members: Vec<ApiMember> = self
            .get(
                &format!("/guilds/{server_id}/members"),
                &[("limit", limit.to_string())],
            )
            .await?;
        Ok(members.iter().map(to_member_handle).collect())
    }

    async fn send_message(&self, channel_id: &str, content: &str) -> Result<(), GatewayError> {
        let _: serde_json::Value = self
            .post(
                &format!("/channels/{channel_id}/messages"),
                &serde_json::json!({ "content": content }),
            )
            .await?;
        Ok(())
    }

    async fn send_file(
        &self,
        channel_id: &str,
        file_name: &str,
        bytes: Vec<u8>,
        content: Option<&str>,
    ) -> Result<(), GatewayError> {
        let payload = serde_json::json!({
            "content": content.unwrap_or_default(),
            "attachments": [{ "id": 0, "filename": file_name }],
        });
        let form = reqwest::multipart::Form::new()
            .text("payload_json", payload.to_string())
            .part(
                "files[0]",
                reqwest::multipart::Part::bytes(bytes).file_name(file_name.to_string()),
            );
        let response = self
            .http
            .post(format!("{API_BASE}/channels/{channel_id}/messages"))
            .header(header::AUTHORIZATION, format!("Bot {}", self.token))
            .multipart(form)
            .send()
            .await?;
        Self::check(response).await?;
        Ok(())
    }

    async fn open_direct_channel(&self, user_id: &str) -> Result<String, GatewayError> {
        let channel: ApiChannel = self
            .post(
                "/users/@me/channels",
                &serde_json::json!({ "recipient_id": user_id }),
            )
            .await?;
        Ok(channel.id)
    }

    async fn read_messages(
        &self,
        channel_id: &str,
        limit: u8,
    ) -> Result<Vec<MessageRecord>, GatewayError> {
        let messages: Vec<ApiMessage> = self
            .get(
                &format!("/channels/{channel_id}/messages"),
                &[("limit", limit.to_string())],
            )
            .await?;
        Ok(messages
            .into_iter()
            .map(|m| MessageRecord {
                author: m.author.username,
                content: m.content,
                timestamp: m.timestamp,
                attachments: m.attachments.into_iter().map(|a| a.url).collect(),
            })
            .collect())
    }
}
