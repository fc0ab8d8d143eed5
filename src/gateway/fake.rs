// In-memory gateway for resolver and dispatcher tests. Channels registered
// as "hidden" only become visible after a forced refresh, mimicking the
// lazily populated live cache.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, PoisonError};

use async_trait::async_trait;

use crate::gateway::{
    ChannelHandle, ChannelKind, ChatGateway, GatewayError, MemberHandle, MessageRecord,
    ServerHandle, UserHandle,
};

#[derive(Debug, Clone)]
pub struct SentMessage {
    pub channel_id: String,
    pub content: String,
}

#[derive(Debug, Clone)]
pub struct SentFile {
    pub channel_id: String,
    pub file_name: String,
    pub bytes: Vec<u8>,
    pub content: Option<String>,
}

#[derive(Default)]
pub struct FakeGateway {
    servers: Mutex<Vec<(ServerHandle, Vec<ChannelHandle>)>>,
    hidden: Mutex<HashMap<String, Vec<ChannelHandle>>>,
    users: Mutex<HashMap<String, UserHandle>>,
    members: Mutex<HashMap<String, Vec<MemberHandle>>>,
    messages: Mutex<HashMap<String, Vec<MessageRecord>>>,
    pub sent: Mutex<Vec<SentMessage>>,
    pub sent_files: Mutex<Vec<SentFile>>,
    pub refreshes: AtomicUsize,
    pub member_limits: Mutex<Vec<u16>>,
}

fn lock<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl FakeGateway {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn text_channel(id: &str, name: &str) -> ChannelHandle {
        ChannelHandle {
            id: id.to_string(),
            name: name.to_string(),
            kind: ChannelKind::Text,
            category: None,
        }
    }

    pub fn add_server(&self, id: &str, name: &str, channels: Vec<ChannelHandle>) {
        lock(&self.servers).push((
            ServerHandle {
                id: id.to_string(),
                name: name.to_string(),
            },
            channels,
        ));
    }

    /// Register a channel that only appears after a forced refresh.
    pub fn add_hidden_channel(&self, server_id: &str, channel: ChannelHandle) {
        lock(&self.hidden)
            .entry(server_id.to_string())
            .or_default()
            .push(channel);
    }

    pub fn add_user(&self, user: UserHandle) {
        lock(&self.users).insert(user.id.clone(), user);
    }

    pub fn add_member(&self, server_id: &str, member: MemberHandle) {
        lock(&self.members)
            .entry(server_id.to_string())
            .or_default()
            .push(member);
    }

    /// Seed a channel's history, newest first (the platform's fetch order).
    pub fn set_messages(&self, channel_id: &str, newest_first: Vec<MessageRecord>) {
        lock(&self.messages).insert(channel_id.to_string(), newest_first);
    }

    pub fn sent_contents(&self) -> Vec<String> {
        lock(&self.sent).iter().map(|m| m.content.clone()).collect()
    }
}

#[async_trait]
impl ChatGateway for FakeGateway {
    fn cached_servers(&self) -> Vec<ServerHandle> {
        lock(&self.servers).iter().map(|(s, _)| s.clone()).collect()
    }

    fn cached_server(&self, id: &str) -> Option<ServerHandle> {
        lock(&self.servers)
            .iter()
            .find(|(s, _)| s.id == id)
            .map(|(s, _)| s.clone())
    }

    fn cached_channels(&self, server_id: &str) -> Vec<ChannelHandle> {
        lock(&self.servers)
            .iter()
            .find(|(s, _)| s.id == server_id)
            .map(|(_, channels)| channels.clone())
            .unwrap_or_default()
    }

    async fn refresh_channels(&self, server_id: &str) -> Result<Vec<ChannelHandle>, GatewayError> {
        self.refreshes.fetch_add(1, Ordering::SeqCst);
        let newly_visible = lock(&self.hidden).remove(server_id).unwrap_or_default();
        let mut servers = lock(&self.servers);
        let Some((_, channels)) = servers.iter_mut().find(|(s, _)| s.id == server_id) else {
            return Ok(Vec::new());
        };
        channels.extend(newly_visible);
        Ok(channels.clone())
    }

    async fn fetch_user(&self, user_id: &str) -> Result<UserHandle, GatewayError> {
        lock(&self.users)
            .get(user_id)
            .cloned()
            .ok_or(GatewayError::Api {
                status: 404,
                message: "Unknown User".to_string(),
            })
    }

    async fn search_members(
        &self,
        server_id: &str,
        query: &str,
        limit: u8,
    ) -> Result<Vec<MemberHandle>, GatewayError> {
        let query = query.to_lowercase();
        Ok(lock(&self.members)
            .get(server_id)
            .map(|members| {
                members
                    .iter()
                    .filter(|m| {
                        m.username.to_lowercase().starts_with(&query)
                            || m.display_name.to_lowercase().starts_with(&query)
                            || m.global_name
                                .as_deref()
                                .is_some_and(|g| g.to_lowercase().starts_with(&query))
                    })
                    .take(limit as usize)
                    .cloned()
                    .collect()
            })
            .unwrap_or_default())
    }

    async fn list_members(
        &self,
        server_id: &str,
        limit: u16,
    ) -> Result<Vec<MemberHandle>, GatewayError> {
        lock(&self.member_limits).push(limit);
        Ok(lock(&self.members)
            .get(server_id)
            .map(|members| members.iter().take(limit as usize).cloned().collect())
            .unwrap_or_default())
    }

    async fn send_message(&self, channel_id: &str, content: &str) -> Result<(), GatewayError> {
        lock(&self.sent).push(SentMessage {
            channel_id: channel_id.to_string(),
            content: content.to_string(),
        });
        Ok(())
    }

    async fn send_file(
        &self,
        channel_id: &str,
        file_name: &str,
        bytes: Vec<u8>,
        content: Option<&str>,
    ) -> Result<(), GatewayError> {
        lock(&self.sent_files).push(SentFile {
            channel_id: channel_id.to_string(),
            file_name: file_name.to_string(),
            bytes,
            content: content.map(str::to_string),
        });
        Ok(())
    }

    async fn open_direct_channel(&self, user_id: &str) -> Result<String, GatewayError> {
        Ok(format!("dm-{user_id}"))
    }

    async fn read_messages(
        &self,
        channel_id: &str,
        limit: u8,
    ) -> Result<Vec<MessageRecord>, GatewayError> {
        Ok(lock(&self.messages)
            .get(channel_id)
            .map(|messages| messages.iter().take(limit as usize).cloned().collect())
            .unwrap_or_default())
    }
}
