use rmcp::{
    handler::server::{
        router::tool::ToolRouter, tool::ToolCallContext, wrapper::Parameters,
    },
    model::*,
    service::{RequestContext, RoleServer},
    tool, tool_router,
    ErrorData as McpError, ServerHandler,
};
use serde::Serialize;
use std::sync::Arc;

use crate::engine::text::{chunk_text, plan_code_block, CodeDelivery, MESSAGE_LIMIT};
use crate::error::Error;
use crate::gateway::ready::DEFAULT_READY_TIMEOUT;
use crate::resolve::{route, user, RoutingContext};

const MEMBER_LIMIT_DEFAULT: u16 = 50;
const MEMBER_LIMIT_MAX: u16 = 100;
const READ_LIMIT_DEFAULT: u8 = 10;
const READ_LIMIT_MAX: u8 = 50;

/// The MCP front end: a fixed tool catalog over the resolution core. Every
/// handler awaits readiness, resolves what it needs, performs one remote
/// operation, and hands its outcome to `reply`, which normalizes success
/// and failure into the uniform result envelope.
#[derive(Clone)]
pub struct DiscordEngine {
    tool_router: ToolRouter<Self>,
    ctx: Arc<RoutingContext>,
}

/// Dispatch-boundary normalization: success becomes a plain-text payload,
/// any error becomes an error-tagged payload. Nothing escapes to the
/// transport layer.
fn reply(result: Result<String, Error>) -> CallToolResult {
    match result {
        Ok(text) => CallToolResult::success(vec![Content::text(text)]),
        Err(e) => CallToolResult::error(vec![Content::text(e.to_string())]),
    }
}

// ── Argument structs ──────────────────────────────────────────────────

#[derive(serde::Deserialize, schemars::JsonSchema)]
pub struct SendMessageArgs {
    #[schemars(description = "Message text to send")]
    pub message: String,
    #[schemars(description = "Channel name (with or without #) or channel id; omit to use the default channel")]
    pub channel: Option<String>,
    #[schemars(description = "Server alias, id, or name; omit to use the default server")]
    pub server: Option<String>,
}

#[derive(serde::Deserialize, schemars::JsonSchema)]
pub struct SendCodeArgs {
    #[schemars(description = "Code to send as a fenced block")]
    pub code: String,
    #[schemars(description = "Syntax-highlighting language (e.g. rust, py)")]
    pub language: Option<String>,
    #[schemars(description = "Bold title line shown above the block")]
    pub title: Option<String>,
    #[schemars(description = "Channel name or id; omit to use the default channel")]
    pub channel: Option<String>,
    #[schemars(description = "Server alias, id, or name; omit to use the default server")]
    pub server: Option<String>,
}

#[derive(serde::Deserialize, schemars::JsonSchema)]
pub struct SendFileArgs {
    #[schemars(description = "Local path of the file to attach")]
    pub file_path: String,
    #[schemars(description = "Message text accompanying the attachment")]
    pub message: Option<String>,
    #[schemars(description = "Channel name or id; omit to use the default channel")]
    pub channel: Option<String>,
    #[schemars(description = "Server alias, id, or name; omit to use the default server")]
    pub server: Option<String>,
}

#[derive(serde::Deserialize, schemars::JsonSchema)]
pub struct SendImageArgs {
    #[schemars(description = "Local path of the image to attach")]
    pub image_path: String,
    #[schemars(description = "Message text accompanying the image")]
    pub message: Option<String>,
    #[schemars(description = "Channel name or id; omit to use the default channel")]
    pub channel: Option<String>,
    #[schemars(description = "Server alias, id, or name; omit to use the default server")]
    pub server: Option<String>,
}

#[derive(serde::Deserialize, schemars::JsonSchema)]
pub struct SendDirectMessageArgs {
    #[schemars(description = "User alias, id, username, or display name")]
    pub user: String,
    #[schemars(description = "Message text to send")]
    pub message: String,
    #[schemars(description = "Optional code block to include")]
    pub code: Option<String>,
    #[schemars(description = "Syntax-highlighting language for the code block")]
    pub language: Option<String>,
    #[schemars(description = "Local path of a file to attach")]
    pub file_path: Option<String>,
}

#[derive(serde::Deserialize, schemars::JsonSchema)]
pub struct ListChannelsArgs {
    #[schemars(description = "Server alias, id, or name; omit to use the default server")]
    pub server: Option<String>,
}

#[derive(serde::Deserialize, schemars::JsonSchema)]
pub struct ListMembersArgs {
    #[schemars(description = "Server alias, id, or name; omit to use the default server")]
    pub server: Option<String>,
    #[schemars(description = "Number of members to return (default 50, max 100)")]
    pub limit: Option<u16>,
}

#[derive(serde::Deserialize, schemars::JsonSchema)]
pub struct ReadMessagesArgs {
    #[schemars(description = "Channel name (with or without #) or channel id")]
    pub channel: String,
    #[schemars(description = "Server alias, id, or name; omit to use the default server")]
    pub server: Option<String>,
    #[schemars(description = "Number of messages to return (default 10, max 50)")]
    pub limit: Option<u8>,
}

#[derive(serde::Deserialize, schemars::JsonSchema)]
pub struct AddUserAliasArgs {
    #[schemars(description = "Friendly alias to register (stored lower-cased)")]
    pub alias: String,
    #[schemars(description = "Discord user id the alias maps to")]
    pub user_id: String,
}

// ── List records ──────────────────────────────────────────────────────

#[derive(Serialize)]
struct ChannelRecord {
    id: String,
    name: String,
    #[serde(rename = "type")]
    kind: &'static str,
    category: Option<String>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct MemberRecord {
    id: String,
    username: String,
    display_name: String,
    global_name: Option<String>,
    bot: bool,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ServerRecord {
    alias: String,
    id: String,
    name: String,
    is_default: bool,
}

#[derive(Serialize)]
struct MessageOut {
    author: String,
    content: String,
    timestamp: String,
    attachments: Vec<String>,
}

// ── Tool implementations ──────────────────────────────────────────────

#[tool_router]
impl DiscordEngine {
    pub fn new(ctx: Arc<RoutingContext>) -> Self {
        Self {
            tool_router: Self::tool_router(),
            ctx,
        }
    }

    #[tool(description = "Send a message to a Discord channel; text longer than 2000 characters is split into ordered chunks")]
    async fn send_message(
        &self,
        params: Parameters<SendMessageArgs>,
    ) -> Result<CallToolResult, McpError> {
        Ok(reply(self.do_send_message(params.0).await))
    }

    #[tool(description = "Send a fenced code block to a Discord channel; blocks too large for one message are delivered as a file attachment instead")]
    async fn send_code(
        &self,
        params: Parameters<SendCodeArgs>,
    ) -> Result<CallToolResult, McpError> {
        Ok(reply(self.do_send_code(params.0).await))
    }

    #[tool(description = "Attach a local file to a Discord channel, with an optional message")]
    async fn send_file(
        &self,
        params: Parameters<SendFileArgs>,
    ) -> Result<CallToolResult, McpError> {
        let args = params.0;
        Ok(reply(
            self.do_send_attachment(&args.file_path, args.message.as_deref(), args.channel.as_deref(), args.server.as_deref())
                .await,
        ))
    }

    #[tool(description = "Attach a local image to a Discord channel, with an optional message")]
    async fn send_image(
        &self,
        params: Parameters<SendImageArgs>,
    ) -> Result<CallToolResult, McpError> {
        let args = params.0;
        Ok(reply(
            self.do_send_attachment(&args.image_path, args.message.as_deref(), args.channel.as_deref(), args.server.as_deref())
                .await,
        ))
    }

    #[tool(description = "Send a direct message to a user, optionally with a code block and/or a file attachment")]
    async fn send_direct_message(
        &self,
        params: Parameters<SendDirectMessageArgs>,
    ) -> Result<CallToolResult, McpError> {
        Ok(reply(self.do_send_direct_message(params.0).await))
    }

    #[tool(description = "List the channels of a server with id, name, type, and category")]
    async fn list_channels(
        &self,
        params: Parameters<ListChannelsArgs>,
    ) -> Result<CallToolResult, McpError> {
        Ok(reply(self.do_list_channels(params.0).await))
    }

    #[tool(description = "List members of a server with id, username, display name, global name, and bot flag")]
    async fn list_members(
        &self,
        params: Parameters<ListMembersArgs>,
    ) -> Result<CallToolResult, McpError> {
        Ok(reply(self.do_list_members(params.0).await))
    }

    #[tool(description = "List the configured server aliases with their connection state and default flag")]
    async fn list_servers(&self) -> Result<CallToolResult, McpError> {
        Ok(reply(self.do_list_servers().await))
    }

    #[tool(description = "Read recent messages from a channel, oldest first")]
    async fn read_messages(
        &self,
        params: Parameters<ReadMessagesArgs>,
    ) -> Result<CallToolResult, McpError> {
        Ok(reply(self.do_read_messages(params.0).await))
    }

    #[tool(description = "Register a friendly alias for a user id, valid for this process only")]
    async fn add_user_alias(
        &self,
        params: Parameters<AddUserAliasArgs>,
    ) -> Result<CallToolResult, McpError> {
        Ok(reply(self.do_add_user_alias(params.0).await))
    }
}

impl DiscordEngine {
    async fn do_send_message(&self, args: SendMessageArgs) -> Result<String, Error> {
        let channel = route::resolve_routed_channel(
            &self.ctx,
            args.channel.as_deref(),
            args.server.as_deref(),
        )
        .await?;
        let chunks = chunk_text(&args.message, MESSAGE_LIMIT);
        for chunk in &chunks {
            self.ctx.gateway.send_message(&channel.id, chunk).await?;
        }
        Ok(format!(
            "Message sent to #{} in {} ({} message(s))",
            channel.name,
            channel.server.name,
            chunks.len()
        ))
    }

    async fn do_send_code(&self, args: SendCodeArgs) -> Result<String, Error> {
        let channel = route::resolve_routed_channel(
            &self.ctx,
            args.channel.as_deref(),
            args.server.as_deref(),
        )
        .await?;
        match plan_code_block(&args.code, args.language.as_deref(), args.title.as_deref()) {
            CodeDelivery::Inline(text) => {
                self.ctx.gateway.send_message(&channel.id, &text).await?;
                Ok(format!(
                    "Code block sent to #{} in {}",
                    channel.name, channel.server.name
                ))
            }
            CodeDelivery::File { file_name, content } => {
                self.ctx
                    .gateway
                    .send_file(
                        &channel.id,
                        &file_name,
                        args.code.into_bytes(),
                        content.as_deref(),
                    )
                    .await?;
                Ok(format!(
                    "Code exceeded the message limit; sent to #{} in {} as {}",
                    channel.name, channel.server.name, file_name
                ))
            }
        }
    }

    async fn do_send_attachment(
        &self,
        path: &str,
        message: Option<&str>,
        channel: Option<&str>,
        server: Option<&str>,
    ) -> Result<String, Error> {
        let resolved = route::resolve_routed_channel(&self.ctx, channel, server).await?;
        let bytes = read_attachment(path).await?;
        let file_name = file_name_of(path);
        self.ctx
            .gateway
            .send_file(&resolved.id, &file_name, bytes, message)
            .await?;
        Ok(format!(
            "{} sent to #{} in {}",
            file_name, resolved.name, resolved.server.name
        ))
    }

    async fn do_send_direct_message(&self, args: SendDirectMessageArgs) -> Result<String, Error> {
        self.ctx.ready.await_ready(DEFAULT_READY_TIMEOUT).await?;
        let user = user::resolve_user(&self.ctx, &args.user).await?;
        let dm = self.ctx.gateway.open_direct_channel(&user.id).await?;

        let mut parts = vec!["message"];
        for chunk in &chunk_text(&args.message, MESSAGE_LIMIT) {
            self.ctx.gateway.send_message(&dm, chunk).await?;
        }
        if let Some(code) = &args.code {
            match plan_code_block(code, args.language.as_deref(), None) {
                CodeDelivery::Inline(text) => {
                    self.ctx.gateway.send_message(&dm, &text).await?;
                }
                CodeDelivery::File { file_name, content } => {
                    self.ctx
                        .gateway
                        .send_file(&dm, &file_name, code.clone().into_bytes(), content.as_deref())
                        .await?;
                }
            }
            parts.push("code");
        }
        if let Some(path) = &args.file_path {
            let bytes = read_attachment(path).await?;
            self.ctx
                .gateway
                .send_file(&dm, &file_name_of(path), bytes, None)
                .await?;
            parts.push("file");
        }
        Ok(format!(
            "Direct message sent to {} ({})",
            user.username,
            parts.join(" + ")
        ))
    }

    async fn do_list_channels(&self, args: ListChannelsArgs) -> Result<String, Error> {
        self.ctx.ready.await_ready(DEFAULT_READY_TIMEOUT).await?;
        let server = crate::resolve::server::resolve_server(
            self.ctx.gateway.as_ref(),
            &self.ctx.registry,
            args.server.as_deref(),
        )?;
        let channels = self.ctx.gateway.refresh_channels(&server.id).await?;
        let records: Vec<ChannelRecord> = channels
            .into_iter()
            .map(|c| ChannelRecord {
                id: c.id,
                name: c.name,
                kind: c.kind.as_str(),
                category: c.category,
            })
            .collect();
        Ok(serde_json::to_string(&records).unwrap_or_default())
    }

    async fn do_list_members(&self, args: ListMembersArgs) -> Result<String, Error> {
        self.ctx.ready.await_ready(DEFAULT_READY_TIMEOUT).await?;
        let server = crate::resolve::server::resolve_server(
            self.ctx.gateway.as_ref(),
            &self.ctx.registry,
            args.server.as_deref(),
        )?;
        let limit = args
            .limit
            .unwrap_or(MEMBER_LIMIT_DEFAULT)
            .min(MEMBER_LIMIT_MAX);
        let members = self.ctx.gateway.list_members(&server.id, limit).await?;
        let records: Vec<MemberRecord> = members
            .into_iter()
            .map(|m| MemberRecord {
                id: m.id,
                username: m.username,
                display_name: m.display_name,
                global_name: m.global_name,
                bot: m.bot,
            })
            .collect();
        Ok(serde_json::to_string(&records).unwrap_or_default())
    }

    async fn do_list_servers(&self) -> Result<String, Error> {
        self.ctx.ready.await_ready(DEFAULT_READY_TIMEOUT).await?;
        let default_alias = self.ctx.registry.default_alias().to_string();
        let records: Vec<ServerRecord> = self
            .ctx
            .registry
            .entries()
            .map(|(alias, id)| ServerRecord {
                alias: alias.to_string(),
                id: id.to_string(),
                name: self
                    .ctx
                    .gateway
                    .cached_server(id)
                    .map(|s| s.name)
                    .unwrap_or_else(|| "not connected".to_string()),
                is_default: alias.eq_ignore_ascii_case(&default_alias),
            })
            .collect();
        Ok(serde_json::to_string(&records).unwrap_or_default())
    }

    async fn do_read_messages(&self, args: ReadMessagesArgs) -> Result<String, Error> {
        let channel = route::resolve_routed_channel(
            &self.ctx,
            Some(&args.channel),
            args.server.as_deref(),
        )
        .await?;
        let limit = args.limit.unwrap_or(READ_LIMIT_DEFAULT).min(READ_LIMIT_MAX);
        let mut messages = self.ctx.gateway.read_messages(&channel.id, limit).await?;
        // The fetch returns newest first; emit chronological ascending.
        messages.reverse();
        let records: Vec<MessageOut> = messages
            .into_iter()
            .map(|m| MessageOut {
                author: m.author,
                content: m.content,
                timestamp: m.timestamp,
                attachments: m.attachments,
            })
            .collect();
        Ok(serde_json::to_string(&records).unwrap_or_default())
    }

    async fn do_add_user_alias(&self, args: AddUserAliasArgs) -> Result<String, Error> {
        self.ctx.ready.await_ready(DEFAULT_READY_TIMEOUT).await?;
        self.ctx.user_aliases.insert(&args.alias, &args.user_id);
        Ok(format!(
            "Alias \"{}\" now maps to user {} (for this process only)",
            args.alias.to_lowercase(),
            args.user_id
        ))
    }
}

#[allow(clippy::manual_async_fn)]
impl ServerHandler for DiscordEngine {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            protocol_version: ProtocolVersion::V_2024_11_05,
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            server_info: Implementation::from_build_env(),
            instructions: Some(
                "Discord messaging tools. Channels and servers accept aliases, \
                 names, or raw ids; server aliases, a default channel, and user \
                 aliases are configured through the environment."
                    .into(),
            ),
            ..Default::default()
        }
    }

    fn list_tools(
        &self,
        _request: Option<PaginatedRequestParam>,
        _context: RequestContext<RoleServer>,
    ) -> impl std::future::Future<Output = Result<ListToolsResult, McpError>> + Send + '_ {
        async {
            Ok(ListToolsResult {
                tools: self.tool_router.list_all(),
                next_cursor: None,
            })
        }
    }

    fn call_tool(
        &self,
        request: CallToolRequestParam,
        context: RequestContext<RoleServer>,
    ) -> impl std::future::Future<Output = Result<CallToolResult, McpError>> + Send + '_ {
        async move {
            // Unknown tools get the same error-tagged payload as every
            // other failure instead of a protocol error.
            if !self.tool_router.has_route(request.name.as_ref()) {
                return Ok(reply(Err(Error::UnknownTool(request.name.to_string()))));
            }
            let context = ToolCallContext::new(self, request, context);
            self.tool_router.call(context).await
        }
    }
}

async fn read_attachment(path: &str) -> Result<Vec<u8>, Error> {
    match tokio::fs::read(path).await {
        Ok(bytes) => Ok(bytes),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            Err(Error::FileNotFound(path.to_string()))
        }
        Err(e) => Err(Error::Io(e)),
    }
}

fn file_name_of(path: &str) -> String {
    std::path::Path::new(path)
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| "attachment".to_string())
}
