use thiserror::Error;

use crate::gateway::GatewayError;

/// Everything a tool invocation can fail with. Every variant is converted
/// into an error-tagged tool result at the dispatch boundary; none escape
/// to the transport layer.
#[derive(Debug, Error)]
pub enum Error {
    #[error("timed out waiting for the Discord connection to become ready")]
    ReadinessTimeout,

    #[error("server not found: {0}")]
    ServerNotFound(String),

    #[error("channel not found: {0}")]
    ChannelNotFound(String),

    #[error("user not found: {0}")]
    UserNotFound(String),

    #[error("no channel specified: pass a channel argument or configure a default channel id")]
    NoChannelSpecified,

    #[error("file not found: {0}")]
    FileNotFound(String),

    #[error("unknown tool: {0}")]
    UnknownTool(String),

    #[error("discord operation failed: {0}")]
    Remote(#[from] GatewayError),

    #[error("failed to read attachment: {0}")]
    Io(#[from] std::io::Error),
}
