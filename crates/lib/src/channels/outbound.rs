//! Outbound delivery: a formatted message and the trait channels implement to send it.

use crate::format::Dialect;
use async_trait::async_trait;

/// A message ready for delivery in one markup dialect.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutboundMessage {
    pub text: String,
    pub dialect: Dialect,
    /// Space out sends to the same conversation to stay under the transport's flood limits.
    pub anti_flood: bool,
}

impl OutboundMessage {
    /// Webhook messages always go out with anti-flood spacing.
    pub fn with_anti_flood(text: String, dialect: Dialect) -> Self {
        Self {
            text,
            dialect,
            anti_flood: true,
        }
    }
}

/// Delivery failure reported by a channel.
#[derive(Debug, thiserror::Error)]
pub enum SendError {
    #[error("bot token not configured")]
    NotConfigured,
    #[error("send request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("{method} rejected: {status} {description}")]
    Api {
        method: String,
        status: u16,
        description: String,
        /// Seconds the API asked us to wait (flood limit responses).
        retry_after: Option<u64>,
    },
}

/// A channel that can deliver formatted messages to a conversation (e.g. Telegram chat_id).
#[async_trait]
pub trait MessageSender: Send + Sync {
    /// Channel id (e.g. "telegram").
    fn id(&self) -> &str;

    async fn send(&self, conversation_id: &str, message: &OutboundMessage) -> Result<(), SendError>;
}
