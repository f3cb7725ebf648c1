//! Inbound message from a channel: delivered to the gateway for bot command handling.

/// What arrived from the chat.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InboundEvent {
    /// A text message (commands included).
    Text(String),
    /// The bot was added to a group or the group was created with it.
    BotAdded,
}

/// A message from a channel conversation.
#[derive(Debug, Clone)]
pub struct InboundMessage {
    pub channel_id: String,
    pub conversation_id: String,
    pub event: InboundEvent,
}
