//! Communication channels (Telegram).
//!
//! Outbound: formatted webhook messages are delivered through a `MessageSender`.
//! Inbound: chat updates are sent to the gateway for bot command handling.

mod flood;
mod inbound;
mod outbound;
mod telegram;

pub use flood::FloodGuard;
pub use inbound::{InboundEvent, InboundMessage};
pub use outbound::{MessageSender, OutboundMessage, SendError};
pub use telegram::{bot_id_from_token, TelegramChannel, TelegramUpdate};
