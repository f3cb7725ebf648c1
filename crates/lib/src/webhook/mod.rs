//! Slack-compatible incoming webhooks: payload decoding, message assembly, delivery.

mod assemble;
mod handler;
mod payload;

pub use assemble::{assemble, Assembled, PREVIEW_ANCHOR};
pub use handler::{deliver, handle_webhook, WebhookError};
pub use payload::{Attachment, Payload};
