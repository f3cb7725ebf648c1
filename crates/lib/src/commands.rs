//! Bot commands received from chats. Only `/start` is answered: it tells the chat its hook URL.

use crate::channels::{InboundEvent, OutboundMessage};
use crate::format::Dialect;

const FORMAT_DOCS_URL: &str = "https://api.slack.com/docs/message-formatting#message_formatting";
const EXAMPLE_PAYLOAD: &str = r#"{"text":"Deploy *finished*\nSee <https://ci.example.com/builds/42|build 42>"}"#;

/// Split `/command@bot param` into (`command`, `param`). Non-commands return `None`.
pub fn parse_command(text: &str) -> Option<(&str, &str)> {
    let rest = text.trim().strip_prefix('/')?;
    let (head, param) = rest.split_once(char::is_whitespace).unwrap_or((rest, ""));
    let command = head.split('@').next().unwrap_or(head);
    if command.is_empty() {
        return None;
    }
    Some((command, param.trim()))
}

/// Reply to an inbound event, if any. `hook_url` is the chat's hook URL when signing is configured.
pub fn reply_for(event: &InboundEvent, hook_url: Option<&str>) -> Option<OutboundMessage> {
    let start = match event {
        InboundEvent::BotAdded => true,
        InboundEvent::Text(text) => {
            matches!(parse_command(text), Some(("start", param)) if param != "silent")
        }
    };
    start.then(|| start_message(hook_url))
}

/// Onboarding text (HTML): what can be sent and where.
pub fn start_message(hook_url: Option<&str>) -> OutboundMessage {
    let html = Dialect::Html.renderer();
    let mut text = format!(
        "Hi! This chat accepts {} webhooks, delivered to {}.",
        html.render_link("Slack-compatible", FORMAT_DOCS_URL),
        html.bold("this chat")
    );
    match hook_url {
        Some(url) => {
            text.push_str(" POST them to:\n<code>");
            text.push_str(&html.escape_text(url));
            text.push_str("</code>");
        }
        None => text.push_str("\nHook URLs are not enabled on this server yet (no hook secret configured)."),
    }
    text.push_str("\n\nExample JSON payload:\n<pre>");
    text.push_str(&html.escape_text(EXAMPLE_PAYLOAD));
    text.push_str("</pre>");
    OutboundMessage::with_anti_flood(text, Dialect::Html)
}
