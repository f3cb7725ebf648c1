//! Webhook handling: decode, assemble, send.

use super::assemble::assemble;
use super::payload::Payload;
use crate::channels::{MessageSender, OutboundMessage, SendError};
use crate::preview::PreviewLinks;

#[derive(Debug, thiserror::Error)]
pub enum WebhookError {
    #[error("malformed webhook payload: {0}")]
    Decode(#[from] serde_json::Error),
    #[error("text and attachments not found")]
    MissingContent,
    #[error("delivery failed: {0}")]
    Send(#[from] SendError),
}

/// Decode a raw webhook body and deliver it to `conversation_id`.
pub async fn handle_webhook(
    body: &[u8],
    conversation_id: &str,
    previews: &dyn PreviewLinks,
    sender: &dyn MessageSender,
) -> Result<(), WebhookError> {
    let payload = Payload::from_json(body)?;
    deliver(&payload, conversation_id, previews, sender).await
}

/// Assemble `payload` and send it once, with anti-flood enabled. Nothing is sent without content.
pub async fn deliver(
    payload: &Payload,
    conversation_id: &str,
    previews: &dyn PreviewLinks,
    sender: &dyn MessageSender,
) -> Result<(), WebhookError> {
    let assembled = assemble(payload, previews).ok_or(WebhookError::MissingContent)?;
    log::debug!(
        "webhook for {}:{} assembled as {} ({} bytes)",
        sender.id(),
        conversation_id,
        assembled.dialect,
        assembled.text.len()
    );
    let message = OutboundMessage::with_anti_flood(assembled.text, assembled.dialect);
    sender.send(conversation_id, &message).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::format::Dialect;
    use crate::preview::DirectLinks;
    use async_trait::async_trait;
    use std::sync::Mutex;

    #[derive(Default)]
    struct Recorder {
        sent: Mutex<Vec<(String, OutboundMessage)>>,
        fail: bool,
    }

    #[async_trait]
    impl MessageSender for Recorder {
        fn id(&self) -> &str {
            "recorder"
        }

        async fn send(&self, conversation_id: &str, message: &OutboundMessage) -> Result<(), SendError> {
            if self.fail {
                return Err(SendError::Api {
                    method: "sendMessage".to_string(),
                    status: 400,
                    description: "Bad Request".to_string(),
                    retry_after: None,
                });
            }
            self.sent
                .lock()
                .unwrap()
                .push((conversation_id.to_string(), message.clone()));
            Ok(())
        }
    }

    #[tokio::test]
    async fn sends_markdown_with_anti_flood() {
        let sender = Recorder::default();
        handle_webhook(
            br#"{"text": "hello <http://x|world>", "mrkdwn": true}"#,
            "42",
            &DirectLinks,
            &sender,
        )
        .await
        .unwrap();
        let sent = sender.sent.lock().unwrap();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].0, "42");
        assert_eq!(
            sent[0].1,
            OutboundMessage {
                text: "hello [world](http://x)".to_string(),
                dialect: Dialect::Markdown,
                anti_flood: true,
            }
        );
    }

    #[tokio::test]
    async fn missing_content_sends_nothing() {
        let sender = Recorder::default();
        let err = handle_webhook(br#"{"text": "", "attachments": []}"#, "42", &DirectLinks, &sender)
            .await
            .unwrap_err();
        assert!(matches!(err, WebhookError::MissingContent));
        assert!(sender.sent.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn decode_error_sends_nothing() {
        let sender = Recorder::default();
        let err = handle_webhook(b"not json", "42", &DirectLinks, &sender)
            .await
            .unwrap_err();
        assert!(matches!(err, WebhookError::Decode(_)));
        assert!(sender.sent.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn send_error_is_surfaced() {
        let sender = Recorder {
            fail: true,
            ..Default::default()
        };
        let err = handle_webhook(br#"{"text": "hi"}"#, "42", &DirectLinks, &sender)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            WebhookError::Send(SendError::Api { status: 400, .. })
        ));
    }
}
