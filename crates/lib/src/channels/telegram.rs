//! Telegram channel: sendMessage with parse mode, long-poll getUpdates or webhook intake via Bot API.

use crate::channels::flood::FloodGuard;
use crate::channels::inbound::{InboundEvent, InboundMessage};
use crate::channels::outbound::{MessageSender, OutboundMessage, SendError};
use async_trait::async_trait;
use serde::Deserialize;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

const TELEGRAM_API_BASE: &str = "https://api.telegram.org";
const LONG_POLL_TIMEOUT: u64 = 30;
/// Upper bound on a 429 `retry_after` we are willing to sleep through before retrying once.
const MAX_RETRY_AFTER_SECS: u64 = 30;

#[derive(Debug, Deserialize)]
struct GetUpdatesResponse {
    ok: bool,
    #[serde(default)]
    result: Vec<TelegramUpdate>,
}

/// Error body of a failed Bot API call.
#[derive(Debug, Default, Deserialize)]
struct ApiErrorResponse {
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    parameters: Option<ResponseParameters>,
}

#[derive(Debug, Default, Deserialize)]
struct ResponseParameters {
    #[serde(default)]
    retry_after: Option<u64>,
}

/// Telegram update payload (getUpdates result item or webhook POST body).
#[derive(Debug, Deserialize)]
pub struct TelegramUpdate {
    pub update_id: i64,
    #[serde(default)]
    pub message: Option<TelegramMessage>,
}

#[derive(Debug, Deserialize)]
pub struct TelegramMessage {
    pub chat: TelegramChat,
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub new_chat_members: Vec<TelegramUser>,
    #[serde(default)]
    pub group_chat_created: bool,
}

#[derive(Debug, Deserialize)]
pub struct TelegramChat {
    pub id: i64,
}

#[derive(Debug, Deserialize)]
pub struct TelegramUser {
    pub id: i64,
}

impl TelegramUpdate {
    /// Inbound message for the gateway: a text message, or the bot joining a group.
    /// `bot_id` is the numeric prefix of the bot token.
    pub fn into_inbound(self, channel_id: &str, bot_id: Option<i64>) -> Option<InboundMessage> {
        let msg = self.message?;
        let conversation_id = msg.chat.id.to_string();
        let bot_added = msg.group_chat_created
            || bot_id.is_some_and(|id| msg.new_chat_members.iter().any(|u| u.id == id));
        let event = if bot_added {
            InboundEvent::BotAdded
        } else {
            InboundEvent::Text(msg.text?)
        };
        Some(InboundMessage {
            channel_id: channel_id.to_string(),
            conversation_id,
            event,
        })
    }
}

/// Numeric bot id from a `<id>:<secret>` bot token.
pub fn bot_id_from_token(token: &str) -> Option<i64> {
    token.split(':').next()?.trim().parse().ok()
}

/// Telegram channel connector: long-polls for updates and sends formatted messages via sendMessage.
pub struct TelegramChannel {
    id: String,
    token: Option<String>,
    api_base: String,
    running: AtomicBool,
    client: reqwest::Client,
    flood: FloodGuard,
}

impl TelegramChannel {
    pub fn new(token: Option<String>, api_base: Option<String>) -> Self {
        let api_base = api_base
            .map(|u| u.trim_end_matches('/').to_string())
            .unwrap_or_else(|| TELEGRAM_API_BASE.to_string());
        Self {
            id: "telegram".to_string(),
            token,
            api_base,
            running: AtomicBool::new(false),
            client: reqwest::Client::new(),
            flood: FloodGuard::default(),
        }
    }

    fn running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Stop the getUpdates loop after the current poll.
    pub fn stop(&self) {
        self.running.store(false, Ordering::SeqCst);
    }

    /// Numeric id of this bot, parsed from the token.
    pub fn bot_id(&self) -> Option<i64> {
        self.token.as_deref().and_then(bot_id_from_token)
    }

    fn method_url(&self, method: &str) -> Result<String, SendError> {
        let token = self.token.as_ref().ok_or(SendError::NotConfigured)?;
        Ok(format!("{}/bot{}/{}", self.api_base, token, method))
    }

    /// Start the getUpdates long-poll loop and forward messages to the gateway. Returns a handle to await on shutdown.
    pub fn start_inbound(
        self: Arc<Self>,
        inbound_tx: mpsc::Sender<InboundMessage>,
    ) -> JoinHandle<()> {
        self.running.store(true, Ordering::SeqCst);
        log::info!("telegram channel: starting getUpdates long-poll loop");
        tokio::spawn(async move {
            run_get_updates_loop(self, inbound_tx).await;
        })
    }

    /// Call Telegram getUpdates (long poll). Returns (updates, next_offset).
    async fn get_updates(
        &self,
        offset: Option<i64>,
    ) -> Result<(Vec<TelegramUpdate>, Option<i64>), SendError> {
        let url = format!("{}?timeout={}", self.method_url("getUpdates")?, LONG_POLL_TIMEOUT);
        let url = if let Some(off) = offset {
            format!("{}&offset={}", url, off)
        } else {
            url
        };
        let res = self.client.get(&url).send().await?;
        if !res.status().is_success() {
            let status = res.status().as_u16();
            let body = res.text().await.unwrap_or_default();
            return Err(api_error("getUpdates", status, &body));
        }
        let data: GetUpdatesResponse = res.json().await?;
        if !data.ok {
            return Err(SendError::Api {
                method: "getUpdates".to_string(),
                status: 200,
                description: "ok: false".to_string(),
                retry_after: None,
            });
        }
        let next_offset = data
            .result
            .iter()
            .map(|u| u.update_id)
            .max()
            .map(|id| id + 1);
        Ok((data.result, next_offset))
    }

    /// Set webhook URL (and optional secret). When set, Telegram POSTs updates to the URL instead of getUpdates.
    pub async fn set_webhook(&self, url: &str, secret: Option<&str>) -> Result<(), SendError> {
        let mut body = serde_json::json!({ "url": url });
        if let Some(s) = secret {
            body["secret_token"] = serde_json::Value::String(s.to_string());
        }
        self.post("setWebhook", &body).await
    }

    /// Remove webhook so the bot can use getUpdates again.
    pub async fn delete_webhook(&self) -> Result<(), SendError> {
        self.post("deleteWebhook", &serde_json::json!({})).await
    }

    /// Send a formatted message to a chat via sendMessage. With `anti_flood`, sends to the same chat
    /// are spaced out and a single 429 is retried after Telegram's `retry_after`.
    pub async fn send_message(
        &self,
        chat_id: &str,
        message: &OutboundMessage,
    ) -> Result<(), SendError> {
        let body = serde_json::json!({
            "chat_id": chat_id,
            "text": message.text,
            "parse_mode": message.dialect.parse_mode(),
        });
        if message.anti_flood {
            self.flood.wait(chat_id).await;
        }
        match self.post("sendMessage", &body).await {
            Err(SendError::Api {
                retry_after: Some(secs),
                ..
            }) if message.anti_flood && secs <= MAX_RETRY_AFTER_SECS => {
                log::warn!("telegram flood limit for chat {}, retrying in {}s", chat_id, secs);
                tokio::time::sleep(std::time::Duration::from_secs(secs)).await;
                self.post("sendMessage", &body).await
            }
            other => other,
        }
    }

    async fn post(&self, method: &str, body: &serde_json::Value) -> Result<(), SendError> {
        let url = self.method_url(method)?;
        let res = self.client.post(&url).json(body).send().await?;
        if !res.status().is_success() {
            let status = res.status().as_u16();
            let text = res.text().await.unwrap_or_default();
            return Err(api_error(method, status, &text));
        }
        Ok(())
    }
}

/// `SendError::Api` from a failed call's status and body. `retry_after` is only read from 429s.
fn api_error(method: &str, status: u16, body: &str) -> SendError {
    let err: ApiErrorResponse = serde_json::from_str(body).unwrap_or_default();
    let retry_after = if status == 429 {
        err.parameters.and_then(|p| p.retry_after)
    } else {
        None
    };
    SendError::Api {
        method: method.to_string(),
        status,
        description: err.description.unwrap_or_else(|| body.trim().to_string()),
        retry_after,
    }
}

async fn run_get_updates_loop(channel: Arc<TelegramChannel>, inbound_tx: mpsc::Sender<InboundMessage>) {
    let mut offset: Option<i64> = None;
    let bot_id = channel.bot_id();
    while channel.running() {
        match channel.get_updates(offset).await {
            Ok((updates, next)) => {
                offset = next;
                for u in updates {
                    let Some(inbound) = u.into_inbound(&channel.id, bot_id) else {
                        continue;
                    };
                    if inbound_tx.send(inbound).await.is_err() {
                        log::debug!("telegram: inbound channel closed, stopping loop");
                        return;
                    }
                }
            }
            Err(e) => {
                log::debug!("telegram getUpdates error: {}", e);
                tokio::time::sleep(tokio::time::Duration::from_secs(2)).await;
            }
        }
    }
    log::info!("telegram channel: getUpdates loop stopped");
}

#[async_trait]
impl MessageSender for TelegramChannel {
    fn id(&self) -> &str {
        &self.id
    }

    async fn send(&self, conversation_id: &str, message: &OutboundMessage) -> Result<(), SendError> {
        TelegramChannel::send_message(self, conversation_id, message).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    fn update(json: &str) -> TelegramUpdate {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn bot_id_is_token_prefix() {
        assert_eq!(bot_id_from_token("123456:ABC-def"), Some(123456));
        assert_eq!(bot_id_from_token("garbage"), None);
    }

    #[test]
    fn text_update_becomes_inbound_text() {
        let u = update(r#"{"update_id": 1, "message": {"chat": {"id": -100}, "text": "/start"}}"#);
        let inbound = u.into_inbound("telegram", Some(7)).unwrap();
        assert_eq!(inbound.conversation_id, "-100");
        assert_eq!(inbound.event, InboundEvent::Text("/start".to_string()));
    }

    #[test]
    fn bot_joining_group_is_detected() {
        let u = update(
            r#"{"update_id": 2, "message": {"chat": {"id": -5}, "new_chat_members": [{"id": 3}, {"id": 7}]}}"#,
        );
        let inbound = u.into_inbound("telegram", Some(7)).unwrap();
        assert_eq!(inbound.event, InboundEvent::BotAdded);

        let u = update(r#"{"update_id": 3, "message": {"chat": {"id": -5}, "new_chat_members": [{"id": 3}]}}"#);
        assert!(u.into_inbound("telegram", Some(7)).is_none());
    }

    #[test]
    fn updates_without_message_are_ignored() {
        let u = update(r#"{"update_id": 4}"#);
        assert!(u.into_inbound("telegram", None).is_none());
    }

    #[test]
    fn api_error_carries_status_and_retry_after() {
        let body = r#"{"ok":false,"error_code":429,"description":"Too Many Requests: retry after 5","parameters":{"retry_after":5}}"#;
        match api_error("sendMessage", 429, body) {
            SendError::Api {
                method,
                status,
                description,
                retry_after,
            } => {
                assert_eq!(method, "sendMessage");
                assert_eq!(status, 429);
                assert_eq!(description, "Too Many Requests: retry after 5");
                assert_eq!(retry_after, Some(5));
            }
            other => panic!("unexpected error: {:?}", other),
        }
        assert!(matches!(
            api_error("sendMessage", 400, r#"{"parameters":{"retry_after":5}}"#),
            SendError::Api { status: 400, retry_after: None, .. }
        ));
        assert!(matches!(
            api_error("sendMessage", 502, "Bad Gateway\n"),
            SendError::Api { ref description, .. } if description == "Bad Gateway"
        ));
    }

    /// Bot API stub answering the first call with a 429 (`retry_after` 0) and later calls with ok.
    async fn flood_limited_api() -> (String, Arc<AtomicUsize>) {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();
        let app = axum::Router::new().route(
            "/:bot/:method",
            axum::routing::post(move || {
                let counter = counter.clone();
                async move {
                    if counter.fetch_add(1, Ordering::SeqCst) == 0 {
                        (
                            axum::http::StatusCode::TOO_MANY_REQUESTS,
                            axum::Json(serde_json::json!({
                                "ok": false,
                                "error_code": 429,
                                "description": "Too Many Requests: retry after 0",
                                "parameters": { "retry_after": 0 }
                            })),
                        )
                    } else {
                        (
                            axum::http::StatusCode::OK,
                            axum::Json(serde_json::json!({ "ok": true, "result": {} })),
                        )
                    }
                }
            }),
        );
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let base = format!("http://{}", listener.local_addr().unwrap());
        tokio::spawn(async move {
            let _ = axum::serve(listener, app).await;
        });
        (base, calls)
    }

    #[tokio::test]
    async fn flood_limit_is_retried_once() {
        let (base, calls) = flood_limited_api().await;
        let channel = TelegramChannel::new(Some("1:t".into()), Some(base));
        let msg = OutboundMessage::with_anti_flood("hi".into(), crate::format::Dialect::Markdown);
        channel.send_message("5", &msg).await.unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn flood_limit_without_anti_flood_is_returned() {
        let (base, calls) = flood_limited_api().await;
        let channel = TelegramChannel::new(Some("1:t".into()), Some(base));
        let msg = OutboundMessage {
            text: "hi".into(),
            dialect: crate::format::Dialect::Markdown,
            anti_flood: false,
        };
        let err = channel.send_message("5", &msg).await.unwrap_err();
        assert!(matches!(
            err,
            SendError::Api { status: 429, retry_after: Some(0), .. }
        ));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn send_without_token_is_not_configured() {
        let channel = TelegramChannel::new(None, None);
        let msg = OutboundMessage::with_anti_flood("hi".into(), crate::format::Dialect::Html);
        assert!(matches!(
            channel.send("1", &msg).await,
            Err(SendError::NotConfigured)
        ));
    }
}
