//! Gateway HTTP server (single port): hook intake, preview pages, Telegram webhook.

use crate::channels::{InboundMessage, MessageSender, TelegramChannel, TelegramUpdate};
use crate::commands;
use crate::config::{self, Config};
use crate::hooks::HookSigner;
use crate::preview::{render_preview_page, DirectLinks, PreviewLinks, PreviewPages, PreviewRequest};
use crate::webhook::{handle_webhook, WebhookError};
use anyhow::{Context, Result};
use axum::{
    body::Bytes,
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode},
    response::Html,
    routing::{get, post},
    Json, Router,
};
use serde_json::json;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

/// Shared state for the gateway (config, hook signing, previews, Telegram).
#[derive(Clone)]
pub struct GatewayState {
    pub config: Arc<Config>,
    /// Externally reachable base URL (no trailing slash).
    pub public_url: String,
    /// None when no hook secret is configured; hook requests are then refused.
    pub signer: Option<HookSigner>,
    pub previews: Arc<dyn PreviewLinks>,
    /// None when no bot token is configured.
    pub telegram: Option<Arc<TelegramChannel>>,
    /// Sender for inbound channel messages (e.g. Telegram webhook POSTs). Processor task receives.
    pub inbound_tx: mpsc::Sender<InboundMessage>,
}

impl GatewayState {
    /// Hook URL for a chat, when signing is configured.
    pub fn hook_url(&self, chat_id: &str) -> Option<String> {
        self.signer
            .as_ref()
            .map(|s| s.hook_url(&self.public_url, chat_id))
    }
}

/// Preview link generator for `config`: gateway-hosted pages, or the title link itself when disabled.
pub fn preview_links(config: &Config) -> Result<Arc<dyn PreviewLinks>> {
    if config.preview.enabled {
        let pages = PreviewPages::new(&config::resolve_public_url(config))?;
        Ok(Arc::new(pages))
    } else {
        Ok(Arc::new(DirectLinks))
    }
}

/// Answer bot commands (e.g. /start) from channel conversations.
async fn process_inbound_message(state: GatewayState, msg: InboundMessage) {
    let Some(reply) = commands::reply_for(&msg.event, state.hook_url(&msg.conversation_id).as_deref())
    else {
        return;
    };
    let Some(ref telegram) = state.telegram else {
        return;
    };
    if let Err(e) = telegram.send(&msg.conversation_id, &reply).await {
        log::warn!(
            "reply to {}:{} failed: {}",
            msg.channel_id,
            msg.conversation_id,
            e
        );
    }
}

/// Run the gateway server; binds to config.gateway.bind:config.gateway.port.
/// When bind is not loopback, a hook secret must be configured or startup fails.
/// Blocks until shutdown (e.g. Ctrl+C).
pub async fn run_gateway(config: Config) -> Result<()> {
    let bind = config.gateway.bind.trim().to_string();
    let hook_secret = config::resolve_hook_secret(&config);
    if !config::is_loopback_bind(&bind) && hook_secret.is_none() {
        anyhow::bail!(
            "refusing to bind gateway to {} without a hook secret (set hooks.secret or HOOKGRAM_HOOK_SECRET)",
            bind
        );
    }
    let signer = match hook_secret {
        Some(secret) => Some(HookSigner::new(&secret)?),
        None => {
            log::warn!("no hook secret configured; hook URLs are disabled");
            None
        }
    };

    let public_url = config::resolve_public_url(&config);
    let previews = preview_links(&config)?;
    let (inbound_tx, mut inbound_rx) = mpsc::channel::<InboundMessage>(64);
    let mut channel_tasks: Vec<JoinHandle<()>> = Vec::new();

    let telegram = config::resolve_telegram_token(&config).map(|token| {
        Arc::new(TelegramChannel::new(
            Some(token),
            config::resolve_telegram_api_base(&config),
        ))
    });
    if telegram.is_none() {
        log::warn!("no telegram bot token configured; webhooks cannot be delivered");
    }

    let state = GatewayState {
        config: Arc::new(config.clone()),
        public_url,
        signer,
        previews,
        telegram: telegram.clone(),
        inbound_tx: inbound_tx.clone(),
    };

    {
        let state_inbound = state.clone();
        channel_tasks.push(tokio::spawn(async move {
            while let Some(msg) = inbound_rx.recv().await {
                process_inbound_message(state_inbound.clone(), msg).await;
            }
        }));
    }

    let webhook_url = config.channels.telegram.webhook_url.clone();
    let telegram_webhook_for_shutdown: Option<Arc<TelegramChannel>> = match telegram {
        Some(telegram) => {
            if let Some(ref url) = webhook_url {
                let secret = config.channels.telegram.webhook_secret.as_deref();
                if let Err(e) = telegram.set_webhook(url, secret).await {
                    log::warn!("telegram set_webhook failed: {}", e);
                } else {
                    log::info!("telegram channel registered (webhook mode): {}", url);
                }
            } else {
                channel_tasks.push(telegram.clone().start_inbound(inbound_tx));
                log::info!("telegram channel registered and getUpdates loop started");
            }
            Some(telegram)
        }
        None => None,
    };

    let app = router(state);

    let bind_addr = format!("{}:{}", bind, config.gateway.port);
    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("binding to {}", bind_addr))?;
    log::info!("gateway listening on {}", bind_addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(
            channel_tasks,
            telegram_webhook_for_shutdown,
            webhook_url.is_some(),
        ))
        .await
        .context("gateway server exited")?;
    log::info!("gateway stopped");
    Ok(())
}

/// Routes served by the gateway.
pub fn router(state: GatewayState) -> Router {
    Router::new()
        .route("/", get(health_http))
        .route("/hook/:chat_id/:signature", post(hook_http))
        .route("/preview", get(preview_http))
        .route("/telegram/webhook", post(telegram_webhook))
        .with_state(state)
}

/// Future that completes when the process should shut down (SIGINT or SIGTERM).
/// Stops the getUpdates loop, removes the Telegram webhook if used, then awaits channel tasks.
async fn shutdown_signal(
    channel_tasks: Vec<JoinHandle<()>>,
    telegram: Option<Arc<TelegramChannel>>,
    webhook_mode: bool,
) {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    log::info!("shutdown signal received, stopping channels");

    if let Some(t) = telegram {
        t.stop();
        if webhook_mode {
            if let Err(e) = t.delete_webhook().await {
                log::debug!("telegram delete_webhook on shutdown: {}", e);
            }
        }
    }

    for h in channel_tasks {
        // A long poll can take 30s and the inbound processor lives as long as its senders.
        h.abort();
        let _ = h.await;
    }
    log::info!("channel tasks finished");
}

/// POST /hook/:chat_id/:signature: Slack-compatible webhook for one chat.
async fn hook_http(
    State(state): State<GatewayState>,
    Path((chat_id, signature)): Path<(String, String)>,
    body: Bytes,
) -> (StatusCode, Json<serde_json::Value>) {
    let Some(ref signer) = state.signer else {
        return hook_response(StatusCode::NOT_FOUND, Some("hook urls are disabled"));
    };
    if !signer.verify(&chat_id, &signature) {
        log::debug!("hook signature mismatch for chat {}", chat_id);
        return hook_response(StatusCode::FORBIDDEN, Some("invalid hook url"));
    }
    let Some(ref telegram) = state.telegram else {
        return hook_response(StatusCode::SERVICE_UNAVAILABLE, Some("no channel configured"));
    };
    match handle_webhook(&body, &chat_id, state.previews.as_ref(), telegram.as_ref()).await {
        Ok(()) => hook_response(StatusCode::OK, None),
        Err(e) => {
            let status = match &e {
                WebhookError::Decode(_) => StatusCode::BAD_REQUEST,
                WebhookError::MissingContent => StatusCode::UNPROCESSABLE_ENTITY,
                WebhookError::Send(_) => StatusCode::BAD_GATEWAY,
            };
            log::warn!("hook for chat {} failed: {}", chat_id, e);
            hook_response(status, Some(&e.to_string()))
        }
    }
}

fn hook_response(status: StatusCode, error: Option<&str>) -> (StatusCode, Json<serde_json::Value>) {
    let body = match error {
        None => json!({ "ok": true }),
        Some(e) => json!({ "ok": false, "error": e }),
    };
    (status, Json(body))
}

/// GET /preview: OpenGraph page for an attachment preview.
async fn preview_http(Query(req): Query<PreviewRequest>) -> Html<String> {
    Html(render_preview_page(&req))
}

/// POST /telegram/webhook: receives Telegram update JSON; verifies optional secret, pushes InboundMessage.
async fn telegram_webhook(
    State(state): State<GatewayState>,
    headers: HeaderMap,
    body: Bytes,
) -> StatusCode {
    if let Some(ref expected) = state.config.channels.telegram.webhook_secret {
        let provided = headers
            .get("X-Telegram-Bot-Api-Secret-Token")
            .and_then(|v| v.to_str().ok())
            .unwrap_or("");
        if provided != expected.as_str() {
            return StatusCode::FORBIDDEN;
        }
    }
    let update: TelegramUpdate = match serde_json::from_slice(&body) {
        Ok(u) => u,
        Err(_) => return StatusCode::BAD_REQUEST,
    };
    let bot_id = state.telegram.as_ref().and_then(|t| t.bot_id());
    let Some(inbound) = update.into_inbound("telegram", bot_id) else {
        return StatusCode::OK;
    };
    if state.inbound_tx.send(inbound).await.is_err() {
        return StatusCode::SERVICE_UNAVAILABLE;
    }
    StatusCode::OK
}

/// GET / returns a simple health JSON (for probes).
async fn health_http(State(state): State<GatewayState>) -> Json<serde_json::Value> {
    Json(json!({
        "runtime": "running",
        "port": state.config.gateway.port,
        "hooks": state.signer.is_some(),
        "telegram": state.telegram.is_some(),
    }))
}
