//! Hookgram core library: Slack-compatible webhooks rendered as Telegram Markdown or HTML,
//! plus the gateway, Telegram channel and config used by the CLI.

pub mod channels;
pub mod commands;
pub mod config;
pub mod format;
pub mod gateway;
pub mod hooks;
pub mod init;
pub mod preview;
pub mod webhook;
