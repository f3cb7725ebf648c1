//! Gateway: HTTP server in front of the webhook pipeline.
//!
//! Single port serves the per-chat hook endpoints, preview pages for attachment links, the
//! Telegram webhook (when configured) and a health probe.

mod server;

pub use server::{preview_links, router, run_gateway, GatewayState};
