//! Per-conversation send spacing.

use std::collections::HashMap;
use tokio::sync::Mutex;
use tokio::time::{Duration, Instant};

/// Telegram allows roughly one message per second into the same chat.
pub const DEFAULT_INTERVAL: Duration = Duration::from_secs(1);

/// Hands out send slots at least `interval` apart per conversation.
pub struct FloodGuard {
    interval: Duration,
    next_slot: Mutex<HashMap<String, Instant>>,
}

impl Default for FloodGuard {
    fn default() -> Self {
        Self::new(DEFAULT_INTERVAL)
    }
}

impl FloodGuard {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            next_slot: Mutex::new(HashMap::new()),
        }
    }

    /// Reserve the next slot for `conversation_id` and sleep until it starts.
    pub async fn wait(&self, conversation_id: &str) {
        let delay = {
            let mut slots = self.next_slot.lock().await;
            let now = Instant::now();
            let slot = slots
                .get(conversation_id)
                .copied()
                .filter(|t| *t > now)
                .unwrap_or(now);
            slots.retain(|_, next| *next > now);
            slots.insert(conversation_id.to_string(), slot + self.interval);
            slot - now
        };
        if !delay.is_zero() {
            log::debug!("anti-flood: delaying send to {} by {:?}", conversation_id, delay);
            tokio::time::sleep(delay).await;
        }
    }
}
