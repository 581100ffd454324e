use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use tracing::debug;

/// Sliding-window rate limiter keyed by logical channel ("github", "claude").
///
/// Each granted acquisition records a timestamp; a new acquisition is denied
/// when the window already holds `limit` grants. Denials are not recorded.
/// State lives for the process lifetime only — owned by the pipeline context,
/// never a global.
#[derive(Debug, Default)]
pub struct RateLimiter {
    windows: Mutex<HashMap<String, Vec<Instant>>>,
}

impl RateLimiter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `true` and records the acquisition when under the limit,
    /// `false` otherwise.
    pub fn try_acquire(&self, channel: &str, limit: usize, window: Duration) -> bool {
        let now = Instant::now();
        let mut windows = self.windows.lock().expect("rate limiter lock poisoned");
        let grants = windows.entry(channel.to_string()).or_default();

        grants.retain(|granted| now.duration_since(*granted) < window);

        if grants.len() >= limit {
            debug!(channel, limit, in_window = grants.len(), "rate limit denied");
            return false;
        }

        grants.push(now);
        true
    }
}
