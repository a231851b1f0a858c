use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use tokio::task::JoinHandle;
use tracing::debug;

#[derive(Debug, Clone, Copy)]
pub struct RateLimitConfig {
    pub limit: u32,
    pub window: Duration,
}

impl RateLimitConfig {
    pub fn new(limit: u32, window: Duration) -> Self {
        Self { limit, window }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RateLimitDecision {
    pub success: bool,
    pub remaining: u32,
    pub reset_at: DateTime<Utc>,
}

impl RateLimitDecision {
    /// Whole seconds until the window rolls over, at least 1.
    pub fn retry_after_secs(&self, now: DateTime<Utc>) -> u64 {
        let millis = (self.reset_at - now).num_milliseconds().max(0) as u64;
        millis.div_ceil(1000).max(1)
    }
}

#[derive(Debug, Clone, Copy)]
struct Counter {
    count: u32,
    reset_at: DateTime<Utc>,
}

/// Process-local fixed-window counter keyed by an arbitrary string.
///
/// Each instance counts independently; in a multi-instance deployment the
/// effective limit is multiplied by the number of instances.
#[derive(Debug, Default)]
pub struct RateLimiter {
    entries: Mutex<HashMap<String, Counter>>,
}

impl RateLimiter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn check(&self, key: &str, config: RateLimitConfig) -> RateLimitDecision {
        self.check_at(key, config, Utc::now())
    }

    pub fn check_at(&self, key: &str, config: RateLimitConfig, now: DateTime<Utc>) -> RateLimitDecision {
        let mut entries = self.lock();

        match entries.get_mut(key) {
            Some(counter) if now <= counter.reset_at => {
                counter.count = counter.count.saturating_add(1);
                if counter.count > config.limit {
                    RateLimitDecision {
                        success: false,
                        remaining: 0,
                        reset_at: counter.reset_at,
                    }
                } else {
                    RateLimitDecision {
                        success: true,
                        remaining: config.limit - counter.count,
                        reset_at: counter.reset_at,
                    }
                }
            }
            // Absent or expired: start a fresh window
            _ => {
                let reset_at = now + config.window;
                entries.insert(key.to_string(), Counter { count: 1, reset_at });
                RateLimitDecision {
                    success: config.limit >= 1,
                    remaining: config.limit.saturating_sub(1),
                    reset_at,
                }
            }
        }
    }

    /// Drop expired entries, returning how many were removed.
    pub fn sweep_at(&self, now: DateTime<Utc>) -> usize {
        let mut entries = self.lock();
        let before = entries.len();
        entries.retain(|_, counter| now <= counter.reset_at);
        before - entries.len()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Run `sweep_at` on a fixed interval until the returned task is aborted.
    pub fn spawn_sweeper(self: Arc<Self>, interval: std::time::Duration) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            // The first tick completes immediately
            ticker.tick().await;
            loop {
                ticker.tick().await;
                let removed = self.sweep_at(Utc::now());
                if removed > 0 {
                    debug!("Rate limiter sweep removed {} expired entries", removed);
                }
            }
        })
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, Counter>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
