// SPDX-License-Identifier: BSD-3-Clause
// Copyright (c) 2026 Aleksandr Ptakhin

//! Per-caller request throttling.
//!
//! `RateLimiter` is the seam for swapping the in-process table for a shared
//! counter (e.g. a key-value store with TTL) when several instances run behind a
//! load balancer. `InMemoryRateLimiter` does not coordinate across instances.

use crate::models::config::RateLimitConfig;
use crate::services::logging::anonymize_ip;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Duration, Instant};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::debug;

/// Shortest sweep period the background task will run with
pub const MIN_SWEEP_PERIOD: Duration = Duration::from_millis(10);

pub trait RateLimiter: Send + Sync {
    /// Record one request for `key` and report whether it is allowed.
    fn check(&self, key: &str) -> bool;

    /// Drop expired windows. Returns the number of entries removed.
    fn sweep(&self) -> usize;
}

/// Request count of one caller within the current window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitEntry {
    pub count: u32,
    pub reset_at: Instant,
}

/// Fixed-window counter table held in process memory. Lost on restart, which
/// is fine for advisory throttling.
pub struct InMemoryRateLimiter {
    config: RateLimitConfig,
    entries: Mutex<HashMap<String, RateLimitEntry>>,
}

impl InMemoryRateLimiter {
    pub fn new(config: RateLimitConfig) -> Self {
        Self {
            config,
            entries: Mutex::new(HashMap::new()),
        }
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    // A panic while holding the lock leaves the counters usable, so poisoning is ignored.
    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<String, RateLimitEntry>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn check_at(&self, key: &str, now: Instant) -> bool {
        let mut entries = self.lock();

        match entries.get_mut(key) {
            Some(entry) if now < entry.reset_at => {
                if entry.count >= self.config.max_requests {
                    return false;
                }
                entry.count += 1;
                true
            }
            _ => {
                entries.insert(
                    key.to_string(),
                    RateLimitEntry {
                        count: 1,
                        reset_at: now + self.config.window,
                    },
                );
                self.config.max_requests > 0
            }
        }
    }

    fn sweep_at(&self, now: Instant) -> usize {
        let mut entries = self.lock();
        let before = entries.len();
        entries.retain(|_, entry| now < entry.reset_at);
        before - entries.len()
    }
}

impl RateLimiter for InMemoryRateLimiter {
    fn check(&self, key: &str) -> bool {
        let allowed = self.check_at(key, Instant::now());
        if !allowed {
            debug!(caller = %anonymize_ip(key), "rate limit exceeded");
        }
        allowed
    }

    fn sweep(&self) -> usize {
        self.sweep_at(Instant::now())
    }
}

/// Sweep expired entries every `period`, independently of request traffic.
/// The returned handle should be aborted on shutdown.
pub fn spawn_sweeper(limiter: Arc<dyn RateLimiter>, period: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        // tokio intervals panic on a zero period
        let mut ticker = tokio::time::interval(period.max(MIN_SWEEP_PERIOD));
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // The first tick completes immediately
        ticker.tick().await;

        loop {
            ticker.tick().await;
            let removed = limiter.sweep();
            if removed > 0 {
                debug!(removed, "swept expired rate limit entries");
            }
        }
    })
}
