//! Per-client cooldown limiter.
//!
//! Each client identifier maps to the instant of its last accepted request.
//! A request is accepted when no earlier request was accepted for the same
//! identifier, or when at least one full cooldown window has passed since
//! that last acceptance. Denied requests leave the recorded instant alone,
//! so hammering the endpoint does not extend the wait.
//!
//! The map lives in process memory only. Several replicas of the service do
//! not share it, and entries are never evicted while the process runs.

use std::time::{Duration, Instant};

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;

/// Identifier used when a request carries no client address header. Every
/// such request shares this single bucket.
pub const UNKNOWN_CLIENT: &str = "unknown";

#[derive(Debug)]
pub struct RateLimiter {
    cooldown: Duration,
    last_accepted: DashMap<String, Instant>,
}

impl RateLimiter {
    pub fn new(cooldown: Duration) -> Self {
        Self {
            cooldown,
            last_accepted: DashMap::new(),
        }
    }

    pub fn cooldown(&self) -> Duration {
        self.cooldown
    }

    /// Returns true and records the acceptance if `client_id` is outside its
    /// cooldown window.
    pub fn allow(&self, client_id: &str) -> bool {
        self.allow_at(client_id, Instant::now())
    }

    /// Same as [`allow`](Self::allow) with an explicit clock reading.
    pub fn allow_at(&self, client_id: &str, now: Instant) -> bool {
        // The entry guard holds the shard lock, so check and update are atomic.
        match self.last_accepted.entry(client_id.to_string()) {
            Entry::Occupied(mut entry) => {
                if now.saturating_duration_since(*entry.get()) >= self.cooldown {
                    entry.insert(now);
                    true
                } else {
                    false
                }
            }
            Entry::Vacant(entry) => {
                entry.insert(now);
                true
            }
        }
    }

    /// Number of identifiers seen so far.
    pub fn tracked_clients(&self) -> usize {
        self.last_accepted.len()
    }
}
