//! Per-host request spacing.
//!
//! Tracker sites throttle aggressive clients, so every request to a host
//! must keep a minimum distance from the previous one. This replaces the
//! fixed sleeps the per-site integrations scatter between calls: the gate
//! is keyed by host and shared process-wide, so concurrent resolutions
//! against the same site serialize instead of hammering it.

use std::collections::HashMap;
use tokio::sync::Mutex;
use tokio::time::{sleep, Duration, Instant};

/// Gate for a single host.
#[derive(Debug)]
struct HostGate {
    next_allowed: Instant,
}

impl HostGate {
    fn new() -> Self {
        Self {
            next_allowed: Instant::now(),
        }
    }

    /// Claim the next slot. `Ok` means go now; `Err` carries the wait.
    fn try_acquire(&mut self, interval: Duration) -> Result<(), Duration> {
        let now = Instant::now();
        if now >= self.next_allowed {
            self.next_allowed = now + interval;
            Ok(())
        } else {
            Err(self.next_allowed - now)
        }
    }
}

/// Enforces a minimum interval between requests per host.
pub struct HostRateLimiter {
    interval: Duration,
    gates: Mutex<HashMap<String, HostGate>>,
}

impl HostRateLimiter {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            gates: Mutex::new(HashMap::new()),
        }
    }

    /// A limiter that never waits (for tests and local mirrors).
    pub fn disabled() -> Self {
        Self::new(Duration::ZERO)
    }

    /// Wait until a request to `host` is allowed.
    pub async fn acquire(&self, host: &str) {
        if self.interval.is_zero() {
            return;
        }
        loop {
            let wait = {
                let mut gates = self.gates.lock().await;
                let gate = gates
                    .entry(host.to_string())
                    .or_insert_with(HostGate::new);
                match gate.try_acquire(self.interval) {
                    Ok(()) => return,
                    Err(wait) => wait,
                }
            };
            sleep(wait).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_first_request_passes_immediately() {
        let limiter = HostRateLimiter::new(Duration::from_secs(3));
        let before = Instant::now();
        limiter.acquire("tracker.example.com").await;
        assert_eq!(Instant::now(), before);
    }

    #[tokio::test(start_paused = true)]
    async fn test_second_request_waits_interval() {
        let limiter = HostRateLimiter::new(Duration::from_secs(3));
        limiter.acquire("tracker.example.com").await;
        let before = Instant::now();
        limiter.acquire("tracker.example.com").await;
        assert!(Instant::now() - before >= Duration::from_secs(3));
    }

    #[tokio::test(start_paused = true)]
    async fn test_hosts_are_independent() {
        let limiter = HostRateLimiter::new(Duration::from_secs(3));
        limiter.acquire("a.example.com").await;
        let before = Instant::now();
        limiter.acquire("b.example.com").await;
        assert_eq!(Instant::now(), before);
    }

    #[tokio::test(start_paused = true)]
    async fn test_disabled_limiter_never_waits() {
        let limiter = HostRateLimiter::disabled();
        let before = Instant::now();
        for _ in 0..10 {
            limiter.acquire("tracker.example.com").await;
        }
        assert_eq!(Instant::now(), before);
    }
}
