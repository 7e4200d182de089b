//! Request pacing for recursive fetches
//!
//! A `RateLimiter` belongs to one crawl invocation. Its delay comes from the
//! request (or the configured default), never from process-wide state, so
//! concurrent crawls pace themselves independently.

use std::time::{Duration, Instant};

/// Enforces a minimum delay between consecutive outbound requests
#[derive(Debug)]
pub struct RateLimiter {
    /// Minimum time between two requests
    delay: Duration,

    /// When the previous request was issued
    last_request_time: Option<Instant>,
}

impl RateLimiter {
    /// Creates a limiter that has not seen any request yet
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            last_request_time: None,
        }
    }

    /// Creates a limiter whose clock starts now
    ///
    /// Used right after the root fetch so the first recursive request is
    /// also spaced from it.
    pub fn started(delay: Duration) -> Self {
        Self {
            delay,
            last_request_time: Some(Instant::now()),
        }
    }

    /// The configured delay
    pub fn delay(&self) -> Duration {
        self.delay
    }

    /// Time left before the next request may be issued
    pub fn remaining(&self, now: Instant) -> Duration {
        match self.last_request_time {
            Some(last) => self.delay.saturating_sub(now.duration_since(last)),
            None => Duration::ZERO,
        }
    }

    /// Suspends until the next request may be issued, then records it
    pub async fn wait(&mut self) {
        let remaining = self.remaining(Instant::now());
        if !remaining.is_zero() {
            tracing::trace!("Rate limiting: sleeping {:?}", remaining);
            tokio::time::sleep(remaining).await;
        }
        self.last_request_time = Some(Instant::now());
    }
}
