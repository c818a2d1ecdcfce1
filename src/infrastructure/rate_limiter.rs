//! Sliding-window rate limiter shared by all outbound fetches.
//!
//! Keeps an ordered sequence of recent request instants. Each call prunes
//! entries that left the trailing window, sleeps until the oldest retained
//! entry falls outside the window when the budget is exhausted, then records
//! the request. The whole check-and-record sequence runs inside one mutex
//! critical section, held across the sleep, so concurrent callers are
//! serialized at their effective request-issue moments.

use std::collections::VecDeque;
use std::time::Duration;

use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::debug;

pub struct RateLimiter {
    max_requests: usize,
    time_window: Duration,
    requests: Mutex<VecDeque<Instant>>,
}

impl RateLimiter {
    pub fn new(max_requests: usize, time_window: Duration) -> Self {
        Self {
            max_requests: max_requests.max(1),
            time_window,
            requests: Mutex::new(VecDeque::new()),
        }
    }

    /// Block until issuing another request stays within `max_requests` per
    /// trailing `time_window`, then record the request instant.
    pub async fn wait_if_needed(&self) {
        let mut requests = self.requests.lock().await;

        let now = Instant::now();
        while let Some(oldest) = requests.front() {
            if now.duration_since(*oldest) >= self.time_window {
                requests.pop_front();
            } else {
                break;
            }
        }

        if requests.len() >= self.max_requests {
            // Sleep until the oldest retained entry leaves the window.
            let oldest = *requests
                .front()
                .unwrap_or(&now);
            let wake_at = oldest + self.time_window;
            if wake_at > now {
                debug!(
                    wait_ms = (wake_at - now).as_millis() as u64,
                    "rate limit reached, waiting"
                );
                tokio::time::sleep_until(wake_at).await;
            }
            requests.pop_front();
        }

        requests.push_back(Instant::now());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[tokio::test(start_paused = true)]
    async fn no_delay_below_the_limit() {
        let limiter = RateLimiter::new(3, Duration::from_secs(60));
        let start = Instant::now();
        for _ in 0..3 {
            limiter.wait_if_needed().await;
        }
        assert!(start.elapsed() < Duration::from_millis(10));
    }

    #[tokio::test(start_paused = true)]
    async fn extra_request_waits_out_the_window() {
        let limiter = RateLimiter::new(2, Duration::from_secs(10));
        limiter.wait_if_needed().await;
        limiter.wait_if_needed().await;

        let start = Instant::now();
        limiter.wait_if_needed().await;
        let waited = start.elapsed();

        assert!(waited >= Duration::from_secs(9), "waited {waited:?}");
        assert!(waited <= Duration::from_secs(11), "waited {waited:?}");
    }

    #[tokio::test(start_paused = true)]
    async fn window_expiry_frees_the_budget() {
        let limiter = RateLimiter::new(1, Duration::from_secs(5));
        limiter.wait_if_needed().await;

        tokio::time::advance(Duration::from_secs(6)).await;

        let start = Instant::now();
        limiter.wait_if_needed().await;
        assert!(start.elapsed() < Duration::from_millis(10));
    }

    #[tokio::test(start_paused = true)]
    async fn concurrent_callers_are_serialized() {
        let limiter = Arc::new(RateLimiter::new(2, Duration::from_secs(4)));
        let start = Instant::now();

        let handles: Vec<_> = (0..4)
            .map(|_| {
                let limiter = Arc::clone(&limiter);
                tokio::spawn(async move {
                    limiter.wait_if_needed().await;
                })
            })
            .collect();
        for handle in handles {
            handle.await.unwrap();
        }

        // Four requests at two-per-4s need at least one full window of delay.
        assert!(start.elapsed() >= Duration::from_secs(4));
    }
}
