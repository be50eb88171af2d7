//! Admission control for outbound Alibaba Cloud API calls.
//!
//! Every upstream request of a collection cycle (metric queries, inventory listings, name lookups and performance
//! queries) draws from the same budget of `max_calls` per trailing second.

use std::{
    collections::VecDeque,
    time::Duration,
};
use tokio::{
    sync::Mutex,
    time::{
        sleep_until,
        Instant,
    },
};

#[derive(Debug)]
pub struct RateLimiter {
    max_calls: usize,
    period: Duration,
    /// Instants of the grants still inside the trailing window, oldest first.
    grants: Mutex<VecDeque<Instant>>,
}

impl RateLimiter {
    pub fn new(max_calls: u32) -> Self {
        Self::with_period(max_calls, Duration::from_secs(1))
    }

    pub fn with_period(max_calls: u32, period: Duration) -> Self {
        let max_calls = (max_calls as usize).max(1);
        Self {
            max_calls,
            period,
            grants: Mutex::new(VecDeque::with_capacity(max_calls)),
        }
    }

    pub fn max_calls(&self) -> usize {
        self.max_calls
    }

    /// Waits until a call is permitted and records it.
    ///
    /// Waiters hold the window lock while sleeping, so permits are handed out in arrival order.
    pub async fn acquire(&self) {
        let mut grants = self.grants.lock().await;
        loop {
            let now = Instant::now();
            while grants
                .front()
                .is_some_and(|granted| now.duration_since(*granted) >= self.period)
            {
                grants.pop_front();
            }

            if grants.len() < self.max_calls {
                grants.push_back(now);
                return;
            }

            if let Some(oldest) = grants.front().copied() {
                trace!(max_calls = self.max_calls, "Rate limit reached, waiting for the window to move");
                sleep_until(oldest + self.period).await;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[tokio::test(start_paused = true)]
    async fn permits_burst_up_to_limit_without_waiting() {
        let limiter = RateLimiter::new(3);
        let start = Instant::now();
        for _ in 0..3 {
            limiter.acquire().await;
        }
        assert_eq!(start.elapsed(), Duration::ZERO);

        limiter.acquire().await;
        assert!(start.elapsed() >= Duration::from_secs(1));
    }

    #[tokio::test(start_paused = true)]
    async fn never_exceeds_limit_in_any_trailing_window() {
        let limiter = Arc::new(RateLimiter::new(3));
        let granted = Arc::new(Mutex::new(Vec::new()));

        let mut handles = Vec::new();
        for _ in 0..4 {
            let limiter = limiter.clone();
            let granted = granted.clone();
            handles.push(tokio::spawn(async move {
                for _ in 0..5 {
                    limiter.acquire().await;
                    granted.lock().await.push(Instant::now());
                }
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }

        let mut granted = granted.lock().await.clone();
        granted.sort();
        assert_eq!(granted.len(), 20);
        for window in granted.windows(4) {
            assert!(window[3].duration_since(window[0]) >= Duration::from_secs(1));
        }
    }
}
