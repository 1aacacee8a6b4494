use std::sync::Mutex;
use std::time::{Duration, Instant};

use dashmap::DashMap;

use crate::core::errors::ApiError;

const WINDOW: Duration = Duration::from_secs(60);

/// Fixed-window admission gate keyed by client address.
///
/// Expired windows are swept at most once per window length, so the map only
/// holds clients seen during the last minute or so.
pub struct RateLimiter {
    limit: u32,
    windows: DashMap<String, (Instant, u32)>,
    last_prune: Mutex<Instant>,
}

impl RateLimiter {
    pub fn new(limit_per_minute: u32) -> Self {
        Self {
            limit: limit_per_minute,
            windows: DashMap::new(),
            last_prune: Mutex::new(Instant::now()),
        }
    }

    pub fn check(&self, client: &str) -> Result<(), ApiError> {
        self.check_at(client, Instant::now())
    }

    fn check_at(&self, client: &str, now: Instant) -> Result<(), ApiError> {
        self.prune_at(now);

        let mut entry = self.windows.entry(client.to_string()).or_insert((now, 0));
        let (started, count) = entry.value_mut();

        if now.duration_since(*started) >= WINDOW {
            *started = now;
            *count = 0;
        }

        if *count >= self.limit {
            log::warn!("Rate limit exceeded for {}", client);
            return Err(ApiError::TooManyRequests);
        }

        *count += 1;
        Ok(())
    }

    fn prune_at(&self, now: Instant) {
        // Must not run while an entry guard is held.
        let Ok(mut last) = self.last_prune.try_lock() else {
            return;
        };
        if now.saturating_duration_since(*last) < WINDOW {
            return;
        }
        *last = now;

        let before = self.windows.len();
        self.windows
            .retain(|_, (started, _)| now.saturating_duration_since(*started) < WINDOW);
        log::debug!("Pruned {} expired rate limit windows", before.saturating_sub(self.windows.len()));
    }

    #[cfg(test)]
    fn tracked(&self) -> usize {
        self.windows.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blocks_after_budget_and_resets_next_window() {
        let limiter = RateLimiter::new(2);
        let start = Instant::now();

        assert!(limiter.check_at("1.2.3.4", start).is_ok());
        assert!(limiter.check_at("1.2.3.4", start).is_ok());
        assert!(matches!(limiter.check_at("1.2.3.4", start), Err(ApiError::TooManyRequests)));
        assert!(limiter.check_at("5.6.7.8", start).is_ok());

        assert!(limiter.check_at("1.2.3.4", start + WINDOW).is_ok());
    }

    #[test]
    fn expired_windows_are_dropped() {
        let limiter = RateLimiter::new(5);
        let start = Instant::now();

        for n in 0..100 {
            assert!(limiter.check_at(&format!("10.0.0.{}", n), start).is_ok());
        }
        assert_eq!(limiter.tracked(), 100);

        let later = start + WINDOW + Duration::from_secs(1);
        assert!(limiter.check_at("10.0.1.1", later).is_ok());
        assert_eq!(limiter.tracked(), 1);
    }
}
