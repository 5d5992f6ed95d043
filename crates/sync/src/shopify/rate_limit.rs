//! Fixed-window client-side throttle for Admin REST calls.
//!
//! Shopify's REST budget for private apps is a small number of calls per
//! second per store. Every request waits here for a slot; when the window's
//! budget is spent the caller sleeps until the window resets. No call is ever
//! dropped.

use std::time::Duration;

use tokio::sync::Mutex;
use tokio::time::{Instant, sleep};
use tracing::debug;

/// Calls allowed per window for the Admin REST API.
pub const MAX_CALLS_PER_WINDOW: u32 = 4;

/// Length of one throttle window.
pub const WINDOW: Duration = Duration::from_secs(1);

/// Fixed-window call limiter.
///
/// The window opens on the first call after the previous window expired.
/// Holding the lock across the sleep serializes waiters, so concurrent callers
/// queue up in arrival order.
#[derive(Debug)]
pub struct FixedWindow {
    max_calls: u32,
    period: Duration,
    state: Mutex<WindowState>,
}

#[derive(Debug, Default)]
struct WindowState {
    opened_at: Option<Instant>,
    calls: u32,
}

impl FixedWindow {
    /// Create a limiter allowing `max_calls` per `period`.
    #[must_use]
    pub fn new(max_calls: u32, period: Duration) -> Self {
        Self {
            max_calls: max_calls.max(1),
            period,
            state: Mutex::new(WindowState::default()),
        }
    }

    /// Limiter matching the Admin REST API budget (4 calls per second).
    #[must_use]
    pub fn admin_rest() -> Self {
        Self::new(MAX_CALLS_PER_WINDOW, WINDOW)
    }

    #[cfg(test)]
    const fn max_calls(&self) -> u32 {
        self.max_calls
    }

    #[cfg(test)]
    const fn period(&self) -> Duration {
        self.period
    }

    /// Wait for a call slot in the current window.
    pub async fn acquire(&self) {
        let mut state = self.state.lock().await;
        let now = Instant::now();

        let opened_at = match state.opened_at {
            Some(opened_at) if now.duration_since(opened_at) < self.period => opened_at,
            _ => {
                state.opened_at = Some(now);
                state.calls = 0;
                now
            }
        };

        if state.calls >= self.max_calls {
            let wait = self.period.saturating_sub(now.duration_since(opened_at));
            debug!(
                wait_ms = wait.as_millis(),
                max_calls = self.max_calls,
                "Call budget exhausted, waiting for window reset"
            );
            sleep(wait).await;
            state.opened_at = Some(Instant::now());
            state.calls = 0;
        }

        state.calls += 1;
    }
}

impl Default for FixedWindow {
    fn default() -> Self {
        Self::admin_rest()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_fifth_call_waits_for_window_reset() {
        let limiter = FixedWindow::admin_rest();
        let start = Instant::now();

        for _ in 0..4 {
            limiter.acquire().await;
        }
        assert_eq!(start.elapsed(), Duration::ZERO);

        limiter.acquire().await;
        assert!(start.elapsed() >= Duration::from_secs(1));
    }

    #[tokio::test(start_paused = true)]
    async fn test_budget_resets_after_window() {
        let limiter = FixedWindow::new(2, Duration::from_secs(1));

        limiter.acquire().await;
        limiter.acquire().await;
        sleep(Duration::from_millis(1500)).await;

        let start = Instant::now();
        limiter.acquire().await;
        limiter.acquire().await;
        assert_eq!(start.elapsed(), Duration::ZERO);
    }

    #[tokio::test(start_paused = true)]
    async fn test_wait_is_measured_from_window_open() {
        let limiter = FixedWindow::new(1, Duration::from_secs(1));
        let start = Instant::now();

        limiter.acquire().await;
        sleep(Duration::from_millis(600)).await;
        limiter.acquire().await;

        let elapsed = start.elapsed();
        assert!(elapsed >= Duration::from_secs(1));
        assert!(elapsed < Duration::from_millis(1100));
    }

    #[tokio::test(start_paused = true)]
    async fn test_concurrent_callers_share_budget() {
        let limiter = std::sync::Arc::new(FixedWindow::admin_rest());
        let start = Instant::now();

        let mut handles = Vec::new();
        for _ in 0..8 {
            let limiter = limiter.clone();
            handles.push(tokio::spawn(async move {
                limiter.acquire().await;
                Instant::now()
            }));
        }

        let mut late = 0;
        for handle in handles {
            if let Ok(at) = handle.await
                && at.duration_since(start) >= Duration::from_secs(1)
            {
                late += 1;
            }
        }
        assert_eq!(late, 4);
    }

    #[test]
    fn test_zero_budget_is_clamped() {
        let limiter = FixedWindow::new(0, WINDOW);
        assert_eq!(limiter.max_calls(), 1);
        assert_eq!(limiter.period(), WINDOW);
    }
}
