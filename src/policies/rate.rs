//! # Rate gate for backend writes.
//!
//! [`RateGate`] enforces a minimum interval between permitted actions of one
//! sink. It never denies: [`RateGate::acquire`] suspends the calling pipeline
//! until the interval has elapsed, then records "now" and returns.
//!
//! ## Rules
//! - The first `acquire` returns immediately.
//! - Each later `acquire` returns no earlier than `min_interval` after the
//!   previous one returned.
//! - Gates are owned per sink; gates of different sinks never interact.
//!
//! # Example
//! ```rust
//! use std::time::Duration;
//! use runvisor::RateGate;
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() {
//! let mut gate = RateGate::new(Duration::from_millis(5));
//! gate.acquire().await; // immediate
//! gate.acquire().await; // waits ~5ms
//! # }
//! ```

use std::time::Duration;

use tokio::time::{self, Instant};

/// Minimum-interval gate for one sink.
#[derive(Debug)]
pub struct RateGate {
    min_interval: Duration,
    last: Option<Instant>,
}

impl RateGate {
    /// Creates a gate; `Duration::ZERO` disables gating.
    pub fn new(min_interval: Duration) -> Self {
        Self {
            min_interval,
            last: None,
        }
    }

    /// Waits until the interval since the previous acquisition has elapsed.
    ///
    /// Returns how long the caller was held back.
    pub async fn acquire(&mut self) -> Duration {
        let mut waited = Duration::ZERO;

        if let Some(ready_at) = self.ready_at() {
            let now = Instant::now();
            if ready_at > now {
                waited = ready_at - now;
                tracing::trace!(?waited, "rate gate holding");
                time::sleep_until(ready_at).await;
            }
        }

        self.last = Some(Instant::now());
        waited
    }

    /// Time left before `acquire` would return immediately.
    pub fn remaining(&self) -> Duration {
        self.ready_at()
            .map_or(Duration::ZERO, |at| at.saturating_duration_since(Instant::now()))
    }

    /// Earliest instant of the next acquisition; an interval past the clock's
    /// range counts as already elapsed.
    fn ready_at(&self) -> Option<Instant> {
        self.last.and_then(|last| last.checked_add(self.min_interval))
    }

    pub fn min_interval(&self) -> Duration {
        self.min_interval
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_first_acquire_is_immediate() {
        let mut gate = RateGate::new(Duration::from_secs(30));
        let before = Instant::now();
        assert_eq!(gate.acquire().await, Duration::ZERO);
        assert_eq!(Instant::now(), before);
    }

    #[tokio::test(start_paused = true)]
    async fn test_second_acquire_waits_full_interval() {
        let mut gate = RateGate::new(Duration::from_secs(30));
        gate.acquire().await;

        let before = Instant::now();
        let waited = gate.acquire().await;
        assert_eq!(waited, Duration::from_secs(30));
        assert!(Instant::now() - before >= Duration::from_secs(30));
    }

    #[tokio::test(start_paused = true)]
    async fn test_elapsed_time_counts_toward_interval() {
        let mut gate = RateGate::new(Duration::from_secs(10));
        gate.acquire().await;
        time::sleep(Duration::from_secs(7)).await;

        assert_eq!(gate.remaining(), Duration::from_secs(3));
        assert_eq!(gate.acquire().await, Duration::from_secs(3));

        time::sleep(Duration::from_secs(11)).await;
        assert_eq!(gate.acquire().await, Duration::ZERO);
    }

    #[tokio::test(start_paused = true)]
    async fn test_gates_are_independent() {
        let mut slow = RateGate::new(Duration::from_secs(30));
        let mut fast = RateGate::new(Duration::from_secs(10));
        slow.acquire().await;
        fast.acquire().await;

        let start = Instant::now();
        let fast_task = tokio::spawn(async move {
            fast.acquire().await;
            Instant::now()
        });
        let slow_task = tokio::spawn(async move {
            slow.acquire().await;
            Instant::now()
        });

        let fast_done = fast_task.await.unwrap();
        let slow_done = slow_task.await.unwrap();
        assert_eq!(fast_done - start, Duration::from_secs(10));
        assert_eq!(slow_done - start, Duration::from_secs(30));
    }

    #[tokio::test(start_paused = true)]
    async fn test_unrepresentable_interval_does_not_panic() {
        let mut gate = RateGate::new(Duration::from_secs_f64(1.5e19));
        gate.acquire().await;
        assert_eq!(gate.remaining(), Duration::ZERO);
        assert_eq!(gate.acquire().await, Duration::ZERO);
    }

    #[tokio::test(start_paused = true)]
    async fn test_zero_interval_never_waits() {
        let mut gate = RateGate::new(Duration::ZERO);
        for _ in 0..5 {
            assert_eq!(gate.acquire().await, Duration::ZERO);
        }
    }
}
