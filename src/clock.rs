//! Monotonic simulation clock
//!
//! All protocol deadlines are measured against this clock. It is built on
//! tokio's instant so tests running under paused time advance it virtually.
//! Wall-clock time is only ever used for log timestamps, never for deadlines.

use tokio::time::Instant;

/// Monotonic clock yielding seconds since engine start.
#[derive(Debug, Clone, Copy)]
pub struct SimClock {
    origin: Instant,
}

impl SimClock {
    /// Starts the clock at zero.
    #[must_use]
    pub fn start() -> Self {
        Self {
            origin: Instant::now(),
        }
    }

    /// Seconds elapsed since the clock started.
    #[must_use]
    pub fn now(&self) -> f64 {
        self.origin.elapsed().as_secs_f64()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test(start_paused = true)]
    async fn advances_with_virtual_time() {
        let clock = SimClock::start();
        assert!(clock.now() < 0.001);

        tokio::time::sleep(Duration::from_secs(30)).await;
        let now = clock.now();
        assert!((29.9..30.1).contains(&now), "clock read {now}");
    }
}
