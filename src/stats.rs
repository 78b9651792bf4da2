//! Shared network statistics
//!
//! Counters and convergence tracking written by router tasks and the
//! convergence monitor. Fields are individually atomic; cross-field
//! consistency is not required, only eventual agreement.

use serde::Serialize;
use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicU8, Ordering};

/// Network-wide convergence state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ConvergenceState {
    Converging,
    Converged,
    Diverging,
}

impl ConvergenceState {
    fn from_u8(value: u8) -> Self {
        match value {
            1 => Self::Converged,
            2 => Self::Diverging,
            _ => Self::Converging,
        }
    }

    fn as_u8(self) -> u8 {
        match self {
            Self::Converging => 0,
            Self::Converged => 1,
            Self::Diverging => 2,
        }
    }
}

impl fmt::Display for ConvergenceState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Converging => write!(f, "CONVERGING"),
            Self::Converged => write!(f, "CONVERGED"),
            Self::Diverging => write!(f, "DIVERGING"),
        }
    }
}

/// Monotonic counters and convergence tracking for the whole network.
#[derive(Debug)]
pub struct NetworkStats {
    total_messages: AtomicU64,
    poison_reverse_messages: AtomicU64,
    total_route_changes: AtomicU64,
    // f64 seconds stored as bit patterns.
    last_route_change_time: AtomicU64,
    convergence_detected_at: AtomicU64,
    convergence_state: AtomicU8,
    periodic_updates_enabled: AtomicBool,
}

impl Default for NetworkStats {
    fn default() -> Self {
        Self {
            total_messages: AtomicU64::new(0),
            poison_reverse_messages: AtomicU64::new(0),
            total_route_changes: AtomicU64::new(0),
            last_route_change_time: AtomicU64::new(0f64.to_bits()),
            convergence_detected_at: AtomicU64::new(0f64.to_bits()),
            convergence_state: AtomicU8::new(ConvergenceState::Converging.as_u8()),
            periodic_updates_enabled: AtomicBool::new(true),
        }
    }
}

impl NetworkStats {
    /// Counts one sent advertisement; `poisoned` marks poison-reverse sends.
    pub fn record_message(&self, poisoned: bool) {
        self.total_messages.fetch_add(1, Ordering::Relaxed);
        if poisoned {
            self.poison_reverse_messages.fetch_add(1, Ordering::Relaxed);
        }
    }

    /// Counts `changes` route changes at `now` and re-enters CONVERGING.
    ///
    /// Only routes changed by processing a received advertisement are
    /// counted; timer and link transitions go through
    /// [`Self::record_route_activity`] instead.
    pub fn record_route_changes(&self, changes: u64, now: f64) {
        if changes == 0 {
            return;
        }
        self.total_route_changes.fetch_add(changes, Ordering::Relaxed);
        self.record_route_activity(now);
    }

    /// Notes route churn at `now` and re-enters CONVERGING without touching
    /// the change counter. Used by the timer sweep and the link
    /// failure/recovery handlers.
    pub fn record_route_activity(&self, now: f64) {
        self.last_route_change_time
            .store(now.to_bits(), Ordering::Relaxed);
        self.convergence_state
            .store(ConvergenceState::Converging.as_u8(), Ordering::Relaxed);
    }

    /// Current convergence state.
    #[must_use]
    pub fn convergence_state(&self) -> ConvergenceState {
        ConvergenceState::from_u8(self.convergence_state.load(Ordering::Relaxed))
    }

    /// Marks the network converged at `now`.
    pub fn mark_converged(&self, now: f64) {
        self.convergence_state
            .store(ConvergenceState::Converged.as_u8(), Ordering::Relaxed);
        self.convergence_detected_at
            .store(now.to_bits(), Ordering::Relaxed);
    }

    /// Time of the most recent route change, in simulation seconds.
    #[must_use]
    pub fn last_route_change_time(&self) -> f64 {
        f64::from_bits(self.last_route_change_time.load(Ordering::Relaxed))
    }

    /// Whether periodic advertisements are enabled.
    #[must_use]
    pub fn periodic_updates_enabled(&self) -> bool {
        self.periodic_updates_enabled.load(Ordering::Relaxed)
    }

    /// Flips the periodic-update flag, returning the new value.
    pub fn toggle_periodic_updates(&self) -> bool {
        !self.periodic_updates_enabled.fetch_xor(true, Ordering::Relaxed)
    }

    /// Resets every counter and flag to a fresh run. Used by `restart`.
    pub fn reset(&self) {
        self.total_messages.store(0, Ordering::Relaxed);
        self.poison_reverse_messages.store(0, Ordering::Relaxed);
        self.total_route_changes.store(0, Ordering::Relaxed);
        self.last_route_change_time
            .store(0f64.to_bits(), Ordering::Relaxed);
        self.convergence_detected_at
            .store(0f64.to_bits(), Ordering::Relaxed);
        self.convergence_state
            .store(ConvergenceState::Converging.as_u8(), Ordering::Relaxed);
        self.periodic_updates_enabled.store(true, Ordering::Relaxed);
    }

    /// Consistent-enough point-in-time copy for observers.
    #[must_use]
    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            total_messages: self.total_messages.load(Ordering::Relaxed),
            poison_reverse_messages: self.poison_reverse_messages.load(Ordering::Relaxed),
            total_route_changes: self.total_route_changes.load(Ordering::Relaxed),
            last_route_change_time: self.last_route_change_time(),
            convergence_state: self.convergence_state(),
            convergence_detected_at: f64::from_bits(
                self.convergence_detected_at.load(Ordering::Relaxed),
            ),
            periodic_updates_enabled: self.periodic_updates_enabled(),
        }
    }
}

/// Point-in-time view of [`NetworkStats`].
#[derive(Debug, Clone, Serialize)]
pub struct StatsSnapshot {
    pub total_messages: u64,
    pub poison_reverse_messages: u64,
    pub total_route_changes: u64,
    pub last_route_change_time: f64,
    pub convergence_state: ConvergenceState,
    pub convergence_detected_at: f64,
    pub periodic_updates_enabled: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counters_accumulate() {
        let stats = NetworkStats::default();
        stats.record_message(false);
        stats.record_message(true);
        stats.record_route_changes(3, 7.5);

        let snapshot = stats.snapshot();
        assert_eq!(snapshot.total_messages, 2);
        assert_eq!(snapshot.poison_reverse_messages, 1);
        assert_eq!(snapshot.total_route_changes, 3);
        assert!((snapshot.last_route_change_time - 7.5).abs() < f64::EPSILON);
        assert_eq!(snapshot.convergence_state, ConvergenceState::Converging);
    }

    #[test]
    fn route_change_reenters_converging() {
        let stats = NetworkStats::default();
        stats.mark_converged(50.0);
        assert_eq!(stats.convergence_state(), ConvergenceState::Converged);

        stats.record_route_changes(1, 51.0);
        assert_eq!(stats.convergence_state(), ConvergenceState::Converging);
    }

    #[test]
    fn route_activity_reenters_converging_without_counting() {
        let stats = NetworkStats::default();
        stats.mark_converged(50.0);

        stats.record_route_activity(51.0);
        assert_eq!(stats.convergence_state(), ConvergenceState::Converging);
        assert!((stats.last_route_change_time() - 51.0).abs() < f64::EPSILON);
        assert_eq!(stats.snapshot().total_route_changes, 0);
    }

    #[test]
    fn zero_changes_do_not_touch_state() {
        let stats = NetworkStats::default();
        stats.mark_converged(10.0);
        stats.record_route_changes(0, 11.0);
        assert_eq!(stats.convergence_state(), ConvergenceState::Converged);
        assert!(stats.last_route_change_time().abs() < f64::EPSILON);
    }

    #[test]
    fn toggle_flips_and_reset_restores() {
        let stats = NetworkStats::default();
        assert!(stats.periodic_updates_enabled());
        assert!(!stats.toggle_periodic_updates());
        assert!(!stats.periodic_updates_enabled());

        stats.reset();
        assert!(stats.periodic_updates_enabled());
        assert_eq!(stats.snapshot().total_messages, 0);
    }
}
