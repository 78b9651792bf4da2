//! Engine configuration
//!
//! Protocol timer constants and engine tunables, with validation. The
//! defaults reproduce classic RIP-style timing.

use crate::domain_types::ChannelCapacity;
use crate::error::EngineError;
use serde::{Deserialize, Serialize};

/// Protocol timer configuration, in seconds.
///
/// All intervals are measured against the monotonic simulation clock.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProtocolTimers {
    /// Base interval between periodic advertisements.
    pub periodic_update: f64,
    /// Jitter fraction applied to the periodic interval; the effective
    /// interval is drawn uniformly from `periodic_update * (1 ± jitter)`.
    pub periodic_jitter: f64,
    /// Floor between consecutive triggered updates.
    pub min_triggered_interval: f64,
    /// A VALID route not refreshed for this long becomes INVALID.
    pub route_timeout: f64,
    /// An INVALID route is garbage-collected after this long.
    pub garbage_collection: f64,
    /// Duration a destination stays in hold-down after becoming unreachable.
    pub hold_down: f64,
    /// Quiet period after the last route change before the network counts
    /// as converged.
    pub convergence_timeout: f64,
    /// Poll interval of the convergence monitor.
    pub convergence_poll: f64,
    /// Cadence of the per-router timer sweep.
    pub sweep_interval: f64,
    /// Uniform range of the delay before a router's loop begins.
    pub startup_jitter: (f64, f64),
    /// Grace period before the dynamics driver injects its first fault.
    pub dynamics_grace: f64,
    /// Uniform range of the pause between injected faults.
    pub fault_interval: (f64, f64),
    /// Uniform range of the delay before a failed link recovers.
    pub recovery_delay: (f64, f64),
}

impl Default for ProtocolTimers {
    fn default() -> Self {
        Self {
            periodic_update: 15.0,
            periodic_jitter: 0.1,
            min_triggered_interval: 2.5,
            route_timeout: 90.0,
            garbage_collection: 60.0,
            hold_down: 90.0,
            convergence_timeout: 45.0,
            convergence_poll: 5.0,
            sweep_interval: 0.1,
            startup_jitter: (1.0, 5.0),
            dynamics_grace: 20.0,
            fault_interval: (10.0, 20.0),
            recovery_delay: (15.0, 25.0),
        }
    }
}

impl ProtocolTimers {
    /// Validates the timer set.
    ///
    /// # Errors
    /// Returns [`EngineError::Configuration`] naming the offending field.
    pub fn validate(&self) -> Result<(), EngineError> {
        let positive = [
            ("periodic_update", self.periodic_update),
            ("min_triggered_interval", self.min_triggered_interval),
            ("route_timeout", self.route_timeout),
            ("garbage_collection", self.garbage_collection),
            ("hold_down", self.hold_down),
            ("convergence_timeout", self.convergence_timeout),
            ("convergence_poll", self.convergence_poll),
            ("sweep_interval", self.sweep_interval),
        ];
        for (field, value) in positive {
            if !value.is_finite() || value <= 0.0 {
                return Err(EngineError::Configuration {
                    field,
                    reason: format!("must be a positive number of seconds, got {value}"),
                });
            }
        }
        if !(0.0..1.0).contains(&self.periodic_jitter) {
            return Err(EngineError::Configuration {
                field: "periodic_jitter",
                reason: format!("must be in [0, 1), got {}", self.periodic_jitter),
            });
        }
        if !self.dynamics_grace.is_finite() || self.dynamics_grace < 0.0 {
            return Err(EngineError::Configuration {
                field: "dynamics_grace",
                reason: format!("must be non-negative, got {}", self.dynamics_grace),
            });
        }
        let ranges = [
            ("startup_jitter", self.startup_jitter),
            ("fault_interval", self.fault_interval),
            ("recovery_delay", self.recovery_delay),
        ];
        for (field, (lo, hi)) in ranges {
            if !lo.is_finite() || !hi.is_finite() || lo < 0.0 || hi < lo {
                return Err(EngineError::Configuration {
                    field,
                    reason: format!("range [{lo}, {hi}] is not a valid interval"),
                });
            }
        }
        Ok(())
    }
}

/// Engine-level configuration wrapping the protocol timers.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Protocol timer set.
    pub timers: ProtocolTimers,
    /// Seed for the shared random stream; `None` seeds from entropy.
    pub seed: Option<u64>,
    /// Whether the randomized fault injector runs.
    pub dynamics_enabled: bool,
    /// Capacity of each router's inbox.
    pub inbox_capacity: ChannelCapacity,
    /// Capacity of the in-flight message queue.
    pub bus_capacity: ChannelCapacity,
    /// Capacity of the domain event channel.
    pub event_capacity: ChannelCapacity,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            timers: ProtocolTimers::default(),
            seed: None,
            dynamics_enabled: true,
            inbox_capacity: ChannelCapacity::default(),
            bus_capacity: ChannelCapacity::default(),
            event_capacity: ChannelCapacity::default(),
        }
    }
}

impl EngineConfig {
    /// Validates the configuration.
    ///
    /// # Errors
    /// Returns [`EngineError::Configuration`] naming the offending field.
    pub fn validate(&self) -> Result<(), EngineError> {
        self.timers.validate()
    }

    /// Configuration for deterministic scenario runs: seeded random stream
    /// and no randomized fault injection.
    #[must_use]
    pub fn deterministic(seed: u64) -> Self {
        Self {
            seed: Some(seed),
            dynamics_enabled: false,
            ..Self::default()
        }
    }
}
