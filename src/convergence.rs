//! Convergence monitor
//!
//! Polls the shared statistics and declares the network converged once no
//! route has changed for the configured quiet period. Any later route
//! change flips the state back to CONVERGING on the router side, and the
//! monitor resumes waiting.

use crate::clock::SimClock;
use crate::config::ProtocolTimers;
use crate::events::{EventBus, NetworkEvent};
use crate::stats::{ConvergenceState, NetworkStats};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tracing::{debug, info};

/// Runs the monitor loop until shutdown.
pub(crate) async fn run(
    stats: Arc<NetworkStats>,
    events: EventBus,
    timers: ProtocolTimers,
    clock: SimClock,
    mut shutdown: watch::Receiver<bool>,
) {
    let poll = Duration::from_secs_f64(timers.convergence_poll);
    loop {
        tokio::select! {
            () = tokio::time::sleep(poll) => {}
            _ = shutdown.changed() => break,
        }

        let now = clock.now();
        if stats.convergence_state() == ConvergenceState::Converging
            && now - stats.last_route_change_time() > timers.convergence_timeout
        {
            stats.mark_converged(now);
            info!(at = now, "network converged");
            events.publish(NetworkEvent::Converged { at: now });
        }
    }
    debug!("convergence monitor stopped");
}
