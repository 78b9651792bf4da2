//! Event surface
//!
//! A bounded fan-out channel of typed domain events. Any number of
//! consumers (loggers, UIs, tests) subscribe; a consumer that falls behind
//! loses the oldest events first and can observe how many it missed.

use crate::bus::MessageKind;
use crate::domain_types::{LinkCost, PathCost, RouterId};
use crate::link::LinkKey;
use serde::Serialize;
use tokio::sync::broadcast;

/// Domain events published by the engine.
#[derive(Debug, Clone, Serialize)]
pub enum NetworkEvent {
    LinkUp {
        link: LinkKey,
        cost: LinkCost,
    },
    LinkDown {
        link: LinkKey,
    },
    CostChange {
        link: LinkKey,
        old_cost: LinkCost,
        new_cost: LinkCost,
    },
    NodeDown {
        router: RouterId,
    },
    RouteChanged {
        router: RouterId,
        dest: RouterId,
        old_cost: PathCost,
        new_cost: PathCost,
        next_hop: Option<RouterId>,
    },
    RouteTimedOut {
        router: RouterId,
        dest: RouterId,
    },
    PoisonReverseSent {
        source: RouterId,
        destination: RouterId,
        poisoned: Vec<RouterId>,
    },
    MessageSent {
        source: RouterId,
        destination: RouterId,
        kind: MessageKind,
    },
    Converged {
        /// Simulation time at which quiescence was detected.
        at: f64,
    },
    Restarted,
    PeriodicUpdatesToggled {
        enabled: bool,
    },
}

/// Publishing side of the event channel. Cheap to clone.
#[derive(Debug, Clone)]
pub struct EventBus {
    tx: broadcast::Sender<NetworkEvent>,
}

impl EventBus {
    /// Creates a bus retaining at most `capacity` undelivered events per
    /// subscriber; beyond that the oldest are dropped.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let (tx, _rx) = broadcast::channel(capacity);
        Self { tx }
    }

    /// Publishes an event. Events published with no subscriber are simply
    /// discarded.
    pub fn publish(&self, event: NetworkEvent) {
        let _ = self.tx.send(event);
    }

    /// Opens a new subscription starting at the current stream position.
    #[must_use]
    pub fn subscribe(&self) -> EventStream {
        EventStream {
            rx: self.tx.subscribe(),
            missed: 0,
        }
    }
}

/// A subscriber's view of the event stream.
///
/// Keeps a running count of events lost to overflow so observers can detect
/// gaps.
#[derive(Debug)]
pub struct EventStream {
    rx: broadcast::Receiver<NetworkEvent>,
    missed: u64,
}

impl EventStream {
    /// Receives the next event, or `None` once the engine has shut down.
    pub async fn recv(&mut self) -> Option<NetworkEvent> {
        loop {
            match self.rx.recv().await {
                Ok(event) => return Some(event),
                Err(broadcast::error::RecvError::Lagged(count)) => {
                    self.missed += count;
                }
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    }

    /// Receives without waiting; `None` when no event is ready.
    pub fn try_recv(&mut self) -> Option<NetworkEvent> {
        loop {
            match self.rx.try_recv() {
                Ok(event) => return Some(event),
                Err(broadcast::error::TryRecvError::Lagged(count)) => {
                    self.missed += count;
                }
                Err(_) => return None,
            }
        }
    }

    /// Number of events this subscriber has lost to overflow.
    #[must_use]
    pub fn missed(&self) -> u64 {
        self.missed
    }
}
