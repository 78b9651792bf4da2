//! Advertisement messages and the in-flight message bus
//!
//! The bus models the wire: a send is non-blocking for the router, the
//! message spends the link's propagation delay in flight, and loss and
//! link-down conditions are evaluated at send time. Per-link FIFO is not
//! guaranteed; advertisements are self-describing vectors, so reordering is
//! harmless. A message sent at `t` is never delivered before `t + delay`.

use crate::clock::SimClock;
use crate::domain_types::{MessageId, PathCost, RouterId};
use crate::link::{LinkKey, LinkStore};
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::debug;

/// Classification of an advertisement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum MessageKind {
    /// Periodic advertisement.
    Regular,
    /// Advertisement carrying at least one poison-reversed destination.
    PoisonReverse,
    /// Rate-limited advertisement sent on a table change.
    Triggered,
}

/// A distance-vector advertisement in flight between two neighbors.
#[derive(Debug, Clone)]
pub struct Message {
    pub id: MessageId,
    pub source: RouterId,
    pub destination: RouterId,
    pub vector: BTreeMap<RouterId, PathCost>,
    pub poison_set: BTreeSet<RouterId>,
    pub sent_at: f64,
    pub kind: MessageKind,
}

/// Sender half of the message bus.
///
/// Cloned into every router. The receiver half is drained by the
/// coordinator's delivery task.
#[derive(Debug, Clone)]
pub struct MessageBus {
    tx: mpsc::Sender<Message>,
    links: Arc<LinkStore>,
    clock: SimClock,
}

impl MessageBus {
    /// Creates the bus and hands back the delivery queue.
    #[must_use]
    pub fn channel(
        capacity: usize,
        links: Arc<LinkStore>,
        clock: SimClock,
    ) -> (Self, mpsc::Receiver<Message>) {
        let (tx, rx) = mpsc::channel(capacity);
        (Self { tx, links, clock }, rx)
    }

    /// Puts `message` on the wire toward its destination.
    ///
    /// Returns false when the message was discarded at send time, either
    /// because the link is DOWN or because the loss draw failed. On success
    /// the message becomes visible to the delivery task no earlier than
    /// `sent_at + propagation_delay`.
    pub fn send(&self, message: Message) -> bool {
        let key = LinkKey::new(message.source.clone(), message.destination.clone());
        let Some(link) = self.links.get(&key) else {
            debug!(source = %message.source, destination = %message.destination,
                   "dropping message for nonexistent link");
            return false;
        };
        if !link.is_operational() {
            debug!(link = %key, "dropping message on DOWN link");
            return false;
        }
        if self.links.should_drop(&key) {
            debug!(link = %key, source = %message.source, "message lost on link");
            return false;
        }

        let delay = Duration::from_secs_f64(link.delay.as_secs_f64());
        let tx = self.tx.clone();
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            // The engine is shutting down if the delivery task is gone.
            let _ = tx.send(message).await;
        });
        true
    }

    /// Simulation time used to stamp `sent_at`.
    #[must_use]
    pub fn now(&self) -> f64 {
        self.clock.now()
    }
}
